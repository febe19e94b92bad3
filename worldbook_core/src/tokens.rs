//! Token cost estimation.
//!
//! This is deliberately not a tokenizer. One token is counted per four UTF-16
//! code units, rounded up, which is close enough for budgeting across scripts.

/// Estimate the token cost of `text` as `ceil(utf16_len / 4)`.
pub fn estimate_tokens(text: &str) -> usize {
    text.encode_utf16().count().div_ceil(4)
}
