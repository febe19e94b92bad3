//! Script detection and boundary-safe substring search.

/// Check whether a character belongs to a CJK script (Han, kana, Hangul) or
/// to the CJK punctuation and full-width blocks.
pub fn is_cjk(c: char) -> bool {
    matches!(
        c as u32,
        0x3000..=0x303F        // CJK symbols and punctuation
            | 0x3040..=0x309F  // Hiragana
            | 0x30A0..=0x30FF  // Katakana
            | 0x3400..=0x4DBF  // CJK extension A
            | 0x4E00..=0x9FFF  // CJK unified ideographs
            | 0xAC00..=0xD7AF  // Hangul syllables
            | 0xF900..=0xFAFF  // CJK compatibility ideographs
            | 0xFF00..=0xFFEF  // Half-width and full-width forms
            | 0x20000..=0x2FA1F
    )
}

/// Check whether any character of `text` is CJK.
pub fn contains_cjk(text: &str) -> bool {
    text.chars().any(is_cjk)
}

/// Word characters for boundary checks: Latin-ish letters, digits, `_`.
/// CJK characters never extend a Latin word.
fn is_word_char(c: char) -> bool {
    c == '_' || (c.is_alphanumeric() && !is_cjk(c))
}

/// Find `needle` in `haystack` delimited on both sides by a non-word
/// character or the edge of the text, i.e. `(^|\W)needle(\W|$)`.
///
/// Overlapping occurrences are considered, so a failed boundary on one
/// occurrence does not hide a later valid one.
pub fn contains_whole_word(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }

    let mut from = 0;
    while let Some(offset) = haystack[from..].find(needle) {
        let start = from + offset;
        let end = start + needle.len();

        let before_ok = haystack[..start]
            .chars()
            .next_back()
            .map_or(true, |c| !is_word_char(c));
        let after_ok = haystack[end..]
            .chars()
            .next()
            .map_or(true, |c| !is_word_char(c));

        if before_ok && after_ok {
            return true;
        }

        // Advance by one character to allow overlapping matches.
        let step = haystack[start..].chars().next().map_or(1, char::len_utf8);
        from = start + step;
    }

    false
}

/// Map full-width ASCII variants (U+FF01-U+FF5E) and the ideographic space
/// to their half-width forms.
pub fn to_half_width(text: &str) -> String {
    text.chars()
        .map(|c| match c as u32 {
            0x3000 => ' ',
            code @ 0xFF01..=0xFF5E => char::from_u32(code - 0xFEE0).unwrap_or(c),
            _ => c,
        })
        .collect()
}
