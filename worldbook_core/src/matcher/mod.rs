//! Key matching against scan text.
//!
//! A key is either a literal or a `/pattern/flags` regex string. Literal keys
//! that contain CJK characters always match by substring; word boundaries
//! mean nothing inside CJK text. Pure-Latin literals honour whole-word
//! matching with a boundary that treats CJK neighbours as separators.

mod script;
mod synonyms;

pub use script::*;
pub use synonyms::*;

use regex::{Regex, RegexBuilder};
use std::borrow::Cow;
use std::collections::HashMap;
use tracing::warn;
use worldbook_model::Entry;

/// Regex flags accepted after the closing slash. Only `i`, `m`, `s`, and `x`
/// change behaviour.
const REGEX_FLAGS: &str = "gimsuxy";

/// Case and boundary handling for one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MatchOptions {
    pub case_sensitive: bool,
    pub whole_words: bool,
}

impl MatchOptions {
    /// Resolve per-entry overrides against engine-level defaults.
    pub fn for_entry(entry: &Entry, defaults: MatchOptions) -> Self {
        Self {
            case_sensitive: entry.case_sensitive.unwrap_or(defaults.case_sensitive),
            whole_words: entry.match_whole_words.unwrap_or(defaults.whole_words),
        }
    }
}

/// Scan text with its case-folded form computed once per scan.
#[derive(Debug, Clone)]
pub struct ScanText<'a> {
    raw: &'a str,
    folded: String,
}

impl<'a> ScanText<'a> {
    pub fn new(raw: &'a str) -> Self {
        Self {
            raw,
            folded: raw.to_lowercase(),
        }
    }

    pub fn raw(&self) -> &str {
        self.raw
    }

    fn haystack(&self, case_sensitive: bool) -> &str {
        if case_sensitive {
            self.raw
        } else {
            &self.folded
        }
    }
}

/// Split a `/pattern/flags` key into pattern and flags.
///
/// Returns `None` for literal keys, including paths such as `/usr/bin`
/// whose "flags" are not regex flags.
pub fn parse_regex_key(key: &str) -> Option<(&str, &str)> {
    let rest = key.strip_prefix('/')?;
    let close = rest.rfind('/')?;
    let (pattern, flags) = (&rest[..close], &rest[close + 1..]);
    if pattern.is_empty() || !flags.chars().all(|c| REGEX_FLAGS.contains(c)) {
        return None;
    }
    Some((pattern, flags))
}

/// Compile a regex key's pattern with its flags.
pub fn compile_regex_key(pattern: &str, flags: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern)
        .case_insensitive(flags.contains('i'))
        .multi_line(flags.contains('m'))
        .dot_matches_new_line(flags.contains('s'))
        .ignore_whitespace(flags.contains('x'))
        .build()
}

/// Matches entry keys against scan text, caching compiled regex keys.
///
/// Invalid regex keys are remembered as failures and never match.
#[derive(Debug, Default)]
pub struct KeyMatcher {
    regex_cache: HashMap<String, Option<Regex>>,
}

impl KeyMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the keys of `entry` that match the scan text, in key order.
    pub fn match_keys(
        &mut self,
        entry: &Entry,
        scan: &ScanText<'_>,
        defaults: MatchOptions,
    ) -> Vec<String> {
        let options = MatchOptions::for_entry(entry, defaults);
        entry
            .keys
            .iter()
            .filter(|key| self.key_matches(key, scan, options))
            .cloned()
            .collect()
    }

    /// Check a single key.
    pub fn key_matches(&mut self, key: &str, scan: &ScanText<'_>, options: MatchOptions) -> bool {
        let key = key.trim();
        if key.is_empty() {
            return false;
        }

        if let Some((pattern, flags)) = parse_regex_key(key) {
            return match self.compiled(key, pattern, flags) {
                Some(regex) => regex.is_match(scan.raw()),
                None => false,
            };
        }

        let haystack = scan.haystack(options.case_sensitive);
        let needle: Cow<'_, str> = if options.case_sensitive {
            Cow::Borrowed(key)
        } else {
            Cow::Owned(key.to_lowercase())
        };

        if options.whole_words && !contains_cjk(&needle) {
            contains_whole_word(haystack, &needle)
        } else {
            haystack.contains(needle.as_ref())
        }
    }

    /// Evaluate the entry's optional filter against the scan text.
    ///
    /// Filter keys are tested by containment (regex keys are honoured); the
    /// entry's [`worldbook_model::FilterLogic`] combines the results. An entry
    /// without a filter, or with an empty one, passes.
    pub fn passes_optional_filter(
        &mut self,
        entry: &Entry,
        scan: &ScanText<'_>,
        defaults: MatchOptions,
    ) -> bool {
        let Some(filter) = &entry.optional_filter else {
            return true;
        };

        let options = MatchOptions {
            whole_words: false,
            ..MatchOptions::for_entry(entry, defaults)
        };
        let present: Vec<bool> = filter
            .keys
            .iter()
            .filter(|key| !key.trim().is_empty())
            .map(|key| self.key_matches(key, scan, options))
            .collect();

        filter.logic.evaluate(&present)
    }

    /// Number of regex keys compiled (or failed) so far.
    pub fn cached_patterns(&self) -> usize {
        self.regex_cache.len()
    }

    fn compiled(&mut self, key: &str, pattern: &str, flags: &str) -> Option<&Regex> {
        self.regex_cache
            .entry(key.to_string())
            .or_insert_with(|| match compile_regex_key(pattern, flags) {
                Ok(regex) => Some(regex),
                Err(err) => {
                    warn!(key, error = %err, "invalid regex key never matches");
                    None
                }
            })
            .as_ref()
    }
}
