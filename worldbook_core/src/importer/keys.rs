//! Trigger key extraction and normalization.

use serde_json::Value;

use super::fields::Object;
use crate::matcher::{parse_regex_key, synonyms_for, to_half_width};

/// Fields tried, in order, for the primary keys.
pub const KEY_FIELDS: [&str; 6] = ["keys", "key", "keywords", "primary_keys", "关键词", "触发词"];

/// Fields carrying secondary (optional-filter) keys.
pub const SECONDARY_KEY_FIELDS: [&str; 5] = [
    "secondary_keys",
    "secondaryKeys",
    "keysecondary",
    "keySecondary",
    "key_secondary",
];

const SEPARATORS: [char; 9] = [',', '、', '，', ';', '；', '|', '/', '｜', '／'];

/// Keys pulled from a raw entry, before normalization.
#[derive(Debug, Default)]
pub(crate) struct ExtractedKeys {
    pub primary: Vec<String>,
    pub secondary: Vec<String>,
}

/// Pull keys from the first key field that yields any.
pub(crate) fn extract_keys(obj: &Object) -> ExtractedKeys {
    let mut extracted = ExtractedKeys::default();

    for field in KEY_FIELDS {
        if let Some(value) = obj.get(field) {
            collect_value(value, &mut extracted);
            if !extracted.primary.is_empty() || !extracted.secondary.is_empty() {
                break;
            }
        }
    }

    for field in SECONDARY_KEY_FIELDS {
        if let Some(value) = obj.get(field) {
            collect_flat(value, &mut extracted.secondary);
        }
    }

    extracted
}

fn collect_value(value: &Value, into: &mut ExtractedKeys) {
    match value {
        Value::Object(map) => {
            if let Some(primary) = map.get("primary") {
                collect_flat(primary, &mut into.primary);
            }
            if let Some(secondary) = map.get("secondary") {
                collect_flat(secondary, &mut into.secondary);
            }
        }
        other => collect_flat(other, &mut into.primary),
    }
}

/// Strings are split on separators; array items are taken as whole keys.
fn collect_flat(value: &Value, into: &mut Vec<String>) {
    match value {
        Value::String(s) => into.extend(split_key_string(s)),
        Value::Array(items) => {
            for item in items {
                match item {
                    Value::String(s) => into.push(s.clone()),
                    Value::Number(n) => into.push(n.to_string()),
                    _ => {}
                }
            }
        }
        Value::Number(n) => into.push(n.to_string()),
        _ => {}
    }
}

/// Split a key string on `, 、，;；|/` and whitespace. A string that is a
/// single `/pattern/flags` regex is kept whole.
pub fn split_key_string(raw: &str) -> Vec<String> {
    let trimmed = raw.trim();
    if parse_regex_key(trimmed).is_some() {
        return vec![trimmed.to_string()];
    }

    trimmed
        .split(|c: char| SEPARATORS.contains(&c) || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

/// Full-width → half-width, trim, drop empties, and dedup keeping the first
/// occurrence.
pub fn normalize_keys(keys: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for key in keys {
        let key = to_half_width(&key).trim().to_string();
        if !key.is_empty() && !out.contains(&key) {
            out.push(key);
        }
    }
    out
}

/// Normalize, append CJK synonyms of English keys, and dedup again.
pub fn expand_keys(keys: impl IntoIterator<Item = String>) -> Vec<String> {
    let normalized = normalize_keys(keys);
    let expansions: Vec<String> = normalized
        .iter()
        .flat_map(|key| synonyms_for(key).iter().map(|s| s.to_string()))
        .collect();
    normalize_keys(normalized.into_iter().chain(expansions))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn extract(value: Value) -> ExtractedKeys {
        extract_keys(value.as_object().unwrap())
    }

    #[test]
    fn test_split_permissive_separators() {
        assert_eq!(
            split_key_string("海南,三亚、海口，椰子;沙滩；岛|海/风 浪"),
            vec!["海南", "三亚", "海口", "椰子", "沙滩", "岛", "海", "风", "浪"]
        );
    }

    #[test]
    fn test_regex_string_not_split() {
        assert_eq!(split_key_string(" /sea|ocean/i "), vec!["/sea|ocean/i"]);
    }

    #[test]
    fn test_field_priority() {
        let keys = extract(json!({"keywords": "b", "key": ["a"]}));
        assert_eq!(keys.primary, vec!["a"]);

        let keys = extract(json!({"关键词": "海南，三亚"}));
        assert_eq!(keys.primary, vec!["海南", "三亚"]);
    }

    #[test]
    fn test_empty_field_falls_through() {
        let keys = extract(json!({"keys": [], "keywords": "moon"}));
        assert_eq!(keys.primary, vec!["moon"]);
    }

    #[test]
    fn test_primary_secondary_object() {
        let keys = extract(json!({"keys": {"primary": "sea, ship", "secondary": ["storm"]}}));
        assert_eq!(keys.primary, vec!["sea", "ship"]);
        assert_eq!(keys.secondary, vec!["storm"]);
    }

    #[test]
    fn test_legacy_secondary_fields() {
        let keys = extract(json!({"key": ["sea"], "keysecondary": ["calm"]}));
        assert_eq!(keys.secondary, vec!["calm"]);
    }

    #[test]
    fn test_normalize_dedups_after_width_folding() {
        let keys = normalize_keys(vec!["ＳＥＡ".into(), " SEA ".into(), "".into(), "sea".into()]);
        assert_eq!(keys, vec!["SEA", "sea"]);
    }

    #[test]
    fn test_expand_synonyms() {
        let keys = expand_keys(vec!["travel".into(), "旅行".into()]);
        assert_eq!(keys[0], "travel");
        assert_eq!(keys[1], "旅行");
        assert!(keys.contains(&"旅游".to_string()));
        assert_eq!(keys.iter().filter(|k| *k == "旅行").count(), 1);
    }

    #[test]
    fn test_expand_is_stable() {
        let once = expand_keys(vec!["weather".into(), "food".into()]);
        let twice = expand_keys(once.clone());
        assert_eq!(once, twice);
    }
}
