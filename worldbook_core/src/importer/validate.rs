//! Book validation. Findings are reported, never thrown; callers decide
//! whether any of them are fatal.

use serde_json::Value;
use std::collections::HashSet;
use thiserror::Error;
use worldbook_model::Book;

use super::entry_values;
use super::fields::bool_field;
use super::keys::KEY_FIELDS;
use crate::matcher::{compile_regex_key, parse_regex_key};

/// One validation finding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationIssue {
    #[error("entry #{index} is not an object")]
    NotAnObject { index: usize },

    #[error("entry #{index} has no id")]
    MissingId { index: usize },

    #[error("entry #{index} ({id}) reuses an id already taken")]
    DuplicateId { index: usize, id: String },

    #[error("entry #{index} has no keys and is not constant")]
    MissingKeys { index: usize },

    #[error("entry #{index} has keys that are not an array")]
    KeysNotArray { index: usize },

    #[error("entry #{index} has no content")]
    MissingContent { index: usize },

    #[error("entry #{index} has a regex key that does not compile: {key}")]
    InvalidRegexKey { index: usize, key: String },
}

/// Outcome of a validation pass.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<ValidationIssue>,
}

impl ValidationReport {
    fn from_issues(errors: Vec<ValidationIssue>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }
}

/// Check a canonical book.
pub(crate) fn validate_book(book: &Book) -> ValidationReport {
    let mut issues = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();

    for (index, entry) in book.entries.iter().enumerate() {
        if entry.id.trim().is_empty() {
            issues.push(ValidationIssue::MissingId { index });
        } else if !seen.insert(entry.id.as_str()) {
            issues.push(ValidationIssue::DuplicateId {
                index,
                id: entry.id.clone(),
            });
        }

        if !entry.constant && entry.keys.iter().all(|k| k.trim().is_empty()) {
            issues.push(ValidationIssue::MissingKeys { index });
        }

        if entry.content.trim().is_empty() {
            issues.push(ValidationIssue::MissingContent { index });
        }

        for key in &entry.keys {
            if let Some((pattern, flags)) = parse_regex_key(key.trim()) {
                if compile_regex_key(pattern, flags).is_err() {
                    issues.push(ValidationIssue::InvalidRegexKey {
                        index,
                        key: key.clone(),
                    });
                }
            }
        }
    }

    ValidationReport::from_issues(issues)
}

/// Check raw JSON before import.
pub(crate) fn validate_raw(raw: &Value) -> ValidationReport {
    let mut issues = Vec::new();

    for (index, value) in entry_values(raw).into_iter().enumerate() {
        let Some(obj) = value.as_object() else {
            issues.push(ValidationIssue::NotAnObject { index });
            continue;
        };

        if !obj.contains_key("id") && !obj.contains_key("uid") {
            issues.push(ValidationIssue::MissingId { index });
        }

        let constant = bool_field(obj, &["constant", "alwaysActive"]).unwrap_or(false);
        match KEY_FIELDS.iter().find_map(|field| obj.get(*field)) {
            Some(Value::Array(_)) => {}
            Some(Value::Object(keys)) if keys.contains_key("primary") => {}
            Some(_) => issues.push(ValidationIssue::KeysNotArray { index }),
            None if !constant => issues.push(ValidationIssue::MissingKeys { index }),
            None => {}
        }

        if !["content", "entry", "text"].iter().any(|f| obj.contains_key(*f)) {
            issues.push(ValidationIssue::MissingContent { index });
        }
    }

    ValidationReport::from_issues(issues)
}
