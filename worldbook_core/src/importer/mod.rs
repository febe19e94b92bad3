//! Importer - normalizes heterogeneous lorebook JSON into a [`Book`].
//!
//! [`Importer::import`] is total: malformed entries fall back to defaults
//! and non-object entries are skipped. Callers that want to reject bad
//! input run [`Importer::validate_raw`] or [`Importer::validate_strict`]
//! first.

mod fields;
mod keys;
mod validate;

pub use keys::{expand_keys, normalize_keys, split_key_string, KEY_FIELDS, SECONDARY_KEY_FIELDS};
pub use validate::{ValidationIssue, ValidationReport};

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};
use worldbook_model::{Book, Entry, FilterLogic, OptionalFilter, WorldBookSettings};

use fields::{
    bool_field, count_field, first, float_field, int_field, parse_logic, parse_position,
    parse_probability, parse_role, string_field, string_list_field, LogicField, Object,
    ProbabilityScale,
};
use keys::extract_keys;

/// Import errors.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("input is not JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("book failed validation with {} issue(s)", .issues.len())]
    Invalid { issues: Vec<ValidationIssue> },
}

/// Lorebook import, validation, and export.
#[derive(Debug, Clone, Copy, Default)]
pub struct Importer;

impl Importer {
    /// Normalize raw JSON into a canonical book. Never fails.
    pub fn import(raw: &Value) -> Book {
        let root = book_root(raw);
        let values = entry_values(raw);
        let scale = ProbabilityScale::detect(values.iter().copied());

        let mut entries = Vec::with_capacity(values.len());
        let mut synthesized = 0usize;
        let mut skipped = 0usize;

        for (index, value) in values.into_iter().enumerate() {
            let Some(obj) = value.as_object() else {
                warn!(index, "skipping lorebook entry that is not an object");
                skipped += 1;
                continue;
            };
            let entry = import_entry(index, obj, scale);
            if entry.id == synthetic_id(index) {
                synthesized += 1;
            }
            entries.push(entry);
        }

        let name = root.and_then(|r| string_field(r, &["name", "title"]));
        let settings = root.and_then(|r| r.get("settings")).and_then(import_settings);
        let metadata = root.and_then(|r| r.get("metadata")).cloned();

        debug!(entries = entries.len(), synthesized, skipped, ?scale, "imported lorebook");

        Book {
            name,
            entries,
            settings,
            metadata,
        }
    }

    /// Parse JSON text and import it.
    pub fn import_str(text: &str) -> Result<Book, ImportError> {
        let raw: Value = serde_json::from_str(text)?;
        Ok(Self::import(&raw))
    }

    /// Report typed findings on a canonical book.
    pub fn validate(book: &Book) -> ValidationReport {
        validate::validate_book(book)
    }

    /// Report findings on raw JSON before import.
    pub fn validate_raw(raw: &Value) -> ValidationReport {
        validate::validate_raw(raw)
    }

    /// Like [`Importer::validate`], but any finding is an error.
    pub fn validate_strict(book: &Book) -> Result<(), ImportError> {
        let report = Self::validate(book);
        if report.valid {
            Ok(())
        } else {
            Err(ImportError::Invalid {
                issues: report.errors,
            })
        }
    }

    /// Project a book back onto portable JSON.
    pub fn export(book: &Book) -> Value {
        match serde_json::to_value(book) {
            Ok(value) => value,
            Err(err) => {
                warn!(error = %err, "failed to export lorebook");
                Value::Object(Map::new())
            }
        }
    }
}

fn synthetic_id(index: usize) -> String {
    format!("entry_{index}")
}

/// The object holding book-level fields, unwrapping `{worldbook: {...}}`.
fn book_root(raw: &Value) -> Option<&Object> {
    let obj = raw.as_object()?;
    match obj.get("worldbook") {
        Some(Value::Object(inner)) => Some(inner),
        _ => Some(obj),
    }
}

/// Raw entry values in import order.
pub(crate) fn entry_values(raw: &Value) -> Vec<&Value> {
    match raw {
        Value::Array(items) => items.iter().collect(),
        Value::Object(obj) => match (obj.get("entries"), obj.get("worldbook")) {
            (Some(entries), _) => collection_values(entries),
            (None, Some(Value::Array(items))) => items.iter().collect(),
            (None, Some(inner @ Value::Object(_))) => entry_values(inner),
            _ if is_uid_map(obj) => uid_map_values(obj),
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

fn collection_values(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().collect(),
        Value::Object(map) => uid_map_values(map),
        _ => Vec::new(),
    }
}

fn is_uid_map(obj: &Object) -> bool {
    !obj.is_empty()
        && obj
            .iter()
            .all(|(k, v)| k.trim().parse::<i64>().is_ok() && v.is_object())
}

/// Values of a uid-keyed object, numeric uids first in numeric order.
fn uid_map_values(map: &Object) -> Vec<&Value> {
    let mut pairs: Vec<(&String, &Value)> = map.iter().collect();
    pairs.sort_by(|(a, _), (b, _)| {
        match (a.trim().parse::<i64>(), b.trim().parse::<i64>()) {
            (Ok(x), Ok(y)) => x.cmp(&y),
            (Ok(_), Err(_)) => std::cmp::Ordering::Less,
            (Err(_), Ok(_)) => std::cmp::Ordering::Greater,
            (Err(_), Err(_)) => a.cmp(b),
        }
    });
    pairs.into_iter().map(|(_, v)| v).collect()
}

fn import_settings(value: &Value) -> Option<WorldBookSettings> {
    match serde_json::from_value::<WorldBookSettings>(value.clone()) {
        Ok(settings) if settings.is_empty() => None,
        Ok(settings) => Some(settings),
        Err(err) => {
            warn!(error = %err, "ignoring malformed lorebook settings");
            None
        }
    }
}

fn import_entry(index: usize, obj: &Object, scale: ProbabilityScale) -> Entry {
    let id = string_field(obj, &["id", "uid"])
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| synthetic_id(index));
    let content = string_field(obj, &["content", "entry", "text"]).unwrap_or_default();

    let extracted = extract_keys(obj);
    let mut entry = Entry::new(id, content);
    entry.keys = expand_keys(extracted.primary);

    entry.comment = string_field(obj, &["comment", "name", "title", "memo"])
        .filter(|c| !c.trim().is_empty());
    entry.enabled = bool_field(obj, &["enabled"])
        .or_else(|| bool_field(obj, &["disable", "disabled"]).map(|d| !d))
        .unwrap_or(true);

    if let Some(position) = first(obj, &["position", "insertion_position", "insertionPosition"]) {
        entry.position = parse_position(position);
    }
    entry.priority = int_field(obj, &["priority"]).unwrap_or(0);
    entry.order = int_field(obj, &["order", "insertion_order", "insertionOrder"]).unwrap_or(0);
    entry.depth = count_field(obj, &["depth"]);
    entry.role = first(obj, &["role"]).and_then(parse_role);
    entry.constant = bool_field(obj, &["constant", "alwaysActive"]).unwrap_or(false);

    let mut legacy_filter_logic = None;
    match first(obj, &["selectiveLogic", "selective_logic"]).and_then(parse_logic) {
        Some(LogicField::Selective(logic)) => entry.selective_logic = Some(logic),
        Some(LogicField::Filter(logic)) => legacy_filter_logic = Some(logic),
        None => {}
    }
    entry.optional_filter = import_filter(obj, extracted.secondary, legacy_filter_logic);

    entry.min_activations = count_field(obj, &["minActivations", "min_activations"]);
    entry.case_sensitive = bool_field(obj, &["caseSensitive", "case_sensitive"]);
    entry.match_whole_words = bool_field(obj, &["matchWholeWords", "match_whole_words"]);

    entry.group = string_field(obj, &["group"]).filter(|g| !g.trim().is_empty());
    entry.inclusion_group = string_field(obj, &["inclusionGroup", "inclusion_group"])
        .filter(|g| !g.trim().is_empty());
    entry.group_weight = float_field(obj, &["groupWeight", "group_weight"]);
    entry.use_group_scoring = bool_field(obj, &["useGroupScoring", "use_group_scoring"]);
    entry.prioritize_inclusion =
        bool_field(obj, &["prioritizeInclusion", "groupOverride"]).unwrap_or(false);

    entry.probability = match bool_field(obj, &["useProbability"]) {
        Some(false) => None,
        _ => first(obj, &["probability"]).and_then(|p| parse_probability(p, scale)),
    };

    entry.recursive = bool_field(obj, &["recursive"])
        .or_else(|| bool_field(obj, &["preventRecursion"]).map(|p| !p));
    entry.non_recursable =
        bool_field(obj, &["nonRecursable", "excludeRecursion"]).unwrap_or(false);
    entry.block_further = bool_field(obj, &["blockFurther"]).unwrap_or(false);
    entry.delay_level = first(obj, &["delayLevel", "delayUntilRecursion"]).and_then(delay_level);
    entry.max_recursion_steps = count_field(obj, &["maxRecursionSteps", "max_recursion_steps"]);

    entry.sticky = count_field(obj, &["sticky"]);
    entry.cooldown = count_field(obj, &["cooldown"]);
    entry.delay = count_field(obj, &["delay"]);

    entry.generation_types = string_list_field(obj, &["generationTypes", "generation_types", "triggers"]);

    entry
}

/// `true` means level 1; numbers name the level; `false` and 0 mean none.
fn delay_level(value: &Value) -> Option<u32> {
    match value {
        Value::Bool(true) => Some(1),
        Value::Bool(false) => None,
        other => fields::as_f64(other)
            .map(|f| f.round().clamp(0.0, u32::MAX as f64) as u32)
            .filter(|level| *level > 0),
    }
}

fn import_filter(
    obj: &Object,
    secondary: Vec<String>,
    legacy_logic: Option<FilterLogic>,
) -> Option<OptionalFilter> {
    let nested = obj.get("optionalFilter").and_then(Value::as_object);

    let nested_keys = nested
        .map(|f| string_list_field(f, &["keys"]))
        .unwrap_or_default();
    let keys = normalize_keys(nested_keys.into_iter().chain(secondary));
    if keys.is_empty() {
        return None;
    }

    let logic = nested
        .and_then(|f| string_field(f, &["logic"]))
        .map(FilterLogic::from)
        .or(legacy_logic)
        .unwrap_or_default();

    Some(OptionalFilter { keys, logic })
}
