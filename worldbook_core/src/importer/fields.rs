//! Lenient field access on raw JSON entry objects.
//!
//! Every accessor takes a list of alias names and returns the first one that
//! is present and convertible. Numbers written as strings and booleans
//! written as 0/1 are accepted.

use serde_json::{Map, Value};
use worldbook_model::{FilterLogic, Position, Role, SelectiveLogic};

pub(crate) type Object = Map<String, Value>;

/// First present, non-null value among `names`.
pub(crate) fn first<'a>(obj: &'a Object, names: &[&str]) -> Option<&'a Value> {
    names
        .iter()
        .filter_map(|name| obj.get(*name))
        .find(|value| !value.is_null())
}

pub(crate) fn string_field(obj: &Object, names: &[&str]) -> Option<String> {
    names.iter().filter_map(|name| obj.get(*name)).find_map(|value| match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

pub(crate) fn bool_field(obj: &Object, names: &[&str]) -> Option<bool> {
    names.iter().filter_map(|name| obj.get(*name)).find_map(as_bool)
}

pub(crate) fn as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

pub(crate) fn float_field(obj: &Object, names: &[&str]) -> Option<f64> {
    names.iter().filter_map(|name| obj.get(*name)).find_map(as_f64)
}

pub(crate) fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|f| f.is_finite())
}

pub(crate) fn int_field(obj: &Object, names: &[&str]) -> Option<i32> {
    float_field(obj, names).map(|f| f.round().clamp(i32::MIN as f64, i32::MAX as f64) as i32)
}

pub(crate) fn count_field(obj: &Object, names: &[&str]) -> Option<u32> {
    float_field(obj, names).map(|f| f.round().clamp(0.0, u32::MAX as f64) as u32)
}

/// String values or a single string as a list.
pub(crate) fn string_list_field(obj: &Object, names: &[&str]) -> Vec<String> {
    match first(obj, names) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        Some(Value::String(s)) => vec![s.clone()],
        _ => Vec::new(),
    }
}

/// Map numeric codes 0-6 and legacy names onto the canonical positions.
///
/// | code | canonical        |
/// |------|------------------|
/// | 0    | `before_char`    |
/// | 1    | `after_char`     |
/// | 2    | `before_an`      |
/// | 3    | `after_an`       |
/// | 4    | `at_depth`       |
/// | 5    | `before_example` |
/// | 6    | `after_example`  |
///
/// Unrecognized values pass through as [`Position::Other`].
pub(crate) fn parse_position(value: &Value) -> Position {
    match value {
        Value::Number(n) => match n.as_f64() {
            Some(code) if code.fract() == 0.0 => position_from_code(code as i64),
            _ => Position::Other(n.to_string()),
        },
        Value::String(s) => {
            let trimmed = s.trim();
            if let Ok(code) = trimmed.parse::<i64>() {
                return position_from_code(code);
            }
            position_from_name(trimmed)
        }
        _ => Position::default(),
    }
}

fn position_from_code(code: i64) -> Position {
    match code {
        0 => Position::BeforeChar,
        1 => Position::AfterChar,
        2 => Position::BeforeAn,
        3 => Position::AfterAn,
        4 => Position::AtDepth,
        5 => Position::BeforeExample,
        6 => Position::AfterExample,
        other => Position::Other(other.to_string()),
    }
}

fn position_from_name(name: &str) -> Position {
    let compact: String = name
        .chars()
        .filter(|c| !matches!(c, '_' | '-' | ' '))
        .flat_map(char::to_lowercase)
        .collect();

    match compact.as_str() {
        "top" | "before" | "beforechar" | "beforemain" | "beforedesc" | "beforedescription" => {
            Position::BeforeChar
        }
        "bottom" | "after" | "afterchar" | "aftermain" | "afterdesc" | "afterdescription" => {
            Position::AfterChar
        }
        "beforeexample" | "beforeexamples" | "exampletop" | "emtop" => Position::BeforeExample,
        "afterexample" | "afterexamples" | "examplebottom" | "embottom" => Position::AfterExample,
        "beforean" | "antop" | "topan" | "beforeauthorsnote" => Position::BeforeAn,
        "afteran" | "anbottom" | "bottoman" | "afterauthorsnote" => Position::AfterAn,
        "atdepth" | "depth" | "@d" | "inchat" => Position::AtDepth,
        _ => Position::from_canonical(name),
    }
}

pub(crate) fn parse_role(value: &Value) -> Option<Role> {
    match value {
        Value::Number(n) => match n.as_i64()? {
            0 => Some(Role::System),
            1 => Some(Role::User),
            2 => Some(Role::Assistant),
            _ => None,
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "system" | "0" => Some(Role::System),
            "user" | "1" => Some(Role::User),
            "assistant" | "ai" | "model" | "char" | "2" => Some(Role::Assistant),
            _ => None,
        },
        _ => None,
    }
}

/// How a book writes probabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProbabilityScale {
    /// `0.0..=1.0`.
    Fraction,
    /// `0..=100`.
    Percent,
}

impl ProbabilityScale {
    /// A book whose probabilities are all at or below 1 uses fractions.
    pub(crate) fn detect<'a>(entries: impl IntoIterator<Item = &'a Value>) -> Self {
        let any_above_one = entries
            .into_iter()
            .filter_map(Value::as_object)
            .filter_map(|obj| first(obj, &["probability"]).and_then(as_f64))
            .any(|p| p > 1.0);
        if any_above_one {
            ProbabilityScale::Percent
        } else {
            ProbabilityScale::Fraction
        }
    }
}

/// Read a probability onto the 0-100 scale, clamped into `[0, 100]`.
pub(crate) fn parse_probability(value: &Value, scale: ProbabilityScale) -> Option<f64> {
    let raw = as_f64(value)?;
    let percent = match scale {
        ProbabilityScale::Fraction => raw * 100.0,
        ProbabilityScale::Percent => raw,
    };
    Some(percent.clamp(0.0, 100.0))
}

/// The primary-key logic, or a legacy optional-filter logic.
pub(crate) enum LogicField {
    Selective(SelectiveLogic),
    Filter(FilterLogic),
}

/// Interpret a `selectiveLogic` field.
///
/// Strings `AND`/`ALL` and `OR`/`ANY` set the primary-key logic. Legacy
/// numeric codes (0 AND_ANY, 1 NOT_ALL, 2 NOT_ANY, 3 AND_ALL) and the
/// `NOT_*` names describe the secondary-key filter instead.
pub(crate) fn parse_logic(value: &Value) -> Option<LogicField> {
    match value {
        Value::Number(n) => {
            let logic = match n.as_i64()? {
                0 => FilterLogic::AndAny,
                1 => FilterLogic::NotAll,
                2 => FilterLogic::NotAny,
                3 => FilterLogic::AndAll,
                _ => return None,
            };
            Some(LogicField::Filter(logic))
        }
        Value::String(s) => match s.trim().to_ascii_uppercase().as_str() {
            "AND" | "ALL" | "AND_ALL" => Some(LogicField::Selective(SelectiveLogic::And)),
            "OR" | "ANY" | "AND_ANY" => Some(LogicField::Selective(SelectiveLogic::Or)),
            "NOT_ANY" => Some(LogicField::Filter(FilterLogic::NotAny)),
            "NOT_ALL" => Some(LogicField::Filter(FilterLogic::NotAll)),
            _ => None,
        },
        _ => None,
    }
}
