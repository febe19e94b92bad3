//! Key combination logic for primary keys and optional filters.

use serde::{Deserialize, Serialize};

/// How an entry's primary keys combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SelectiveLogic {
    /// Every key must match.
    #[serde(rename = "AND")]
    And,
    /// Any one key is enough.
    #[serde(rename = "OR")]
    Or,
}

/// Boolean combination applied by an [`OptionalFilter`].
///
/// Unknown logic names are kept verbatim in [`FilterLogic::Other`]; such a
/// filter always passes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(from = "String", into = "String")]
pub enum FilterLogic {
    /// Every filter key must be present.
    AndAll,
    /// At least one filter key must be present.
    #[default]
    AndAny,
    /// No filter key may be present.
    NotAny,
    /// At least one filter key must be absent.
    NotAll,
    Other(String),
}

impl FilterLogic {
    pub fn as_str(&self) -> &str {
        match self {
            FilterLogic::AndAll => "AND_ALL",
            FilterLogic::AndAny => "AND_ANY",
            FilterLogic::NotAny => "NOT_ANY",
            FilterLogic::NotAll => "NOT_ALL",
            FilterLogic::Other(name) => name,
        }
    }

    /// Combine per-key presence results. Empty input always passes.
    pub fn evaluate(&self, present: &[bool]) -> bool {
        if present.is_empty() {
            return true;
        }
        match self {
            FilterLogic::AndAll => present.iter().all(|p| *p),
            FilterLogic::AndAny => present.iter().any(|p| *p),
            FilterLogic::NotAny => !present.iter().any(|p| *p),
            FilterLogic::NotAll => !present.iter().all(|p| *p),
            FilterLogic::Other(_) => true,
        }
    }
}

impl From<String> for FilterLogic {
    fn from(name: String) -> Self {
        match name.to_ascii_uppercase().as_str() {
            "AND_ALL" => FilterLogic::AndAll,
            "AND_ANY" => FilterLogic::AndAny,
            "NOT_ANY" => FilterLogic::NotAny,
            "NOT_ALL" => FilterLogic::NotAll,
            _ => FilterLogic::Other(name),
        }
    }
}

impl From<FilterLogic> for String {
    fn from(logic: FilterLogic) -> Self {
        logic.as_str().to_string()
    }
}

/// Secondary keys that narrow an already-matched entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct OptionalFilter {
    pub keys: Vec<String>,
    #[serde(default)]
    pub logic: FilterLogic,
}

impl OptionalFilter {
    pub fn new(keys: impl IntoIterator<Item = impl Into<String>>, logic: FilterLogic) -> Self {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
            logic,
        }
    }
}
