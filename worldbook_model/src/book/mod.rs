//! Books - the caller-owned collection of entries handed to the engine.

use serde::{Deserialize, Serialize};

use crate::entry::Entry;

/// Book-level overrides of engine options.
///
/// Every field is optional; `None` keeps the engine's value. The same shape
/// is used to patch an engine's options in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct WorldBookSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_budget: Option<usize>,

    /// Fraction (0.0-1.0) of the token budget that lore may use.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_percent: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub recursive_scanning: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_recursion_steps: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub case_sensitive: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_whole_words: Option<bool>,

    /// Minimum number of entries to activate per turn (backfill target).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_activations: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_group_scoring: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_bonus: Option<bool>,

    /// Number of trailing chat messages appended to the scan text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scan_depth: Option<usize>,
}

impl WorldBookSettings {
    /// Check if no field is set.
    pub fn is_empty(&self) -> bool {
        *self == WorldBookSettings::default()
    }
}

/// A lorebook: entries plus optional settings and opaque metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Book {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default)]
    pub entries: Vec<Entry>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<WorldBookSettings>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl Book {
    /// Create an empty book.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a named book.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Add an entry.
    pub fn with_entry(mut self, entry: Entry) -> Self {
        self.entries.push(entry);
        self
    }

    /// Add multiple entries.
    pub fn with_entries(mut self, entries: impl IntoIterator<Item = Entry>) -> Self {
        self.entries.extend(entries);
        self
    }

    pub fn with_settings(mut self, settings: WorldBookSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Get an entry by id.
    pub fn get_entry(&self, id: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Iterate over enabled entries.
    pub fn enabled_entries(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter().filter(|e| e.enabled)
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }
}
