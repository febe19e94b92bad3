//! Per-turn output shapes.

use serde::{Deserialize, Serialize};

use crate::entry::{Entry, Position, Role};

/// An entry selected for this turn, with the facts that led to it.
///
/// Built fresh on every call; the source [`Entry`] is cloned, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivatedEntry {
    pub entry: Entry,

    /// Keys that matched the scan text (empty for constants, sticky carry-over,
    /// and backfill).
    pub matched_keys: Vec<String>,

    /// 0 for the direct scan, n for the n-th recursive scan.
    pub recursion_level: u32,

    pub activation_score: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_score: Option<f64>,

    /// Set when the entry is active because of a running sticky timer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sticky_remaining: Option<u32>,
}

impl ActivatedEntry {
    pub fn new(entry: Entry, matched_keys: Vec<String>, recursion_level: u32) -> Self {
        Self {
            entry,
            matched_keys,
            recursion_level,
            activation_score: 0.0,
            group_score: None,
            sticky_remaining: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.entry.id
    }

    pub fn content(&self) -> &str {
        &self.entry.content
    }

    /// Whether the entry is held active by a sticky timer.
    pub fn is_sticky_held(&self) -> bool {
        self.sticky_remaining.is_some()
    }
}

/// One insertion anchor with its ordered entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertionSlot {
    pub position: Position,
    pub entries: Vec<ActivatedEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

impl InsertionSlot {
    pub fn new(position: Position, depth: Option<u32>, role: Option<Role>) -> Self {
        Self {
            position,
            entries: Vec::new(),
            depth,
            role,
        }
    }

    /// Concatenate entry contents in slot order.
    pub fn joined_content(&self, separator: &str) -> String {
        self.entries
            .iter()
            .map(|e| e.content())
            .collect::<Vec<_>>()
            .join(separator)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
