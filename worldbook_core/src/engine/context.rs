//! Per-turn input and output.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use worldbook_model::{ActivatedEntry, InsertionSlot};

/// What the engine scans this turn.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanContext {
    pub text: String,

    /// Prior messages. Its length is the number of turns seen for `delay`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_history: Option<Vec<String>>,

    /// Kind of generation (e.g. "normal", "continue", "impersonate").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation_type: Option<String>,

    /// Caller clock, carried into logs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_time: Option<u64>,
}

impl ScanContext {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn with_history(mut self, history: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.chat_history = Some(history.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_generation_type(mut self, generation_type: impl Into<String>) -> Self {
        self.generation_type = Some(generation_type.into());
        self
    }

    pub fn with_current_time(mut self, time: u64) -> Self {
        self.current_time = Some(time);
        self
    }

    /// The text to scan: the turn text followed by the last `scan_depth`
    /// history messages.
    pub fn scan_text(&self, scan_depth: usize) -> String {
        let history = self.chat_history.as_deref().unwrap_or(&[]);
        if scan_depth == 0 || history.is_empty() {
            return self.text.clone();
        }

        let start = history.len().saturating_sub(scan_depth);
        let mut text = self.text.clone();
        for message in &history[start..] {
            text.push('\n');
            text.push_str(message);
        }
        text
    }
}

impl From<&str> for ScanContext {
    fn from(text: &str) -> Self {
        ScanContext::new(text)
    }
}

impl From<String> for ScanContext {
    fn from(text: String) -> Self {
        ScanContext::new(text)
    }
}

/// Everything one `process()` call produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessResult {
    /// Insertion slots in prompt order.
    pub slots: Vec<InsertionSlot>,

    /// Accepted entries in acceptance order.
    pub activated_entries: Vec<ActivatedEntry>,

    /// Estimated tokens used by the accepted entries.
    pub total_tokens: usize,

    /// Wall time of the call. Diagnostic only.
    pub process_time: Duration,
}

impl ProcessResult {
    /// Ids of accepted entries in acceptance order.
    pub fn activated_ids(&self) -> Vec<&str> {
        self.activated_entries.iter().map(|a| a.id()).collect()
    }

    pub fn is_activated(&self, id: &str) -> bool {
        self.activated_entries.iter().any(|a| a.id() == id)
    }

    pub fn get(&self, id: &str) -> Option<&ActivatedEntry> {
        self.activated_entries.iter().find(|a| a.id() == id)
    }

    /// Format the slots as prompt text: one block per slot, entries joined by
    /// newlines, blocks separated by a blank line.
    pub fn to_prompt_string(&self) -> String {
        self.slots
            .iter()
            .filter(|slot| !slot.is_empty())
            .map(|slot| slot.joined_content("\n"))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}
