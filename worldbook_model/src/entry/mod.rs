//! Lore entries - the unit the engine activates.

mod logic;
mod position;

pub use logic::*;
pub use position::*;

use serde::{Deserialize, Serialize};

fn default_enabled() -> bool {
    true
}

fn is_false(value: &bool) -> bool {
    !*value
}

fn is_true(value: &bool) -> bool {
    *value
}

/// A lore entry: trigger keys, content, and activation metadata.
///
/// `id` is the key for all persistent timer state in the engine and must not
/// change between turns. `keys` may only be empty when `constant` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub id: String,

    /// Trigger words, synonyms, or `/pattern/flags` regex strings.
    #[serde(default)]
    pub keys: Vec<String>,

    #[serde(default)]
    pub content: String,

    /// Free-form label carried through import/export.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,

    #[serde(default = "default_enabled", skip_serializing_if = "is_true")]
    pub enabled: bool,

    #[serde(default)]
    pub position: Position,

    #[serde(default)]
    pub priority: i32,

    /// Tie-break within a slot.
    #[serde(default)]
    pub order: i32,

    /// Depth for `at_depth` insertions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,

    /// Always active, independent of keys.
    #[serde(default, skip_serializing_if = "is_false")]
    pub constant: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selective_logic: Option<SelectiveLogic>,

    /// Minimum number of distinct keys that must match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_activations: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_sensitive: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_whole_words: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optional_filter: Option<OptionalFilter>,

    /// Thematic cluster; members reward each other when active together.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,

    /// Mutual exclusion group; one member survives per turn.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inclusion_group: Option<String>,

    /// Activation chance on a 0-100 scale.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probability: Option<f64>,

    /// Weight for the random draw inside an inclusion group (default 100).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_weight: Option<f64>,

    /// Resolve the inclusion group by score instead of by weight.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_group_scoring: Option<bool>,

    /// Resolve the inclusion group by highest `order`.
    #[serde(default, skip_serializing_if = "is_false")]
    pub prioritize_inclusion: bool,

    /// `Some(false)` keeps this entry's content out of recursive scans.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recursive: Option<bool>,

    /// Turns to stay active after activating.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sticky: Option<u32>,

    /// Turns to stay suppressed once sticky time is over.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cooldown: Option<u32>,

    /// Minimum number of turns seen before the entry may activate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<u32>,

    /// Never activated by a recursive scan.
    #[serde(default, skip_serializing_if = "is_false")]
    pub non_recursable: bool,

    /// Stops recursion once this entry is accepted.
    #[serde(default, skip_serializing_if = "is_false")]
    pub block_further: bool,

    /// Recursion level at which the entry becomes eligible.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_level: Option<u32>,

    /// Deepest recursion level at which the entry may still activate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_recursion_steps: Option<u32>,

    /// Generation types this entry is restricted to. Empty means all.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub generation_types: Vec<String>,
}

impl Entry {
    /// Create an enabled entry with the given id and content and no keys.
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            keys: Vec::new(),
            content: content.into(),
            comment: None,
            enabled: true,
            position: Position::default(),
            priority: 0,
            order: 0,
            depth: None,
            role: None,
            constant: false,
            selective_logic: None,
            min_activations: None,
            case_sensitive: None,
            match_whole_words: None,
            optional_filter: None,
            group: None,
            inclusion_group: None,
            probability: None,
            group_weight: None,
            use_group_scoring: None,
            prioritize_inclusion: false,
            recursive: None,
            sticky: None,
            cooldown: None,
            delay: None,
            non_recursable: false,
            block_further: false,
            delay_level: None,
            max_recursion_steps: None,
            generation_types: Vec::new(),
        }
    }

    /// Add a trigger key.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.keys.push(key.into());
        self
    }

    /// Add multiple trigger keys.
    pub fn with_keys(mut self, keys: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.keys.extend(keys.into_iter().map(Into::into));
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    pub fn with_position(mut self, position: Position) -> Self {
        self.position = position;
        self
    }

    /// Place the entry at a chat depth with an optional role.
    pub fn at_depth(mut self, depth: u32, role: Option<Role>) -> Self {
        self.position = Position::AtDepth;
        self.depth = Some(depth);
        self.role = role;
        self
    }

    pub fn constant(mut self) -> Self {
        self.constant = true;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Set the activation probability (0-100, clamped).
    pub fn with_probability(mut self, probability: f64) -> Self {
        self.probability = Some(probability.clamp(0.0, 100.0));
        self
    }

    pub fn with_inclusion_group(mut self, group: impl Into<String>) -> Self {
        self.inclusion_group = Some(group.into());
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn with_group_weight(mut self, weight: f64) -> Self {
        self.group_weight = Some(weight);
        self
    }

    pub fn with_sticky(mut self, turns: u32) -> Self {
        self.sticky = Some(turns);
        self
    }

    pub fn with_cooldown(mut self, turns: u32) -> Self {
        self.cooldown = Some(turns);
        self
    }

    pub fn with_delay(mut self, turns: u32) -> Self {
        self.delay = Some(turns);
        self
    }

    pub fn with_selective_logic(mut self, logic: SelectiveLogic) -> Self {
        self.selective_logic = Some(logic);
        self
    }

    pub fn with_optional_filter(mut self, filter: OptionalFilter) -> Self {
        self.optional_filter = Some(filter);
        self
    }

    /// Whether the entry may trigger from key matching at all.
    pub fn has_keys(&self) -> bool {
        !self.keys.is_empty()
    }

    /// Probability clamped into range; `None` means always pass.
    pub fn effective_probability(&self) -> Option<f64> {
        self.probability.map(|p| if p.is_nan() { 0.0 } else { p.clamp(0.0, 100.0) })
    }

    /// Inclusion-group draw weight, defaulting to 100.
    pub fn effective_group_weight(&self) -> f64 {
        match self.group_weight {
            Some(w) if w.is_finite() && w > 0.0 => w,
            Some(_) => 0.0,
            None => 100.0,
        }
    }

    /// Whether this entry's content feeds the next recursive scan.
    pub fn feeds_recursion(&self) -> bool {
        self.recursive != Some(false)
    }
}
