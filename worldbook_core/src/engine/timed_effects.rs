//! Timers that persist across turns, keyed by entry id.
//!
//! An entry moves `fresh → active → sticky (N turns) → cooldown (M turns) →
//! fresh`. Sticky time runs first; cooldown only starts counting once the
//! sticky timer is spent.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Timer values for one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TimedEffect {
    pub sticky_remaining: u32,
    pub cooldown_remaining: u32,
    /// Ticks observed since the entry was first tracked.
    pub messages_seen: u32,
}

impl TimedEffect {
    /// Check if both timers are spent.
    pub fn is_idle(&self) -> bool {
        self.sticky_remaining == 0 && self.cooldown_remaining == 0
    }
}

/// What the tick at the start of a turn decided for each tracked entry.
#[derive(Debug, Clone, Default)]
pub struct TurnTimers {
    /// Entries held active this turn, with the sticky turns left after it.
    pub held: HashMap<String, u32>,
    /// Entries suppressed this turn.
    pub cooling: HashSet<String>,
}

impl TurnTimers {
    pub fn held_remaining(&self, id: &str) -> Option<u32> {
        self.held.get(id).copied()
    }

    pub fn is_cooling(&self, id: &str) -> bool {
        self.cooling.contains(id)
    }
}

/// Engine-owned timer map. Entries are created on the first activation that
/// sets a timer and are never removed.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TimedEffectState {
    effects: HashMap<String, TimedEffect>,
}

impl TimedEffectState {
    /// Create a new empty timer state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance every timer by one turn and report which entries are held or
    /// cooling for the turn that is starting.
    pub fn tick(&mut self) -> TurnTimers {
        let mut turn = TurnTimers::default();

        for (id, effect) in self.effects.iter_mut() {
            effect.messages_seen = effect.messages_seen.saturating_add(1);

            if effect.sticky_remaining > 0 {
                effect.sticky_remaining -= 1;
                turn.held.insert(id.clone(), effect.sticky_remaining);
            } else if effect.cooldown_remaining > 0 {
                effect.cooldown_remaining -= 1;
                turn.cooling.insert(id.clone());
            }
        }

        turn
    }

    /// Seed the timers of an entry that activated this turn.
    pub fn commit(&mut self, id: &str, sticky: u32, cooldown: u32) {
        if sticky == 0 && cooldown == 0 && !self.effects.contains_key(id) {
            return;
        }

        let effect = self.effects.entry(id.to_string()).or_default();
        effect.sticky_remaining = sticky;
        effect.cooldown_remaining = cooldown;
    }

    /// Get the timers of an entry.
    pub fn get(&self, id: &str) -> Option<&TimedEffect> {
        self.effects.get(id)
    }

    /// Number of entries ever tracked.
    pub fn tracked_count(&self) -> usize {
        self.effects.len()
    }

    /// Iterate over all tracked timers.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &TimedEffect)> {
        self.effects.iter()
    }

    /// Forget all timers.
    pub fn clear(&mut self) {
        self.effects.clear();
    }
}
