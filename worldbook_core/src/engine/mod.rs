//! WorldBook Engine - selects the entries that are active this turn.
//!
//! Every `process()` call runs the same stages in a fixed order:
//! 1. **Tick**: advance sticky/cooldown timers by one turn
//! 2. **Select**: constants, plus entries whose keys match the scan text
//! 3. **Filter**: apply optional-filter logic to matched entries
//! 4. **Timed effects**: enforce delay and cooldown, carry sticky entries over
//! 5. **Groups**: score candidates and keep one member per inclusion group
//! 6. **Probability**: one seeded draw per remaining candidate (sticky and
//!    constant entries skip it)
//! 7. **Budget**: accept by score while the token total fits
//! 8. **Recursion or backfill**: re-scan accepted content, or top up to the
//!    minimum number of activations
//! 9. **Commit**: seed timers for newly activated entries
//! 10. **Distribute**: bucket the winners into ordered insertion slots

mod context;
mod options;
mod slots;
mod timed_effects;

pub use context::*;
pub use options::*;
pub use slots::*;
pub use timed_effects::*;

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Instant;
use tracing::{debug, trace};
use uuid::Uuid;
use worldbook_model::{ActivatedEntry, Book, Entry, SelectiveLogic, WorldBookSettings};

use crate::matcher::{distinct_concepts, KeyMatcher, MatchOptions, ScanText};
use crate::scoring::{
    apply_group_bonus, resolve_inclusion_groups, score_candidates, score_entry, sort_by_score,
};
use crate::tokens::estimate_tokens;

/// Identifies the conversation an engine instance serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Create a new random session id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The stateful activation engine.
///
/// Owns the timer map and the RNG stream, so one instance serves exactly one
/// conversation. Calls into the same instance must be serialized by the
/// caller.
pub struct WorldBookEngine {
    session_id: SessionId,
    options: EngineOptions,
    timers: TimedEffectState,
    matcher: KeyMatcher,
    rng: Box<dyn RngCore + Send>,
    turns: u64,
}

impl std::fmt::Debug for WorldBookEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorldBookEngine")
            .field("session_id", &self.session_id)
            .field("options", &self.options)
            .field("timers", &self.timers)
            .field("turns", &self.turns)
            .finish_non_exhaustive()
    }
}

/// Running totals shared by every acceptance stage of one turn.
struct Allocation {
    accepted: Vec<ActivatedEntry>,
    used_tokens: usize,
    limit: usize,
}

impl Allocation {
    fn contains(&self, id: &str) -> bool {
        self.accepted.iter().any(|a| a.id() == id)
    }

    fn claimed_groups(&self) -> HashSet<String> {
        self.accepted
            .iter()
            .filter_map(|a| a.entry.inclusion_group.clone())
            .collect()
    }

    /// Accept if the entry fits the remaining budget.
    fn try_accept(&mut self, candidate: ActivatedEntry) -> bool {
        let cost = estimate_tokens(candidate.content());
        if self.used_tokens + cost > self.limit {
            trace!(id = candidate.id(), cost, used = self.used_tokens, limit = self.limit, "dropped: over budget");
            return false;
        }
        self.used_tokens += cost;
        self.accepted.push(candidate);
        true
    }
}

impl WorldBookEngine {
    /// Create an engine. The RNG is seeded from `options.seed` when set and
    /// from entropy otherwise.
    pub fn new(options: EngineOptions) -> Self {
        let rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::with_rng(options, rng)
    }

    /// Create an engine with default options.
    pub fn with_defaults() -> Self {
        Self::new(EngineOptions::default())
    }

    /// Create an engine drawing from a caller-supplied RNG.
    pub fn with_rng(options: EngineOptions, rng: impl RngCore + Send + 'static) -> Self {
        Self {
            session_id: SessionId::new(),
            options,
            timers: TimedEffectState::new(),
            matcher: KeyMatcher::new(),
            rng: Box::new(rng),
            turns: 0,
        }
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Patch the engine options with every field the settings specify.
    pub fn set_options(&mut self, patch: &WorldBookSettings) {
        self.options.apply(patch);
    }

    /// Replace the RNG stream with one seeded from `seed`.
    pub fn reseed(&mut self, seed: u64) {
        self.options.seed = Some(seed);
        self.rng = Box::new(StdRng::seed_from_u64(seed));
    }

    /// Forget all timers and the turn count and start a new session.
    pub fn reset(&mut self) {
        self.timers.clear();
        self.turns = 0;
        self.session_id = SessionId::new();
        debug!(session = %self.session_id, "engine reset");
    }

    /// Number of `process()` calls so far in this session.
    pub fn turns(&self) -> u64 {
        self.turns
    }

    /// Timer state of an entry, if it ever set a timer.
    pub fn timed_effect(&self, id: &str) -> Option<&TimedEffect> {
        self.timers.get(id)
    }

    /// Run one turn against `book`.
    ///
    /// Never fails: malformed keys and filters degrade to "no match" and
    /// "pass" respectively.
    pub fn process(&mut self, book: &Book, context: impl Into<ScanContext>) -> ProcessResult {
        let started = Instant::now();
        let context = context.into();
        let options = self.options.overlaid(book.settings.as_ref());

        let turns_seen = context
            .chat_history
            .as_ref()
            .map_or(self.turns, |history| history.len() as u64);

        // 1. Tick
        let timers = self.timers.tick();
        self.turns += 1;

        let scan_text = context.scan_text(options.scan_depth);
        let scan = ScanText::new(&scan_text);
        let defaults = MatchOptions {
            case_sensitive: options.case_sensitive,
            whole_words: options.match_whole_words,
        };
        let generation_type = context.generation_type.as_deref();

        // 2-4. Select, filter, timed effects
        let candidates = self.select_candidates(book, &scan, defaults, generation_type, 0);
        let candidates = self.apply_optional_filters(candidates, &scan, defaults);
        let mut candidates = apply_timed_effects(candidates, book, &timers, turns_seen, generation_type);
        let considered = candidates.len();

        // 5. Groups
        score_candidates(&mut candidates);
        if options.group_bonus {
            apply_group_bonus(&mut candidates);
        }
        let candidates = resolve_inclusion_groups(candidates, options.use_group_scoring, &mut self.rng);

        // 6. Probability
        let mut rejected = HashSet::new();
        let candidates = self.probability_gate(candidates, &mut rejected);

        // 7. Budget
        let mut allocation = Allocation {
            accepted: Vec::new(),
            used_tokens: 0,
            limit: options.budget_limit(),
        };
        allocate(&mut allocation, candidates);

        // 8. Recursion or backfill
        let mut levels = 0;
        if options.recursive_scanning {
            levels = self.recurse(book, &mut allocation, &mut rejected, &options, &timers, turns_seen, generation_type);
        } else if allocation.accepted.len() < options.min_activations {
            backfill(book, &mut allocation, &options, &timers, turns_seen, generation_type);
        }

        // 9. Commit
        for activated in &allocation.accepted {
            if activated.is_sticky_held() {
                continue;
            }
            let entry = &activated.entry;
            self.timers
                .commit(&entry.id, entry.sticky.unwrap_or(0), entry.cooldown.unwrap_or(0));
        }

        // 10. Distribute
        let slots = distribute(&allocation.accepted);

        debug!(
            session = %self.session_id,
            turn = self.turns,
            current_time = context.current_time,
            considered,
            accepted = allocation.accepted.len(),
            total_tokens = allocation.used_tokens,
            limit = allocation.limit,
            recursion_levels = levels,
            "worldbook turn processed"
        );

        ProcessResult {
            slots,
            activated_entries: allocation.accepted,
            total_tokens: allocation.used_tokens,
            process_time: started.elapsed(),
        }
    }

    /// Constants and key-matched entries eligible at `level`.
    ///
    /// At level 0 constants are always included. At deeper levels constants,
    /// non-recursable entries, and entries past their own recursion limit are
    /// skipped.
    fn select_candidates(
        &mut self,
        book: &Book,
        scan: &ScanText<'_>,
        defaults: MatchOptions,
        generation_type: Option<&str>,
        level: u32,
    ) -> Vec<ActivatedEntry> {
        let mut candidates = Vec::new();

        for entry in book.enabled_entries() {
            if !allows_generation(entry, generation_type) {
                continue;
            }

            if level == 0 && entry.constant {
                candidates.push(ActivatedEntry::new(entry.clone(), Vec::new(), 0));
                continue;
            }
            if level > 0 && (entry.constant || entry.non_recursable) {
                continue;
            }
            if entry.delay_level.unwrap_or(0) > level {
                continue;
            }
            if entry.max_recursion_steps.is_some_and(|max| level > max) {
                continue;
            }

            let matched = self.matcher.match_keys(entry, scan, defaults);
            if keys_satisfied(entry, &matched) {
                candidates.push(ActivatedEntry::new(entry.clone(), matched, level));
            }
        }

        candidates
    }

    /// Drop matched entries whose optional filter fails. Entries without
    /// matched keys (constants) are never filtered.
    fn apply_optional_filters(
        &mut self,
        candidates: Vec<ActivatedEntry>,
        scan: &ScanText<'_>,
        defaults: MatchOptions,
    ) -> Vec<ActivatedEntry> {
        candidates
            .into_iter()
            .filter(|candidate| {
                if candidate.matched_keys.is_empty() {
                    return true;
                }
                let keep = self
                    .matcher
                    .passes_optional_filter(&candidate.entry, scan, defaults);
                if !keep {
                    trace!(id = candidate.id(), "dropped: optional filter");
                }
                keep
            })
            .collect()
    }

    /// One draw per candidate that is neither sticky-held nor constant.
    /// Losers are added to `rejected`; they get no second draw this turn.
    fn probability_gate(
        &mut self,
        candidates: Vec<ActivatedEntry>,
        rejected: &mut HashSet<String>,
    ) -> Vec<ActivatedEntry> {
        candidates
            .into_iter()
            .filter(|candidate| {
                if candidate.is_sticky_held() || candidate.entry.constant {
                    return true;
                }
                let keep = self.passes_probability(&candidate.entry);
                if !keep {
                    trace!(id = candidate.id(), probability = candidate.entry.probability, "dropped: probability");
                    rejected.insert(candidate.entry.id.clone());
                }
                keep
            })
            .collect()
    }

    fn passes_probability(&mut self, entry: &Entry) -> bool {
        match entry.effective_probability() {
            None => true,
            Some(p) if p >= 100.0 => true,
            Some(p) if p <= 0.0 => false,
            Some(p) => self.rng.gen::<f64>() * 100.0 < p,
        }
    }

    /// Re-scan accepted content level by level. Returns the number of levels
    /// that accepted at least one entry.
    fn recurse(
        &mut self,
        book: &Book,
        allocation: &mut Allocation,
        rejected: &mut HashSet<String>,
        options: &EngineOptions,
        timers: &TurnTimers,
        turns_seen: u64,
        generation_type: Option<&str>,
    ) -> u32 {
        if allocation.accepted.iter().any(|a| a.entry.block_further) {
            trace!("recursion blocked at level 0");
            return 0;
        }

        let defaults = MatchOptions {
            case_sensitive: options.case_sensitive,
            whole_words: options.match_whole_words,
        };
        let mut levels = 0;

        for level in 1..=options.max_recursion_steps {
            let recursion_text = allocation
                .accepted
                .iter()
                .filter(|a| a.entry.feeds_recursion())
                .map(|a| a.content())
                .collect::<Vec<_>>()
                .join("\n");
            if recursion_text.trim().is_empty() {
                break;
            }
            let scan = ScanText::new(&recursion_text);

            let claimed = allocation.claimed_groups();
            let candidates = self.select_candidates(book, &scan, defaults, generation_type, level);
            let candidates: Vec<ActivatedEntry> = self
                .apply_optional_filters(candidates, &scan, defaults)
                .into_iter()
                .filter(|c| !allocation.contains(c.id()) && !rejected.contains(c.id()))
                .filter(|c| is_unclaimed(&c.entry, &claimed))
                .filter(|c| passes_timing(&c.entry, timers, turns_seen))
                .collect();

            let mut candidates = candidates;
            score_candidates(&mut candidates);
            if options.group_bonus {
                apply_group_bonus(&mut candidates);
            }
            let candidates = resolve_inclusion_groups(candidates, options.use_group_scoring, &mut self.rng);
            let candidates = self.probability_gate(candidates, rejected);

            let before = allocation.accepted.len();
            allocate(allocation, candidates);
            let added = &allocation.accepted[before..];
            if added.is_empty() {
                break;
            }

            levels = level;
            trace!(level, added = added.len(), "recursive scan accepted entries");
            if added.iter().any(|a| a.entry.block_further) {
                trace!(level, "recursion blocked");
                break;
            }
        }

        levels
    }
}

/// Whether the matched keys satisfy the entry's key logic.
///
/// Keys are counted as concepts: a synonym appended on import counts
/// together with the word it came from.
fn keys_satisfied(entry: &Entry, matched: &[String]) -> bool {
    if matched.is_empty() {
        return false;
    }
    let found = distinct_concepts(matched, &entry.keys);
    match entry.selective_logic {
        Some(SelectiveLogic::And) => found == distinct_concepts(&entry.keys, &entry.keys),
        Some(SelectiveLogic::Or) => true,
        None => {
            let required = entry.min_activations.unwrap_or(0).max(1) as usize;
            found >= required
        }
    }
}

fn allows_generation(entry: &Entry, generation_type: Option<&str>) -> bool {
    match generation_type {
        Some(kind) if !entry.generation_types.is_empty() => {
            entry.generation_types.iter().any(|t| t.eq_ignore_ascii_case(kind))
        }
        _ => true,
    }
}

/// Delay and cooldown checks for a non-constant, non-held entry.
fn passes_timing(entry: &Entry, timers: &TurnTimers, turns_seen: u64) -> bool {
    if entry.delay.is_some_and(|delay| u64::from(delay) > turns_seen) {
        trace!(id = %entry.id, delay = entry.delay, turns_seen, "dropped: delay");
        return false;
    }
    if timers.is_cooling(&entry.id) {
        trace!(id = %entry.id, "dropped: cooldown");
        return false;
    }
    true
}

fn is_unclaimed(entry: &Entry, claimed: &HashSet<String>) -> bool {
    entry
        .inclusion_group
        .as_ref()
        .map_or(true, |group| !claimed.contains(group))
}

/// Enforce delay and cooldown, then carry over entries held by a sticky
/// timer whether or not they matched this turn.
fn apply_timed_effects(
    candidates: Vec<ActivatedEntry>,
    book: &Book,
    timers: &TurnTimers,
    turns_seen: u64,
    generation_type: Option<&str>,
) -> Vec<ActivatedEntry> {
    let mut kept: Vec<ActivatedEntry> = candidates
        .into_iter()
        .filter_map(|mut candidate| {
            if let Some(remaining) = timers.held_remaining(candidate.id()) {
                candidate.sticky_remaining = Some(remaining);
                return Some(candidate);
            }
            if candidate.entry.constant || passes_timing(&candidate.entry, timers, turns_seen) {
                Some(candidate)
            } else {
                None
            }
        })
        .collect();

    for entry in book.enabled_entries() {
        let Some(remaining) = timers.held_remaining(&entry.id) else {
            continue;
        };
        if kept.iter().any(|c| c.id() == entry.id) || !allows_generation(entry, generation_type) {
            continue;
        }
        let mut carried = ActivatedEntry::new(entry.clone(), Vec::new(), 0);
        carried.sticky_remaining = Some(remaining);
        trace!(id = %entry.id, remaining, "sticky carry-over");
        kept.push(carried);
    }

    kept
}

/// Accept candidates by score while they fit the remaining budget.
fn allocate(allocation: &mut Allocation, mut candidates: Vec<ActivatedEntry>) {
    sort_by_score(&mut candidates);
    for candidate in candidates {
        allocation.try_accept(candidate);
    }
}

/// Top up to `min_activations` by priority from entries not yet accepted.
///
/// Backfilled entries skip the probability gate but still respect delay,
/// cooldown, inclusion groups, and the budget.
fn backfill(
    book: &Book,
    allocation: &mut Allocation,
    options: &EngineOptions,
    timers: &TurnTimers,
    turns_seen: u64,
    generation_type: Option<&str>,
) {
    let mut pool: Vec<&Entry> = book
        .enabled_entries()
        .filter(|e| !allocation.contains(&e.id))
        .filter(|e| e.delay_level.unwrap_or(0) == 0)
        .filter(|e| allows_generation(e, generation_type))
        .collect();
    pool.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then_with(|| a.order.cmp(&b.order))
            .then_with(|| a.id.cmp(&b.id))
    });

    let mut claimed = allocation.claimed_groups();
    let mut added = 0;
    for entry in pool {
        if allocation.accepted.len() >= options.min_activations {
            break;
        }
        if !is_unclaimed(entry, &claimed) || !passes_timing(entry, timers, turns_seen) {
            continue;
        }

        let mut candidate = ActivatedEntry::new(entry.clone(), Vec::new(), 0);
        candidate.activation_score = score_entry(entry, &[]);
        if allocation.try_accept(candidate) {
            if let Some(group) = &entry.inclusion_group {
                claimed.insert(group.clone());
            }
            added += 1;
        }
    }

    trace!(added, target = options.min_activations, "backfill finished");
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;
    use worldbook_model::{FilterLogic, OptionalFilter, Position};

    fn engine() -> WorldBookEngine {
        WorldBookEngine::new(EngineOptions::default().with_seed(7))
    }

    #[test]
    fn test_example_scenario() {
        let book = Book::new()
            .with_entry(Entry::new("e1", "Hainan lore").with_key("海南").with_priority(50))
            .with_entry(Entry::new("e2", "Always here").constant().with_priority(10));

        let result = engine().process(&book, "我想去海南玩");

        assert!(result.is_activated("e1"));
        assert!(result.is_activated("e2"));
        let e1 = result.get("e1").unwrap();
        let e2 = result.get("e2").unwrap();
        assert!(e2.activation_score > e1.activation_score);
        assert_eq!(result.activated_ids(), vec!["e2", "e1"]);
        assert_eq!(e1.matched_keys, vec!["海南"]);
    }

    #[test]
    fn test_disabled_entries_never_activate() {
        let book = Book::new().with_entry(Entry::new("off", "x").with_key("dragon").disabled());
        assert!(engine().process(&book, "dragon").activated_entries.is_empty());
    }

    #[test]
    fn test_min_activations_per_entry() {
        let mut entry = Entry::new("pair", "x").with_keys(["sword", "shield", "helm"]);
        entry.min_activations = Some(2);
        let book = Book::new().with_entry(entry);

        let mut engine = engine();
        assert!(!engine.process(&book, "a sword").is_activated("pair"));
        assert!(engine.process(&book, "a sword and shield").is_activated("pair"));
    }

    #[test]
    fn test_selective_and_requires_all_keys() {
        let book = Book::new().with_entry(
            Entry::new("both", "x")
                .with_keys(["moon", "wolf"])
                .with_selective_logic(SelectiveLogic::And),
        );

        let mut engine = engine();
        assert!(!engine.process(&book, "the moon rises").is_activated("both"));
        assert!(engine.process(&book, "the wolf howls at the moon").is_activated("both"));
    }

    #[test]
    fn test_optional_filter_narrows() {
        let book = Book::new().with_entry(
            Entry::new("calm-sea", "x")
                .with_key("sea")
                .with_optional_filter(OptionalFilter::new(["storm"], FilterLogic::NotAny)),
        );

        let mut engine = engine();
        assert!(engine.process(&book, "the sea is calm").is_activated("calm-sea"));
        assert!(!engine.process(&book, "storm over the sea").is_activated("calm-sea"));
    }

    #[test]
    fn test_sticky_overrides_probability() {
        let mut book = Book::new().with_entry(Entry::new("s", "sticky lore").with_key("omen").with_sticky(3));

        let mut engine = engine();
        assert!(engine.process(&book, "an omen").is_activated("s"));

        book.entries[0].probability = Some(0.0);
        for turn in 0..3 {
            let result = engine.process(&book, "nothing relevant");
            assert!(result.is_activated("s"), "turn {turn} should still be sticky");
            assert!(result.get("s").unwrap().is_sticky_held());
        }
        assert!(!engine.process(&book, "nothing relevant").is_activated("s"));
    }

    #[test]
    fn test_cooldown_suppresses_matches() {
        let book = Book::new().with_entry(Entry::new("c", "x").with_key("bell").with_cooldown(2));

        let mut engine = engine();
        assert!(engine.process(&book, "bell").is_activated("c"));
        assert!(!engine.process(&book, "bell").is_activated("c"));
        assert!(!engine.process(&book, "bell").is_activated("c"));
        assert!(engine.process(&book, "bell").is_activated("c"));
    }

    #[test]
    fn test_delay_uses_chat_history_length() {
        let book = Book::new().with_entry(Entry::new("late", "x").with_key("door").with_delay(2));

        let mut engine = engine();
        let short = ScanContext::new("door").with_history(["hi"]);
        assert!(!engine.process(&book, short).is_activated("late"));

        let long = ScanContext::new("door").with_history(["hi", "hello"]);
        assert!(engine.process(&book, long).is_activated("late"));
    }

    #[test]
    fn test_delay_falls_back_to_turn_count() {
        let book = Book::new().with_entry(Entry::new("late", "x").with_key("door").with_delay(1));

        let mut engine = engine();
        assert!(!engine.process(&book, "door").is_activated("late"));
        assert!(engine.process(&book, "door").is_activated("late"));
    }

    #[test]
    fn test_probability_zero_never_activates() {
        let book = Book::new().with_entry(Entry::new("p", "x").with_key("coin").with_probability(0.0));
        let mut engine = engine();
        for _ in 0..10 {
            assert!(!engine.process(&book, "coin").is_activated("p"));
        }
    }

    #[test]
    fn test_budget_is_respected() {
        let settings = WorldBookSettings {
            token_budget: Some(10),
            context_percent: Some(1.0),
            ..Default::default()
        };
        let book = Book::new()
            .with_settings(settings)
            .with_entry(Entry::new("big", "x".repeat(40)).with_key("k").with_priority(5))
            .with_entry(Entry::new("small", "y".repeat(8)).with_key("k"));

        let result = engine().process(&book, "k");
        // "big" costs 10 tokens and fits exactly; "small" no longer fits.
        assert_eq!(result.activated_ids(), vec!["big"]);
        assert_eq!(result.total_tokens, 10);
    }

    #[test]
    fn test_budget_skips_and_continues() {
        let settings = WorldBookSettings {
            token_budget: Some(5),
            context_percent: Some(1.0),
            ..Default::default()
        };
        let book = Book::new()
            .with_settings(settings)
            .with_entry(Entry::new("huge", "x".repeat(400)).with_key("k").with_priority(9))
            .with_entry(Entry::new("tiny", "y".repeat(4)).with_key("k"));

        let result = engine().process(&book, "k");
        assert_eq!(result.activated_ids(), vec!["tiny"]);
    }

    #[test]
    fn test_inclusion_group_exclusive() {
        let book = Book::new()
            .with_entry(Entry::new("rain", "x").with_key("weather").with_inclusion_group("sky"))
            .with_entry(Entry::new("sun", "x").with_key("weather").with_inclusion_group("sky"))
            .with_entry(Entry::new("snow", "x").with_key("weather").with_inclusion_group("sky"));

        let mut engine = engine();
        for _ in 0..5 {
            let result = engine.process(&book, "what's the weather");
            assert_eq!(result.activated_entries.len(), 1);
        }
    }

    #[test]
    fn test_recursive_scan() {
        let settings = WorldBookSettings {
            recursive_scanning: Some(true),
            ..Default::default()
        };
        let book = Book::new()
            .with_settings(settings)
            .with_entry(Entry::new("city", "The city is ruled by the Duke.").with_key("city"))
            .with_entry(Entry::new("duke", "The Duke hides a secret.").with_key("Duke"))
            .with_entry(Entry::new("secret", "The secret is a dragon egg.").with_key("secret"));

        let result = engine().process(&book, "we reach the city");
        assert_eq!(result.activated_ids(), vec!["city", "duke", "secret"]);
        assert_eq!(result.get("duke").unwrap().recursion_level, 1);
        assert_eq!(result.get("secret").unwrap().recursion_level, 2);
    }

    #[test]
    fn test_recursion_respects_max_steps() {
        let settings = WorldBookSettings {
            recursive_scanning: Some(true),
            max_recursion_steps: Some(1),
            ..Default::default()
        };
        let book = Book::new()
            .with_settings(settings)
            .with_entry(Entry::new("city", "The Duke rules.").with_key("city"))
            .with_entry(Entry::new("duke", "He hides a secret.").with_key("Duke"))
            .with_entry(Entry::new("secret", "A dragon egg.").with_key("secret"));

        let result = engine().process(&book, "city");
        assert_eq!(result.activated_ids(), vec!["city", "duke"]);
    }

    #[test]
    fn test_block_further_stops_recursion() {
        let settings = WorldBookSettings {
            recursive_scanning: Some(true),
            ..Default::default()
        };
        let mut city = Entry::new("city", "The Duke rules.").with_key("city");
        city.block_further = true;
        let book = Book::new()
            .with_settings(settings)
            .with_entry(city)
            .with_entry(Entry::new("duke", "x").with_key("Duke"));

        assert_eq!(engine().process(&book, "city").activated_ids(), vec!["city"]);
    }

    #[test]
    fn test_non_recursable_and_prevent_recursion() {
        let settings = WorldBookSettings {
            recursive_scanning: Some(true),
            ..Default::default()
        };
        let mut quiet = Entry::new("quiet", "mentions the Duke").with_key("quiet");
        quiet.recursive = Some(false);
        let mut duke = Entry::new("duke", "x").with_key("Duke");
        duke.non_recursable = true;
        let book = Book::new()
            .with_settings(settings)
            .with_entry(Entry::new("city", "The Duke rules.").with_key("city"))
            .with_entry(quiet)
            .with_entry(duke);

        let result = engine().process(&book, "city");
        assert!(!result.is_activated("duke"));
    }

    #[test]
    fn test_delay_level_gates_recursion() {
        let settings = WorldBookSettings {
            recursive_scanning: Some(true),
            ..Default::default()
        };
        let mut late = Entry::new("late", "late lore").with_key("city");
        late.delay_level = Some(1);
        let book = Book::new()
            .with_settings(settings)
            .with_entry(Entry::new("city", "The city again.").with_key("city"))
            .with_entry(late);

        let result = engine().process(&book, "city");
        assert_eq!(result.get("late").map(|a| a.recursion_level), Some(1));
    }

    #[test]
    fn test_recursion_respects_claimed_group() {
        let settings = WorldBookSettings {
            recursive_scanning: Some(true),
            ..Default::default()
        };
        let book = Book::new()
            .with_settings(settings)
            .with_entry(
                Entry::new("knight", "The dragon circles the keep.")
                    .with_key("castle")
                    .with_inclusion_group("guard"),
            )
            .with_entry(Entry::new("dragon", "x").with_key("dragon").with_inclusion_group("guard"));

        let result = engine().process(&book, "we reach the castle");
        assert_eq!(result.activated_ids(), vec!["knight"]);
    }

    #[test]
    fn test_recursion_resolves_group_per_level() {
        let settings = WorldBookSettings {
            recursive_scanning: Some(true),
            ..Default::default()
        };
        let book = Book::new()
            .with_settings(settings)
            .with_entry(Entry::new("city", "A dragon and a wyvern fight above.").with_key("city"))
            .with_entry(Entry::new("dragon", "x").with_key("dragon").with_inclusion_group("sky"))
            .with_entry(Entry::new("wyvern", "y").with_key("wyvern").with_inclusion_group("sky"));

        for seed in 0..8 {
            let mut engine = WorldBookEngine::new(EngineOptions::default().with_seed(seed));
            let result = engine.process(&book, "the city");
            assert_eq!(result.activated_entries.len(), 2, "seed {seed}");
            assert!(result.is_activated("city"));
            let winner = &result.activated_entries[1];
            assert_eq!(winner.recursion_level, 1);
            assert!(matches!(winner.id(), "dragon" | "wyvern"));
        }
    }

    #[test]
    fn test_probability_loser_gets_no_second_draw() {
        let settings = WorldBookSettings {
            recursive_scanning: Some(true),
            ..Default::default()
        };
        let book = Book::new()
            .with_settings(settings)
            .with_entry(Entry::new("city", "A dragon sleeps here.").with_key("city"))
            .with_entry(Entry::new("dragon", "x").with_key("dragon").with_probability(50.0));

        // First draw is just below 1.0 and loses, the next wraps to 0.0 and
        // would win.
        let rng = StepRng::new(u64::MAX, 1);
        let mut engine = WorldBookEngine::with_rng(EngineOptions::default(), rng);

        let result = engine.process(&book, "city and dragon");
        assert_eq!(result.activated_ids(), vec!["city"]);
    }

    #[test]
    fn test_scan_depth_reads_history() {
        let book = Book::new().with_entry(Entry::new("dragon", "x").with_key("dragon"));
        let context = || ScanContext::new("hello").with_history(["a dragon appeared", "it flew off"]);

        let mut options = EngineOptions::default().with_seed(3);
        assert!(!WorldBookEngine::new(options.clone()).process(&book, context()).is_activated("dragon"));

        options.scan_depth = 1;
        assert!(!WorldBookEngine::new(options.clone()).process(&book, context()).is_activated("dragon"));

        options.scan_depth = 2;
        assert!(WorldBookEngine::new(options).process(&book, context()).is_activated("dragon"));
    }

    #[test]
    fn test_and_logic_counts_synonyms_once() {
        let entry = Entry::new("trip", "x")
            .with_keys(["travel", "旅行", "旅游", "出行"])
            .with_selective_logic(SelectiveLogic::And);
        let book = Book::new().with_entry(entry);

        let mut engine = engine();
        assert!(engine.process(&book, "we travel tomorrow").is_activated("trip"));
        assert!(engine.process(&book, "明天去旅游").is_activated("trip"));
        assert!(!engine.process(&book, "we stay home").is_activated("trip"));
    }

    #[test]
    fn test_min_activations_counts_synonyms_once() {
        let mut entry = Entry::new("meal", "x").with_keys(["weather", "天气", "气候", "food", "食物"]);
        entry.min_activations = Some(2);
        let book = Book::new().with_entry(entry);

        let mut engine = engine();
        assert!(!engine.process(&book, "天气和气候").is_activated("meal"));
        assert!(engine.process(&book, "天气和食物").is_activated("meal"));
    }

    #[test]
    fn test_backfill_to_minimum() {
        let settings = WorldBookSettings {
            min_activations: Some(2),
            ..Default::default()
        };
        let book = Book::new()
            .with_settings(settings)
            .with_entry(Entry::new("low", "x").with_key("zzz").with_priority(1))
            .with_entry(Entry::new("high", "x").with_key("zzz").with_priority(9))
            .with_entry(Entry::new("hit", "x").with_key("hit"));

        let result = engine().process(&book, "a hit");
        assert_eq!(result.activated_ids(), vec!["hit", "high"]);
    }

    #[test]
    fn test_generation_type_filter() {
        let mut entry = Entry::new("imp", "x").with_key("k");
        entry.generation_types = vec!["impersonate".to_string()];
        let book = Book::new().with_entry(entry);

        let mut engine = engine();
        assert!(!engine
            .process(&book, ScanContext::new("k").with_generation_type("normal"))
            .is_activated("imp"));
        assert!(engine
            .process(&book, ScanContext::new("k").with_generation_type("impersonate"))
            .is_activated("imp"));
        assert!(engine.process(&book, "k").is_activated("imp"));
    }

    #[test]
    fn test_slots_in_result() {
        let book = Book::new()
            .with_entry(Entry::new("after", "A").constant().with_position(Position::AfterChar))
            .with_entry(Entry::new("before", "B").constant().with_position(Position::BeforeChar));

        let result = engine().process(&book, "");
        assert_eq!(result.slots.len(), 2);
        assert_eq!(result.slots[0].position, Position::BeforeChar);
        assert_eq!(result.to_prompt_string(), "B\n\nA");
    }

    #[test]
    fn test_set_options_and_reset() {
        let book = Book::new().with_entry(Entry::new("s", "x").with_key("k").with_sticky(2));

        let mut engine = engine();
        engine.set_options(&WorldBookSettings {
            match_whole_words: Some(true),
            ..Default::default()
        });
        assert!(engine.options().match_whole_words);

        engine.process(&book, "k");
        assert!(engine.timed_effect("s").is_some());
        let session = engine.session_id();

        engine.reset();
        assert!(engine.timed_effect("s").is_none());
        assert_eq!(engine.turns(), 0);
        assert_ne!(engine.session_id(), session);
    }

    #[test]
    fn test_seeded_engines_agree() {
        let book = Book::new().with_entries((0..20).map(|i| {
            Entry::new(format!("e{i}"), "lore")
                .with_key("k")
                .with_probability(50.0)
                .with_inclusion_group(format!("g{}", i % 4))
        }));

        let mut a = WorldBookEngine::new(EngineOptions::default().with_seed(99));
        let mut b = WorldBookEngine::new(EngineOptions::default().with_seed(99));
        for _ in 0..5 {
            assert_eq!(a.process(&book, "k").activated_ids(), b.process(&book, "k").activated_ids());
        }
    }
}
