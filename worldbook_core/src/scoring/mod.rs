//! Activation scoring.
//!
//! `score = CONSTANT_BONUS·constant + 100·priority + 10·order
//!        + Σ chars(matched key) + 50·(probability / 100)`
//!
//! Constants form their own tier above any priority; explicit priority comes
//! next, then order, then how specific the match was, then a small nudge
//! from probability.

mod groups;

pub use groups::*;

use std::collections::HashMap;
use worldbook_model::{ActivatedEntry, Entry};

pub const CONSTANT_BONUS: f64 = 1_000_000.0;
pub const PRIORITY_WEIGHT: f64 = 100.0;
pub const ORDER_WEIGHT: f64 = 10.0;
pub const PROBABILITY_WEIGHT: f64 = 50.0;
pub const GROUP_BONUS_WEIGHT: f64 = 10.0;

/// Score an entry given the keys it matched.
pub fn score_entry(entry: &Entry, matched_keys: &[String]) -> f64 {
    let mut score = 0.0;

    if entry.constant {
        score += CONSTANT_BONUS;
    }
    score += PRIORITY_WEIGHT * f64::from(entry.priority);
    score += ORDER_WEIGHT * f64::from(entry.order);
    score += matched_keys
        .iter()
        .map(|k| k.chars().count() as f64)
        .sum::<f64>();

    if let Some(probability) = entry.effective_probability() {
        score += PROBABILITY_WEIGHT * probability / 100.0;
    }

    score
}

/// Fill in `activation_score` for every candidate.
pub fn score_candidates(candidates: &mut [ActivatedEntry]) {
    for candidate in candidates.iter_mut() {
        candidate.activation_score = score_entry(&candidate.entry, &candidate.matched_keys);
    }
}

/// Reward thematic clusters: each candidate with a `group` gains
/// `10 × (number of candidates sharing that group)`.
pub fn apply_group_bonus(candidates: &mut [ActivatedEntry]) {
    let mut sizes: HashMap<&str, usize> = HashMap::new();
    for candidate in candidates.iter() {
        if let Some(group) = candidate.entry.group.as_deref() {
            *sizes.entry(group).or_default() += 1;
        }
    }

    let bonuses: Vec<Option<f64>> = candidates
        .iter()
        .map(|c| {
            c.entry
                .group
                .as_deref()
                .and_then(|g| sizes.get(g))
                .map(|n| GROUP_BONUS_WEIGHT * *n as f64)
        })
        .collect();

    for (candidate, bonus) in candidates.iter_mut().zip(bonuses) {
        if let Some(bonus) = bonus {
            candidate.activation_score += bonus;
            candidate.group_score = Some(bonus);
        }
    }
}

/// Order candidates by score, highest first; ties go to the smaller id.
pub fn sort_by_score(candidates: &mut [ActivatedEntry]) {
    candidates.sort_by(|a, b| {
        b.activation_score
            .partial_cmp(&a.activation_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.entry.id.cmp(&b.entry.id))
    });
}
