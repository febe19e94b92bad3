//! Inclusion-group resolution.
//!
//! Entries sharing an `inclusion_group` are mutually exclusive: one member
//! survives per turn. Members held by a sticky timer or marked constant win
//! outright. Otherwise the survivor is chosen by, in order:
//!
//! 1. score, if any member asks for group scoring (ties fall through);
//! 2. highest `order`, if any member asks to prioritize inclusion;
//! 3. a weighted draw over `group_weight` (default 100) from the engine's RNG.

use rand::Rng;
use std::collections::HashSet;
use tracing::trace;
use worldbook_model::ActivatedEntry;

/// Keep one member per inclusion group, preserving the input order of the
/// survivors. Candidates without a group pass through untouched.
pub fn resolve_inclusion_groups<R: Rng + ?Sized>(
    candidates: Vec<ActivatedEntry>,
    default_group_scoring: bool,
    rng: &mut R,
) -> Vec<ActivatedEntry> {
    // Groups in first-seen order keep RNG consumption deterministic.
    let mut groups: Vec<(&str, Vec<usize>)> = Vec::new();
    for (index, candidate) in candidates.iter().enumerate() {
        if let Some(name) = candidate.entry.inclusion_group.as_deref() {
            match groups.iter_mut().find(|(g, _)| *g == name) {
                Some((_, members)) => members.push(index),
                None => groups.push((name, vec![index])),
            }
        }
    }

    let mut losers: HashSet<usize> = HashSet::new();
    for (name, members) in &groups {
        if members.len() < 2 {
            continue;
        }
        let winner = pick_winner(&candidates, members, default_group_scoring, rng);
        trace!(group = name, winner = candidates[winner].id(), contenders = members.len(), "inclusion group resolved");
        losers.extend(members.iter().copied().filter(|m| *m != winner));
    }

    candidates
        .into_iter()
        .enumerate()
        .filter(|(index, _)| !losers.contains(index))
        .map(|(_, candidate)| candidate)
        .collect()
}

fn pick_winner<R: Rng + ?Sized>(
    candidates: &[ActivatedEntry],
    members: &[usize],
    default_group_scoring: bool,
    rng: &mut R,
) -> usize {
    let forced: Vec<usize> = members
        .iter()
        .copied()
        .filter(|m| candidates[*m].is_sticky_held() || candidates[*m].entry.constant)
        .collect();
    let mut pool: Vec<usize> = if forced.is_empty() {
        members.to_vec()
    } else {
        forced
    };
    if pool.len() == 1 {
        return pool[0];
    }

    let scoring = pool.iter().any(|m| {
        candidates[*m]
            .entry
            .use_group_scoring
            .unwrap_or(default_group_scoring)
    });
    if scoring {
        let best = pool
            .iter()
            .map(|m| candidates[*m].activation_score)
            .fold(f64::NEG_INFINITY, f64::max);
        pool.retain(|m| candidates[*m].activation_score >= best);
        if pool.len() == 1 {
            return pool[0];
        }
    }

    if pool.iter().any(|m| candidates[*m].entry.prioritize_inclusion) {
        return pool
            .iter()
            .copied()
            .max_by(|a, b| {
                let (a, b) = (&candidates[*a].entry, &candidates[*b].entry);
                a.order.cmp(&b.order).then_with(|| b.id.cmp(&a.id))
            })
            .unwrap_or(pool[0]);
    }

    weighted_draw(candidates, &pool, rng)
}

fn weighted_draw<R: Rng + ?Sized>(candidates: &[ActivatedEntry], pool: &[usize], rng: &mut R) -> usize {
    let weights: Vec<f64> = pool
        .iter()
        .map(|m| candidates[*m].entry.effective_group_weight())
        .collect();
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return pool[0];
    }

    let mut roll = rng.gen::<f64>() * total;
    for (member, weight) in pool.iter().zip(&weights) {
        if roll < *weight {
            return *member;
        }
        roll -= weight;
    }
    pool[pool.len() - 1]
}
