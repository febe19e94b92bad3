//! # WorldBook Core
//!
//! The lore activation engine. Given a [`Book`] of entries and the text of
//! the current turn, it decides which entries are active, resolves
//! mutually-exclusive groups, respects a token budget, and hands back the
//! winners bucketed into ordered insertion slots.
//!
//! ## Core Components
//!
//! - **importer**: normalizes heterogeneous lorebook JSON into a [`Book`]
//! - **matcher**: CJK-aware literal and regex key matching
//! - **scoring**: activation scores and inclusion-group resolution
//! - **engine**: the per-turn pipeline and the timers that persist across turns
//! - **tokens**: the length-based token cost model used for budgeting
//!
//! ## Sessions
//!
//! A [`WorldBookEngine`] owns sticky/cooldown timers and its RNG stream.
//! Use one engine per conversation; sharing an engine between conversations
//! leaks timer state between them.

pub mod engine;
pub mod importer;
pub mod matcher;
pub mod scoring;
pub mod tokens;

pub use engine::*;
pub use importer::*;
pub use matcher::*;
pub use scoring::*;
pub use tokens::*;

pub use worldbook_model::*;
