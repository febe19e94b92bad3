//! # WorldBook Model
//!
//! The canonical data model shared by the importer and the activation engine.
//! This crate holds record shapes only and does not contain any activation
//! logic.
//!
//! - **entry**: lore entries, insertion positions, and key/filter logic
//! - **book**: a collection of entries plus book-level settings
//! - **activation**: per-turn output shapes (activated entries and slots)

pub mod activation;
pub mod book;
pub mod entry;

pub use activation::*;
pub use book::*;
pub use entry::*;
