//! moodlog-core - Core library for moodlog
//!
//! This crate contains the journal entry models, the offline record store,
//! the TTL-bound detail cache, and the sync coordinator that reconciles the
//! local mirror with the server-authoritative collection. All client
//! surfaces (CLI, future GUI shells) build on this crate.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod events;
pub mod models;
pub mod session;
pub mod store;
pub mod sync;
pub mod util;

pub use error::{Error, Result};
pub use models::{Attachment, Emotion, Entry, EntryId, LocalId, ServerId};
