//! vista-core: shared types, IDs, errors, configuration, events and the
//! lazily-loaded record model.
//!
//! This crate is the foundational dependency for the other vista crates. It
//! knows nothing about filtering or the worker pipeline; it only describes
//! what a media record is, where its attributes come from, and how the rest
//! of the system reports what happened.

pub mod config;
pub mod error;
pub mod events;
pub mod ids;
pub mod media;
pub mod memory;
pub mod record;

// Re-export the most commonly used items at the crate root.
pub use error::{Error, Result};
pub use ids::*;
pub use media::*;
pub use memory::{MemoryEntry, MemorySource};
pub use record::{Grouping, Record, RecordInfo, RecordSource};
