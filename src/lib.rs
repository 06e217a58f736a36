//! vista - filter, sort and categorize media records in the background.
//!
//! This library crate exposes what the `vista` binary builds on, so that the
//! integration tests can drive it directly.

pub mod catalog;
pub mod query;

pub use catalog::Catalog;
pub use query::{Query, QueryResult, Row};

pub use vista_core as core;
pub use vista_filter as filter;
pub use vista_pipeline as pipeline;
