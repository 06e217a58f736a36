//! # vista-pipeline
//!
//! Asynchronous filtering of media records for a view.
//!
//! This crate provides:
//!
//! - **[`Package`]** -- a move-only chunk of records stamped with the filter
//!   version it was built for.
//! - **[`preparer`]** -- loads the attributes the current filter needs and
//!   runs registered [`PrepareHook`]s.
//! - **[`filterer`]** -- evaluates the filter predicate per record.
//! - **[`Coordinator`]** -- owns settings, version, result cache and record
//!   set; chunks, dispatches, merges, recycles and drops packages.
//! - **[`FilterModel`]** -- a coordinator wired to live tokio workers.
//!
//! Cancellation is purely version based: changing the filter bumps the
//! version, and work stamped with an older version is recycled on arrival
//! instead of merged. A reset additionally marks everything in flight as
//! dead.

pub mod coordinator;
pub mod filterer;
pub mod hook;
pub mod model;
pub mod package;
pub mod preparer;
pub mod state;

pub use coordinator::{Coordinator, Dispatcher};
pub use hook::PrepareHook;
pub use model::FilterModel;
pub use package::{Completion, Package, Prepared};
pub use state::{Shared, Snapshot};
