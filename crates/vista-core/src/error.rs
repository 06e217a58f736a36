//! Unified error type for vista.
//!
//! Record sources, configuration loading and catalog parsing funnel their
//! failures into [`Error`]. The filter pipeline itself never surfaces errors to
//! its caller: a failed attribute load degrades to a default value instead.

use std::fmt;

use crate::ids::RecordId;
use crate::media::Attribute;

/// Unified error type covering all failure modes in vista.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested entity could not be found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g. "record", "tag").
        entity: String,
        /// The identifier that was looked up.
        id: String,
    },

    /// A lazily-loaded record attribute could not be produced by the source.
    #[error("Source error [{attribute} of record {id}]: {message}")]
    Source {
        /// Which attribute was being loaded.
        attribute: Attribute,
        /// The record whose attribute failed to load.
        id: RecordId,
        /// Human-readable error description.
        message: String,
    },

    /// Input data failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// A JSON document could not be parsed.
    #[error("JSON error: {source}")]
    Json {
        /// The underlying serde error.
        #[from]
        source: serde_json::Error,
    },

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Convenience constructor for [`Error::NotFound`].
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        Error::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Convenience constructor for [`Error::Source`].
    pub fn source(attribute: Attribute, id: RecordId, message: impl Into<String>) -> Self {
        Error::Source {
            attribute,
            id,
            message: message.into(),
        }
    }

    /// Whether this error came from a record source rather than from local
    /// parsing or validation.
    pub fn is_source(&self) -> bool {
        matches!(self, Error::Source { .. } | Error::NotFound { .. })
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
