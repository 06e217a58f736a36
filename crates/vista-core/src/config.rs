//! Application configuration types.
//!
//! The top-level [`Config`] struct is deserialized from JSON and carries the
//! pipeline tuning knobs and the default catalog location. Every section
//! defaults sensibly so a completely empty `{}` file is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::Error;

/// Records per package when no preparation step is needed.
pub const DEFAULT_CHUNK_SIZE: usize = 2001;

/// Records per package when attributes must be prepared first.
pub const DEFAULT_PREPARE_CHUNK_SIZE: usize = 101;

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub pipeline: PipelineConfig,
    pub catalog: CatalogConfig,
}

impl Config {
    /// Deserialize a `Config` from a JSON string.
    ///
    /// This is intentionally string-based so the caller can read the file
    /// however it sees fit.
    pub fn from_json(json_str: &str) -> Result<Self> {
        serde_json::from_str(json_str)
            .map_err(|e| Error::Validation(format!("config parse error: {e}")))
    }

    /// Load configuration from a file path, falling back to defaults if the
    /// path is `None` or the file does not exist.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_json(&contents).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse config file {}: {e}", path.display());
                Self::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No config file at {}; using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Failed to read config file {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        let pipeline = &self.pipeline;

        if pipeline.chunk_size == 0 {
            warnings.push(format!(
                "pipeline.chunk_size is 0; {DEFAULT_CHUNK_SIZE} will be used"
            ));
        }
        if pipeline.prepare_chunk_size == 0 {
            warnings.push(format!(
                "pipeline.prepare_chunk_size is 0; {DEFAULT_PREPARE_CHUNK_SIZE} will be used"
            ));
        }
        if pipeline.prepare_chunk_size > pipeline.chunk_size && pipeline.chunk_size > 0 {
            warnings.push(format!(
                "pipeline.prepare_chunk_size ({}) is larger than pipeline.chunk_size ({}); \
                 packages that need preparation should be the smaller ones",
                pipeline.prepare_chunk_size, pipeline.chunk_size
            ));
        }
        if pipeline.event_capacity == 0 {
            warnings.push("pipeline.event_capacity is 0; events cannot be delivered".into());
        }

        if let Some(ref path) = self.catalog.path {
            if path.as_os_str().is_empty() {
                warnings.push("catalog.path is empty".into());
            }
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// Filter pipeline tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Records per package on the pure-filter path.
    pub chunk_size: usize,
    /// Records per package when a preparation step runs first.
    pub prepare_chunk_size: usize,
    /// Capacity of the event broadcast channel.
    pub event_capacity: usize,
}

impl PipelineConfig {
    /// Effective chunk size for a batch, never zero.
    pub fn chunk_size_for(&self, needs_prepare: bool) -> usize {
        if needs_prepare {
            non_zero_or(self.prepare_chunk_size, DEFAULT_PREPARE_CHUNK_SIZE)
        } else {
            non_zero_or(self.chunk_size, DEFAULT_CHUNK_SIZE)
        }
    }
}

fn non_zero_or(value: usize, fallback: usize) -> usize {
    if value == 0 {
        fallback
    } else {
        value
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            prepare_chunk_size: DEFAULT_PREPARE_CHUNK_SIZE,
            event_capacity: 256,
        }
    }
}

/// Where the CLI looks for a record catalog when none is given.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub path: Option<PathBuf>,
}
