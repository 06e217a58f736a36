//! Loading record catalogs from JSON files.
//!
//! A catalog is either a bare array of records or an object carrying the
//! records together with the display names of their tags:
//!
//! ```json
//! { "tags": { "10": "Holiday" }, "records": [ { "id": 1, "tags": [10] } ] }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Deserialize;
use vista_core::config::Config;
use vista_core::{MemoryEntry, MemorySource, TagId};

#[derive(Deserialize)]
#[serde(untagged)]
enum CatalogFile {
    Records(Vec<MemoryEntry>),
    Full {
        #[serde(default)]
        tags: BTreeMap<TagId, String>,
        records: Vec<MemoryEntry>,
    },
}

/// Records plus tag names, ready to feed a filter model.
pub struct Catalog {
    pub source: Arc<MemorySource>,
    pub tag_names: BTreeMap<TagId, String>,
}

impl Catalog {
    pub fn from_json(json: &str) -> Result<Self> {
        let file: CatalogFile = serde_json::from_str(json).context("invalid catalog JSON")?;
        let (records, tag_names) = match file {
            CatalogFile::Records(records) => (records, BTreeMap::new()),
            CatalogFile::Full { tags, records } => (records, tags),
        };
        Ok(Self {
            source: Arc::new(MemorySource::from_entries(records)),
            tag_names,
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read catalog {}", path.display()))?;
        let catalog = Self::from_json(&json)
            .with_context(|| format!("failed to load catalog {}", path.display()))?;
        tracing::info!(
            path = %path.display(),
            records = catalog.source.len(),
            tags = catalog.tag_names.len(),
            "Catalog loaded"
        );
        Ok(catalog)
    }

    pub fn len(&self) -> usize {
        self.source.len()
    }

    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }
}

/// The catalog given on the command line, else the configured one.
pub fn resolve_path(explicit: Option<&Path>, config: &Config) -> Result<PathBuf> {
    explicit
        .map(Path::to_path_buf)
        .or_else(|| config.catalog.path.clone())
        .context("no catalog given and catalog.path is not configured")
}
