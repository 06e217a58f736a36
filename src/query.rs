//! One-shot filter runs over a catalog.
//!
//! A [`Query`] is applied to a fresh [`FilterModel`]; the run waits until the
//! pipeline settles and returns the visible rows in display order.

use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;
use vista_core::config::PipelineConfig;
use vista_core::{Record, RecordId};
use vista_filter::{FilterSettings, SortSettings};
use vista_pipeline::FilterModel;

use crate::catalog::Catalog;

/// How long a run may take before it is abandoned.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct Query {
    pub filter: FilterSettings,
    pub sort: SortSettings,
    pub timeout: Duration,
}

impl Default for Query {
    fn default() -> Self {
        Self {
            filter: FilterSettings::default(),
            sort: SortSettings::default(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// One visible record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Row {
    pub id: RecordId,
    pub name: String,
    pub path: String,
    pub category: String,
    pub rating: Option<u8>,
}

impl Row {
    fn new(record: &Record, sort: &SortSettings) -> Self {
        let info = record.info();
        Self {
            id: record.id(),
            name: info.name.clone(),
            path: info.path.display().to_string(),
            category: sort.category_key(record).to_string(),
            rating: info.rating,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    /// Filter version the rows were computed for.
    pub version: u64,
    pub total: usize,
    pub has_match: bool,
    pub has_text_match: bool,
    pub categorized: bool,
    pub rows: Vec<Row>,
}

/// Filter and sort `catalog` with `query`.
///
/// Tag names known to the catalog are made available to the text filter.
pub async fn run(catalog: &Catalog, query: &Query, config: PipelineConfig) -> Result<QueryResult> {
    let model = FilterModel::new(config);

    let mut filter = query.filter.clone();
    if filter.content.text.tag_names.is_empty() {
        filter.content.text.tag_names = catalog.tag_names.clone();
    }

    model.set_sort_settings(query.sort);
    model.set_filter(filter);
    model.records_added(catalog.source.records());

    tokio::time::timeout(query.timeout, model.wait_settled())
        .await
        .with_context(|| format!("filter pipeline did not settle within {:?}", query.timeout))?;

    let sort = model.sort_settings();
    let rows: Vec<Row> = model
        .visible_records()
        .iter()
        .map(|record| Row::new(record, &sort))
        .collect();

    tracing::debug!(
        version = model.version(),
        total = model.record_count(),
        visible = rows.len(),
        "Query settled"
    );

    Ok(QueryResult {
        version: model.version(),
        total: model.record_count(),
        has_match: model.has_match(),
        has_text_match: model.has_text_match(),
        categorized: sort.is_categorized(),
        rows,
    })
}
