//! In-memory [`RecordSource`] used by the CLI catalog loader and by tests.
//!
//! Entries can be edited after records were handed out, which together with
//! [`Record::invalidate`] mimics a database row changing underneath a view.
//! Individual attribute loads can be made to fail, and an artificial latency
//! can be added to every load to simulate a slow backend.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::ids::{RecordId, TagId};
use crate::media::Attribute;
use crate::record::{Grouping, Record, RecordInfo, RecordSource};

/// One stored record with all of its attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryEntry {
    pub id: RecordId,
    pub info: RecordInfo,
    pub tags: BTreeSet<TagId>,
    pub comment: String,
    pub group_leader: Option<RecordId>,
}

/// Thread-safe in-memory record store.
#[derive(Default)]
pub struct MemorySource {
    entries: RwLock<HashMap<RecordId, MemoryEntry>>,
    failing: RwLock<HashSet<(RecordId, Attribute)>>,
    latency: Option<Duration>,
    loads: AtomicUsize,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a source pre-populated with `entries`.
    pub fn from_entries(entries: impl IntoIterator<Item = MemoryEntry>) -> Self {
        let source = Self::new();
        {
            let mut map = source.entries.write();
            for entry in entries {
                map.insert(entry.id, entry);
            }
        }
        source
    }

    /// Parse a JSON array of [`MemoryEntry`] values.
    pub fn from_json(json: &str) -> Result<Self> {
        let entries: Vec<MemoryEntry> = serde_json::from_str(json)?;
        Ok(Self::from_entries(entries))
    }

    /// Sleep for `latency` before every attribute load.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Insert or replace an entry.
    pub fn insert(&self, entry: MemoryEntry) {
        self.entries.write().insert(entry.id, entry);
    }

    /// Edit an existing entry in place.
    pub fn update(&self, id: RecordId, edit: impl FnOnce(&mut MemoryEntry)) -> Result<()> {
        let mut entries = self.entries.write();
        let entry = entries
            .get_mut(&id)
            .ok_or_else(|| Error::not_found("record", id))?;
        edit(entry);
        Ok(())
    }

    pub fn remove(&self, id: RecordId) -> Option<MemoryEntry> {
        self.entries.write().remove(&id)
    }

    /// Make every future load of `attribute` for `id` fail.
    pub fn fail_on(&self, id: RecordId, attribute: Attribute) {
        self.failing.write().insert((id, attribute));
    }

    /// Stop failing loads for `id`.
    pub fn heal(&self, id: RecordId) {
        self.failing.write().retain(|(failing_id, _)| *failing_id != id);
    }

    /// All stored ids in ascending order.
    pub fn ids(&self) -> Vec<RecordId> {
        let mut ids: Vec<RecordId> = self.entries.read().keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Number of attribute loads served so far (including failed ones).
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    /// Fresh handle for `id`, if it is stored.
    pub fn record(self: &Arc<Self>, id: RecordId) -> Option<Record> {
        if !self.entries.read().contains_key(&id) {
            return None;
        }
        let source: Arc<dyn RecordSource> = self.clone();
        Some(Record::new(id, source))
    }

    /// Fresh handles for every stored entry, in id order.
    pub fn records(self: &Arc<Self>) -> Vec<Record> {
        let source: Arc<dyn RecordSource> = self.clone();
        self.ids()
            .into_iter()
            .map(|id| Record::new(id, Arc::clone(&source)))
            .collect()
    }

    fn load<T>(
        &self,
        id: RecordId,
        attribute: Attribute,
        read: impl FnOnce(&MemoryEntry) -> T,
    ) -> Result<T> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            std::thread::sleep(latency);
        }
        if self.failing.read().contains(&(id, attribute)) {
            return Err(Error::source(attribute, id, "injected failure"));
        }
        let entries = self.entries.read();
        let entry = entries
            .get(&id)
            .ok_or_else(|| Error::not_found("record", id))?;
        Ok(read(entry))
    }
}

impl RecordSource for MemorySource {
    fn info(&self, id: RecordId) -> Result<RecordInfo> {
        self.load(id, Attribute::Info, |e| e.info.clone())
    }

    fn tags(&self, id: RecordId) -> Result<BTreeSet<TagId>> {
        self.load(id, Attribute::Tags, |e| e.tags.clone())
    }

    fn comment(&self, id: RecordId) -> Result<String> {
        self.load(id, Attribute::Comment, |e| e.comment.clone())
    }

    fn grouping(&self, id: RecordId) -> Result<Grouping> {
        self.load(id, Attribute::Grouping, |e| Grouping {
            leader: e.group_leader,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: u64, name: &str) -> MemoryEntry {
        MemoryEntry {
            id: RecordId::new(id),
            info: RecordInfo {
                name: name.into(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn records_are_in_id_order() {
        let source = Arc::new(MemorySource::from_entries(vec![
            entry(3, "c.jpg"),
            entry(1, "a.jpg"),
            entry(2, "b.jpg"),
        ]));
        let ids: Vec<u64> = source.records().iter().map(|r| r.id().get()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(source.len(), 3);
    }

    #[test]
    fn record_reads_through_source() {
        let source = Arc::new(MemorySource::from_entries(vec![entry(1, "a.jpg")]));
        let record = source.record(RecordId::new(1)).unwrap();
        assert_eq!(record.info().name, "a.jpg");
        assert!(source.record(RecordId::new(2)).is_none());
    }

    #[test]
    fn update_then_invalidate_shows_new_value() {
        let source = Arc::new(MemorySource::from_entries(vec![entry(1, "a.jpg")]));
        let record = source.record(RecordId::new(1)).unwrap();
        assert_eq!(record.info().rating, None);

        source
            .update(RecordId::new(1), |e| e.info.rating = Some(4))
            .unwrap();
        assert_eq!(record.info().rating, None);

        record.invalidate(&[Attribute::Rating]);
        assert_eq!(record.info().rating, Some(4));
    }

    #[test]
    fn update_missing_is_not_found() {
        let source = MemorySource::new();
        let err = source.update(RecordId::new(9), |_| {}).unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[test]
    fn injected_failure_and_heal() {
        let source = MemorySource::from_entries(vec![entry(1, "a.jpg")]);
        source.fail_on(RecordId::new(1), Attribute::Comment);
        assert!(source.comment(RecordId::new(1)).is_err());
        assert!(source.info(RecordId::new(1)).is_ok());
        source.heal(RecordId::new(1));
        assert!(source.comment(RecordId::new(1)).is_ok());
        assert_eq!(source.load_count(), 3);
    }

    #[test]
    fn parse_json_catalog() {
        let json = r#"[
            {"id": 1, "info": {"name": "a.jpg", "rating": 3}, "tags": [10, 11]},
            {"id": 2, "comment": "beach", "group_leader": 1}
        ]"#;
        let source = MemorySource::from_json(json).unwrap();
        assert_eq!(source.ids(), vec![RecordId::new(1), RecordId::new(2)]);
        assert_eq!(source.info(RecordId::new(1)).unwrap().rating, Some(3));
        assert_eq!(source.tags(RecordId::new(1)).unwrap().len(), 2);
        assert_eq!(
            source.grouping(RecordId::new(2)).unwrap().leader,
            Some(RecordId::new(1))
        );
    }
}
