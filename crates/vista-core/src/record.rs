//! The record model: cheap handles to media items whose attributes are
//! loaded lazily from a [`RecordSource`].
//!
//! A [`Record`] is an `Arc`-backed handle. Cloning it never copies attribute
//! data, so the same record can sit in the coordinator's known set and in an
//! in-flight package at the same time. Each attribute group lives in its own
//! slot that is filled on first access and stays filled until
//! [`Record::invalidate`] clears it.
//!
//! Loads never fail from the caller's point of view: a source error is logged
//! and the slot is filled with the attribute's default value, which filters
//! then treat as "no tags", "no comment", "not grouped" and so on.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{Datelike, NaiveDateTime};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::ids::{RecordId, TagId};
use crate::media::{Attribute, ColorLabel, MediaCategory, PickLabel};

// ---------------------------------------------------------------------------
// Attribute payloads
// ---------------------------------------------------------------------------

/// Core sort/filter fields of a record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordInfo {
    /// File name shown to the user.
    pub name: String,
    /// Full path of the file.
    pub path: PathBuf,
    /// Upper-case file format (e.g. `JPG`, `CR2`, `MP4`).
    pub format: String,
    pub category: MediaCategory,
    /// Star rating 0..=5; `None` when the item was never rated.
    pub rating: Option<u8>,
    pub color_label: ColorLabel,
    pub pick_label: PickLabel,
    /// Capture (or, failing that, modification) date.
    pub date: Option<NaiveDateTime>,
    pub file_size: u64,
    /// Width and height in pixels.
    pub dimensions: Option<(u32, u32)>,
}

impl RecordInfo {
    /// Directory containing the file, or an empty path for bare names.
    pub fn folder(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new(""))
    }

    /// Total number of pixels, 0 when unknown.
    pub fn pixel_count(&self) -> u64 {
        self.dimensions
            .map(|(w, h)| u64::from(w) * u64::from(h))
            .unwrap_or(0)
    }

    /// `(year, month)` of the record date.
    pub fn month(&self) -> Option<(i32, u32)> {
        self.date.map(|d| (d.year(), d.month()))
    }
}

/// Group membership of a record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Grouping {
    /// The group leader this record is folded under. `None` for ungrouped
    /// records and for leaders themselves.
    pub leader: Option<RecordId>,
}

impl Grouping {
    pub fn under(leader: RecordId) -> Self {
        Self {
            leader: Some(leader),
        }
    }

    pub fn is_grouped(&self) -> bool {
        self.leader.is_some()
    }
}

// ---------------------------------------------------------------------------
// RecordSource
// ---------------------------------------------------------------------------

/// Supplier of record attributes, typically backed by a database.
///
/// Every method may perform blocking I/O. Implementations are shared across
/// the worker pool and must therefore be `Send + Sync`.
pub trait RecordSource: Send + Sync {
    /// Load the core info bundle.
    fn info(&self, id: RecordId) -> Result<RecordInfo>;

    /// Load the set of tag ids assigned to the record.
    fn tags(&self, id: RecordId) -> Result<BTreeSet<TagId>>;

    /// Load the record's comment (caption).
    fn comment(&self, id: RecordId) -> Result<String>;

    /// Load the record's group membership.
    fn grouping(&self, id: RecordId) -> Result<Grouping>;
}

// ---------------------------------------------------------------------------
// Lazy slot
// ---------------------------------------------------------------------------

struct Slot<T> {
    value: RwLock<Option<Arc<T>>>,
}

impl<T: Default> Slot<T> {
    fn new() -> Self {
        Self {
            value: RwLock::new(None),
        }
    }

    fn get_or_load(
        &self,
        id: RecordId,
        attribute: Attribute,
        load: impl FnOnce() -> Result<T>,
    ) -> Arc<T> {
        if let Some(value) = self.value.read().as_ref() {
            return Arc::clone(value);
        }

        // Load without holding the lock; a concurrent loader may win the race,
        // in which case its value is kept and ours is dropped.
        let loaded = match load() {
            Ok(value) => value,
            Err(e) => {
                tracing::debug!(
                    record = %id,
                    %attribute,
                    error = %e,
                    "Attribute load failed; using default"
                );
                T::default()
            }
        };

        let mut guard = self.value.write();
        Arc::clone(guard.get_or_insert_with(|| Arc::new(loaded)))
    }

    fn is_loaded(&self) -> bool {
        self.value.read().is_some()
    }

    fn clear(&self) {
        *self.value.write() = None;
    }
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

struct Inner {
    id: RecordId,
    source: Arc<dyn RecordSource>,
    info: Slot<RecordInfo>,
    tags: Slot<BTreeSet<TagId>>,
    comment: Slot<String>,
    grouping: Slot<Grouping>,
}

/// Handle to a media record with lazily-loaded attributes.
#[derive(Clone)]
pub struct Record {
    inner: Arc<Inner>,
}

impl Record {
    /// Create a handle for `id`; nothing is loaded until first access.
    pub fn new(id: RecordId, source: Arc<dyn RecordSource>) -> Self {
        Self {
            inner: Arc::new(Inner {
                id,
                source,
                info: Slot::new(),
                tags: Slot::new(),
                comment: Slot::new(),
                grouping: Slot::new(),
            }),
        }
    }

    pub fn id(&self) -> RecordId {
        self.inner.id
    }

    /// Core info bundle, loading it on first access.
    pub fn info(&self) -> Arc<RecordInfo> {
        let inner = &self.inner;
        inner
            .info
            .get_or_load(inner.id, Attribute::Info, || inner.source.info(inner.id))
    }

    /// Assigned tag ids, loading them on first access.
    pub fn tags(&self) -> Arc<BTreeSet<TagId>> {
        let inner = &self.inner;
        inner
            .tags
            .get_or_load(inner.id, Attribute::Tags, || inner.source.tags(inner.id))
    }

    /// Comment text, loading it on first access.
    pub fn comment(&self) -> Arc<String> {
        let inner = &self.inner;
        inner
            .comment
            .get_or_load(inner.id, Attribute::Comment, || inner.source.comment(inner.id))
    }

    /// Group membership, loading it on first access.
    pub fn grouping(&self) -> Grouping {
        let inner = &self.inner;
        *inner
            .grouping
            .get_or_load(inner.id, Attribute::Grouping, || inner.source.grouping(inner.id))
    }

    /// Whether the slot backing `attribute` currently holds a value.
    pub fn is_loaded(&self, attribute: Attribute) -> bool {
        match attribute {
            Attribute::Tags => self.inner.tags.is_loaded(),
            Attribute::Comment => self.inner.comment.is_loaded(),
            Attribute::Grouping => self.inner.grouping.is_loaded(),
            _ => self.inner.info.is_loaded(),
        }
    }

    /// Drop cached values so the next access reloads them from the source.
    pub fn invalidate(&self, attributes: &[Attribute]) {
        if attributes.iter().any(|a| a.is_info()) {
            self.inner.info.clear();
        }
        if attributes.contains(&Attribute::Tags) {
            self.inner.tags.clear();
        }
        if attributes.contains(&Attribute::Comment) {
            self.inner.comment.clear();
        }
        if attributes.contains(&Attribute::Grouping) {
            self.inner.grouping.clear();
        }
    }

    /// Whether both handles point at the same underlying record.
    pub fn same_handle(&self, other: &Record) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record").field("id", &self.inner.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingSource {
        info_loads: AtomicUsize,
        fail_tags: bool,
    }

    impl RecordSource for CountingSource {
        fn info(&self, id: RecordId) -> Result<RecordInfo> {
            self.info_loads.fetch_add(1, Ordering::SeqCst);
            Ok(RecordInfo {
                name: format!("img_{id}.jpg"),
                ..Default::default()
            })
        }

        fn tags(&self, id: RecordId) -> Result<BTreeSet<TagId>> {
            if self.fail_tags {
                return Err(Error::source(Attribute::Tags, id, "unavailable"));
            }
            Ok([TagId::new(1)].into_iter().collect())
        }

        fn comment(&self, _id: RecordId) -> Result<String> {
            Ok("sunset".into())
        }

        fn grouping(&self, _id: RecordId) -> Result<Grouping> {
            Ok(Grouping::under(RecordId::new(99)))
        }
    }

    #[test]
    fn info_is_loaded_once() {
        let source = Arc::new(CountingSource::default());
        let record = Record::new(RecordId::new(3), source.clone());

        assert!(!record.is_loaded(Attribute::Name));
        assert_eq!(record.info().name, "img_3.jpg");
        assert_eq!(record.info().name, "img_3.jpg");
        assert_eq!(source.info_loads.load(Ordering::SeqCst), 1);
        assert!(record.is_loaded(Attribute::Rating));
    }

    #[test]
    fn invalidate_forces_reload() {
        let source = Arc::new(CountingSource::default());
        let record = Record::new(RecordId::new(3), source.clone());
        record.info();
        record.invalidate(&[Attribute::Rating]);
        assert!(!record.is_loaded(Attribute::Info));
        record.info();
        assert_eq!(source.info_loads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn invalidate_leaves_unrelated_slots() {
        let record = Record::new(RecordId::new(1), Arc::new(CountingSource::default()));
        record.tags();
        record.comment();
        record.invalidate(&[Attribute::Comment]);
        assert!(record.is_loaded(Attribute::Tags));
        assert!(!record.is_loaded(Attribute::Comment));
    }

    #[test]
    fn failed_load_degrades_to_default() {
        let source = Arc::new(CountingSource {
            fail_tags: true,
            ..Default::default()
        });
        let record = Record::new(RecordId::new(8), source);
        assert!(record.tags().is_empty());
        assert!(record.is_loaded(Attribute::Tags));
    }

    #[test]
    fn clones_share_slots() {
        let source = Arc::new(CountingSource::default());
        let record = Record::new(RecordId::new(4), source.clone());
        let clone = record.clone();
        record.info();
        clone.info();
        assert!(record.same_handle(&clone));
        assert_eq!(source.info_loads.load(Ordering::SeqCst), 1);
        assert_eq!(clone.grouping().leader, Some(RecordId::new(99)));
    }

    #[test]
    fn info_helpers() {
        let info = RecordInfo {
            path: PathBuf::from("/photos/2024/a.jpg"),
            dimensions: Some((4000, 3000)),
            date: chrono::NaiveDate::from_ymd_opt(2024, 6, 2)
                .and_then(|d| d.and_hms_opt(10, 0, 0)),
            ..Default::default()
        };
        assert_eq!(info.folder(), Path::new("/photos/2024"));
        assert_eq!(info.pixel_count(), 12_000_000);
        assert_eq!(info.month(), Some((2024, 6)));
        assert_eq!(RecordInfo::default().pixel_count(), 0);
    }
}
