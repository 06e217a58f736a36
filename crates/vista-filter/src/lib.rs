//! # vista-filter
//!
//! Filter and sort settings for media records.
//!
//! Every type here is an immutable value: a view composes them, hands a copy
//! to the pipeline, and replaces them wholesale when the user changes
//! something. Evaluation reads record attributes through [`Record`] handles
//! and may therefore trigger lazy loads when the attributes were not prepared
//! beforehand.
//!
//! ## Overview
//!
//! - [`ContentFilter`] -- text, tag, rating, label, day, mime and URL
//!   sub-filters.
//! - [`VersionFilterSettings`] -- hides superseded versions of an image.
//! - [`GroupFilterSettings`] -- hides records folded into closed groups.
//! - [`FilterSettings`] -- the three layers above, evaluated left to right.
//! - [`SortSettings`] -- sort order, direction and categorization.
//!
//! [`Record`]: vista_core::Record

pub mod content;
pub mod group;
pub mod settings;
pub mod sort;
pub mod version;

pub use content::{
    ContentFilter, ContentMatch, LabelFilter, MimeFilter, RatingCondition, RatingFilter,
    TagFilter, TagMatch, TextField, TextFilter,
};
pub use group::GroupFilterSettings;
pub use settings::{FilterSettings, Verdict};
pub use sort::{Categorization, CategoryKey, SortDirection, SortOrder, SortSettings};
pub use version::VersionFilterSettings;

use std::collections::BTreeSet;

use vista_core::Attribute;

/// Whether any of `changed` touches one of the `watched` attributes.
///
/// [`Attribute::Info`] stands for the whole core info bundle and therefore
/// intersects every info attribute.
pub(crate) fn intersects(watched: &BTreeSet<Attribute>, changed: &[Attribute]) -> bool {
    changed.iter().any(|attr| {
        watched.contains(attr)
            || (*attr == Attribute::Info && watched.iter().any(|w| w.is_info()))
            || (attr.is_info() && watched.contains(&Attribute::Info))
    })
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Record fixtures shared by the unit tests of this crate.

    use std::path::PathBuf;
    use std::sync::Arc;

    use chrono::NaiveDate;
    use vista_core::memory::MemoryEntry;
    use vista_core::{MediaCategory, MemorySource, Record, RecordId, RecordInfo, TagId};

    pub fn photo(id: u64, name: &str) -> MemoryEntry {
        MemoryEntry {
            id: RecordId::new(id),
            info: RecordInfo {
                name: name.into(),
                path: PathBuf::from(format!("/photos/2024/{name}")),
                format: "JPG".into(),
                category: MediaCategory::Image,
                date: NaiveDate::from_ymd_opt(2024, 5, 1).and_then(|d| d.and_hms_opt(12, 0, 0)),
                file_size: 1_000 * id,
                dimensions: Some((4000, 3000)),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    pub fn tagged(mut entry: MemoryEntry, tags: &[u64]) -> MemoryEntry {
        entry.tags = tags.iter().copied().map(TagId::new).collect();
        entry
    }

    pub fn record_of(entry: MemoryEntry) -> Record {
        let id = entry.id;
        let source = Arc::new(MemorySource::from_entries(vec![entry]));
        source.record(id).expect("entry was just inserted")
    }
}
