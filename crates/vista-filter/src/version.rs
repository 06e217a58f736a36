//! Version filter: hides superseded versions of an image.
//!
//! Derived versions are marked by tags (for example "original version" or
//! "intermediate version"). When enabled, a record carrying any of the hidden
//! tags is filtered out unless it carries the exception tag or its id was
//! explicitly listed.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use vista_core::{Attribute, Record, RecordId, TagId};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VersionFilterSettings {
    pub enabled: bool,
    pub hidden_tags: BTreeSet<TagId>,
    /// Records with this tag are always shown.
    pub exception_tag: Option<TagId>,
    /// Records always shown regardless of their tags.
    pub exceptions: BTreeSet<RecordId>,
}

impl VersionFilterSettings {
    /// Hide records tagged with any of `tags`.
    pub fn hiding(tags: impl IntoIterator<Item = TagId>) -> Self {
        Self {
            enabled: true,
            hidden_tags: tags.into_iter().collect(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_exception_tag(mut self, tag: TagId) -> Self {
        self.exception_tag = Some(tag);
        self
    }

    #[must_use]
    pub fn with_exceptions(mut self, ids: impl IntoIterator<Item = RecordId>) -> Self {
        self.exceptions.extend(ids);
        self
    }

    pub fn is_active(&self) -> bool {
        self.enabled && !self.hidden_tags.is_empty()
    }

    pub fn needs_tags(&self) -> bool {
        self.is_active()
    }

    pub fn matches(&self, record: &Record) -> bool {
        if !self.is_active() || self.exceptions.contains(&record.id()) {
            return true;
        }

        let tags = record.tags();
        if self.exception_tag.is_some_and(|tag| tags.contains(&tag)) {
            return true;
        }
        !self.hidden_tags.iter().any(|tag| tags.contains(tag))
    }

    pub fn watched_attributes(&self) -> BTreeSet<Attribute> {
        if self.is_active() {
            [Attribute::Tags].into_iter().collect()
        } else {
            BTreeSet::new()
        }
    }
}
