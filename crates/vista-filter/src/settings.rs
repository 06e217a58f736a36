//! The composed filter predicate.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use vista_core::{Attribute, Record};

use crate::content::ContentFilter;
use crate::group::GroupFilterSettings;
use crate::intersects;
use crate::version::VersionFilterSettings;

/// Outcome of evaluating [`FilterSettings`] on one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Verdict {
    pub accepted: bool,
    /// The text sub-filter is active and matched the record.
    pub by_text: bool,
}

/// `content AND version AND group`, evaluated left to right.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSettings {
    pub content: ContentFilter,
    pub version: VersionFilterSettings,
    pub group: GroupFilterSettings,
}

impl FilterSettings {
    pub fn new(
        content: ContentFilter,
        version: VersionFilterSettings,
        group: GroupFilterSettings,
    ) -> Self {
        Self {
            content,
            version,
            group,
        }
    }

    /// Evaluate the three layers, stopping at the first rejection.
    pub fn evaluate(&self, record: &Record) -> Verdict {
        let content = self.content.evaluate(record);
        let accepted =
            content.accepted && self.version.matches(record) && self.group.matches(record);
        Verdict {
            accepted,
            by_text: content.by_text,
        }
    }

    pub fn matches(&self, record: &Record) -> bool {
        self.evaluate(record).accepted
    }

    /// Whether any layer restricts the record set.
    pub fn is_filtering(&self) -> bool {
        self.content.is_active() || self.version.is_active() || !self.group.all_open
    }

    pub fn needs_tags(&self) -> bool {
        self.content.needs_tags() || self.version.needs_tags()
    }

    pub fn needs_comments(&self) -> bool {
        self.content.needs_comments()
    }

    pub fn needs_grouping(&self) -> bool {
        self.group.needs_grouping()
    }

    /// Whether a package must visit the preparer before being filtered,
    /// ignoring registered prepare hooks.
    pub fn needs_prepare(&self) -> bool {
        self.needs_tags() || self.needs_comments() || self.needs_grouping()
    }

    /// Attributes whose change can flip a verdict.
    pub fn watched_attributes(&self) -> BTreeSet<Attribute> {
        let mut watched = self.content.watched_attributes();
        watched.extend(self.version.watched_attributes());
        watched.extend(self.group.watched_attributes());
        watched
    }

    pub fn is_affected_by(&self, changed: &[Attribute]) -> bool {
        intersects(&self.watched_attributes(), changed)
    }
}
