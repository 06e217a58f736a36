//! The content layer of the filter predicate.
//!
//! A [`ContentFilter`] bundles independent sub-filters. Each one is inactive
//! when left at its default and a record must pass every active sub-filter.
//! The text sub-filter additionally reports whether it matched on its own, so
//! a search field can tell the user that the typed text found something even
//! when other sub-filters hide those records.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use vista_core::{Attribute, ColorLabel, MediaCategory, PickLabel, Record, TagId};

// ---------------------------------------------------------------------------
// Text
// ---------------------------------------------------------------------------

/// Record field searched by the text filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextField {
    Name,
    Comment,
    TagName,
    Format,
    Path,
}

/// Case-insensitive substring search over selected record fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextFilter {
    pub text: String,
    pub fields: BTreeSet<TextField>,
    /// Display names of tags, used when [`TextField::TagName`] is searched.
    pub tag_names: BTreeMap<TagId, String>,
}

impl Default for TextFilter {
    fn default() -> Self {
        Self {
            text: String::new(),
            fields: [TextField::Name, TextField::Comment, TextField::TagName]
                .into_iter()
                .collect(),
            tag_names: BTreeMap::new(),
        }
    }
}

impl TextFilter {
    /// Search names, comments and tag names for `text`.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_fields(mut self, fields: impl IntoIterator<Item = TextField>) -> Self {
        self.fields = fields.into_iter().collect();
        self
    }

    #[must_use]
    pub fn with_tag_names(mut self, names: BTreeMap<TagId, String>) -> Self {
        self.tag_names = names;
        self
    }

    pub fn is_active(&self) -> bool {
        !self.text.trim().is_empty() && !self.fields.is_empty()
    }

    pub fn searches(&self, field: TextField) -> bool {
        self.is_active() && self.fields.contains(&field)
    }

    /// Whether any searched field contains the text.
    pub fn matches(&self, record: &Record) -> bool {
        let needle = self.text.trim().to_lowercase();
        let contains = |haystack: &str| haystack.to_lowercase().contains(&needle);

        self.fields.iter().any(|field| match field {
            TextField::Name => contains(&record.info().name),
            TextField::Format => contains(&record.info().format),
            TextField::Path => contains(&record.info().path.to_string_lossy()),
            TextField::Comment => contains(&record.comment()),
            TextField::TagName => record
                .tags()
                .iter()
                .filter_map(|tag| self.tag_names.get(tag))
                .any(|name| contains(name)),
        })
    }

    fn attributes(&self) -> impl Iterator<Item = Attribute> + '_ {
        self.fields.iter().map(|field| match field {
            TextField::Name => Attribute::Name,
            TextField::Comment => Attribute::Comment,
            TextField::TagName => Attribute::Tags,
            TextField::Format => Attribute::Format,
            TextField::Path => Attribute::Path,
        })
    }
}

// ---------------------------------------------------------------------------
// Tags
// ---------------------------------------------------------------------------

/// How the included tags combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagMatch {
    /// At least one included tag must be assigned.
    #[default]
    Any,
    /// Every included tag must be assigned.
    All,
}

/// Include/exclude filter over assigned tag ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TagFilter {
    pub include: BTreeSet<TagId>,
    pub exclude: BTreeSet<TagId>,
    pub mode: TagMatch,
    /// Also accept records without any tag (only meaningful for
    /// [`TagMatch::Any`], or on its own).
    pub untagged: bool,
}

impl TagFilter {
    pub fn any_of(tags: impl IntoIterator<Item = TagId>) -> Self {
        Self {
            include: tags.into_iter().collect(),
            ..Default::default()
        }
    }

    pub fn all_of(tags: impl IntoIterator<Item = TagId>) -> Self {
        Self {
            include: tags.into_iter().collect(),
            mode: TagMatch::All,
            ..Default::default()
        }
    }

    pub fn is_active(&self) -> bool {
        !self.include.is_empty() || !self.exclude.is_empty() || self.untagged
    }

    pub fn matches(&self, record: &Record) -> bool {
        let tags = record.tags();
        let has = |tag: &TagId| tags.contains(tag);

        let included = if self.include.is_empty() {
            !self.untagged || tags.is_empty()
        } else {
            match self.mode {
                TagMatch::Any => {
                    self.include.iter().any(has) || (self.untagged && tags.is_empty())
                }
                TagMatch::All => self.include.iter().all(has),
            }
        };

        included && !self.exclude.iter().any(has)
    }
}

// ---------------------------------------------------------------------------
// Rating
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatingCondition {
    #[default]
    AtLeast,
    Exactly,
    AtMost,
}

/// Star-rating threshold. Unrated records count as 0 stars unless
/// `exclude_unrated` is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingFilter {
    pub value: u8,
    #[serde(default)]
    pub condition: RatingCondition,
    #[serde(default)]
    pub exclude_unrated: bool,
}

impl RatingFilter {
    pub fn at_least(value: u8) -> Self {
        Self {
            value,
            condition: RatingCondition::AtLeast,
            exclude_unrated: false,
        }
    }

    pub fn matches(&self, record: &Record) -> bool {
        let rating = record.info().rating;
        if rating.is_none() && self.exclude_unrated {
            return false;
        }
        let stars = rating.unwrap_or(0);
        match self.condition {
            RatingCondition::AtLeast => stars >= self.value,
            RatingCondition::Exactly => stars == self.value,
            RatingCondition::AtMost => stars <= self.value,
        }
    }
}

// ---------------------------------------------------------------------------
// Labels
// ---------------------------------------------------------------------------

/// Accepted color and pick labels; an empty set accepts every label.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelFilter {
    pub colors: BTreeSet<ColorLabel>,
    pub picks: BTreeSet<PickLabel>,
}

impl LabelFilter {
    pub fn is_active(&self) -> bool {
        !self.colors.is_empty() || !self.picks.is_empty()
    }

    pub fn matches(&self, record: &Record) -> bool {
        let info = record.info();
        (self.colors.is_empty() || self.colors.contains(&info.color_label))
            && (self.picks.is_empty() || self.picks.contains(&info.pick_label))
    }
}

// ---------------------------------------------------------------------------
// Mime
// ---------------------------------------------------------------------------

/// File-type class filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MimeFilter {
    #[default]
    All,
    /// Rendered and raw still images.
    Images,
    /// Everything except camera raw files.
    NoRaw,
    Raw,
    Jpeg,
    Png,
    Tiff,
    Video,
    Audio,
}

impl MimeFilter {
    pub fn is_active(self) -> bool {
        self != Self::All
    }

    pub fn matches(self, record: &Record) -> bool {
        if !self.is_active() {
            return true;
        }
        let info = record.info();
        let format = info.format.to_ascii_uppercase();
        match self {
            Self::All => true,
            Self::Images => info.category.is_still(),
            Self::NoRaw => info.category != MediaCategory::RawImage,
            Self::Raw => info.category == MediaCategory::RawImage,
            Self::Jpeg => matches!(format.as_str(), "JPG" | "JPEG" | "JPE"),
            Self::Png => format == "PNG",
            Self::Tiff => matches!(format.as_str(), "TIF" | "TIFF"),
            Self::Video => info.category == MediaCategory::Video,
            Self::Audio => info.category == MediaCategory::Audio,
        }
    }
}

// ---------------------------------------------------------------------------
// ContentFilter
// ---------------------------------------------------------------------------

/// Result of evaluating the content layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ContentMatch {
    /// Every active sub-filter accepted the record.
    pub accepted: bool,
    /// The text sub-filter is active and matched, regardless of the others.
    pub by_text: bool,
}

/// Content part of the filter predicate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentFilter {
    pub text: TextFilter,
    pub tags: TagFilter,
    pub rating: Option<RatingFilter>,
    pub labels: LabelFilter,
    /// Accepted capture days; empty accepts every date.
    pub days: BTreeSet<NaiveDate>,
    pub mime: MimeFilter,
    /// Named allow-lists of file paths. A record must appear in at least one
    /// list when any list is set.
    pub url_allow_lists: BTreeMap<String, BTreeSet<PathBuf>>,
}

impl ContentFilter {
    pub fn is_active(&self) -> bool {
        self.text.is_active()
            || self.tags.is_active()
            || self.rating.is_some()
            || self.labels.is_active()
            || !self.days.is_empty()
            || self.mime.is_active()
            || !self.url_allow_lists.is_empty()
    }

    pub fn needs_tags(&self) -> bool {
        self.tags.is_active() || self.text.searches(TextField::TagName)
    }

    pub fn needs_comments(&self) -> bool {
        self.text.searches(TextField::Comment)
    }

    /// Evaluate every active sub-filter.
    ///
    /// The text sub-filter runs first so that `by_text` is known even when a
    /// later sub-filter rejects the record; the remaining checks stop at the
    /// first rejection.
    pub fn evaluate(&self, record: &Record) -> ContentMatch {
        let mut accepted = true;
        let mut by_text = false;

        if self.text.is_active() {
            by_text = self.text.matches(record);
            accepted = by_text;
        }

        accepted = accepted
            && (!self.tags.is_active() || self.tags.matches(record))
            && self.rating.map_or(true, |rating| rating.matches(record))
            && (!self.labels.is_active() || self.labels.matches(record))
            && self.matches_day(record)
            && self.mime.matches(record)
            && self.matches_url(record);

        ContentMatch { accepted, by_text }
    }

    fn matches_day(&self, record: &Record) -> bool {
        if self.days.is_empty() {
            return true;
        }
        record
            .info()
            .date
            .map_or(false, |date| self.days.contains(&date.date()))
    }

    fn matches_url(&self, record: &Record) -> bool {
        if self.url_allow_lists.is_empty() {
            return true;
        }
        let info = record.info();
        self.url_allow_lists
            .values()
            .any(|list| list.contains(&info.path))
    }

    /// Attributes whose change can alter this layer's verdict.
    pub fn watched_attributes(&self) -> BTreeSet<Attribute> {
        let mut watched = BTreeSet::new();
        if self.text.is_active() {
            watched.extend(self.text.attributes());
        }
        if self.tags.is_active() {
            watched.insert(Attribute::Tags);
        }
        if self.rating.is_some() {
            watched.insert(Attribute::Rating);
        }
        if !self.labels.colors.is_empty() {
            watched.insert(Attribute::ColorLabel);
        }
        if !self.labels.picks.is_empty() {
            watched.insert(Attribute::PickLabel);
        }
        if !self.days.is_empty() {
            watched.insert(Attribute::Date);
        }
        if self.mime.is_active() {
            watched.insert(Attribute::Format);
            watched.insert(Attribute::Category);
        }
        if !self.url_allow_lists.is_empty() {
            watched.insert(Attribute::Path);
        }
        watched
    }
}
