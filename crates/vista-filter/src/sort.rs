//! Sort order and categorization.
//!
//! Sorting never touches the filter pipeline: it is a synchronous total order
//! over records computed by the view after merging. Categorization groups the
//! sorted rows under headers (folder, format or month); categories always
//! sort before the per-record order.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use vista_core::{Attribute, Record};

use crate::intersects;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Name,
    Path,
    FileSize,
    Date,
    Rating,
    /// Pixel count.
    Dimensions,
    Id,
}

impl SortOrder {
    fn attribute(self) -> Option<Attribute> {
        match self {
            Self::Name => Some(Attribute::Name),
            Self::Path => Some(Attribute::Path),
            Self::FileSize => Some(Attribute::FileSize),
            Self::Date => Some(Attribute::Date),
            Self::Rating => Some(Attribute::Rating),
            Self::Dimensions => Some(Attribute::Dimensions),
            Self::Id => None,
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Name => "name",
            Self::Path => "path",
            Self::FileSize => "file_size",
            Self::Date => "date",
            Self::Rating => "rating",
            Self::Dimensions => "dimensions",
            Self::Id => "id",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Self::Ascending => ordering,
            Self::Descending => ordering.reverse(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Categorization {
    #[default]
    None,
    Folder,
    Format,
    Month,
}

impl Categorization {
    fn attribute(self) -> Option<Attribute> {
        match self {
            Self::None => None,
            Self::Folder => Some(Attribute::Path),
            Self::Format => Some(Attribute::Format),
            Self::Month => Some(Attribute::Date),
        }
    }
}

impl fmt::Display for Categorization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::None => "none",
            Self::Folder => "folder",
            Self::Format => "format",
            Self::Month => "month",
        };
        f.write_str(s)
    }
}

/// The header a record is listed under.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryKey {
    None,
    Folder(PathBuf),
    Format(String),
    /// `(year, month)`; undated records come first.
    Month(Option<(i32, u32)>),
}

impl fmt::Display for CategoryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("all"),
            Self::Folder(path) => write!(f, "{}", path.display()),
            Self::Format(format) => f.write_str(format),
            Self::Month(Some((year, month))) => write!(f, "{year:04}-{month:02}"),
            Self::Month(None) => f.write_str("undated"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SortSettings {
    pub order: SortOrder,
    pub direction: SortDirection,
    pub categorization: Categorization,
    pub category_direction: SortDirection,
}

impl SortSettings {
    pub fn by(order: SortOrder, direction: SortDirection) -> Self {
        Self {
            order,
            direction,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn categorized(mut self, categorization: Categorization) -> Self {
        self.categorization = categorization;
        self
    }

    pub fn is_categorized(&self) -> bool {
        self.categorization != Categorization::None
    }

    pub fn category_key(&self, record: &Record) -> CategoryKey {
        match self.categorization {
            Categorization::None => CategoryKey::None,
            Categorization::Folder => CategoryKey::Folder(record.info().folder().to_path_buf()),
            Categorization::Format => CategoryKey::Format(record.info().format.to_uppercase()),
            Categorization::Month => CategoryKey::Month(record.info().month()),
        }
    }

    /// Order of the categories `a` and `b` belong to.
    pub fn compare_categories(&self, a: &Record, b: &Record) -> Ordering {
        if !self.is_categorized() {
            return Ordering::Equal;
        }
        self.category_direction
            .apply(self.category_key(a).cmp(&self.category_key(b)))
    }

    /// Per-record order ignoring categories. Ties are broken by ascending id
    /// so the order is total.
    pub fn compare(&self, a: &Record, b: &Record) -> Ordering {
        let (ia, ib) = (a.info(), b.info());
        let primary = match self.order {
            SortOrder::Name => compare_names(&ia.name, &ib.name),
            SortOrder::Path => ia.path.cmp(&ib.path),
            SortOrder::FileSize => ia.file_size.cmp(&ib.file_size),
            SortOrder::Date => ia.date.cmp(&ib.date),
            SortOrder::Rating => ia.rating.cmp(&ib.rating),
            SortOrder::Dimensions => ia.pixel_count().cmp(&ib.pixel_count()),
            SortOrder::Id => Ordering::Equal,
        };
        let tie = a.id().cmp(&b.id());
        match primary {
            Ordering::Equal if self.order == SortOrder::Id => self.direction.apply(tie),
            Ordering::Equal => tie,
            ordering => self.direction.apply(ordering),
        }
    }

    /// Categories first, then the per-record order.
    pub fn compare_for_sort(&self, a: &Record, b: &Record) -> Ordering {
        self.compare_categories(a, b).then_with(|| self.compare(a, b))
    }

    pub fn sort(&self, records: &mut [Record]) {
        records.sort_by(|a, b| self.compare_for_sort(a, b));
    }

    /// Attributes whose change can move a record.
    pub fn watched_attributes(&self) -> BTreeSet<Attribute> {
        self.order
            .attribute()
            .into_iter()
            .chain(self.categorization.attribute())
            .collect()
    }

    pub fn is_affected_by(&self, changed: &[Attribute]) -> bool {
        intersects(&self.watched_attributes(), changed)
    }
}

fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}
