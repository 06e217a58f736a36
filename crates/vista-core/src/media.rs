//! Media-domain enums: categories, labels and the attribute vocabulary used by
//! change notifications.
//!
//! All enums serialize in snake_case and implement `Display` manually for
//! consistent string representation.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// MediaCategory
// ---------------------------------------------------------------------------

/// Broad classification of a record's file type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaCategory {
    /// Rendered still images (JPEG, PNG, TIFF, HEIF, ...).
    Image,
    /// Camera raw files.
    RawImage,
    Video,
    Audio,
    #[default]
    Other,
}

impl MediaCategory {
    /// Whether the category is a still image of any kind.
    pub fn is_still(self) -> bool {
        matches!(self, Self::Image | Self::RawImage)
    }
}

impl fmt::Display for MediaCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Image => write!(f, "image"),
            Self::RawImage => write!(f, "raw_image"),
            Self::Video => write!(f, "video"),
            Self::Audio => write!(f, "audio"),
            Self::Other => write!(f, "other"),
        }
    }
}

// ---------------------------------------------------------------------------
// Labels
// ---------------------------------------------------------------------------

/// Color label assigned by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorLabel {
    #[default]
    None,
    Red,
    Orange,
    Yellow,
    Green,
    Blue,
    Magenta,
    Gray,
    Black,
    White,
}

impl fmt::Display for ColorLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::None => "none",
            Self::Red => "red",
            Self::Orange => "orange",
            Self::Yellow => "yellow",
            Self::Green => "green",
            Self::Blue => "blue",
            Self::Magenta => "magenta",
            Self::Gray => "gray",
            Self::Black => "black",
            Self::White => "white",
        };
        f.write_str(s)
    }
}

/// Pick (culling) label assigned by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PickLabel {
    #[default]
    None,
    Rejected,
    Pending,
    Accepted,
}

impl fmt::Display for PickLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::None => "none",
            Self::Rejected => "rejected",
            Self::Pending => "pending",
            Self::Accepted => "accepted",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Attribute
// ---------------------------------------------------------------------------

/// A record attribute, as named by change notifications and source errors.
///
/// The first group lives in the record's core info bundle; `Tags`, `Comment`
/// and `Grouping` are loaded separately because they are comparatively
/// expensive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attribute {
    /// The whole core info bundle.
    Info,
    Name,
    Path,
    Format,
    Category,
    Rating,
    ColorLabel,
    PickLabel,
    Date,
    FileSize,
    Dimensions,
    Tags,
    Comment,
    Grouping,
}

impl Attribute {
    /// Whether the attribute is stored in the core info bundle.
    pub fn is_info(self) -> bool {
        !matches!(self, Self::Tags | Self::Comment | Self::Grouping)
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Info => "info",
            Self::Name => "name",
            Self::Path => "path",
            Self::Format => "format",
            Self::Category => "category",
            Self::Rating => "rating",
            Self::ColorLabel => "color_label",
            Self::PickLabel => "pick_label",
            Self::Date => "date",
            Self::FileSize => "file_size",
            Self::Dimensions => "dimensions",
            Self::Tags => "tags",
            Self::Comment => "comment",
            Self::Grouping => "grouping",
        };
        f.write_str(s)
    }
}
