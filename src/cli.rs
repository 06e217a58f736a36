use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

use vista::core::{ColorLabel, PickLabel, RecordId, TagId};
use vista::filter::{
    Categorization, ContentFilter, FilterSettings, GroupFilterSettings, LabelFilter, MimeFilter,
    RatingCondition, RatingFilter, SortDirection, SortOrder, SortSettings, TagFilter, TagMatch,
    TextField, TextFilter, VersionFilterSettings,
};
use vista::Query;

#[derive(Parser)]
#[command(name = "vista")]
#[command(author, version, about = "Filter, sort and categorize media record catalogs")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Filter a catalog and print the visible records
    Filter(FilterArgs),

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}

#[derive(Args)]
pub struct FilterArgs {
    /// Catalog JSON file (defaults to catalog.path from the config)
    pub catalog: Option<PathBuf>,

    /// Case-insensitive text to search for
    #[arg(short, long)]
    pub text: Option<String>,

    /// Fields searched by --text (repeatable)
    #[arg(long = "text-field", value_enum)]
    pub text_fields: Vec<TextFieldArg>,

    /// Show records carrying this tag id (repeatable)
    #[arg(long = "tag")]
    pub tags: Vec<u64>,

    /// Require every --tag instead of any
    #[arg(long)]
    pub all_tags: bool,

    /// Hide records carrying this tag id (repeatable)
    #[arg(long = "exclude-tag")]
    pub exclude_tags: Vec<u64>,

    /// Also show records without tags
    #[arg(long)]
    pub untagged: bool,

    /// Star rating threshold
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=5))]
    pub rating: Option<u8>,

    /// How --rating is compared
    #[arg(long, value_enum, default_value = "at-least")]
    pub rating_condition: RatingConditionArg,

    /// Hide records that were never rated
    #[arg(long)]
    pub exclude_unrated: bool,

    /// Accepted color label (repeatable)
    #[arg(long = "color", value_enum)]
    pub colors: Vec<ColorArg>,

    /// Accepted pick label (repeatable)
    #[arg(long = "pick", value_enum)]
    pub picks: Vec<PickArg>,

    /// Accepted capture day, YYYY-MM-DD (repeatable)
    #[arg(long = "day")]
    pub days: Vec<NaiveDate>,

    /// File type class
    #[arg(long, value_enum, default_value = "all")]
    pub mime: MimeArg,

    /// Only show these paths (repeatable)
    #[arg(long = "allow-path")]
    pub allow_paths: Vec<PathBuf>,

    /// Hide versions carrying this tag id (repeatable)
    #[arg(long = "hide-version-tag")]
    pub hide_version_tags: Vec<u64>,

    /// Always show versions carrying this tag id
    #[arg(long)]
    pub version_exception_tag: Option<u64>,

    /// Show the members of this group leader (repeatable)
    #[arg(long = "open-group")]
    pub open_groups: Vec<u64>,

    /// Show the members of every group
    #[arg(long)]
    pub all_groups_open: bool,

    /// Sort order
    #[arg(long, value_enum, default_value = "name")]
    pub sort: SortArg,

    /// Sort descending
    #[arg(long)]
    pub descending: bool,

    /// Group rows under category headers
    #[arg(long, value_enum, default_value = "none")]
    pub categorize: CategorizeArg,

    /// Give up if the pipeline has not settled after this many seconds
    #[arg(long, default_value = "30")]
    pub timeout: u64,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

// ---------------------------------------------------------------------------
// Value enums
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum TextFieldArg {
    Name,
    Comment,
    Tag,
    Format,
    Path,
}

impl From<TextFieldArg> for TextField {
    fn from(arg: TextFieldArg) -> Self {
        match arg {
            TextFieldArg::Name => TextField::Name,
            TextFieldArg::Comment => TextField::Comment,
            TextFieldArg::Tag => TextField::TagName,
            TextFieldArg::Format => TextField::Format,
            TextFieldArg::Path => TextField::Path,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum RatingConditionArg {
    AtLeast,
    Exactly,
    AtMost,
}

impl From<RatingConditionArg> for RatingCondition {
    fn from(arg: RatingConditionArg) -> Self {
        match arg {
            RatingConditionArg::AtLeast => RatingCondition::AtLeast,
            RatingConditionArg::Exactly => RatingCondition::Exactly,
            RatingConditionArg::AtMost => RatingCondition::AtMost,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColorArg {
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

impl From<ColorArg> for ColorLabel {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::None => ColorLabel::None,
            ColorArg::Red => ColorLabel::Red,
            ColorArg::Orange => ColorLabel::Orange,
            ColorArg::Yellow => ColorLabel::Yellow,
            ColorArg::Green => ColorLabel::Green,
            ColorArg::Blue => ColorLabel::Blue,
            ColorArg::Magenta => ColorLabel::Magenta,
            ColorArg::Gray => ColorLabel::Gray,
            ColorArg::Black => ColorLabel::Black,
            ColorArg::White => ColorLabel::White,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum PickArg {
    None,
    Rejected,
    Pending,
    Accepted,
}

impl From<PickArg> for PickLabel {
    fn from(arg: PickArg) -> Self {
        match arg {
            PickArg::None => PickLabel::None,
            PickArg::Rejected => PickLabel::Rejected,
            PickArg::Pending => PickLabel::Pending,
            PickArg::Accepted => PickLabel::Accepted,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum MimeArg {
    All,
    Images,
    NoRaw,
    Raw,
    Jpeg,
    Png,
    Tiff,
    Video,
    Audio,
}

impl From<MimeArg> for MimeFilter {
    fn from(arg: MimeArg) -> Self {
        match arg {
            MimeArg::All => MimeFilter::All,
            MimeArg::Images => MimeFilter::Images,
            MimeArg::NoRaw => MimeFilter::NoRaw,
            MimeArg::Raw => MimeFilter::Raw,
            MimeArg::Jpeg => MimeFilter::Jpeg,
            MimeArg::Png => MimeFilter::Png,
            MimeArg::Tiff => MimeFilter::Tiff,
            MimeArg::Video => MimeFilter::Video,
            MimeArg::Audio => MimeFilter::Audio,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SortArg {
    Name,
    Path,
    Size,
    Date,
    Rating,
    Dimensions,
    Id,
}

impl From<SortArg> for SortOrder {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Name => SortOrder::Name,
            SortArg::Path => SortOrder::Path,
            SortArg::Size => SortOrder::FileSize,
            SortArg::Date => SortOrder::Date,
            SortArg::Rating => SortOrder::Rating,
            SortArg::Dimensions => SortOrder::Dimensions,
            SortArg::Id => SortOrder::Id,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CategorizeArg {
    None,
    Folder,
    Format,
    Month,
}

impl From<CategorizeArg> for Categorization {
    fn from(arg: CategorizeArg) -> Self {
        match arg {
            CategorizeArg::None => Categorization::None,
            CategorizeArg::Folder => Categorization::Folder,
            CategorizeArg::Format => Categorization::Format,
            CategorizeArg::Month => Categorization::Month,
        }
    }
}

// ---------------------------------------------------------------------------
// Query construction
// ---------------------------------------------------------------------------

impl FilterArgs {
    /// Translate the command-line flags into a [`Query`].
    pub fn to_query(&self) -> Query {
        let mut content = ContentFilter::default();

        if let Some(text) = &self.text {
            content.text = TextFilter::new(text.clone());
            if !self.text_fields.is_empty() {
                content.text.fields = self.text_fields.iter().map(|&f| f.into()).collect();
            }
        }

        content.tags = TagFilter {
            include: self.tags.iter().copied().map(TagId::new).collect(),
            exclude: self.exclude_tags.iter().copied().map(TagId::new).collect(),
            mode: if self.all_tags { TagMatch::All } else { TagMatch::Any },
            untagged: self.untagged,
        };

        content.rating = self.rating.map(|value| RatingFilter {
            value,
            condition: self.rating_condition.into(),
            exclude_unrated: self.exclude_unrated,
        });

        content.labels = LabelFilter {
            colors: self.colors.iter().map(|&c| c.into()).collect(),
            picks: self.picks.iter().map(|&p| p.into()).collect(),
        };
        content.days = self.days.iter().copied().collect();
        content.mime = self.mime.into();

        if !self.allow_paths.is_empty() {
            content
                .url_allow_lists
                .insert("cli".to_string(), self.allow_paths.iter().cloned().collect());
        }

        let mut version = VersionFilterSettings::default();
        if !self.hide_version_tags.is_empty() {
            version = VersionFilterSettings::hiding(
                self.hide_version_tags.iter().copied().map(TagId::new),
            );
            if let Some(tag) = self.version_exception_tag {
                version = version.with_exception_tag(TagId::new(tag));
            }
        }

        let group = if self.all_groups_open {
            GroupFilterSettings::all_open()
        } else {
            GroupFilterSettings {
                all_open: false,
                open_groups: self.open_groups.iter().copied().map(RecordId::new).collect(),
            }
        };

        let direction = if self.descending {
            SortDirection::Descending
        } else {
            SortDirection::Ascending
        };

        Query {
            filter: FilterSettings::new(content, version, group),
            sort: SortSettings::by(self.sort.into(), direction).categorized(self.categorize.into()),
            timeout: Duration::from_secs(self.timeout),
        }
    }
}
