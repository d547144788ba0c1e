use serde::{Deserialize, Serialize};

// -- Well-known tags --

pub const TAG_SLUG_FRESHLY_PRESSED: &str = "freshly-pressed";
pub const TAG_TITLE_FRESHLY_PRESSED: &str = "Freshly Pressed";
pub const FRESHLY_PRESSED_PATH: &str = "freshly-pressed";

/// Site that hosts the editorial "Discover" stream.
pub const DISCOVER_SITE_ID: i64 = 53424024;
pub const DISCOVER_PATH: &str = "read/sites/53424024/posts";

pub const FOLLOWING_PATH: &str = "/read/following";
pub const LIKED_PATH: &str = "/read/liked";

/// Origin of a tag. The integer codes are persisted and must stay stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReaderTagType {
    #[default]
    Default,
    Followed,
    CustomList,
    Bookmarked,
    DiscoverPostCards,
}

impl ReaderTagType {
    pub const ALL: [ReaderTagType; 5] = [
        Self::Default,
        Self::Followed,
        Self::CustomList,
        Self::Bookmarked,
        Self::DiscoverPostCards,
    ];

    pub fn to_i64(self) -> i64 {
        match self {
            Self::Default => 0,
            Self::Followed => 1,
            Self::CustomList => 3,
            Self::Bookmarked => 5,
            Self::DiscoverPostCards => 6,
        }
    }

    /// Unknown codes (including retired ones) decode as `Default`.
    pub fn from_i64(value: i64) -> Self {
        match value {
            1 => Self::Followed,
            3 => Self::CustomList,
            5 => Self::Bookmarked,
            6 => Self::DiscoverPostCards,
            _ => Self::Default,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Followed => "followed",
            Self::CustomList => "custom_list",
            Self::Bookmarked => "bookmarked",
            Self::DiscoverPostCards => "discover_post_cards",
        }
    }
}

/// A classification tag as cached locally.
///
/// `date_updated` is owned by the cache: it is written only by the
/// touch/clear operations and is ignored on upsert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReaderTag {
    pub slug: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub tag_type: ReaderTagType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_updated: Option<String>,
}

impl ReaderTag {
    pub fn new(
        slug: impl Into<String>,
        display_name: impl Into<String>,
        title: impl Into<String>,
        endpoint: impl Into<String>,
        tag_type: ReaderTagType,
    ) -> Self {
        Self {
            slug: slug.into(),
            display_name: display_name.into(),
            title: title.into(),
            endpoint: endpoint.into(),
            tag_type,
            date_updated: None,
        }
    }

    /// Text shown for the tag: display name, then title, then slug.
    pub fn label(&self) -> &str {
        if !self.display_name.is_empty() {
            &self.display_name
        } else if !self.title.is_empty() {
            &self.title
        } else {
            &self.slug
        }
    }

    /// Same identity as the cache key: slug compared case-insensitively, type exact.
    pub fn is_same_tag(&self, other: &ReaderTag) -> bool {
        self.tag_type == other.tag_type && self.slug.eq_ignore_ascii_case(&other.slug)
    }

    pub fn is_freshly_pressed(&self) -> bool {
        self.tag_type == ReaderTagType::Default && self.endpoint.ends_with(FRESHLY_PRESSED_PATH)
    }

    pub fn is_discover(&self) -> bool {
        self.tag_type == ReaderTagType::Default && self.endpoint.ends_with(DISCOVER_PATH)
    }

    pub fn is_followed_sites(&self) -> bool {
        self.tag_type == ReaderTagType::Default && self.endpoint.ends_with(FOLLOWING_PATH)
    }

    pub fn is_bookmarked(&self) -> bool {
        self.tag_type == ReaderTagType::Bookmarked
    }
}
