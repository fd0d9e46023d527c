//! Core data models shared by the query builder, loader, and voting session.
//!
//! The query service speaks in raw wire shapes ([`RawMediaRow`],
//! [`RawKeywordRow`]); everything downstream works with the normalized
//! types ([`MediaRecord`], [`KeywordEntry`]). The single conversion
//! `MediaRecord::from(RawMediaRow)` is the only place optional-field
//! defaults are decided.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Extension that marks a media item as a video.
pub const VIDEO_EXTENSION: &str = ".mp4";

/// Group assigned to keywords that belong to no keyword group.
pub const UNGROUPED_KEYWORD_GROUP: &str = "Other";

/// Media row as returned by the query service.
///
/// Accepts every historical spelling of the row (photo rows and
/// media-with-likes rows), so callers never branch on row shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMediaRow {
    #[serde(alias = "photo_id", alias = "id")]
    pub media_id: i64,
    pub filename: String,
    #[serde(default)]
    pub extension: String,
    #[serde(default)]
    pub width: Option<i64>,
    #[serde(default)]
    pub height: Option<i64>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, alias = "keywords")]
    pub keyword_list: Option<Vec<String>>,
    #[serde(default, alias = "likes")]
    pub like_count: Option<i64>,
    #[serde(default)]
    pub capture_date: Option<String>,
}

impl RawMediaRow {
    /// Minimal row with only the required fields set.
    pub fn new(media_id: i64, filename: &str, extension: &str) -> Self {
        Self {
            media_id,
            filename: filename.to_string(),
            extension: extension.to_string(),
            width: None,
            height: None,
            latitude: None,
            longitude: None,
            title: None,
            description: None,
            keyword_list: None,
            like_count: None,
            capture_date: None,
        }
    }
}

/// Pixel dimensions of a media item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MediaSize {
    pub width: i64,
    pub height: i64,
}

/// Geotag of a media item.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// Normalized media item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaRecord {
    pub id: i64,
    pub filename: String,
    pub extension: String,
    pub size: Option<MediaSize>,
    pub location: Option<GeoPoint>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub keywords: Option<Vec<String>>,
    pub like_count: i64,
    pub capture_date: Option<String>,
}

impl MediaRecord {
    pub fn is_video(&self) -> bool {
        self.extension == VIDEO_EXTENSION
    }

    /// Height over width, or `1.0` when the dimensions are unknown.
    pub fn aspect_ratio(&self) -> f64 {
        match self.size {
            Some(MediaSize { width, height }) if width > 0 && height > 0 => {
                height as f64 / width as f64
            }
            _ => 1.0,
        }
    }

    pub fn has_keyword(&self, keyword: &str) -> bool {
        self.keywords
            .as_ref()
            .is_some_and(|kws| kws.iter().any(|k| k == keyword))
    }
}

impl From<RawMediaRow> for MediaRecord {
    fn from(row: RawMediaRow) -> Self {
        let size = match (row.width, row.height) {
            (Some(width), Some(height)) => Some(MediaSize { width, height }),
            _ => None,
        };
        let location = match (row.latitude, row.longitude) {
            (Some(latitude), Some(longitude)) => Some(GeoPoint {
                latitude,
                longitude,
            }),
            _ => None,
        };
        Self {
            id: row.media_id,
            filename: row.filename,
            extension: row.extension,
            size,
            location,
            title: row.title,
            description: row.description,
            keywords: row.keyword_list,
            like_count: row.like_count.unwrap_or(0),
            capture_date: row.capture_date,
        }
    }
}

/// A keyword and the group it is displayed under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordEntry {
    pub keyword: String,
    pub group: String,
}

/// Keyword row with its (optional) embedded group, as selected from the
/// `keywords` table.
#[derive(Debug, Clone, Deserialize)]
pub struct RawKeywordRow {
    pub keyword: String,
    #[serde(default)]
    pub keyword_groups: Option<RawKeywordGroup>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawKeywordGroup {
    pub group: String,
}

impl From<RawKeywordRow> for KeywordEntry {
    fn from(row: RawKeywordRow) -> Self {
        Self {
            keyword: row.keyword,
            group: row
                .keyword_groups
                .map(|g| g.group)
                .unwrap_or_else(|| UNGROUPED_KEYWORD_GROUP.to_string()),
        }
    }
}

/// Left or right position of an item in a voting pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PairSlot {
    Left,
    Right,
}

/// Immutable entry of a user's vote log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRecord {
    #[serde(alias = "vote_id", deserialize_with = "deserialize_id")]
    pub id: String,
    pub user_id: String,
    #[serde(alias = "media1_id")]
    pub media_a: i64,
    #[serde(alias = "media2_id")]
    pub media_b: i64,
    #[serde(alias = "selected_media_id", alias = "selected_photo_id")]
    pub selected: i64,
    #[serde(alias = "created_at")]
    pub timestamp: DateTime<Utc>,
}

/// Vote identifiers are uuids on some backends and serial integers on others.
fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(i64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Number(n) => n.to_string(),
    })
}

/// Community ranking entry: a media id and the number of times it won.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatedMedia {
    #[serde(alias = "photo_id")]
    pub media_id: i64,
    #[serde(alias = "vote_count", default)]
    pub votes: i64,
}
