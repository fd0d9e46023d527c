//! Declarative media filters and their resolution into a backend mode.
//!
//! A [`FilterSpec`] describes *which* media a view wants; [`FilterSpec::resolved_mode`]
//! decides *how* the query service is asked for it. Resolution is pure:
//!
//! 1. an explicit [`FilterSpec::mode`] override wins;
//! 2. otherwise a non-empty id list selects [`FilterMode::ById`] (ids take
//!    precedence over keywords when both are present);
//! 3. otherwise non-empty keywords select [`FilterMode::KeywordsAnd`] or
//!    [`FilterMode::KeywordsOr`] according to [`KeywordMode`];
//! 4. otherwise [`FilterMode::All`].
//!
//! Filters can also be carried in deep links through
//! [`FilterSpec::from_query_string`] / [`FilterSpec::to_query_string`]
//! (`keywords=a;b&KeywordFilterMode=AND&sort=Oldest&ids=1;2`).

use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::GalleryError;

/// Page size used when a filter does not specify one.
pub const DEFAULT_LIMIT: u32 = 30;

/// Whether a record must carry all or any of the requested keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum KeywordMode {
    And,
    #[default]
    Or,
}

impl FromStr for KeywordMode {
    type Err = GalleryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "AND" => Ok(KeywordMode::And),
            "OR" => Ok(KeywordMode::Or),
            other => Err(GalleryError::InvalidFilter(format!(
                "unknown keyword mode '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for KeywordMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            KeywordMode::And => "AND",
            KeywordMode::Or => "OR",
        })
    }
}

/// User-facing sort choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum SortOrder {
    #[default]
    Newest,
    Oldest,
    Random,
}

impl SortOrder {
    pub fn direction(self) -> SortDirection {
        match self {
            SortOrder::Newest => SortDirection::Descending,
            SortOrder::Oldest => SortDirection::Ascending,
            SortOrder::Random => SortDirection::Random,
        }
    }
}

impl FromStr for SortOrder {
    type Err = GalleryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "newest" => Ok(SortOrder::Newest),
            "oldest" => Ok(SortOrder::Oldest),
            "random" => Ok(SortOrder::Random),
            other => Err(GalleryError::InvalidFilter(format!(
                "unknown sort order '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SortOrder::Newest => "Newest",
            SortOrder::Oldest => "Oldest",
            SortOrder::Random => "Random",
        })
    }
}

/// Sort direction sent to the query service.
///
/// `Random` carries no reproducibility contract: the service decides the
/// order of every call independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SortDirection {
    Ascending,
    Descending,
    Random,
}

impl SortDirection {
    /// Wire spelling used by the stored procedures.
    pub fn as_str(self) -> &'static str {
        match self {
            SortDirection::Ascending => "asc",
            SortDirection::Descending => "desc",
            SortDirection::Random => "random",
        }
    }
}

/// How the query service selects media.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FilterMode {
    ById,
    KeywordsAnd,
    KeywordsOr,
    All,
    /// Media flagged for the home-page background slideshow.
    Background,
}

impl FilterMode {
    /// Wire spelling used by the stored procedures.
    pub fn as_str(self) -> &'static str {
        match self {
            FilterMode::ById => "by_id",
            FilterMode::KeywordsAnd => "keywords_and",
            FilterMode::KeywordsOr => "keywords_or",
            FilterMode::All => "all",
            FilterMode::Background => "background",
        }
    }
}

/// Client-side description of which media to query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSpec {
    pub keywords: BTreeSet<String>,
    pub keyword_mode: KeywordMode,
    pub ids: BTreeSet<i64>,
    pub sort: SortOrder,
    /// Explicit mode override; bypasses id/keyword resolution.
    pub mode: Option<FilterMode>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_keywords<I, K>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        self.keywords.extend(keywords.into_iter().map(Into::into));
        self
    }

    pub fn with_keyword_mode(mut self, mode: KeywordMode) -> Self {
        self.keyword_mode = mode;
        self
    }

    pub fn with_ids<I: IntoIterator<Item = i64>>(mut self, ids: I) -> Self {
        self.ids.extend(ids);
        self
    }

    pub fn with_sort(mut self, sort: SortOrder) -> Self {
        self.sort = sort;
        self
    }

    pub fn with_mode(mut self, mode: FilterMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn with_window(mut self, limit: u32, offset: u32) -> Self {
        self.limit = Some(limit);
        self.offset = Some(offset);
        self
    }

    /// Background slideshow filter.
    pub fn background() -> Self {
        Self::new().with_mode(FilterMode::Background)
    }

    pub fn resolved_mode(&self) -> FilterMode {
        if let Some(mode) = self.mode {
            return mode;
        }
        if !self.ids.is_empty() {
            return FilterMode::ById;
        }
        if !self.keywords.is_empty() {
            return match self.keyword_mode {
                KeywordMode::And => FilterMode::KeywordsAnd,
                KeywordMode::Or => FilterMode::KeywordsOr,
            };
        }
        FilterMode::All
    }

    /// True when the filter narrows the catalog (keywords or ids selected).
    pub fn is_active(&self) -> bool {
        !self.keywords.is_empty() || !self.ids.is_empty() || self.mode.is_some()
    }

    /// Add the keyword if absent, remove it if present.
    pub fn toggle_keyword(&mut self, keyword: &str) {
        if !self.keywords.remove(keyword) {
            self.keywords.insert(keyword.to_string());
        }
    }

    /// Parse a deep-link query string.
    ///
    /// Recognized keys: `keywords` and `ids` (`;`-separated), `KeywordFilterMode`
    /// (`AND`, anything else is `OR`), `sort`. Unknown keys are ignored and
    /// values are taken verbatim.
    pub fn from_query_string(query: &str) -> Result<Self, GalleryError> {
        let mut spec = FilterSpec::new();
        for pair in query.trim_start_matches('?').split('&') {
            let (key, value) = match pair.split_once('=') {
                Some(kv) => kv,
                None => continue,
            };
            match key {
                "keywords" => {
                    spec.keywords = split_list(value).map(str::to_string).collect();
                }
                "ids" => {
                    spec.ids = split_list(value)
                        .map(|v| {
                            v.parse::<i64>().map_err(|_| {
                                GalleryError::InvalidFilter(format!("invalid media id '{}'", v))
                            })
                        })
                        .collect::<Result<_, _>>()?;
                }
                "KeywordFilterMode" => {
                    spec.keyword_mode = if value.eq_ignore_ascii_case("AND") {
                        KeywordMode::And
                    } else {
                        KeywordMode::Or
                    };
                }
                "sort" => spec.sort = value.parse()?,
                _ => {}
            }
        }
        Ok(spec)
    }

    /// Render the filter as a deep-link query string (inverse of
    /// [`from_query_string`](Self::from_query_string) for the keys it knows).
    pub fn to_query_string(&self) -> String {
        let mut parts = Vec::new();
        if !self.keywords.is_empty() {
            let keywords: Vec<&str> = self.keywords.iter().map(String::as_str).collect();
            parts.push(format!("keywords={}", keywords.join(";")));
            parts.push(format!("KeywordFilterMode={}", self.keyword_mode));
        }
        if !self.ids.is_empty() {
            let ids: Vec<String> = self.ids.iter().map(i64::to_string).collect();
            parts.push(format!("ids={}", ids.join(";")));
        }
        if self.sort != SortOrder::Newest {
            parts.push(format!("sort={}", self.sort));
        }
        parts.join("&")
    }
}

fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(';').map(str::trim).filter(|v| !v.is_empty())
}
