//! JSON catalogs for the `memory` backend.
//!
//! ```json
//! {
//!   "media": [
//!     { "media_id": 1, "filename": "2023/IMG_0001", "extension": ".jpg",
//!       "keywords": ["alps"], "capture_date": "2023-07-01T09:12:00Z" }
//!   ],
//!   "keywords": [ { "keyword": "alps", "group": "Places" } ],
//!   "likes": [ { "user_id": "alice", "media_id": 1 } ]
//! }
//! ```
//!
//! Media rows accept the same field spellings as the REST backend.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use photo_gallery_core::models::{KeywordEntry, RawMediaRow, UNGROUPED_KEYWORD_GROUP};
use photo_gallery_core::service::memory::InMemoryQueryService;
use photo_gallery_core::service::QueryService;

#[derive(Debug, Deserialize, Default)]
pub struct Fixture {
    #[serde(default)]
    pub media: Vec<RawMediaRow>,
    #[serde(default)]
    pub keywords: Vec<FixtureKeyword>,
    #[serde(default)]
    pub likes: Vec<FixtureLike>,
}

#[derive(Debug, Deserialize)]
pub struct FixtureKeyword {
    pub keyword: String,
    #[serde(default)]
    pub group: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FixtureLike {
    pub user_id: String,
    pub media_id: i64,
}

impl Fixture {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read fixture: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse fixture: {}", path.display()))
    }

    /// Build an in-memory service holding this catalog.
    pub async fn into_service(self) -> Result<InMemoryQueryService> {
        let keywords = self
            .keywords
            .into_iter()
            .map(|k| KeywordEntry {
                keyword: k.keyword,
                group: k
                    .group
                    .unwrap_or_else(|| UNGROUPED_KEYWORD_GROUP.to_string()),
            })
            .collect();
        let service = InMemoryQueryService::with_catalog(self.media, keywords);
        for like in self.likes {
            service
                .add_like(&like.user_id, like.media_id)
                .await
                .with_context(|| format!("fixture like for unknown media {}", like.media_id))?;
        }
        Ok(service)
    }
}
