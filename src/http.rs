//! PostgREST implementation of [`QueryService`].
//!
//! Every backend operation is a stored procedure exposed at
//! `POST {url}/rest/v1/rpc/{function}`; the keyword catalog is a plain
//! table select. Requests carry the project key in both the `apikey` and
//! `Authorization: Bearer` headers.
//!
//! # Retry Strategy
//!
//! Read-only calls use exponential backoff for transient errors:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)
//!
//! Votes and likes change server state and are sent exactly once.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use photo_gallery_core::models::{
    KeywordEntry, PairSlot, RatedMedia, RawKeywordRow, RawMediaRow, VoteRecord,
};
use photo_gallery_core::service::{MediaQuery, QueryService};

use crate::config::Config;

const KEYWORDS_SELECT: &str = "keywords?select=keyword,keyword_groups(group)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Retry {
    Transient,
    Never,
}

/// HTTP client for the hosted gallery backend.
pub struct RestQueryService {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    max_retries: u32,
    backoff_base: Duration,
}

impl RestQueryService {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration, max_retries: u32) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            max_retries,
            backoff_base: Duration::from_secs(1),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let url = config
            .service
            .url
            .as_deref()
            .ok_or_else(|| anyhow!("service.url must be set for the rest backend"))?;
        let api_key = config.api_key().ok_or_else(|| {
            anyhow!(
                "no API key: set {} or [service].api_key",
                crate::config::API_KEY_ENV
            )
        })?;
        Self::new(
            url,
            &api_key,
            Duration::from_secs(config.service.timeout_secs),
            config.service.max_retries,
        )
    }

    /// Scale the retry delays (first retry waits `base`).
    pub fn with_backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }

    async fn rpc<B, T>(&self, function: &str, body: &B, retry: Retry) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}/rest/v1/rpc/{}", self.base_url, function);
        let body = serde_json::to_value(body)?;
        self.request(Method::POST, &url, Some(&body), function, retry)
            .await
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        body: Option<&serde_json::Value>,
        name: &str,
        retry: Retry,
    ) -> Result<T> {
        let attempts = match retry {
            Retry::Transient => self.max_retries,
            Retry::Never => 0,
        };
        let mut last_err = None;

        for attempt in 0..=attempts {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s, 8s, ...
                let delay = self.backoff_base * (1u32 << (attempt - 1).min(5));
                warn!(call = name, attempt, ?delay, "retrying backend call");
                tokio::time::sleep(delay).await;
            }

            let mut builder = self
                .client
                .request(method.clone(), url)
                .header("apikey", &self.api_key)
                .bearer_auth(&self.api_key);
            if let Some(body) = body {
                builder = builder.json(body);
            }
            debug!(call = name, "sending backend request");

            match builder.send().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        return response
                            .json::<T>()
                            .await
                            .with_context(|| format!("invalid response from {}", name));
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    // Rate limited or server error: retry if allowed
                    if retry == Retry::Transient
                        && (status.as_u16() == 429 || status.is_server_error())
                    {
                        last_err = Some(anyhow!("{} failed with {}: {}", name, status, body_text));
                        continue;
                    }

                    bail!("{} failed with {}: {}", name, status, body_text);
                }
                Err(e) => {
                    let err = anyhow::Error::new(e).context(format!("{} request failed", name));
                    if retry == Retry::Never {
                        return Err(err);
                    }
                    last_err = Some(err);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow!("{} failed after retries", name)))
    }
}

#[derive(Serialize)]
struct MediaFilterParams<'a> {
    filter_type: &'a str,
    keywords: &'a [String],
    media_ids: &'a [i64],
    limit_count: u32,
    offset_count: u32,
    sort_order: &'a str,
}

#[derive(Serialize)]
struct UnvotedPairParams<'a> {
    user_id: &'a str,
    winner_media_id: Option<i64>,
    winner_position: Option<&'a str>,
}

#[derive(Serialize)]
struct VoteParams<'a> {
    user_id: &'a str,
    media1_id: i64,
    media2_id: i64,
    selected_media_id: i64,
}

#[derive(Serialize)]
struct UserParams<'a> {
    user_id: &'a str,
}

#[derive(Serialize)]
struct LikeParams<'a> {
    user_id: &'a str,
    media_id: i64,
}

#[derive(Serialize)]
struct LimitParams {
    limit_count: u32,
}

/// Set-returning functions answer with an array, scalar ones with an object.
#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LikedId {
    Bare(i64),
    Row { media_id: i64 },
}

fn slot_name(slot: PairSlot) -> &'static str {
    match slot {
        PairSlot::Left => "media1",
        PairSlot::Right => "media2",
    }
}

#[async_trait]
impl QueryService for RestQueryService {
    async fn query_media(&self, query: &MediaQuery) -> Result<Vec<RawMediaRow>> {
        let params = MediaFilterParams {
            filter_type: query.mode.as_str(),
            keywords: &query.keywords,
            media_ids: &query.ids,
            limit_count: query.limit,
            offset_count: query.offset,
            sort_order: query.sort.as_str(),
        };
        let rows: Option<Vec<RawMediaRow>> = self
            .rpc("get_medias_with_filter", &params, Retry::Transient)
            .await?;
        Ok(rows.unwrap_or_default())
    }

    async fn list_keywords(&self) -> Result<Vec<KeywordEntry>> {
        let url = format!("{}/rest/v1/{}", self.base_url, KEYWORDS_SELECT);
        let rows: Vec<RawKeywordRow> = self
            .request(Method::GET, &url, None, "keywords", Retry::Transient)
            .await?;
        Ok(rows.into_iter().map(KeywordEntry::from).collect())
    }

    async fn get_unvoted_pair(
        &self,
        user_id: &str,
        winner: Option<(i64, PairSlot)>,
    ) -> Result<Vec<RawMediaRow>> {
        let params = UnvotedPairParams {
            user_id,
            winner_media_id: winner.map(|(id, _)| id),
            winner_position: winner.map(|(_, slot)| slot_name(slot)),
        };
        let rows: Option<Vec<RawMediaRow>> = self
            .rpc("get_unvoted_media_pair", &params, Retry::Transient)
            .await?;
        Ok(rows.unwrap_or_default())
    }

    async fn submit_vote(
        &self,
        user_id: &str,
        left_id: i64,
        right_id: i64,
        selected_id: i64,
    ) -> Result<VoteRecord> {
        let params = VoteParams {
            user_id,
            media1_id: left_id,
            media2_id: right_id,
            selected_media_id: selected_id,
        };
        let reply: OneOrMany<VoteRecord> = self.rpc("submit_vote", &params, Retry::Never).await?;
        match reply {
            OneOrMany::One(record) => Ok(record),
            OneOrMany::Many(records) => records
                .into_iter()
                .next()
                .ok_or_else(|| anyhow!("submit_vote returned no record")),
        }
    }

    async fn list_votes(&self, user_id: &str) -> Result<Vec<VoteRecord>> {
        let votes: Option<Vec<VoteRecord>> = self
            .rpc("get_user_votes", &UserParams { user_id }, Retry::Transient)
            .await?;
        Ok(votes.unwrap_or_default())
    }

    async fn top_rated(&self, limit: u32) -> Result<Vec<RatedMedia>> {
        let ranked: Option<Vec<RatedMedia>> = self
            .rpc(
                "get_top_rated_medias",
                &LimitParams { limit_count: limit },
                Retry::Transient,
            )
            .await?;
        Ok(ranked.unwrap_or_default())
    }

    async fn add_like(&self, user_id: &str, media_id: i64) -> Result<bool> {
        self.rpc("add_like", &LikeParams { user_id, media_id }, Retry::Never)
            .await
    }

    async fn remove_like(&self, user_id: &str, media_id: i64) -> Result<bool> {
        self.rpc("remove_like", &LikeParams { user_id, media_id }, Retry::Never)
            .await
    }

    async fn list_liked_ids(&self, user_id: &str) -> Result<Vec<i64>> {
        let ids: Option<Vec<LikedId>> = self
            .rpc("get_liked_media_ids", &UserParams { user_id }, Retry::Transient)
            .await?;
        Ok(ids
            .unwrap_or_default()
            .into_iter()
            .map(|id| match id {
                LikedId::Bare(id) => id,
                LikedId::Row { media_id } => media_id,
            })
            .collect())
    }
}
