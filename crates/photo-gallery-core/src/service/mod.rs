//! Query-service abstraction for Photo Gallery.
//!
//! The [`QueryService`] trait is the fixed call contract of the hosted
//! backend's stored procedures. The core never talks to the network
//! itself: the app crate provides an HTTP implementation, and
//! [`memory::InMemoryQueryService`] backs tests and offline use.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

use crate::filter::{FilterMode, SortDirection};
use crate::models::{KeywordEntry, PairSlot, RatedMedia, RawMediaRow, VoteRecord};

/// One media-listing call, as produced by [`crate::query::build_query`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MediaQuery {
    pub mode: FilterMode,
    pub keywords: Vec<String>,
    pub ids: Vec<i64>,
    pub limit: u32,
    pub offset: u32,
    pub sort: SortDirection,
}

/// Abstract backend for Photo Gallery.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`query_media`](QueryService::query_media) | One page of media for a resolved filter |
/// | [`list_keywords`](QueryService::list_keywords) | Keyword catalog with groups |
/// | [`get_unvoted_pair`](QueryService::get_unvoted_pair) | Next pair the user has not compared |
/// | [`submit_vote`](QueryService::submit_vote) | Record a pairwise vote |
/// | [`list_votes`](QueryService::list_votes) | The user's durable vote log |
/// | [`top_rated`](QueryService::top_rated) | Community ranking by votes won |
/// | [`add_like`](QueryService::add_like) / [`remove_like`](QueryService::remove_like) | Toggle a like |
/// | [`list_liked_ids`](QueryService::list_liked_ids) | Ids the user liked |
#[async_trait]
pub trait QueryService: Send + Sync {
    /// Fetch one page of media rows. An empty page is not an error.
    async fn query_media(&self, query: &MediaQuery) -> Result<Vec<RawMediaRow>>;

    /// List every keyword with its display group.
    async fn list_keywords(&self) -> Result<Vec<KeywordEntry>>;

    /// Request a pair of media the user has not compared yet.
    ///
    /// With `winner`, the pair must contain that media id; the service is
    /// told which slot it occupied. A full pair has exactly two rows; an
    /// empty result means no unseen pair exists.
    async fn get_unvoted_pair(
        &self,
        user_id: &str,
        winner: Option<(i64, PairSlot)>,
    ) -> Result<Vec<RawMediaRow>>;

    /// Record that `user_id` preferred `selected_id` out of the pair.
    async fn submit_vote(
        &self,
        user_id: &str,
        left_id: i64,
        right_id: i64,
        selected_id: i64,
    ) -> Result<VoteRecord>;

    /// The user's vote log, oldest first.
    async fn list_votes(&self, user_id: &str) -> Result<Vec<VoteRecord>>;

    /// Media ranked by votes won across all users, best first.
    async fn top_rated(&self, limit: u32) -> Result<Vec<RatedMedia>>;

    /// Like a media item. Returns `false` if nothing changed.
    async fn add_like(&self, user_id: &str, media_id: i64) -> Result<bool>;

    /// Remove a like. Returns `false` if the item was not liked.
    async fn remove_like(&self, user_id: &str, media_id: i64) -> Result<bool>;

    async fn list_liked_ids(&self, user_id: &str) -> Result<Vec<i64>>;
}
