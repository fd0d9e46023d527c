//! In-memory [`QueryService`] implementation for testing and offline use.
//!
//! Uses `BTreeMap`/`BTreeSet`/`Vec` behind `std::sync::RwLock` for thread
//! safety. Ordering follows capture date then id; `Random` sorting hashes
//! each id with a per-call seed, so every call is independently shuffled.
//! Like counts are derived from the like table on top of the catalog's
//! baseline counts.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::Utc;
use sha2::{Digest, Sha256};

use crate::filter::{FilterMode, SortDirection};
use crate::models::{KeywordEntry, PairSlot, RatedMedia, RawMediaRow, VoteRecord};

use super::{MediaQuery, QueryService};

/// Keyword that flags media for the background slideshow.
pub const BACKGROUND_KEYWORD: &str = "background";

/// In-memory query service for tests and the offline backend.
pub struct InMemoryQueryService {
    media: RwLock<BTreeMap<i64, RawMediaRow>>,
    keywords: RwLock<Vec<KeywordEntry>>,
    likes: RwLock<BTreeSet<(String, i64)>>,
    votes: RwLock<Vec<VoteRecord>>,
    shuffle_seed: AtomicU64,
}

impl InMemoryQueryService {
    pub fn new() -> Self {
        Self {
            media: RwLock::new(BTreeMap::new()),
            keywords: RwLock::new(Vec::new()),
            likes: RwLock::new(BTreeSet::new()),
            votes: RwLock::new(Vec::new()),
            shuffle_seed: AtomicU64::new(0),
        }
    }

    /// Service pre-loaded with a media catalog and keyword list.
    pub fn with_catalog(rows: Vec<RawMediaRow>, keywords: Vec<KeywordEntry>) -> Self {
        let service = Self::new();
        for row in rows {
            service.insert_media(row);
        }
        *service.keywords.write().unwrap_or_else(PoisonError::into_inner) = keywords;
        service
    }

    /// Insert or replace a media row.
    pub fn insert_media(&self, row: RawMediaRow) {
        self.media
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(row.media_id, row);
    }

    pub fn media_count(&self) -> usize {
        self.media.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn like_counts(&self) -> HashMap<i64, i64> {
        let likes = self.likes.read().unwrap_or_else(PoisonError::into_inner);
        let mut counts = HashMap::new();
        for (_, media_id) in likes.iter() {
            *counts.entry(*media_id).or_insert(0) += 1;
        }
        counts
    }

    fn voted_combinations(&self, user_id: &str) -> HashSet<(i64, i64)> {
        let votes = self.votes.read().unwrap_or_else(PoisonError::into_inner);
        votes
            .iter()
            .filter(|v| v.user_id == user_id)
            .map(|v| combination(v.media_a, v.media_b))
            .collect()
    }
}

impl Default for InMemoryQueryService {
    fn default() -> Self {
        Self::new()
    }
}

fn combination(a: i64, b: i64) -> (i64, i64) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

fn row_matches(query: &MediaQuery, row: &RawMediaRow) -> bool {
    let has = |keyword: &str| {
        row.keyword_list
            .as_ref()
            .is_some_and(|kws| kws.iter().any(|k| k == keyword))
    };
    match query.mode {
        FilterMode::ById => query.ids.contains(&row.media_id),
        FilterMode::KeywordsAnd => query.keywords.iter().all(|k| has(k)),
        FilterMode::KeywordsOr => query.keywords.iter().any(|k| has(k)),
        FilterMode::All => true,
        FilterMode::Background => has(BACKGROUND_KEYWORD),
    }
}

fn shuffle_key(seed: u64, media_id: i64) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(seed.to_le_bytes());
    hasher.update(media_id.to_le_bytes());
    let digest = hasher.finalize();
    let mut key = [0u8; 32];
    key.copy_from_slice(&digest);
    key
}

#[async_trait]
impl QueryService for InMemoryQueryService {
    async fn query_media(&self, query: &MediaQuery) -> Result<Vec<RawMediaRow>> {
        let likes = self.like_counts();
        let media = self.media.read().unwrap_or_else(PoisonError::into_inner);
        let mut rows: Vec<&RawMediaRow> = media.values().filter(|r| row_matches(query, r)).collect();

        match query.sort {
            SortDirection::Ascending => rows.sort_by(|a, b| {
                (&a.capture_date, a.media_id).cmp(&(&b.capture_date, b.media_id))
            }),
            SortDirection::Descending => rows.sort_by(|a, b| {
                (&b.capture_date, b.media_id).cmp(&(&a.capture_date, a.media_id))
            }),
            SortDirection::Random => {
                let seed = self.shuffle_seed.fetch_add(1, Ordering::Relaxed);
                rows.sort_by_cached_key(|r| shuffle_key(seed, r.media_id));
            }
        }

        Ok(rows
            .into_iter()
            .skip(query.offset as usize)
            .take(query.limit as usize)
            .map(|r| {
                let mut row = r.clone();
                let liked = likes.get(&r.media_id).copied().unwrap_or(0);
                if liked > 0 || row.like_count.is_some() {
                    row.like_count = Some(row.like_count.unwrap_or(0) + liked);
                }
                row
            })
            .collect())
    }

    async fn list_keywords(&self) -> Result<Vec<KeywordEntry>> {
        Ok(self
            .keywords
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    async fn get_unvoted_pair(
        &self,
        user_id: &str,
        winner: Option<(i64, PairSlot)>,
    ) -> Result<Vec<RawMediaRow>> {
        let voted = self.voted_combinations(user_id);
        let media = self.media.read().unwrap_or_else(PoisonError::into_inner);
        let ids: Vec<i64> = media.keys().copied().collect();

        let pair = match winner {
            Some((winner_id, _)) => {
                if !media.contains_key(&winner_id) {
                    return Ok(Vec::new());
                }
                ids.iter()
                    .copied()
                    .find(|&c| c != winner_id && !voted.contains(&combination(winner_id, c)))
                    .map(|c| combination(winner_id, c))
            }
            None => ids.iter().enumerate().find_map(|(i, &a)| {
                ids[i + 1..]
                    .iter()
                    .find(|&&b| !voted.contains(&(a, b)))
                    .map(|&b| (a, b))
            }),
        };

        Ok(match pair {
            Some((a, b)) => vec![media[&a].clone(), media[&b].clone()],
            None => Vec::new(),
        })
    }

    async fn submit_vote(
        &self,
        user_id: &str,
        left_id: i64,
        right_id: i64,
        selected_id: i64,
    ) -> Result<VoteRecord> {
        if left_id == right_id {
            bail!("a vote needs two distinct media, got {} twice", left_id);
        }
        if selected_id != left_id && selected_id != right_id {
            bail!(
                "selected media {} is not one of {} and {}",
                selected_id,
                left_id,
                right_id
            );
        }
        {
            let media = self.media.read().unwrap_or_else(PoisonError::into_inner);
            for id in [left_id, right_id] {
                if !media.contains_key(&id) {
                    bail!("media not found: {}", id);
                }
            }
        }

        let record = VoteRecord {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            media_a: left_id,
            media_b: right_id,
            selected: selected_id,
            timestamp: Utc::now(),
        };
        self.votes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());
        Ok(record)
    }

    async fn list_votes(&self, user_id: &str) -> Result<Vec<VoteRecord>> {
        let votes = self.votes.read().unwrap_or_else(PoisonError::into_inner);
        Ok(votes.iter().filter(|v| v.user_id == user_id).cloned().collect())
    }

    async fn top_rated(&self, limit: u32) -> Result<Vec<RatedMedia>> {
        let votes = self.votes.read().unwrap_or_else(PoisonError::into_inner);
        let mut tally: BTreeMap<i64, i64> = BTreeMap::new();
        for vote in votes.iter() {
            *tally.entry(vote.selected).or_insert(0) += 1;
        }
        let mut ranked: Vec<RatedMedia> = tally
            .into_iter()
            .map(|(media_id, votes)| RatedMedia { media_id, votes })
            .collect();
        ranked.sort_by(|a, b| b.votes.cmp(&a.votes).then(a.media_id.cmp(&b.media_id)));
        ranked.truncate(limit as usize);
        Ok(ranked)
    }

    async fn add_like(&self, user_id: &str, media_id: i64) -> Result<bool> {
        if !self
            .media
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&media_id)
        {
            bail!("media not found: {}", media_id);
        }
        Ok(self
            .likes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((user_id.to_string(), media_id)))
    }

    async fn remove_like(&self, user_id: &str, media_id: i64) -> Result<bool> {
        Ok(self
            .likes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&(user_id.to_string(), media_id)))
    }

    async fn list_liked_ids(&self, user_id: &str) -> Result<Vec<i64>> {
        let likes = self.likes.read().unwrap_or_else(PoisonError::into_inner);
        Ok(likes
            .iter()
            .filter(|(u, _)| u == user_id)
            .map(|(_, id)| *id)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: i64, date: &str, keywords: &[&str]) -> RawMediaRow {
        let mut r = RawMediaRow::new(id, &format!("IMG_{:04}", id), ".jpg");
        r.capture_date = Some(date.to_string());
        r.keyword_list = Some(keywords.iter().map(|k| k.to_string()).collect());
        r
    }

    fn catalog() -> InMemoryQueryService {
        InMemoryQueryService::with_catalog(
            vec![
                row(1, "2021-01-01", &["lake", "sunset"]),
                row(2, "2022-01-01", &["lake"]),
                row(3, "2023-01-01", &["city", "background"]),
                row(4, "2024-01-01", &["sunset"]),
            ],
            Vec::new(),
        )
    }

    fn query(mode: FilterMode, keywords: &[&str], sort: SortDirection) -> MediaQuery {
        MediaQuery {
            mode,
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            ids: Vec::new(),
            limit: 30,
            offset: 0,
            sort,
        }
    }

    fn ids(rows: &[RawMediaRow]) -> Vec<i64> {
        rows.iter().map(|r| r.media_id).collect()
    }

    #[tokio::test]
    async fn test_keyword_modes() {
        let svc = catalog();
        let and = svc
            .query_media(&query(FilterMode::KeywordsAnd, &["lake", "sunset"], SortDirection::Ascending))
            .await
            .unwrap();
        assert_eq!(ids(&and), vec![1]);

        let or = svc
            .query_media(&query(FilterMode::KeywordsOr, &["lake", "sunset"], SortDirection::Ascending))
            .await
            .unwrap();
        assert_eq!(ids(&or), vec![1, 2, 4]);
    }

    #[tokio::test]
    async fn test_sort_and_window() {
        let svc = catalog();
        let mut q = query(FilterMode::All, &[], SortDirection::Descending);
        q.limit = 2;
        q.offset = 1;
        let page = svc.query_media(&q).await.unwrap();
        assert_eq!(ids(&page), vec![3, 2]);
    }

    #[tokio::test]
    async fn test_background_and_ids() {
        let svc = catalog();
        let bg = svc
            .query_media(&query(FilterMode::Background, &[], SortDirection::Descending))
            .await
            .unwrap();
        assert_eq!(ids(&bg), vec![3]);

        let mut q = query(FilterMode::ById, &[], SortDirection::Ascending);
        q.ids = vec![4, 2, 99];
        assert_eq!(ids(&svc.query_media(&q).await.unwrap()), vec![2, 4]);
    }

    #[tokio::test]
    async fn test_random_returns_every_row() {
        let svc = catalog();
        let mut page = svc
            .query_media(&query(FilterMode::All, &[], SortDirection::Random))
            .await
            .unwrap();
        page.sort_by_key(|r| r.media_id);
        assert_eq!(ids(&page), vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_likes_feed_like_count() {
        let svc = catalog();
        assert!(svc.add_like("u1", 2).await.unwrap());
        assert!(svc.add_like("u2", 2).await.unwrap());
        let mut q = query(FilterMode::ById, &[], SortDirection::Ascending);
        q.ids = vec![2];
        let rows = svc.query_media(&q).await.unwrap();
        assert_eq!(rows[0].like_count, Some(2));
        assert!(svc.add_like("u1", 99).await.is_err());
    }

    #[tokio::test]
    async fn test_unvoted_pairs_exclude_voted_combinations() {
        let svc = InMemoryQueryService::with_catalog(
            vec![row(1, "a", &[]), row(2, "b", &[]), row(3, "c", &[])],
            Vec::new(),
        );
        let first = svc.get_unvoted_pair("u", None).await.unwrap();
        assert_eq!(ids(&first), vec![1, 2]);

        svc.submit_vote("u", 1, 2, 1).await.unwrap();
        let next = svc
            .get_unvoted_pair("u", Some((1, PairSlot::Left)))
            .await
            .unwrap();
        assert_eq!(ids(&next), vec![1, 3]);

        svc.submit_vote("u", 1, 3, 1).await.unwrap();
        let none = svc
            .get_unvoted_pair("u", Some((1, PairSlot::Left)))
            .await
            .unwrap();
        assert!(none.is_empty());

        // Other users are unaffected.
        assert_eq!(ids(&svc.get_unvoted_pair("v", None).await.unwrap()), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_submit_vote_validates_selection() {
        let svc = catalog();
        assert!(svc.submit_vote("u", 1, 2, 3).await.is_err());
        assert!(svc.submit_vote("u", 1, 1, 1).await.is_err());
        assert!(svc.list_votes("u").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_top_rated_orders_by_wins() {
        let svc = catalog();
        svc.submit_vote("u", 1, 2, 2).await.unwrap();
        svc.submit_vote("v", 2, 3, 2).await.unwrap();
        svc.submit_vote("v", 1, 3, 3).await.unwrap();
        let top = svc.top_rated(2).await.unwrap();
        assert_eq!(
            top,
            vec![
                RatedMedia { media_id: 2, votes: 2 },
                RatedMedia { media_id: 3, votes: 1 },
            ]
        );
    }
}
