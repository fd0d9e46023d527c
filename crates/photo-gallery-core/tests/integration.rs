use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use tokio::sync::Notify;

use photo_gallery_core::filter::{FilterSpec, KeywordMode, SortOrder};
use photo_gallery_core::likes::LikeSet;
use photo_gallery_core::loader::{GalleryLoader, LoadStatus};
use photo_gallery_core::models::{KeywordEntry, PairSlot, RatedMedia, RawMediaRow, VoteRecord};
use photo_gallery_core::service::memory::InMemoryQueryService;
use photo_gallery_core::service::{MediaQuery, QueryService};
use photo_gallery_core::session::{IdentityProvider, UserSession};
use photo_gallery_core::voting::{community_favorite, VotingSession, VotingState};
use photo_gallery_core::GalleryError;

fn row(id: i64, date: &str, keywords: &[&str]) -> RawMediaRow {
    let mut row = RawMediaRow::new(id, &format!("IMG_{id:04}"), ".jpg");
    row.capture_date = Some(date.to_string());
    row.keyword_list = Some(keywords.iter().map(|k| k.to_string()).collect());
    row
}

fn catalog(count: i64) -> InMemoryQueryService {
    let rows = (1..=count)
        .map(|id| row(id, &format!("2024-01-{id:02}T10:00:00Z"), &["lake"]))
        .collect();
    InMemoryQueryService::with_catalog(rows, Vec::new())
}

/// Wraps the in-memory service with knobs for ordering, gating and failures.
struct Scripted {
    inner: InMemoryQueryService,
    /// Media queries containing this keyword wait for `gate`.
    gated_keyword: Option<String>,
    gate: Notify,
    reverse_pairs: bool,
    fail_votes: AtomicBool,
    fail_pairs: AtomicBool,
}

impl Scripted {
    fn new(inner: InMemoryQueryService) -> Self {
        Self {
            inner,
            gated_keyword: None,
            gate: Notify::new(),
            reverse_pairs: false,
            fail_votes: AtomicBool::new(false),
            fail_pairs: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl QueryService for Scripted {
    async fn query_media(&self, query: &MediaQuery) -> Result<Vec<RawMediaRow>> {
        if let Some(kw) = &self.gated_keyword {
            if query.keywords.contains(kw) {
                self.gate.notified().await;
            }
        }
        self.inner.query_media(query).await
    }

    async fn list_keywords(&self) -> Result<Vec<KeywordEntry>> {
        self.inner.list_keywords().await
    }

    async fn get_unvoted_pair(
        &self,
        user_id: &str,
        winner: Option<(i64, PairSlot)>,
    ) -> Result<Vec<RawMediaRow>> {
        if self.fail_pairs.load(Ordering::SeqCst) {
            bail!("pair lookup timed out");
        }
        let mut rows = self.inner.get_unvoted_pair(user_id, winner).await?;
        if self.reverse_pairs {
            rows.reverse();
        }
        Ok(rows)
    }

    async fn submit_vote(&self, user_id: &str, left: i64, right: i64, selected: i64) -> Result<VoteRecord> {
        if self.fail_votes.load(Ordering::SeqCst) {
            bail!("503 Service Unavailable");
        }
        self.inner.submit_vote(user_id, left, right, selected).await
    }

    async fn list_votes(&self, user_id: &str) -> Result<Vec<VoteRecord>> {
        self.inner.list_votes(user_id).await
    }

    async fn top_rated(&self, limit: u32) -> Result<Vec<RatedMedia>> {
        self.inner.top_rated(limit).await
    }

    async fn add_like(&self, user_id: &str, media_id: i64) -> Result<bool> {
        self.inner.add_like(user_id, media_id).await
    }

    async fn remove_like(&self, user_id: &str, media_id: i64) -> Result<bool> {
        self.inner.remove_like(user_id, media_id).await
    }

    async fn list_liked_ids(&self, user_id: &str) -> Result<Vec<i64>> {
        self.inner.list_liked_ids(user_id).await
    }
}

fn signed_in(user: &str) -> Arc<UserSession> {
    Arc::new(UserSession::new(Some(user.to_string())))
}

fn ids(pair_state: &VotingState) -> Option<(i64, i64)> {
    match pair_state {
        VotingState::HasPair(pair) => Some(pair.ids()),
        _ => None,
    }
}

// ============ Gallery loader ============

async fn drain<S: QueryService + ?Sized>(loader: &GalleryLoader<S>) -> usize {
    let mut calls = 0;
    while loader.load_more().await.unwrap() != LoadStatus::Idle {
        calls += 1;
    }
    calls
}

#[tokio::test]
async fn test_pagination_accumulates_all_items() {
    let loader = GalleryLoader::new(Arc::new(catalog(5)), 2);
    loader.set_filter(FilterSpec::new()).await.unwrap();
    let extra = drain(&loader).await;

    let snap = loader.snapshot();
    assert_eq!(extra, 2, "pages of 2, 2, 1");
    assert_eq!(snap.items.len(), 5);
    assert!(!snap.has_more);
    let ids: Vec<i64> = snap.items.iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![5, 4, 3, 2, 1], "newest first");
}

#[tokio::test]
async fn test_pagination_ends_on_empty_page() {
    let loader = GalleryLoader::new(Arc::new(catalog(4)), 2);
    loader
        .set_filter(FilterSpec::new().with_sort(SortOrder::Oldest))
        .await
        .unwrap();
    let extra = drain(&loader).await;

    let snap = loader.snapshot();
    assert_eq!(extra, 2, "pages of 2, 2, 0");
    assert_eq!(snap.items.len(), 4);
    assert!(!snap.has_more);
    assert_eq!(snap.items[0].id, 1);
}

#[tokio::test]
async fn test_same_filter_does_not_refetch() {
    let loader = GalleryLoader::new(Arc::new(catalog(3)), 10);
    let spec = FilterSpec::new().with_keywords(["lake"]);
    loader.set_filter(spec.clone()).await.unwrap();
    assert_eq!(loader.set_filter(spec).await.unwrap(), LoadStatus::Idle);
    assert_eq!(loader.snapshot().epoch, 1);
}

#[tokio::test]
async fn test_late_page_from_old_filter_is_discarded() {
    let inner = InMemoryQueryService::with_catalog(
        vec![
            row(1, "2024-01-01T00:00:00Z", &["slow"]),
            row(2, "2024-01-02T00:00:00Z", &["slow"]),
            row(3, "2024-01-03T00:00:00Z", &["fast"]),
        ],
        Vec::new(),
    );
    let mut scripted = Scripted::new(inner);
    scripted.gated_keyword = Some("slow".to_string());
    let service = Arc::new(scripted);
    let loader = GalleryLoader::new(Arc::clone(&service), 10);

    let (a, b) = tokio::join!(
        loader.set_filter(FilterSpec::new().with_keywords(["slow"])),
        async {
            while !loader.with_state(|s| s.is_loading()) {
                tokio::task::yield_now().await;
            }
            let status = loader
                .set_filter(FilterSpec::new().with_keywords(["fast"]))
                .await;
            service.gate.notify_one();
            status
        }
    );

    assert_eq!(a.unwrap(), LoadStatus::Stale);
    assert_eq!(
        b.unwrap(),
        LoadStatus::Appended {
            count: 1,
            has_more: false
        }
    );
    let snap = loader.snapshot();
    let ids: Vec<i64> = snap.items.iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![3]);
    assert_eq!(snap.epoch, 2);
    assert!(!snap.loading);
}

#[tokio::test]
async fn test_keyword_and_mode_through_loader() {
    let service = InMemoryQueryService::with_catalog(
        vec![
            row(1, "2024-01-01T00:00:00Z", &["sunset", "alps"]),
            row(2, "2024-01-02T00:00:00Z", &["sunset"]),
            row(3, "2024-01-03T00:00:00Z", &["alps"]),
        ],
        Vec::new(),
    );
    let loader = GalleryLoader::new(Arc::new(service), 10);
    loader
        .set_filter(
            FilterSpec::new()
                .with_keywords(["sunset", "alps"])
                .with_keyword_mode(KeywordMode::And),
        )
        .await
        .unwrap();
    let ids: Vec<i64> = loader.snapshot().items.iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![1]);

    loader
        .set_filter(FilterSpec::new().with_keywords(["sunset", "alps"]))
        .await
        .unwrap();
    assert_eq!(loader.snapshot().items.len(), 3);
}

// ============ Likes ============

#[tokio::test]
async fn test_like_toggle_round_trip() {
    let service = Arc::new(catalog(3));
    let mut likes = LikeSet::new(Arc::clone(&service), signed_in("alice"));
    likes.refresh().await.unwrap();
    let before = service.list_liked_ids("alice").await.unwrap();

    assert!(likes.add(2).await.unwrap());
    assert!(likes.is_liked(2));
    assert!(likes.remove(2).await.unwrap());

    assert_eq!(service.list_liked_ids("alice").await.unwrap(), before);
    assert!(!likes.remove(3).await.unwrap(), "removing a non-liked id is a no-op");
    assert!(likes.toggle(1).await.unwrap());
    assert_eq!(likes.ids(), vec![1]);
}

#[tokio::test]
async fn test_likes_require_identity() {
    let service = Arc::new(catalog(1));
    let mut likes = LikeSet::new(service, Arc::new(UserSession::anonymous()));
    assert_eq!(likes.add(1).await.unwrap_err(), GalleryError::AuthRequired);
    assert_eq!(likes.refresh().await.unwrap_err(), GalleryError::AuthRequired);
}

#[tokio::test]
async fn test_likes_follow_identity_changes() {
    let service = Arc::new(catalog(3));
    service.add_like("bob", 3).await.unwrap();
    let session = Arc::new(UserSession::new(Some("alice".to_string())));
    let mut likes = LikeSet::new(Arc::clone(&service), session.clone() as Arc<dyn IdentityProvider>);
    likes.add(1).await.unwrap();

    session.sign_in("bob");
    assert!(likes.sync_identity().await.unwrap());
    assert_eq!(likes.ids(), vec![3]);

    session.sign_out();
    assert!(likes.sync_identity().await.unwrap());
    assert!(likes.ids().is_empty());
    assert_eq!(likes.user_id(), None);
}

// ============ Voting ============

#[tokio::test]
async fn test_initialize_requires_user() {
    let mut voting = VotingSession::new(Arc::new(catalog(2)), Arc::new(UserSession::anonymous()));
    assert_eq!(
        voting.initialize(None).await.unwrap_err(),
        GalleryError::AuthRequired
    );
    assert_eq!(voting.state(), &VotingState::Uninitialized);
    assert_eq!(voting.vote(1).await.unwrap_err(), GalleryError::AuthRequired);
}

#[tokio::test]
async fn test_winner_keeps_left_slot() {
    let mut scripted = Scripted::new(catalog(3));
    scripted.reverse_pairs = true;
    let mut voting = VotingSession::new(Arc::new(scripted), signed_in("alice"));
    voting.initialize(Some("alice")).await.unwrap();

    // Service hands back (2, 1) reversed from its natural order.
    assert_eq!(ids(voting.state()), Some((2, 1)));
    voting.vote(2).await.unwrap();

    // Replacement is [2, 3] from the store, reversed to [3, 2] on the wire.
    assert_eq!(ids(voting.state()), Some((2, 3)));
}

#[tokio::test]
async fn test_winner_keeps_right_slot() {
    let mut voting = VotingSession::new(Arc::new(catalog(3)), signed_in("alice"));
    voting.initialize(Some("alice")).await.unwrap();
    assert_eq!(ids(voting.state()), Some((1, 2)));

    let record = voting.vote(2).await.unwrap();
    assert_eq!((record.media_a, record.media_b, record.selected), (1, 2, 2));
    assert_eq!(ids(voting.state()), Some((3, 2)));
}

#[tokio::test]
async fn test_two_items_exhaust_after_one_vote() {
    let service = Arc::new(catalog(2));
    let mut voting = VotingSession::new(Arc::clone(&service), signed_in("alice"));
    voting.initialize(Some("alice")).await.unwrap();
    voting.vote(1).await.unwrap();

    assert!(voting.is_exhausted());
    voting.refresh().await.unwrap();
    assert!(voting.is_exhausted());
    assert_eq!(voting.vote(1).await.unwrap_err(), GalleryError::NoActivePair);

    voting.initialize(Some("alice")).await.unwrap();
    assert!(voting.is_exhausted());
    assert_eq!(voting.history().len(), 1, "durable log reloaded");
}

#[tokio::test]
async fn test_invalid_selection_is_rejected() {
    let mut voting = VotingSession::new(Arc::new(catalog(3)), signed_in("alice"));
    voting.initialize(Some("alice")).await.unwrap();
    assert_eq!(
        voting.vote(99).await.unwrap_err(),
        GalleryError::InvalidSelection { selected: 99 }
    );
    assert_eq!(ids(voting.state()), Some((1, 2)));
}

#[tokio::test]
async fn test_failed_vote_keeps_pair() {
    let service = Arc::new(Scripted::new(catalog(3)));
    let mut voting = VotingSession::new(Arc::clone(&service), signed_in("alice"));
    voting.initialize(Some("alice")).await.unwrap();

    service.fail_votes.store(true, Ordering::SeqCst);
    let err = voting.vote(1).await.unwrap_err();
    assert!(matches!(err, GalleryError::QueryFailure(ref m) if m.contains("503")));
    assert_eq!(ids(voting.state()), Some((1, 2)));
    assert!(voting.history().is_empty());

    service.fail_votes.store(false, Ordering::SeqCst);
    voting.vote(1).await.unwrap();
    assert_eq!(voting.history().len(), 1);
}

#[tokio::test]
async fn test_failed_replacement_recovers_with_refresh() {
    let service = Arc::new(Scripted::new(catalog(3)));
    let mut voting = VotingSession::new(Arc::clone(&service), signed_in("alice"));
    voting.initialize(Some("alice")).await.unwrap();

    service.fail_pairs.store(true, Ordering::SeqCst);
    assert!(matches!(
        voting.vote(1).await.unwrap_err(),
        GalleryError::QueryFailure(_)
    ));
    assert_eq!(voting.state(), &VotingState::Loading);
    assert_eq!(voting.history().len(), 1);

    service.fail_pairs.store(false, Ordering::SeqCst);
    voting.refresh().await.unwrap();
    assert_eq!(ids(voting.state()), Some((1, 3)));
}

#[tokio::test]
async fn test_identity_switch_reinitializes() {
    let service = Arc::new(catalog(3));
    let session = Arc::new(UserSession::new(Some("alice".to_string())));
    let mut voting = VotingSession::new(Arc::clone(&service), session.clone() as Arc<dyn IdentityProvider>);
    assert!(voting.sync_identity().await.unwrap());
    voting.vote(2).await.unwrap();
    assert_eq!(voting.favorite_media_id(), Some(2));

    session.sign_in("bob");
    assert!(voting.sync_identity().await.unwrap());
    assert_eq!(voting.user_id(), Some("bob"));
    assert!(voting.history().is_empty());
    assert_eq!(ids(voting.state()), Some((1, 2)));

    session.sign_out();
    assert!(voting.sync_identity().await.unwrap());
    assert_eq!(voting.state(), &VotingState::Uninitialized);
    assert!(!voting.sync_identity().await.unwrap());
}

#[tokio::test]
async fn test_identity_notification_drives_resync() {
    let service = Arc::new(catalog(3));
    service.add_like("bob", 3).await.unwrap();
    let session = Arc::new(UserSession::new(Some("alice".to_string())));
    let identity = session.clone() as Arc<dyn IdentityProvider>;
    let mut voting = VotingSession::new(Arc::clone(&service), Arc::clone(&identity));
    let mut likes = LikeSet::new(Arc::clone(&service), identity);
    voting.initialize(Some("alice")).await.unwrap();
    voting.vote(1).await.unwrap();

    let changed = Arc::new(Notify::new());
    let flag = Arc::clone(&changed);
    let sub = session.subscribe(move |_| flag.notify_one());

    session.sign_in("bob");
    changed.notified().await;
    assert!(voting.sync_identity().await.unwrap());
    assert!(likes.sync_identity().await.unwrap());
    assert_eq!(voting.user_id(), Some("bob"));
    assert!(voting.history().is_empty());
    assert_eq!(ids(voting.state()), Some((1, 2)));
    assert_eq!(likes.ids(), vec![3]);

    session.sign_out();
    changed.notified().await;
    assert!(voting.sync_identity().await.unwrap());
    assert!(likes.sync_identity().await.unwrap());
    assert_eq!(voting.state(), &VotingState::Uninitialized);
    assert!(likes.ids().is_empty());

    assert!(session.unsubscribe(sub));
}

#[tokio::test]
async fn test_favorites() {
    let service = Arc::new(catalog(4));
    let mut voting = VotingSession::new(Arc::clone(&service), signed_in("alice"));
    voting.initialize(Some("alice")).await.unwrap();
    assert_eq!(voting.favorite_media_id(), None);
    assert_eq!(community_favorite(service.as_ref()).await.unwrap(), None);

    // (1,2): 1 wins, then (1,3): 3 wins.
    voting.vote(1).await.unwrap();
    voting.vote(3).await.unwrap();
    assert_eq!(voting.favorite_media_id(), Some(3), "tie goes to the higher id");

    let best = community_favorite(service.as_ref()).await.unwrap().unwrap();
    assert_eq!(best.id, 1, "ranking ties go to the lower id");
}
