//! Incremental gallery loader for infinite-scroll views.
//!
//! [`GalleryState`] is the pure pagination state machine; [`GalleryLoader`]
//! drives it against a [`QueryService`]. Every page fetch is issued as a
//! [`PageRequest`] tagged with the filter epoch it was issued under:
//!
//! ```text
//! set_filter(A) ──▶ epoch 1 ──▶ PageRequest{epoch 1, offset 0} ─┐
//! set_filter(B) ──▶ epoch 2 ──▶ PageRequest{epoch 2, offset 0} ─┼─▶ complete()
//!                                                               │
//!         epoch 1 result arrives late ──▶ LoadStatus::Stale ◀───┘
//! ```
//!
//! Results whose epoch no longer matches are dropped silently, so a slow
//! page for an old filter can never leak into the view of a newer one.
//! Within one epoch at most one page is in flight; scroll-triggered
//! `load_more()` calls made while a page is outstanding are no-ops.
//!
//! # Random sort
//!
//! With [`SortOrder::Random`](crate::filter::SortOrder::Random) every page
//! is shuffled independently by the service. Successive pages may overlap
//! and some records may never appear; pagination is only stable for
//! `Newest` and `Oldest`.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::error::GalleryError;
use crate::filter::FilterSpec;
use crate::models::MediaRecord;
use crate::query::fetch_media;
use crate::service::QueryService;

/// Page size used when a view does not choose one.
pub const DEFAULT_PAGE_SIZE: u32 = 30;

/// One page fetch, tagged with the epoch it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub epoch: u64,
    /// Bound filter with the page window (`limit`, `offset`) filled in.
    pub spec: FilterSpec,
}

/// Outcome of a load attempt that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    /// Nothing was fetched: unchanged filter, end of results, no filter
    /// bound yet, or a page already in flight.
    Idle,
    /// A page was appended.
    Appended { count: usize, has_more: bool },
    /// The page belonged to an older epoch and was discarded.
    Stale,
}

/// Pagination state of one gallery view.
#[derive(Debug, Clone)]
pub struct GalleryState {
    page_size: u32,
    filter: Option<FilterSpec>,
    items: Vec<MediaRecord>,
    offset: u32,
    has_more: bool,
    epoch: u64,
    in_flight: bool,
    last_error: Option<GalleryError>,
}

impl GalleryState {
    /// New state with a fixed page size (`0` falls back to [`DEFAULT_PAGE_SIZE`]).
    pub fn new(page_size: u32) -> Self {
        Self {
            page_size: if page_size == 0 {
                DEFAULT_PAGE_SIZE
            } else {
                page_size
            },
            filter: None,
            items: Vec::new(),
            offset: 0,
            has_more: true,
            epoch: 0,
            in_flight: false,
            last_error: None,
        }
    }

    /// Bind a filter. If it differs from the bound one, reset the state,
    /// start a new epoch, and return the first page request.
    ///
    /// The filter's own `limit`/`offset` are replaced by the view's window.
    pub fn set_filter(&mut self, spec: FilterSpec) -> Option<PageRequest> {
        if self.filter.as_ref() == Some(&spec) {
            return None;
        }
        self.filter = Some(spec);
        self.items.clear();
        self.offset = 0;
        self.has_more = true;
        self.in_flight = false;
        self.last_error = None;
        self.epoch += 1;
        debug!(epoch = self.epoch, "gallery filter changed");
        self.issue()
    }

    /// Request the next page, unless results are exhausted or a page is
    /// already in flight for this epoch.
    pub fn load_more(&mut self) -> Option<PageRequest> {
        if !self.has_more || self.in_flight {
            return None;
        }
        self.issue()
    }

    fn issue(&mut self) -> Option<PageRequest> {
        let spec = self
            .filter
            .clone()?
            .with_window(self.page_size, self.offset);
        self.in_flight = true;
        Some(PageRequest {
            epoch: self.epoch,
            spec,
        })
    }

    /// Apply the result of `request`.
    ///
    /// Stale results (older epoch, or not the outstanding page) change
    /// nothing. A failure is recorded and returned; accumulated items and
    /// `has_more` stay as they were, and the next `load_more()` retries.
    pub fn complete(
        &mut self,
        request: &PageRequest,
        result: Result<Vec<MediaRecord>, GalleryError>,
    ) -> Result<LoadStatus, GalleryError> {
        if request.epoch != self.epoch
            || !self.in_flight
            || request.spec.offset != Some(self.offset)
        {
            debug!(
                request_epoch = request.epoch,
                current_epoch = self.epoch,
                "discarding stale gallery page"
            );
            return Ok(LoadStatus::Stale);
        }
        self.in_flight = false;

        match result {
            Ok(records) => {
                let count = records.len();
                self.has_more = count == self.page_size as usize;
                self.items.extend(records);
                self.offset += self.page_size;
                self.last_error = None;
                Ok(LoadStatus::Appended {
                    count,
                    has_more: self.has_more,
                })
            }
            Err(err) => {
                self.last_error = Some(err.clone());
                Err(err)
            }
        }
    }

    pub fn items(&self) -> &[MediaRecord] {
        &self.items
    }

    pub fn filter(&self) -> Option<&FilterSpec> {
        self.filter.as_ref()
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn offset(&self) -> u32 {
        self.offset
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn last_error(&self) -> Option<&GalleryError> {
        self.last_error.as_ref()
    }
}

/// Point-in-time copy of a view's state, for rendering.
#[derive(Debug, Clone)]
pub struct GallerySnapshot {
    pub items: Vec<MediaRecord>,
    pub has_more: bool,
    pub loading: bool,
    pub error: Option<GalleryError>,
    pub epoch: u64,
}

/// Async driver of a [`GalleryState`] bound to one view.
///
/// Methods take `&self` so scroll handlers and filter changes may overlap;
/// the state lock is never held across a service call.
pub struct GalleryLoader<S: ?Sized> {
    service: Arc<S>,
    state: Mutex<GalleryState>,
}

impl<S: QueryService + ?Sized> GalleryLoader<S> {
    pub fn new(service: Arc<S>, page_size: u32) -> Self {
        Self {
            service,
            state: Mutex::new(GalleryState::new(page_size)),
        }
    }

    fn state(&self) -> MutexGuard<'_, GalleryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Bind a filter and fetch its first page if it changed.
    pub async fn set_filter(&self, spec: FilterSpec) -> Result<LoadStatus, GalleryError> {
        let request = self.state().set_filter(spec);
        match request {
            Some(request) => self.run(request).await,
            None => Ok(LoadStatus::Idle),
        }
    }

    /// Fetch the next page if there is one and none is in flight.
    pub async fn load_more(&self) -> Result<LoadStatus, GalleryError> {
        let request = self.state().load_more();
        match request {
            Some(request) => self.run(request).await,
            None => Ok(LoadStatus::Idle),
        }
    }

    async fn run(&self, request: PageRequest) -> Result<LoadStatus, GalleryError> {
        let result = fetch_media(self.service.as_ref(), &request.spec).await;
        self.state().complete(&request, result)
    }

    pub fn snapshot(&self) -> GallerySnapshot {
        let state = self.state();
        GallerySnapshot {
            items: state.items.clone(),
            has_more: state.has_more,
            loading: state.in_flight,
            error: state.last_error.clone(),
            epoch: state.epoch,
        }
    }

    /// Run `f` against the current state without cloning items.
    pub fn with_state<R>(&self, f: impl FnOnce(&GalleryState) -> R) -> R {
        f(&self.state())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawMediaRow;

    fn records(ids: std::ops::Range<i64>) -> Vec<MediaRecord> {
        ids.map(|id| MediaRecord::from(RawMediaRow::new(id, "f", ".jpg")))
            .collect()
    }

    fn keyword(k: &str) -> FilterSpec {
        FilterSpec::new().with_keywords([k])
    }

    #[test]
    fn test_set_filter_issues_first_page() {
        let mut state = GalleryState::new(20);
        let req = state.set_filter(keyword("lake")).unwrap();
        assert_eq!(req.epoch, 1);
        assert_eq!(req.spec.limit, Some(20));
        assert_eq!(req.spec.offset, Some(0));
        assert!(state.is_loading());
    }

    #[test]
    fn test_same_filter_is_noop() {
        let mut state = GalleryState::new(20);
        state.set_filter(keyword("lake")).unwrap();
        assert!(state.set_filter(keyword("lake")).is_none());
        assert_eq!(state.epoch(), 1);
    }

    #[test]
    fn test_load_more_blocked_while_in_flight() {
        let mut state = GalleryState::new(2);
        let req = state.set_filter(keyword("lake")).unwrap();
        assert!(state.load_more().is_none());
        state.complete(&req, Ok(records(0..2))).unwrap();
        let next = state.load_more().unwrap();
        assert_eq!(next.spec.offset, Some(2));
    }

    #[test]
    fn test_load_more_without_filter_is_noop() {
        let mut state = GalleryState::new(2);
        assert!(state.load_more().is_none());
        assert!(!state.is_loading());
    }

    #[test]
    fn test_pagination_terminates_on_short_page() {
        // 5 items, page size 2: pages of 2, 2, 1.
        let mut state = GalleryState::new(2);
        let mut req = state.set_filter(keyword("lake"));
        let mut served = 0i64;
        while let Some(r) = req {
            let end = (served + 2).min(5);
            state.complete(&r, Ok(records(served..end))).unwrap();
            served = end;
            req = state.load_more();
        }
        assert_eq!(state.items().len(), 5);
        assert!(!state.has_more());
    }

    #[test]
    fn test_pagination_terminates_on_empty_page() {
        // 4 items, page size 2: pages of 2, 2, 0.
        let mut state = GalleryState::new(2);
        let r1 = state.set_filter(keyword("lake")).unwrap();
        state.complete(&r1, Ok(records(0..2))).unwrap();
        let r2 = state.load_more().unwrap();
        state.complete(&r2, Ok(records(2..4))).unwrap();
        assert!(state.has_more());
        let r3 = state.load_more().unwrap();
        let status = state.complete(&r3, Ok(Vec::new())).unwrap();
        assert_eq!(
            status,
            LoadStatus::Appended {
                count: 0,
                has_more: false
            }
        );
        assert_eq!(state.items().len(), 4);
        assert!(state.load_more().is_none());
    }

    #[test]
    fn test_stale_epoch_is_discarded() {
        let mut state = GalleryState::new(10);
        let a = state.set_filter(keyword("a")).unwrap();
        let b = state.set_filter(keyword("b")).unwrap();

        state.complete(&b, Ok(records(100..103))).unwrap();
        let status = state.complete(&a, Ok(records(0..10))).unwrap();

        assert_eq!(status, LoadStatus::Stale);
        let ids: Vec<i64> = state.items().iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![100, 101, 102]);
    }

    #[test]
    fn test_stale_result_does_not_clear_in_flight() {
        let mut state = GalleryState::new(10);
        let a = state.set_filter(keyword("a")).unwrap();
        let _b = state.set_filter(keyword("b")).unwrap();
        state.complete(&a, Ok(records(0..10))).unwrap();
        assert!(state.is_loading());
        assert!(state.items().is_empty());
    }

    #[test]
    fn test_duplicate_completion_is_ignored() {
        let mut state = GalleryState::new(2);
        let r = state.set_filter(keyword("a")).unwrap();
        state.complete(&r, Ok(records(0..2))).unwrap();
        assert_eq!(state.complete(&r, Ok(records(0..2))).unwrap(), LoadStatus::Stale);
        assert_eq!(state.items().len(), 2);
    }

    #[test]
    fn test_failure_keeps_items_and_allows_retry() {
        let mut state = GalleryState::new(2);
        let r1 = state.set_filter(keyword("a")).unwrap();
        state.complete(&r1, Ok(records(0..2))).unwrap();

        let r2 = state.load_more().unwrap();
        let err = state
            .complete(&r2, Err(GalleryError::QueryFailure("timeout".into())))
            .unwrap_err();
        assert!(matches!(err, GalleryError::QueryFailure(_)));
        assert_eq!(state.items().len(), 2);
        assert!(state.has_more());
        assert!(state.last_error().is_some());

        let retry = state.load_more().unwrap();
        assert_eq!(retry.spec.offset, Some(2));
        state.complete(&retry, Ok(records(2..3))).unwrap();
        assert!(state.last_error().is_none());
        assert_eq!(state.items().len(), 3);
    }

    #[test]
    fn test_zero_page_size_uses_default() {
        assert_eq!(GalleryState::new(0).page_size(), DEFAULT_PAGE_SIZE);
    }
}
