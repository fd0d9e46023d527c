//! Pairwise voting session.
//!
//! A [`VotingSession`] shows one user two media items at a time, records
//! which one they prefer, and advances to a pair they have not compared
//! yet. The query service guarantees that replacement pairs exclude
//! combinations already in the user's vote log; the session guarantees
//! the winner keeps its slot:
//!
//! ```text
//! HasPair{left: X, right: Y} ──vote(X)──▶ submit_vote ──▶ get_unvoted_pair(X, Left)
//!                                                            │
//!                  service returns [Z, X] or [X, Z] ─────────┴──▶ HasPair{left: X, right: Z}
//! ```
//!
//! Votes take `&mut self`, so two votes on one session can never overlap.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::GalleryError;
use crate::models::{MediaRecord, PairSlot, RawMediaRow, VoteRecord};
use crate::query::fetch_by_ids;
use crate::service::QueryService;
use crate::session::IdentityProvider;

/// Two media items presented side by side.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaPair {
    pub left: MediaRecord,
    pub right: MediaRecord,
}

impl MediaPair {
    pub fn slot_of(&self, media_id: i64) -> Option<PairSlot> {
        if self.left.id == media_id {
            Some(PairSlot::Left)
        } else if self.right.id == media_id {
            Some(PairSlot::Right)
        } else {
            None
        }
    }

    pub fn ids(&self) -> (i64, i64) {
        (self.left.id, self.right.id)
    }

    pub fn get(&self, slot: PairSlot) -> &MediaRecord {
        match slot {
            PairSlot::Left => &self.left,
            PairSlot::Right => &self.right,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum VotingState {
    Uninitialized,
    /// Waiting for a pair, or a replacement request failed after a vote
    /// committed (see [`VotingSession::refresh`]).
    Loading,
    HasPair(MediaPair),
    /// No unseen pair is left for this user. Terminal until re-initialized.
    Exhausted,
}

/// Voting state for one user at a time.
pub struct VotingSession<S: ?Sized> {
    service: Arc<S>,
    identity: Arc<dyn IdentityProvider>,
    user_id: Option<String>,
    state: VotingState,
    history: Vec<VoteRecord>,
}

impl<S: QueryService + ?Sized> VotingSession<S> {
    pub fn new(service: Arc<S>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self {
            service,
            identity,
            user_id: None,
            state: VotingState::Uninitialized,
            history: Vec::new(),
        }
    }

    pub fn state(&self) -> &VotingState {
        &self.state
    }

    pub fn pair(&self) -> Option<&MediaPair> {
        match &self.state {
            VotingState::HasPair(pair) => Some(pair),
            _ => None,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.state == VotingState::Exhausted
    }

    /// Votes recorded for the bound user, oldest first.
    pub fn history(&self) -> &[VoteRecord] {
        &self.history
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// Drop the bound user, pair, and cached history.
    pub fn reset(&mut self) {
        self.user_id = None;
        self.state = VotingState::Uninitialized;
        self.history.clear();
    }

    /// Bind `user_id`, load their vote log, and fetch a first pair.
    ///
    /// `None` (or an empty id) resets the session and fails with
    /// [`GalleryError::AuthRequired`]. A service failure leaves the session
    /// uninitialized.
    pub async fn initialize(&mut self, user_id: Option<&str>) -> Result<(), GalleryError> {
        self.reset();
        let user = match user_id.filter(|u| !u.is_empty()) {
            Some(user) => user.to_string(),
            None => return Err(GalleryError::AuthRequired),
        };
        self.state = VotingState::Loading;

        let history = match self.service.list_votes(&user).await {
            Ok(history) => history,
            Err(err) => {
                self.state = VotingState::Uninitialized;
                return Err(GalleryError::query(err));
            }
        };
        debug!(votes = history.len(), "loaded vote history");

        match self.request_pair(&user, None).await {
            Ok(next) => {
                self.user_id = Some(user);
                self.history = history;
                self.apply(next);
                Ok(())
            }
            Err(err) => {
                self.state = VotingState::Uninitialized;
                Err(err)
            }
        }
    }

    /// Record a preference for `selected_id` and advance to the next pair.
    ///
    /// If the vote itself fails nothing changes and the pair stays live.
    /// If the vote commits but the replacement request fails, the session
    /// is left in [`VotingState::Loading`] with the vote in `history`.
    ///
    /// Voting with no live pair (any state but [`VotingState::HasPair`])
    /// fails with [`GalleryError::NoActivePair`] rather than
    /// [`GalleryError::InvalidSelection`], which is kept for ids that are
    /// not one of the two shown.
    pub async fn vote(&mut self, selected_id: i64) -> Result<VoteRecord, GalleryError> {
        let user = self.user_id.clone().ok_or(GalleryError::AuthRequired)?;
        let pair = match &self.state {
            VotingState::HasPair(pair) => pair,
            _ => return Err(GalleryError::NoActivePair),
        };
        let slot = pair.slot_of(selected_id).ok_or(GalleryError::InvalidSelection {
            selected: selected_id,
        })?;
        let (left, right) = pair.ids();

        let record = self
            .service
            .submit_vote(&user, left, right, selected_id)
            .await
            .map_err(GalleryError::query)?;
        self.history.push(record.clone());
        self.state = VotingState::Loading;

        let next = self.request_pair(&user, Some((selected_id, slot))).await?;
        self.apply(next);
        Ok(record)
    }

    /// Re-request a pair after a failed replacement fetch.
    ///
    /// Does nothing while a pair is live or once the session is exhausted.
    pub async fn refresh(&mut self) -> Result<(), GalleryError> {
        if matches!(self.state, VotingState::HasPair(_) | VotingState::Exhausted) {
            return Ok(());
        }
        let user = self.user_id.clone().ok_or(GalleryError::AuthRequired)?;
        self.state = VotingState::Loading;
        let next = self.request_pair(&user, None).await?;
        self.apply(next);
        Ok(())
    }

    /// Follow the identity provider: re-initialize on a user change, reset
    /// on sign-out. Returns `true` if the bound user changed.
    pub async fn sync_identity(&mut self) -> Result<bool, GalleryError> {
        let current = self.identity.current_user_id();
        if current.as_deref() == self.user_id.as_deref() {
            return Ok(false);
        }
        match current {
            Some(user) => self.initialize(Some(&user)).await?,
            None => self.reset(),
        }
        Ok(true)
    }

    /// The media id this user picked most often (ties go to the higher id).
    pub fn favorite_media_id(&self) -> Option<i64> {
        let mut counts: HashMap<i64, usize> = HashMap::new();
        for vote in &self.history {
            *counts.entry(vote.selected).or_default() += 1;
        }
        counts
            .into_iter()
            .max_by_key(|&(id, count)| (count, id))
            .map(|(id, _)| id)
    }

    fn apply(&mut self, next: Option<MediaPair>) {
        self.state = match next {
            Some(pair) => VotingState::HasPair(pair),
            None => {
                debug!("no unvoted pair left");
                VotingState::Exhausted
            }
        };
    }

    async fn request_pair(
        &self,
        user: &str,
        winner: Option<(i64, PairSlot)>,
    ) -> Result<Option<MediaPair>, GalleryError> {
        let rows = self
            .service
            .get_unvoted_pair(user, winner)
            .await
            .map_err(GalleryError::query)?;
        Ok(arrange_pair(rows, winner))
    }
}

/// Turn service rows into a pair, putting the winner back in its slot.
///
/// Anything other than two distinct rows (containing the winner, when one
/// is given) is treated as "no pair".
fn arrange_pair(rows: Vec<RawMediaRow>, winner: Option<(i64, PairSlot)>) -> Option<MediaPair> {
    if rows.is_empty() {
        return None;
    }
    let [first, second]: [RawMediaRow; 2] = match rows.try_into() {
        Ok(pair) => pair,
        Err(rows) => {
            warn!(rows = rows.len(), "malformed voting pair");
            return None;
        }
    };
    let (first, second) = (MediaRecord::from(first), MediaRecord::from(second));
    if first.id == second.id {
        warn!(media_id = first.id, "voting pair repeats one item");
        return None;
    }

    let Some((winner_id, slot)) = winner else {
        return Some(MediaPair {
            left: first,
            right: second,
        });
    };
    let (kept, challenger) = if first.id == winner_id {
        (first, second)
    } else if second.id == winner_id {
        (second, first)
    } else {
        warn!(winner_id, "replacement pair is missing the winner");
        return None;
    };
    Some(match slot {
        PairSlot::Left => MediaPair {
            left: kept,
            right: challenger,
        },
        PairSlot::Right => MediaPair {
            left: challenger,
            right: kept,
        },
    })
}

/// The community's top-rated media item, if anything has been voted on.
pub async fn community_favorite<S>(service: &S) -> Result<Option<MediaRecord>, GalleryError>
where
    S: QueryService + ?Sized,
{
    let top = service.top_rated(1).await.map_err(GalleryError::query)?;
    let Some(best) = top.first() else {
        return Ok(None);
    };
    let mut records = fetch_by_ids(service, &[best.media_id]).await?;
    Ok(records.pop())
}
