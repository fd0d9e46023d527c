//! Per-user like state.
//!
//! [`LikeSet`] caches the ids a user liked and keeps the cache in step
//! with the query service. Every mutation requires a signed-in user.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::debug;

use crate::error::GalleryError;
use crate::service::QueryService;
use crate::session::IdentityProvider;

pub struct LikeSet<S: ?Sized> {
    service: Arc<S>,
    identity: Arc<dyn IdentityProvider>,
    user_id: Option<String>,
    liked: BTreeSet<i64>,
}

impl<S: QueryService + ?Sized> LikeSet<S> {
    /// New set bound to whoever the identity provider reports right now.
    /// Call [`refresh`](Self::refresh) to load it.
    pub fn new(service: Arc<S>, identity: Arc<dyn IdentityProvider>) -> Self {
        let user_id = identity.current_user_id();
        Self {
            service,
            identity,
            user_id,
            liked: BTreeSet::new(),
        }
    }

    fn user(&self) -> Result<String, GalleryError> {
        self.user_id.clone().ok_or(GalleryError::AuthRequired)
    }

    /// Reload the liked ids from the service.
    pub async fn refresh(&mut self) -> Result<(), GalleryError> {
        let user = self.user()?;
        let ids = self
            .service
            .list_liked_ids(&user)
            .await
            .map_err(GalleryError::query)?;
        self.liked = ids.into_iter().collect();
        debug!(likes = self.liked.len(), "refreshed likes");
        Ok(())
    }

    /// Like `media_id`. Returns `false` if it was already liked.
    pub async fn add(&mut self, media_id: i64) -> Result<bool, GalleryError> {
        let user = self.user()?;
        let changed = self
            .service
            .add_like(&user, media_id)
            .await
            .map_err(GalleryError::query)?;
        self.liked.insert(media_id);
        Ok(changed)
    }

    /// Unlike `media_id`. Returns `false` if it was not liked.
    pub async fn remove(&mut self, media_id: i64) -> Result<bool, GalleryError> {
        let user = self.user()?;
        let changed = self
            .service
            .remove_like(&user, media_id)
            .await
            .map_err(GalleryError::query)?;
        self.liked.remove(&media_id);
        Ok(changed)
    }

    /// Flip the like on `media_id`; returns whether it is now liked.
    pub async fn toggle(&mut self, media_id: i64) -> Result<bool, GalleryError> {
        if self.is_liked(media_id) {
            self.remove(media_id).await?;
            Ok(false)
        } else {
            self.add(media_id).await?;
            Ok(true)
        }
    }

    pub fn is_liked(&self, media_id: i64) -> bool {
        self.liked.contains(&media_id)
    }

    pub fn ids(&self) -> Vec<i64> {
        self.liked.iter().copied().collect()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// Rebind to the identity provider's current user. On a change the
    /// cache is cleared and, for a signed-in user, reloaded.
    pub async fn sync_identity(&mut self) -> Result<bool, GalleryError> {
        let current = self.identity.current_user_id();
        if current == self.user_id {
            return Ok(false);
        }
        self.user_id = current;
        self.liked.clear();
        if self.user_id.is_some() {
            self.refresh().await?;
        }
        Ok(true)
    }
}
