//! Explicit user identity with change notifications.
//!
//! [`UserSession`] holds the signed-in user id and notifies subscribers when
//! it changes. Voting sessions and like sets read identity through the
//! [`IdentityProvider`] trait and are re-synced by their owner when a
//! notification arrives.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

/// Source of the current user identity.
pub trait IdentityProvider: Send + Sync {
    /// The signed-in user id, or `None` when anonymous.
    fn current_user_id(&self) -> Option<String>;
}

type Listener = Arc<dyn Fn(Option<&str>) + Send + Sync>;

/// Handle returned by [`UserSession::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Mutable identity shared by every user-bound component.
pub struct UserSession {
    user_id: RwLock<Option<String>>,
    listeners: RwLock<Vec<(SubscriptionId, Listener)>>,
    next_id: AtomicU64,
}

impl UserSession {
    pub fn new(user_id: Option<String>) -> Self {
        Self {
            user_id: RwLock::new(user_id.filter(|u| !u.is_empty())),
            listeners: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn anonymous() -> Self {
        Self::new(None)
    }

    pub fn sign_in(&self, user_id: impl Into<String>) {
        let user_id = user_id.into();
        self.set(if user_id.is_empty() { None } else { Some(user_id) });
    }

    pub fn sign_out(&self) {
        self.set(None);
    }

    /// Register a callback invoked with the new identity after each change.
    ///
    /// Callbacks run without any internal lock held, so they may call
    /// `subscribe` or `unsubscribe` on the same session.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(Option<&str>) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(listener)));
        id
    }

    /// Remove a subscription. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(sub, _)| *sub != id);
        listeners.len() != before
    }

    fn set(&self, user_id: Option<String>) {
        {
            let mut current = self.user_id.write().unwrap_or_else(PoisonError::into_inner);
            if *current == user_id {
                return;
            }
            *current = user_id.clone();
        }
        debug!(signed_in = user_id.is_some(), "identity changed");

        let listeners: Vec<Listener> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener(user_id.as_deref());
        }
    }
}

impl Default for UserSession {
    fn default() -> Self {
        Self::anonymous()
    }
}

impl IdentityProvider for UserSession {
    fn current_user_id(&self) -> Option<String> {
        self.user_id
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
