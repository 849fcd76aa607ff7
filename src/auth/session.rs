use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;

use crate::auth::provider::{AuthProvider, ListenerId};
use crate::error::PortalError;
use crate::models::{AuthChange, Identity, Session};

/// Wraps the auth provider: holds the current session and hands out the
/// single listener subscription.
pub struct SessionStore {
    provider: Arc<dyn AuthProvider>,
    current: Arc<RwLock<Option<Session>>>,
    subscribed: Arc<AtomicBool>,
}

impl SessionStore {
    pub fn new(provider: Arc<dyn AuthProvider>) -> Self {
        Self {
            provider,
            current: Arc::new(RwLock::new(None)),
            subscribed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Construct and fetch the current session.
    pub async fn load(provider: Arc<dyn AuthProvider>) -> Self {
        let store = Self::new(provider);
        store.fetch_current().await;
        store
    }

    /// Ask the provider for its persisted session. A provider error is logged
    /// and leaves the store signed out.
    pub async fn fetch_current(&self) -> Option<Session> {
        let session = match self.provider.get_session().await {
            Ok(session) => session,
            Err(e) => {
                tracing::error!(error = %e, "Session fetch error");
                None
            }
        };

        tracing::info!(
            "Initial session check: {}",
            if session.is_some() { "found session" } else { "no session" }
        );

        *self.current.write() = session.clone();
        session
    }

    pub fn current(&self) -> Option<Session> {
        self.current.read().clone()
    }

    pub fn user(&self) -> Option<Identity> {
        self.current.read().as_ref().map(|s| s.user.clone())
    }

    pub fn clear(&self) {
        *self.current.write() = None;
    }

    pub fn provider(&self) -> &Arc<dyn AuthProvider> {
        &self.provider
    }

    /// Register the one listener for this store.
    pub fn subscribe(&self) -> Result<Subscription, PortalError> {
        if self.subscribed.swap(true, Ordering::SeqCst) {
            return Err(PortalError::Auth(
                "Session store already has a listener".to_string(),
            ));
        }

        let listener = self.provider.on_auth_state_change();
        let handle = SubscriptionHandle {
            id: listener.id,
            provider: self.provider.clone(),
            subscribed: self.subscribed.clone(),
            released: Arc::new(AtomicBool::new(false)),
        };

        Ok(Subscription {
            events: listener.events,
            current: self.current.clone(),
            handle,
        })
    }
}

/// Ordered auth events for the store's listener. Dropping it unsubscribes.
pub struct Subscription {
    events: tokio::sync::mpsc::Receiver<AuthChange>,
    current: Arc<RwLock<Option<Session>>>,
    handle: SubscriptionHandle,
}

impl Subscription {
    /// Next change, after the store's current session has been updated to it.
    /// `None` once unsubscribed.
    pub async fn recv(&mut self) -> Option<AuthChange> {
        let change = self.events.recv().await?;
        *self.current.write() = change.session.clone();
        Some(change)
    }

    pub fn handle(&self) -> SubscriptionHandle {
        self.handle.clone()
    }

    pub fn unsubscribe(&mut self) {
        self.handle.unsubscribe();
        self.events.close();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.handle.unsubscribe();
    }
}

/// Detached unsubscribe capability; every clone shares one release flag.
#[derive(Clone)]
pub struct SubscriptionHandle {
    id: ListenerId,
    provider: Arc<dyn AuthProvider>,
    subscribed: Arc<AtomicBool>,
    released: Arc<AtomicBool>,
}

impl SubscriptionHandle {
    /// Idempotent: the provider sees at most one unsubscribe per listener.
    pub fn unsubscribe(&self) {
        if self.released.swap(true, Ordering::SeqCst) {
            return;
        }
        self.provider.unsubscribe(self.id);
        self.subscribed.store(false, Ordering::SeqCst);
        tracing::debug!(listener = self.id, "Auth listener unsubscribed");
    }

    pub fn is_active(&self) -> bool {
        !self.released.load(Ordering::SeqCst)
    }
}
