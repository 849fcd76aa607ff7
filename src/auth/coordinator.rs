//! Auth bootstrap state machine.
//!
//! [`AuthCoordinator`] combines the [`SessionStore`] and the
//! [`ProfileResolver`] into a single `{user, profile, loading}` view that the
//! rest of the portal reads through a watch channel. It is the only writer of
//! that view.
//!
//! ```text
//! Uninitialized -> Initializing -> AwaitingProfile -> Ready
//!                              \--------------------> Ready (signed out)
//! ```
//!
//! Every auth event re-enters `AwaitingProfile`/`Ready`. A fallback timer
//! bounds `loading` even if the profile lookup never returns, and teardown
//! stops all tasks and unsubscribes before anything else can be written.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::auth::guard::Route;
use crate::auth::provider::AuthProvider;
use crate::auth::resolver::{ProfileResolver, Resolution};
use crate::auth::session::{SessionStore, Subscription, SubscriptionHandle};
use crate::config::AuthTimings;
use crate::db::Store;
use crate::error::PortalError;
use crate::models::{AuthChange, Identity, NewProfile, Profile, Role, Session};
use crate::retry::{self, RetryPolicy};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AuthPhase {
    #[default]
    Uninitialized,
    Initializing,
    /// Signed in, profile not resolved yet.
    AwaitingProfile,
    Ready,
}

/// Read model shared with every view.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthState {
    pub phase: AuthPhase,
    pub user: Option<Identity>,
    pub session: Option<Session>,
    pub profile: Option<Profile>,
    pub loading: bool,
}

impl Default for AuthState {
    fn default() -> Self {
        Self {
            phase: AuthPhase::Uninitialized,
            user: None,
            session: None,
            profile: None,
            loading: true,
        }
    }
}

impl AuthState {
    pub fn role(&self) -> Option<Role> {
        self.profile.as_ref().map(|p| p.role)
    }

    pub fn is_signed_in(&self) -> bool {
        self.user.is_some()
    }
}

#[derive(Debug, Clone, Default)]
pub struct SignUpData {
    pub full_name: String,
    pub company_name: Option<String>,
    /// Defaults to [`Role::Client`].
    pub role: Option<Role>,
}

pub struct AuthCoordinator {
    inner: Arc<Inner>,
}

struct Inner {
    state: watch::Sender<AuthState>,
    sessions: SessionStore,
    resolver: ProfileResolver,
    store: Arc<dyn Store>,
    timings: AuthTimings,
    mounted: AtomicBool,
    cancel: CancellationToken,
    subscription: Mutex<Option<SubscriptionHandle>>,
}

impl AuthCoordinator {
    /// Subscribe to auth changes and begin initialization in the background.
    /// Must be called inside a Tokio runtime.
    pub fn start(provider: Arc<dyn AuthProvider>, store: Arc<dyn Store>, timings: AuthTimings) -> Self {
        let (state, _) = watch::channel(AuthState::default());
        let inner = Arc::new(Inner {
            state,
            sessions: SessionStore::new(provider),
            resolver: ProfileResolver::new(store.clone(), timings.profile_fetch_timeout),
            store,
            timings,
            mounted: AtomicBool::new(true),
            cancel: CancellationToken::new(),
            subscription: Mutex::new(None),
        });

        inner.publish(|s| {
            s.phase = AuthPhase::Initializing;
            s.loading = true;
        });

        match inner.sessions.subscribe() {
            Ok(subscription) => {
                *inner.subscription.lock() = Some(subscription.handle());
                tokio::spawn(inner.clone().run_events(subscription));
            }
            Err(e) => tracing::error!(error = %e, "Could not subscribe to auth changes"),
        }

        let init_done = inner.cancel.child_token();
        tokio::spawn(inner.clone().run_fallback(init_done.clone()));
        tokio::spawn(inner.clone().run_initialize(init_done));

        Self { inner }
    }

    pub fn state(&self) -> AuthState {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.inner.state.subscribe()
    }

    /// Wait until `loading` is false (bounded by the fallback timer).
    pub async fn wait_until_loaded(&self) -> AuthState {
        let mut rx = self.subscribe();
        match rx.wait_for(|s| !s.loading).await {
            Ok(state) => state.clone(),
            Err(_) => self.state(),
        }
    }

    pub fn session_store(&self) -> &SessionStore {
        &self.inner.sessions
    }

    pub fn resolver(&self) -> &ProfileResolver {
        &self.inner.resolver
    }

    /// Create the identity and its profile row, then wait for the row to be
    /// readable before reporting success.
    pub async fn sign_up(&self, email: &str, password: &str, data: SignUpData) -> Result<Profile, PortalError> {
        let identity = self.inner.sessions.provider().sign_up(email, password).await?;

        let new_profile = NewProfile {
            id: identity.id,
            email: identity.email.clone(),
            role: data.role.unwrap_or_default(),
            full_name: Some(data.full_name.trim().to_string()).filter(|n| !n.is_empty()),
            company_name: data
                .company_name
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty()),
        };
        self.inner.store.insert_profile(&new_profile).await?;

        // The insert and the following read may hit different replicas.
        let store = &self.inner.store;
        let policy = RetryPolicy::profile_visibility(&self.inner.timings);
        let profile = retry::poll(policy, move || store.find_profile(identity.id))
            .await
            .map_err(|e| {
                tracing::error!(user_id = %identity.id, "Profile never became visible: {e}");
                PortalError::ProfileCreationTimeout
            })?;

        tracing::info!(user_id = %profile.id, role = %profile.role, "Signed up");
        self.inner.resolver.prime(profile.clone());
        let published = profile.clone();
        self.inner.publish(|s| s.profile = Some(published));
        Ok(profile)
    }

    /// Password sign-in. State follows through the `SignedIn` event.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<(), PortalError> {
        let session = self
            .inner
            .sessions
            .provider()
            .sign_in_with_password(email, password)
            .await?;
        tracing::info!(user_id = %session.user.id, "Signed in");
        Ok(())
    }

    /// Revoke the session and clear local state. Returns where to redirect.
    pub async fn sign_out(&self) -> Result<Route, PortalError> {
        self.inner.sessions.provider().sign_out().await?;

        self.inner.sessions.clear();
        self.inner.resolver.reset();
        self.inner.publish(|s| {
            s.user = None;
            s.profile = None;
            s.session = None;
            s.phase = AuthPhase::Ready;
            s.loading = false;
        });

        tracing::info!("Signed out, redirecting to {}", Route::Login.path());
        Ok(Route::Login)
    }

    /// Force a profile lookup, bypassing the seen-set. A lookup already in
    /// flight leaves the current profile as it is.
    pub async fn refresh_profile(&self, user_id: Uuid) -> Result<Option<Profile>, PortalError> {
        let generation = self.inner.resolver.generation();
        match self.inner.resolver.resolve(user_id).await {
            Ok(Resolution::Fetched(profile)) => {
                self.inner.publish_profile_for(user_id, generation, profile.clone());
                Ok(profile)
            }
            Ok(Resolution::InFlight | Resolution::Superseded) => Ok(self.state().profile),
            Err(e) => {
                self.inner.publish_profile_for(user_id, generation, None);
                Err(e)
            }
        }
    }

    /// Stop the timer and tasks and unsubscribe. Nothing is written afterwards.
    pub fn teardown(&self) {
        if !self.inner.mounted.swap(false, Ordering::SeqCst) {
            return;
        }
        self.inner.cancel.cancel();
        if let Some(handle) = self.inner.subscription.lock().take() {
            handle.unsubscribe();
        }
        tracing::debug!("Auth coordinator torn down");
    }
}

impl Drop for AuthCoordinator {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl Inner {
    fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::SeqCst)
    }

    fn publish(&self, update: impl FnOnce(&mut AuthState)) {
        if !self.is_mounted() {
            return;
        }
        self.state.send_modify(update);
    }

    /// Leave `loading`, keeping whatever session and profile are current.
    fn settle(&self) {
        self.publish(|s| {
            s.loading = false;
            s.phase = AuthPhase::Ready;
        });
    }

    async fn run_initialize(self: Arc<Self>, init_done: CancellationToken) {
        tokio::select! {
            _ = self.cancel.cancelled() => {}
            _ = self.initialize() => {}
        }
        init_done.cancel();
    }

    async fn initialize(&self) {
        tracing::info!("Starting auth initialization");

        let session = self.sessions.fetch_current().await;
        if !self.is_mounted() {
            return;
        }

        let user = session.as_ref().map(|s| s.user.clone());
        let published = user.clone();
        self.publish(|s| {
            s.session = session;
            s.user = published;
        });

        if let Some(user) = user {
            tracing::info!(user_id = %user.id, "User found in session, fetching profile");
            self.publish(|s| s.phase = AuthPhase::AwaitingProfile);
            self.resolve_profile(user.id, "initialization").await;
        }

        tracing::info!("Auth initialization completed, setting loading to false");
        self.settle();
    }

    async fn run_fallback(self: Arc<Self>, init_done: CancellationToken) {
        tokio::select! {
            _ = init_done.cancelled() => {}
            _ = tokio::time::sleep(self.timings.bootstrap_fallback) => {
                tracing::warn!("Auth initialization fallback timeout, setting loading to false");
                self.settle();
            }
        }
    }

    async fn run_events(self: Arc<Self>, mut subscription: Subscription) {
        loop {
            let change = tokio::select! {
                _ = self.cancel.cancelled() => break,
                change = subscription.recv() => change,
            };
            let Some(change) = change else { break };
            self.handle_change(change).await;
        }
        subscription.unsubscribe();
    }

    async fn handle_change(&self, change: AuthChange) {
        tracing::info!(event = ?change.event, user_id = ?change.user().map(|u| u.id), "Auth state changed");
        if !self.is_mounted() {
            return;
        }

        let user = change.user().cloned();
        let published = user.clone();
        self.publish(|s| {
            s.session = change.session;
            s.user = published;
        });

        match user {
            Some(user) if self.resolver.has_seen(user.id) => {
                tracing::debug!(user_id = %user.id, "Skipping profile fetch, already fetched for this user");
            }
            Some(user) => {
                self.publish(|s| s.phase = AuthPhase::AwaitingProfile);
                self.resolve_profile(user.id, "auth state change").await;
            }
            None => {
                self.resolver.reset();
                self.publish(|s| s.profile = None);
            }
        }

        self.settle();
    }

    async fn resolve_profile(&self, user_id: Uuid, context: &'static str) {
        let generation = self.resolver.generation();
        match self.resolver.resolve(user_id).await {
            Ok(Resolution::Fetched(profile)) => {
                if profile.is_some() {
                    tracing::info!(%user_id, context, "Profile loaded");
                }
                self.publish_profile_for(user_id, generation, profile);
            }
            Ok(Resolution::InFlight) => {
                tracing::debug!(%user_id, context, "Profile resolution already running");
            }
            Ok(Resolution::Superseded) => {
                tracing::debug!(%user_id, context, "Profile was set while fetching, keeping it");
            }
            Err(e) => {
                tracing::error!(%user_id, context, error = %e, "Profile fetch failed, continuing without profile");
                self.publish_profile_for(user_id, generation, None);
            }
        }
    }

    /// Only applies if `user_id` is still the signed-in identity and the
    /// profile was not primed or reset since `generation` was read.
    fn publish_profile_for(&self, user_id: Uuid, generation: u64, profile: Option<Profile>) {
        self.publish(|s| {
            let same_user = s.user.as_ref().map(|u| u.id) == Some(user_id);
            if same_user && self.resolver.generation() == generation {
                s.profile = profile;
            }
        });
    }
}
