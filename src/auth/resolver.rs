use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashSet;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::db::Store;
use crate::error::PortalError;
use crate::models::Profile;

/// Outcome of a [`ProfileResolver::resolve`] call that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A lookup ran; `None` means the identity has no profile row yet.
    Fetched(Option<Profile>),
    /// Another resolution was outstanding, so no lookup was issued.
    InFlight,
    /// The profile was primed or reset while the lookup ran; its result was
    /// discarded.
    Superseded,
}

/// Maps an identity to its profile.
///
/// At most one lookup is in flight at a time; callers arriving while one is
/// outstanding get [`Resolution::InFlight`] instead of a duplicate query.
/// Identities are remembered once resolved until [`clear_seen`] (sign-out),
/// so repeated auth events for the same user do not refetch.
///
/// Every [`prime`], [`reset`] and [`clear_seen`] starts a new generation. A
/// lookup that finishes in an older generation never touches the profile.
///
/// [`prime`]: ProfileResolver::prime
/// [`reset`]: ProfileResolver::reset
/// [`clear_seen`]: ProfileResolver::clear_seen
pub struct ProfileResolver {
    store: Arc<dyn Store>,
    timeout: Duration,
    in_flight: AtomicBool,
    generation: AtomicU64,
    seen: DashSet<Uuid>,
    current: RwLock<Option<Profile>>,
}

/// Releases the single-flight slot on every exit path, cancellation included.
struct FlightGuard<'a>(&'a AtomicBool);

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl ProfileResolver {
    pub fn new(store: Arc<dyn Store>, timeout: Duration) -> Self {
        Self {
            store,
            timeout,
            in_flight: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            seen: DashSet::new(),
            current: RwLock::new(None),
        }
    }

    pub async fn resolve(&self, user_id: Uuid) -> Result<Resolution, PortalError> {
        let Some(_flight) = self.begin_flight() else {
            tracing::debug!(%user_id, "Profile fetch already in progress, skipping");
            return Ok(Resolution::InFlight);
        };

        let generation = self.generation();
        // Recorded before the lookup so an event racing this call is skipped.
        self.seen.insert(user_id);
        tracing::debug!(%user_id, "Fetching profile");

        let outcome = tokio::time::timeout(self.timeout, self.store.find_profile(user_id)).await;

        // Checked under the slot lock so a concurrent prime either lands
        // first and wins, or lands after and overwrites.
        let mut current = self.current.write();
        if self.generation() != generation {
            tracing::debug!(%user_id, "Profile changed during fetch, discarding result");
            return Ok(Resolution::Superseded);
        }

        match outcome {
            Ok(Ok(profile)) => {
                tracing::info!(
                    %user_id,
                    "Profile fetch result: {}",
                    if profile.is_some() { "profile found" } else { "no profile" }
                );
                *current = profile.clone();
                Ok(Resolution::Fetched(profile))
            }
            Ok(Err(e)) => {
                tracing::error!(%user_id, error = %e, "Error fetching profile");
                *current = None;
                Err(e)
            }
            Err(_) => {
                tracing::warn!(%user_id, timeout_secs = self.timeout.as_secs(), "Profile fetch timed out");
                *current = None;
                Err(PortalError::ProfileFetchTimeout(self.timeout))
            }
        }
    }

    fn begin_flight(&self) -> Option<FlightGuard<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| FlightGuard(&self.in_flight))
    }

    /// Install a profile obtained elsewhere (sign-up polling) without a lookup.
    pub fn prime(&self, profile: Profile) {
        let mut current = self.current.write();
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.seen.insert(profile.id);
        *current = Some(profile);
    }

    /// Changes whenever the profile is installed or forgotten outside a lookup.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn current(&self) -> Option<Profile> {
        self.current.read().clone()
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn has_seen(&self, user_id: Uuid) -> bool {
        self.seen.contains(&user_id)
    }

    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }

    pub fn clear_seen(&self) {
        let _current = self.current.write();
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.seen.clear();
    }

    /// Forget the current profile and every seen identity.
    pub fn reset(&self) {
        let mut current = self.current.write();
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.seen.clear();
        *current = None;
    }
}
