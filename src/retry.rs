//! Bounded fixed-interval polling.
//!
//! Used where a write is followed by a read that may lag behind it (the
//! profile row inserted right after sign-up). The probe is retried a fixed
//! number of times with a fixed pause between attempts; running out of
//! attempts is reported as [`Exhausted`] instead of looping inline.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use crate::config::AuthTimings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub interval: Duration,
}

impl RetryPolicy {
    pub fn profile_visibility(timings: &AuthTimings) -> Self {
        Self {
            attempts: timings.profile_poll_attempts,
            interval: timings.profile_poll_interval,
        }
    }
}

/// The probe never produced a value within the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("no result after {attempts} attempts")]
pub struct Exhausted {
    pub attempts: u32,
}

/// Run `probe` until it yields `Some`, at most `policy.attempts` times.
///
/// Probe errors count as "not yet" and are only logged; the caller cares
/// about visibility, not about individual read failures.
pub async fn poll<T, E, F, Fut>(policy: RetryPolicy, mut probe: F) -> Result<T, Exhausted>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
    E: Display,
{
    for attempt in 1..=policy.attempts {
        match probe().await {
            Ok(Some(value)) => {
                tracing::debug!(attempt, "Poll succeeded");
                return Ok(value);
            }
            Ok(None) => tracing::debug!(attempt, "Poll found nothing yet"),
            Err(e) => tracing::debug!(attempt, error = %e, "Poll probe failed"),
        }

        if attempt < policy.attempts {
            tokio::time::sleep(policy.interval).await;
        }
    }

    Err(Exhausted {
        attempts: policy.attempts,
    })
}
