use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Per-recipient email limiter using a fixed window.
pub struct RecipientRateLimiter {
    /// lowercased address -> (count, window_start)
    entries: DashMap<String, (u32, Instant)>,
    limit: u32,
    window: Duration,
}

impl RecipientRateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            limit,
            window,
        }
    }

    pub fn hourly(limit: u32) -> Self {
        Self::new(limit, Duration::from_secs(60 * 60))
    }

    /// Count one email to `recipient`. Returns Err with retry-after seconds
    /// once the limit for the current window is reached.
    pub fn check(&self, recipient: &str) -> Result<(), u64> {
        let now = Instant::now();

        let mut entry = self
            .entries
            .entry(recipient.trim().to_lowercase())
            .or_insert((0, now));
        let (count, start) = entry.value_mut();

        if now.duration_since(*start) > self.window {
            *count = 1;
            *start = now;
            return Ok(());
        }

        if *count >= self.limit {
            let elapsed = now.duration_since(*start).as_secs();
            return Err(self.window.as_secs().saturating_sub(elapsed));
        }

        *count += 1;
        Ok(())
    }

    /// Drop windows that have expired.
    pub fn cleanup(&self) {
        let now = Instant::now();
        self.entries
            .retain(|_, (_, start)| now.duration_since(*start) < self.window);
    }

    pub fn tracked(&self) -> usize {
        self.entries.len()
    }
}
