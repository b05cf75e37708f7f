// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sliding-window spawn rate limiter with exponential backoff.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

const WINDOW: Duration = Duration::from_secs(1);
const BASE_BACKOFF: Duration = Duration::from_millis(100);
const MAX_BACKOFF: Duration = Duration::from_secs(3);

/// Shapes spawn throughput to at most `limit` per one-second window.
///
/// `allow()` never rejects — it shapes the call rate by sleeping, and
/// always eventually returns.
pub struct RateLimiter {
    limit: usize,
    timestamps: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(limit: usize) -> Self {
        Self { limit, timestamps: Mutex::new(VecDeque::new()) }
    }

    /// Disabled limiter (limit == 0) that never shapes calls.
    pub fn disabled() -> Self {
        Self::new(0)
    }

    pub fn is_disabled(&self) -> bool {
        self.limit == 0
    }

    /// Discard stale timestamps, admit immediately if under the limit,
    /// otherwise sleep for an exponentially increasing backoff (capped at
    /// 3s) before admitting a fresh timestamp. The internal lock is
    /// released across the sleep so other callers can make progress.
    pub async fn allow(&self) {
        if self.is_disabled() {
            return;
        }

        let sleep_for = {
            let mut timestamps = self.timestamps.lock().await;
            let now = Instant::now();
            while timestamps.front().is_some_and(|t| now.duration_since(*t) > WINDOW) {
                timestamps.pop_front();
            }

            if timestamps.len() < self.limit {
                timestamps.push_back(now);
                return;
            }

            let excess = timestamps.len() - self.limit + 1;
            let shift = u32::try_from(excess - 1).unwrap_or(u32::MAX);
            let backoff = BASE_BACKOFF.saturating_mul(1u32.checked_shl(shift).unwrap_or(u32::MAX));
            backoff.min(MAX_BACKOFF)
        };

        tokio::time::sleep(sleep_for).await;

        let mut timestamps = self.timestamps.lock().await;
        timestamps.push_back(Instant::now());
    }
}

#[cfg(test)]
#[path = "rate_limit_tests.rs"]
mod tests;
