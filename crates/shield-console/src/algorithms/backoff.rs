//! # Reconnect Backoff
//!
//! Exponential backoff for the live channel: the delay before reconnect
//! attempt `n` (counting from zero) is `min(base * 2^n, max)`.

use std::time::Duration;

use crate::config::ReconnectPolicy;

/// Delay before reconnect attempt `attempt`.
pub fn backoff_delay(policy: &ReconnectPolicy, attempt: u32) -> Duration {
    let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
    let delay = policy.base_delay_ms.saturating_mul(factor);
    Duration::from_millis(delay.min(policy.max_delay_ms))
}

/// Counts consecutive failed attempts and decides when to give up.
#[derive(Clone, Debug)]
pub struct ReconnectTracker {
    policy: ReconnectPolicy,
    attempts: u32,
}

impl ReconnectTracker {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            policy,
            attempts: 0,
        }
    }

    /// A channel opened; the counter starts over.
    pub fn on_connected(&mut self) {
        self.attempts = 0;
    }

    /// The channel closed or failed to open.
    ///
    /// Returns the delay before the next attempt, or `None` once the
    /// attempt ceiling is reached.
    pub fn on_disconnect(&mut self) -> Option<Duration> {
        if self.attempts >= self.policy.max_attempts {
            return None;
        }
        let delay = backoff_delay(&self.policy, self.attempts);
        self.attempts += 1;
        Some(delay)
    }

    /// Reconnects scheduled since the last successful connection.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn is_exhausted(&self) -> bool {
        self.attempts >= self.policy.max_attempts
    }
}
