//! Public types for the session layer.

use std::ops::RangeInclusive;
use std::time::Duration;

use sharecopy_protocol::Credentials;

/// Connection state of a [`RemoteSession`](crate::RemoteSession).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No live protocol handle.
    Disconnected,
    /// Authenticated and attached to the share.
    Connected,
}

/// Where and as whom to connect.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Server address (host name or IP).
    pub address: String,
    /// Share (tree) name on the server.
    pub share: String,
    /// Authentication domain.
    pub domain: String,
    pub credentials: Credentials,
}

/// A bounded number of attempts separated by a fixed delay.
///
/// Used wherever the engine retries: reconnects (long delay) and chunk
/// writes (no delay).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, the first one included. Zero is treated as one.
    pub max_attempts: u32,
    /// Pause taken before each attempt.
    pub delay: Duration,
}

/// Reconnect attempts before a session is given up.
pub const DEFAULT_RECONNECT_ATTEMPTS: u32 = 10;

/// Pause before each reconnect attempt, long enough for server-side
/// credit exhaustion to clear.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(20);

impl RetryPolicy {
    pub const fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// Retries back to back, without pausing.
    pub const fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO)
    }

    /// The policy used for session reconnects.
    pub const fn reconnect() -> Self {
        Self::new(DEFAULT_RECONNECT_ATTEMPTS, DEFAULT_RECONNECT_DELAY)
    }

    /// Effective attempt count (at least one).
    pub fn limit(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// 1-based attempt numbers.
    pub fn attempts(&self) -> RangeInclusive<u32> {
        1..=self.limit()
    }

    pub fn is_last(&self, attempt: u32) -> bool {
        attempt >= self.limit()
    }

    /// Sleeps for the configured delay, if any.
    pub async fn wait(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::reconnect()
    }
}
