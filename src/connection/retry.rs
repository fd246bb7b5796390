//! Connection retry policy
//!
//! Decides, on each reported connection failure, whether to reconnect after
//! a fixed backoff or give up.

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_BACKOFF_MS: u64 = 5000;

/// Connection state as shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
    Retrying,
    Failed,
}

/// Outcome of a failure report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Reconnect after `after`; `attempt` is the 1-based retry number
    Retry { attempt: u32, after: Duration },
    /// Stop the stream
    GiveUp,
}

/// Bounded retry with fixed backoff.
///
/// `max_attempts` counts connection attempts including the initial one, so
/// a policy allowing 5 attempts retries at most 4 times: five consecutive
/// failures yield four retries and then a give-up.
#[derive(Debug, Clone)]
pub struct ConnectionRetryPolicy {
    max_attempts: u32,
    backoff: Duration,
    attempt_count: u32,
    status: ConnectionStatus,
}

impl Default for ConnectionRetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, Duration::from_millis(DEFAULT_BACKOFF_MS))
    }
}

impl ConnectionRetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts,
            backoff,
            attempt_count: 0,
            status: ConnectionStatus::Disconnected,
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    /// Retries performed since the last successful connection
    pub fn attempt_count(&self) -> u32 {
        self.attempt_count
    }

    pub fn backoff(&self) -> Duration {
        self.backoff
    }

    pub fn on_connection_failed(&mut self, reason: &str) -> RetryDecision {
        if self.status != ConnectionStatus::Failed && self.attempt_count + 1 < self.max_attempts {
            self.attempt_count += 1;
            self.status = ConnectionStatus::Retrying;
            tracing::info!(
                "Connection failed ({}), retry {}/{} in {:?}",
                reason,
                self.attempt_count,
                self.max_attempts.saturating_sub(1),
                self.backoff
            );
            RetryDecision::Retry {
                attempt: self.attempt_count,
                after: self.backoff,
            }
        } else {
            self.status = ConnectionStatus::Failed;
            tracing::warn!(
                "Connection failed ({}), giving up after {} retries",
                reason,
                self.attempt_count
            );
            RetryDecision::GiveUp
        }
    }

    pub fn on_connection_success(&mut self) {
        self.attempt_count = 0;
        self.status = ConnectionStatus::Connected;
    }

    pub fn on_auth_success(&mut self) {
        self.on_connection_success();
    }

    /// Authentication errors are never retried
    pub fn on_auth_error(&mut self) -> RetryDecision {
        tracing::warn!("Authentication rejected, not retrying");
        self.status = ConnectionStatus::Failed;
        RetryDecision::GiveUp
    }

    pub fn on_disconnect(&mut self) {
        if self.status != ConnectionStatus::Failed {
            self.status = ConnectionStatus::Disconnected;
        }
    }

    /// Forget all retry state, e.g. once the stream is stopped
    pub fn reset(&mut self) {
        self.attempt_count = 0;
        self.status = ConnectionStatus::Disconnected;
    }
}
