//! Retry policy after failed ceremonies
//!
//! No attempt limit applies unless one is configured. Retries are always
//! started by the user.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};

pub const LOCKOUT_MESSAGE: &str = "Too many failed attempts. Please use your password instead.";

/// Configuration for repeated failures
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Failed ceremonies allowed before the coordinator refuses new ones
    /// (None = unlimited)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_failed_attempts: Option<u32>,
}

impl RetryPolicy {
    pub fn unlimited() -> Self {
        Self::default()
    }

    pub fn max_failed_attempts(limit: u32) -> Self {
        Self {
            max_failed_attempts: Some(limit),
        }
    }

    pub fn is_locked_out(&self, failures: u32) -> bool {
        self.max_failed_attempts
            .map(|limit| failures >= limit)
            .unwrap_or(false)
    }
}

/// Consecutive failure counter for one coordinator
#[derive(Debug, Default)]
pub(crate) struct FailureTracker {
    failures: AtomicU32,
}

impl FailureTracker {
    /// Record a failure and return the new count
    pub fn record(&self) -> u32 {
        self.failures.fetch_add(1, Ordering::SeqCst).saturating_add(1)
    }

    pub fn count(&self) -> u32 {
        self.failures.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.failures.store(0, Ordering::SeqCst);
    }
}
