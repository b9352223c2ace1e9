//! Flaky-test retry tracking.
//!
//! The tracker decides, thread-safely, whether a failed test execution
//! should be re-executed. Retry is per-attempt, not per-test-definition: a
//! test retried twice produces three independent pass/fail signals to the
//! surrounding reporting system, and the tracker's only job is to cap how
//! many attempts occur. It counts every propagated failure identically —
//! it does not distinguish a genuine bug from flaky timing.
//!
//! The counter map is an explicitly constructed, explicitly lifetime-scoped
//! object owned by the test-runner integration layer; `should_retry`,
//! `reset`, and `reset_all` are its only mutation entry points.

use dashmap::DashMap;
use tracing::{error, warn};

/// Thread-safe retry counters keyed by test identity
#[derive(Debug)]
pub struct RetryTracker {
    max_retries: u32,
    counts: DashMap<String, u32>,
}

impl RetryTracker {
    /// Tracker allowing up to `max_retries` re-executions per identity
    #[must_use]
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            counts: DashMap::new(),
        }
    }

    /// The configured maximum number of re-executions
    #[must_use]
    pub const fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Decide whether a just-finished test attempt should be re-executed.
    ///
    /// A passing attempt never mutates state and never retries. A failing
    /// attempt atomically increments the identity's counter (created at
    /// zero on first failure) and retries while the post-increment count is
    /// within the configured maximum. The counter stops incrementing once
    /// retries are exhausted, so it never exceeds `max_retries + 1`.
    pub fn should_retry(&self, identity: &str, failed: bool) -> bool {
        if !failed {
            return false;
        }

        let attempts = {
            let mut counter = self.counts.entry(identity.to_owned()).or_insert(0);
            if *counter <= self.max_retries {
                *counter += 1;
            }
            *counter
        };

        if attempts <= self.max_retries {
            warn!(
                identity,
                attempt = attempts,
                max = self.max_retries,
                "retrying failed test"
            );
            true
        } else {
            error!(
                identity,
                max = self.max_retries,
                "test failed after exhausting retries"
            );
            false
        }
    }

    /// Recorded failure count for an identity (zero if never failed)
    #[must_use]
    pub fn attempts(&self, identity: &str) -> u32 {
        self.counts.get(identity).map_or(0, |counter| *counter)
    }

    /// Drop one identity's counter
    pub fn reset(&self, identity: &str) {
        self.counts.remove(identity);
    }

    /// Drop every counter. Invoked once at suite end so counters never leak
    /// across independent suite runs in the same process.
    pub fn reset_all(&self) {
        self.counts.clear();
    }

    /// Number of identities currently tracked
    #[must_use]
    pub fn tracked(&self) -> usize {
        self.counts.len()
    }
}

/// Qualify a test name with the current worker thread.
///
/// Concurrent executions of the same test method on different workers must
/// not share a counter, so the identity is the qualified name plus the
/// worker id.
#[must_use]
pub fn test_identity(qualified_name: &str) -> String {
    format!("{qualified_name}@{:?}", std::thread::current().id())
}
