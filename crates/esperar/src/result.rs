//! Result and error types for Esperar.

use crate::locator::Locator;
use thiserror::Error;

/// Result type for Esperar operations
pub type EsperarResult<T> = Result<T, EsperarError>;

/// Errors that can occur while waiting for, or interacting with, the UI
#[derive(Debug, Error)]
pub enum EsperarError {
    /// A readiness condition never became true within the wait budget
    #[error("element {locator} not found after waiting {timeout_ms} ms")]
    Timeout {
        /// Locator that was being waited on
        locator: Locator,
        /// Configured timeout in milliseconds
        timeout_ms: u64,
    },

    /// A non-element condition (URL, predicate) never became true in budget
    #[error("condition [{description}] not met after {timeout_ms} ms")]
    ConditionTimeout {
        /// Description of the condition
        description: String,
        /// Configured timeout in milliseconds
        timeout_ms: u64,
    },

    /// A single immediate lookup found no matching element
    #[error("no element matching {locator}")]
    ElementNotFound {
        /// Locator that matched nothing
        locator: Locator,
    },

    /// A previously resolved element handle was invalidated by a re-render
    #[error("stale element reference for {locator}")]
    StaleElement {
        /// Locator the stale handle was resolved from
        locator: Locator,
    },

    /// An interaction kept hitting stale handles until its attempt budget ran out
    #[error("interaction with {locator} failed after {attempts} attempts")]
    InteractionFailed {
        /// Locator the interaction targeted
        locator: Locator,
        /// Number of attempts made before giving up
        attempts: u32,
    },

    /// The underlying browser session could not be created; never retried
    #[error("failed to create browser session: {message}")]
    SessionCreation {
        /// Error message from the session factory
        message: String,
    },

    /// The calling thread already holds a live session handle
    #[error("a session is already bound to worker thread {thread}")]
    SessionAlreadyBound {
        /// Worker thread that holds the existing handle
        thread: String,
    },

    /// A session handle was used from a thread that does not own it
    #[error("session owned by {owner} was accessed from {caller}")]
    ForeignSessionAccess {
        /// Thread the handle is bound to
        owner: String,
        /// Thread that attempted the access
        caller: String,
    },

    /// A required configuration value is missing or invalid
    #[error("configuration error: {message}")]
    Configuration {
        /// What is missing or invalid
        message: String,
    },

    /// The UI driver failed for a reason other than the taxonomy above
    #[error("driver error: {message}")]
    Driver {
        /// Error message from the driver
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EsperarError {
    /// Whether this failure is the transient stale-handle race that the
    /// interaction retrier recovers from
    #[must_use]
    pub const fn is_stale(&self) -> bool {
        matches!(self, Self::StaleElement { .. })
    }

    /// Whether this failure aborts the test outright (no retry of any kind)
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::SessionCreation { .. } | Self::Configuration { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::Locator;

    #[test]
    fn test_timeout_display_names_locator_and_budget() {
        let err = EsperarError::Timeout {
            locator: Locator::css("button.checkout"),
            timeout_ms: 15_000,
        };
        let text = err.to_string();
        assert!(text.contains("button.checkout"));
        assert!(text.contains("15000 ms"));
    }

    #[test]
    fn test_interaction_failed_display_names_attempts() {
        let err = EsperarError::InteractionFailed {
            locator: Locator::id("submit"),
            attempts: 3,
        };
        assert!(err.to_string().contains("3 attempts"));
    }

    #[test]
    fn test_is_stale() {
        let stale = EsperarError::StaleElement {
            locator: Locator::id("cart"),
        };
        assert!(stale.is_stale());
        assert!(!stale.is_fatal());
    }

    #[test]
    fn test_fatal_classification() {
        let session = EsperarError::SessionCreation {
            message: "no browser".into(),
        };
        let config = EsperarError::Configuration {
            message: "base_url missing".into(),
        };
        assert!(session.is_fatal());
        assert!(config.is_fatal());
        assert!(!EsperarError::ElementNotFound {
            locator: Locator::id("x"),
        }
        .is_fatal());
    }
}
