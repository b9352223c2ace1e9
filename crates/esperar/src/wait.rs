//! Condition evaluation: polling the live UI until an element is actionable.
//!
//! The evaluator owns the locate half of every locate/act cycle. Given a
//! locator and a [`WaitStrategy`] it polls the driver at a fixed sub-second
//! interval until the strategy's readiness predicate holds or the deadline
//! elapses; a timeout always surfaces as a typed failure carrying the
//! locator and the budget, never as a silent absent value. Recovery from
//! failures is the caller's decision — the evaluator itself retries nothing.

use crate::driver::{ElementHandle, UiDriver};
use crate::locator::Locator;
use crate::result::{EsperarError, EsperarResult};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::debug;

/// Default explicit wait budget (seconds)
pub const DEFAULT_EXPLICIT_WAIT_SECS: u64 = 15;

/// Default polling interval (milliseconds)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

/// Readiness predicate applied while polling for an element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WaitStrategy {
    /// Present, displayed, and enabled for interaction
    #[default]
    Clickable,
    /// Present and rendered with a non-zero bounding box
    Visible,
    /// Exists in the current document, regardless of visibility
    Present,
    /// Skip polling entirely and fetch immediately
    None,
}

impl fmt::Display for WaitStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Clickable => "clickable",
            Self::Visible => "visible",
            Self::Present => "present",
            Self::None => "none",
        };
        write!(f, "{name}")
    }
}

/// Timeout and polling cadence for one wait
#[derive(Debug, Clone)]
pub struct WaitOptions {
    /// Total budget before the wait fails
    pub timeout: Duration,
    /// Pause between readiness probes
    pub poll_interval: Duration,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_EXPLICIT_WAIT_SECS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }
}

impl WaitOptions {
    /// Create options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the total wait budget
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the polling interval
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Derive options from resolved framework settings
    #[must_use]
    pub fn from_settings(settings: &crate::config::Settings) -> Self {
        Self {
            timeout: settings.explicit_wait(),
            poll_interval: settings.poll_interval(),
        }
    }

    fn timeout_ms(&self) -> u64 {
        u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX)
    }
}

/// Polls the live UI until a readiness condition holds or a deadline elapses
pub struct ConditionEvaluator<'d> {
    driver: &'d dyn UiDriver,
    options: WaitOptions,
}

impl fmt::Debug for ConditionEvaluator<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConditionEvaluator")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<'d> ConditionEvaluator<'d> {
    /// Evaluator with default options
    #[must_use]
    pub fn new(driver: &'d dyn UiDriver) -> Self {
        Self {
            driver,
            options: WaitOptions::default(),
        }
    }

    /// Evaluator with explicit options
    #[must_use]
    pub const fn with_options(driver: &'d dyn UiDriver, options: WaitOptions) -> Self {
        Self { driver, options }
    }

    /// Wait for an element to satisfy `strategy`.
    ///
    /// `WaitStrategy::None` performs a single immediate lookup with no
    /// polling, for callers that already know the element is ready or want
    /// a synchronous failure.
    ///
    /// # Errors
    ///
    /// [`EsperarError::Timeout`] carrying the locator and the configured
    /// budget once the deadline elapses; immediate driver failures
    /// propagate as-is.
    pub fn wait_for(
        &self,
        locator: &Locator,
        strategy: WaitStrategy,
    ) -> EsperarResult<ElementHandle> {
        debug!(%locator, %strategy, "waiting for element");
        if strategy == WaitStrategy::None {
            return self.driver.find_element(locator);
        }

        self.poll(
            || self.probe(locator, strategy),
            || EsperarError::Timeout {
                locator: locator.clone(),
                timeout_ms: self.options.timeout_ms(),
            },
        )
    }

    /// Wait until at least one element matches `locator` and return every
    /// current match (`Present` semantics — no waiting for a stable count).
    ///
    /// # Errors
    ///
    /// [`EsperarError::Timeout`] once the deadline elapses.
    pub fn wait_for_all(&self, locator: &Locator) -> EsperarResult<Vec<ElementHandle>> {
        debug!(%locator, "waiting for at least one match");
        self.poll(
            || {
                let matches = self.driver.find_elements(locator)?;
                Ok(if matches.is_empty() {
                    None
                } else {
                    Some(matches)
                })
            },
            || EsperarError::Timeout {
                locator: locator.clone(),
                timeout_ms: self.options.timeout_ms(),
            },
        )
    }

    /// Wait until no displayed element matches `locator`
    ///
    /// # Errors
    ///
    /// [`EsperarError::Timeout`] once the deadline elapses.
    pub fn wait_for_invisibility(&self, locator: &Locator) -> EsperarResult<()> {
        debug!(%locator, "waiting for invisibility");
        self.poll(
            || match self.driver.find_element(locator) {
                Ok(handle) => match self.driver.is_displayed(&handle) {
                    Ok(true) => Ok(None),
                    // Gone or mid-removal counts as invisible
                    Ok(false) | Err(EsperarError::StaleElement { .. }) => Ok(Some(())),
                    Err(other) => Err(other),
                },
                Err(EsperarError::ElementNotFound { .. }) => Ok(Some(())),
                Err(other) => Err(other),
            },
            || EsperarError::Timeout {
                locator: locator.clone(),
                timeout_ms: self.options.timeout_ms(),
            },
        )
    }

    /// Wait until the element's visible text contains `needle`
    ///
    /// # Errors
    ///
    /// [`EsperarError::Timeout`] once the deadline elapses.
    pub fn wait_for_text(
        &self,
        locator: &Locator,
        needle: &str,
    ) -> EsperarResult<ElementHandle> {
        debug!(%locator, needle, "waiting for element text");
        self.poll(
            || match self.probe(locator, WaitStrategy::Visible)? {
                Some(handle) => match self.driver.text(&handle) {
                    Ok(text) if text.contains(needle) => Ok(Some(handle)),
                    Ok(_) => Ok(None),
                    Err(EsperarError::StaleElement { .. }) => Ok(None),
                    Err(other) => Err(other),
                },
                Option::None => Ok(None),
            },
            || EsperarError::Timeout {
                locator: locator.clone(),
                timeout_ms: self.options.timeout_ms(),
            },
        )
    }

    /// Wait until the current URL contains `needle`
    ///
    /// # Errors
    ///
    /// [`EsperarError::ConditionTimeout`] once the deadline elapses.
    pub fn wait_until_url_contains(&self, needle: &str) -> EsperarResult<()> {
        debug!(needle, "waiting for URL");
        self.poll(
            || {
                Ok(self
                    .driver
                    .current_url()?
                    .contains(needle)
                    .then_some(()))
            },
            || EsperarError::ConditionTimeout {
                description: format!("url contains '{needle}'"),
                timeout_ms: self.options.timeout_ms(),
            },
        )
    }

    /// Wait until an arbitrary predicate returns true
    ///
    /// # Errors
    ///
    /// [`EsperarError::ConditionTimeout`] carrying `description` once the
    /// deadline elapses.
    pub fn wait_until<F>(&self, predicate: F, description: &str) -> EsperarResult<()>
    where
        F: Fn() -> bool,
    {
        debug!(description, "waiting for condition");
        self.poll(
            || Ok(predicate().then_some(())),
            || EsperarError::ConditionTimeout {
                description: description.to_string(),
                timeout_ms: self.options.timeout_ms(),
            },
        )
    }

    /// Shared polling loop. The probe returns `Ok(Some(_))` when the
    /// condition holds, `Ok(None)` to keep polling, and `Err` for failures
    /// that should stop the wait immediately. One final probe runs after
    /// the deadline so a condition satisfied during the last sleep is not
    /// reported as a timeout; total blocking time stays within
    /// timeout + one poll interval.
    fn poll<T>(
        &self,
        probe: impl Fn() -> EsperarResult<Option<T>>,
        on_timeout: impl FnOnce() -> EsperarError,
    ) -> EsperarResult<T> {
        let start = Instant::now();
        while start.elapsed() < self.options.timeout {
            if let Some(value) = probe()? {
                return Ok(value);
            }
            std::thread::sleep(self.options.poll_interval);
        }
        if let Some(value) = probe()? {
            return Ok(value);
        }
        Err(on_timeout())
    }

    /// Evaluate one readiness probe. A stale read mid-probe means the
    /// document re-rendered under us; the element is simply not ready yet.
    fn probe(
        &self,
        locator: &Locator,
        strategy: WaitStrategy,
    ) -> EsperarResult<Option<ElementHandle>> {
        let handle = match self.driver.find_element(locator) {
            Ok(handle) => handle,
            Err(EsperarError::ElementNotFound { .. } | EsperarError::StaleElement { .. }) => {
                return Ok(None)
            }
            Err(other) => return Err(other),
        };

        let ready = match strategy {
            WaitStrategy::Present => true,
            WaitStrategy::Visible => {
                self.read(self.driver.is_displayed(&handle))?.unwrap_or(false)
                    && self
                        .read(self.driver.bounding_box(&handle))?
                        .flatten()
                        .is_some_and(|b| !b.is_empty())
            }
            WaitStrategy::Clickable => {
                self.read(self.driver.is_displayed(&handle))?.unwrap_or(false)
                    && self.read(self.driver.is_enabled(&handle))?.unwrap_or(false)
            }
            WaitStrategy::None => unreachable!("None is resolved before polling"),
        };

        Ok(ready.then_some(handle))
    }

    /// Map a stale failure during a state read to "not ready"
    fn read<T>(&self, result: EsperarResult<T>) -> EsperarResult<Option<T>> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(EsperarError::StaleElement { .. }) => Ok(None),
            Err(other) => Err(other),
        }
    }
}
