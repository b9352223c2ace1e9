//! Interaction retry: the act half of every locate/act cycle.
//!
//! A handle resolved by the evaluator can be invalidated by a re-render
//! before the action on it lands — the classic stale-reference race in
//! dynamic UIs. The old handle can never be reused, so the only safe
//! recovery is to rerun the whole locate+act sequence. [`Interactor`] does
//! exactly that, up to a small bounded number of attempts, and only for
//! staleness: every other failure propagates immediately.

use crate::config::Settings;
use crate::driver::{ElementHandle, UiDriver};
use crate::locator::Locator;
use crate::result::{EsperarError, EsperarResult};
use crate::wait::{ConditionEvaluator, WaitOptions, WaitStrategy};
use std::fmt;
use tracing::{debug, info, warn};

/// How many locate+act cycles one interaction may consume before failing.
///
/// Shared by all interactions; per-instance override via
/// [`Interactor::with_stale_retries`].
pub const STALE_RETRY_ATTEMPTS: u32 = 3;

/// Performs user interactions with transparent stale-handle recovery.
///
/// Methods return `Ok(&Self)` so page operations chain as an explicit
/// pipeline, each step yielding its own result:
///
/// ```
/// use esperar::interact::Interactor;
/// use esperar::locator::Locator;
/// use esperar::mock::{MockDriver, MockElement};
///
/// # fn main() -> esperar::result::EsperarResult<()> {
/// let driver = MockDriver::new()
///     .with_element(Locator::name("q"), MockElement::new())
///     .with_element(Locator::id("search"), MockElement::new());
/// let ui = Interactor::new(&driver);
/// ui.set_text(&Locator::name("q"), "badminton racquet")?
///     .click(&Locator::id("search"))?;
/// # Ok(())
/// # }
/// ```
pub struct Interactor<'d> {
    driver: &'d dyn UiDriver,
    options: WaitOptions,
    stale_retries: u32,
}

impl fmt::Debug for Interactor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interactor")
            .field("options", &self.options)
            .field("stale_retries", &self.stale_retries)
            .finish_non_exhaustive()
    }
}

impl<'d> Interactor<'d> {
    /// Interactor with default wait options
    #[must_use]
    pub fn new(driver: &'d dyn UiDriver) -> Self {
        Self {
            driver,
            options: WaitOptions::default(),
            stale_retries: STALE_RETRY_ATTEMPTS,
        }
    }

    /// Interactor with waits derived from resolved settings
    #[must_use]
    pub fn from_settings(driver: &'d dyn UiDriver, settings: &Settings) -> Self {
        Self {
            driver,
            options: WaitOptions::from_settings(settings),
            stale_retries: STALE_RETRY_ATTEMPTS,
        }
    }

    /// Interactor with explicit wait options
    #[must_use]
    pub const fn with_options(driver: &'d dyn UiDriver, options: WaitOptions) -> Self {
        Self {
            driver,
            options,
            stale_retries: STALE_RETRY_ATTEMPTS,
        }
    }

    /// Override the stale-handle attempt budget
    #[must_use]
    pub const fn with_stale_retries(mut self, attempts: u32) -> Self {
        self.stale_retries = attempts;
        self
    }

    /// The evaluator this interactor resolves elements with
    #[must_use]
    pub fn evaluator(&self) -> ConditionEvaluator<'d> {
        ConditionEvaluator::with_options(self.driver, self.options.clone())
    }

    /// Click an element once it is clickable
    ///
    /// # Errors
    ///
    /// [`EsperarError::InteractionFailed`] when the stale budget is
    /// exhausted; wait and driver failures propagate unchanged.
    pub fn click(&self, locator: &Locator) -> EsperarResult<&Self> {
        self.click_with(locator, WaitStrategy::Clickable)
    }

    /// Click an element resolved with an explicit strategy
    ///
    /// # Errors
    ///
    /// See [`Interactor::click`].
    pub fn click_with(
        &self,
        locator: &Locator,
        strategy: WaitStrategy,
    ) -> EsperarResult<&Self> {
        info!(%locator, "clicking");
        self.perform(locator, strategy, "click", |element| {
            self.driver.click(element)
        })?;
        Ok(self)
    }

    /// Replace an element's value with `text` once it is visible
    ///
    /// # Errors
    ///
    /// See [`Interactor::click`].
    pub fn set_text(&self, locator: &Locator, text: &str) -> EsperarResult<&Self> {
        self.set_text_with(locator, text, WaitStrategy::Visible)
    }

    /// Replace an element's value with `text`, resolving with an explicit
    /// strategy. The current value is cleared first.
    ///
    /// # Errors
    ///
    /// See [`Interactor::click`].
    pub fn set_text_with(
        &self,
        locator: &Locator,
        text: &str,
        strategy: WaitStrategy,
    ) -> EsperarResult<&Self> {
        info!(%locator, text, "entering text");
        self.perform(locator, strategy, "set_text", |element| {
            self.driver.clear(element)?;
            self.driver.set_text(element, text)
        })?;
        Ok(self)
    }

    /// Visible text of an element resolved with `strategy`
    ///
    /// # Errors
    ///
    /// Wait and driver failures propagate unchanged.
    pub fn text_of(&self, locator: &Locator, strategy: WaitStrategy) -> EsperarResult<String> {
        let element = self.evaluator().wait_for(locator, strategy)?;
        let text = self.driver.text(&element)?;
        debug!(%locator, text, "read element text");
        Ok(text)
    }

    /// Whether the element becomes visible within the wait budget
    #[must_use]
    pub fn is_displayed(&self, locator: &Locator) -> bool {
        self.evaluator()
            .wait_for(locator, WaitStrategy::Visible)
            .is_ok()
    }

    /// One interaction: up to `stale_retries` locate+act cycles. Only a
    /// stale reference consumes an attempt; anything else propagates.
    fn perform(
        &self,
        locator: &Locator,
        strategy: WaitStrategy,
        verb: &str,
        action: impl Fn(&ElementHandle) -> EsperarResult<()>,
    ) -> EsperarResult<()> {
        let mut attempts = 0;
        while attempts < self.stale_retries {
            let element = self.evaluator().wait_for(locator, strategy)?;
            match action(&element) {
                Ok(()) => {
                    debug!(%locator, verb, attempts = attempts + 1, "interaction succeeded");
                    return Ok(());
                }
                Err(EsperarError::StaleElement { .. }) => {
                    attempts += 1;
                    warn!(
                        %locator,
                        verb,
                        attempt = attempts,
                        budget = self.stale_retries,
                        "stale element reference, retrying locate+act"
                    );
                }
                Err(other) => return Err(other),
            }
        }
        Err(EsperarError::InteractionFailed {
            locator: locator.clone(),
            attempts: self.stale_retries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockDriver, MockElement};
    use std::time::Duration;

    fn fast() -> WaitOptions {
        WaitOptions::new()
            .with_timeout(Duration::from_millis(250))
            .with_poll_interval(Duration::from_millis(10))
    }

    fn ui(driver: &MockDriver) -> Interactor<'_> {
        Interactor::with_options(driver, fast())
    }

    mod click_tests {
        use super::*;

        #[test]
        fn test_click_ready_element() {
            let driver =
                MockDriver::new().with_element(Locator::id("go"), MockElement::new());
            ui(&driver).click(&Locator::id("go")).unwrap();
            assert_eq!(driver.action_count("click [id=go]"), 1);
        }

        #[test]
        fn test_recovers_from_staleness_within_budget() {
            // Two stale cycles, success on the third of three attempts
            let driver = MockDriver::new()
                .with_element(Locator::id("go"), MockElement::new().stale_for_actions(2));
            ui(&driver).click(&Locator::id("go")).unwrap();
            // Exactly three locate+act cycles were performed
            assert_eq!(driver.action_count("click [id=go]"), 3);
            assert_eq!(driver.action_count("stale"), 2);
        }

        #[test]
        fn test_exhausted_budget_reports_attempt_count() {
            let driver = MockDriver::new()
                .with_element(Locator::id("go"), MockElement::new().stale_for_actions(5));
            let err = ui(&driver).click(&Locator::id("go")).unwrap_err();
            match err {
                EsperarError::InteractionFailed { locator, attempts } => {
                    assert_eq!(locator, Locator::id("go"));
                    assert_eq!(attempts, STALE_RETRY_ATTEMPTS);
                }
                other => panic!("expected InteractionFailed, got {other:?}"),
            }
            assert_eq!(
                driver.action_count("stale"),
                STALE_RETRY_ATTEMPTS as usize
            );
        }

        #[test]
        fn test_non_stale_failure_is_not_retried() {
            // Element never becomes clickable: the wait times out on the
            // first cycle and no further attempts are made
            let driver = MockDriver::new()
                .with_element(Locator::id("go"), MockElement::new().disabled());
            let err = ui(&driver).click(&Locator::id("go")).unwrap_err();
            assert!(matches!(err, EsperarError::Timeout { .. }));
            assert_eq!(driver.action_count("click"), 0);
        }

        #[test]
        fn test_custom_stale_budget() {
            let driver = MockDriver::new()
                .with_element(Locator::id("go"), MockElement::new().stale_for_actions(1));
            let err = ui(&driver)
                .with_stale_retries(1)
                .click(&Locator::id("go"))
                .unwrap_err();
            assert!(matches!(
                err,
                EsperarError::InteractionFailed { attempts: 1, .. }
            ));
        }
    }

    mod set_text_tests {
        use super::*;

        #[test]
        fn test_set_text_clears_first() {
            let driver = MockDriver::new().with_element(
                Locator::name("q"),
                MockElement::new().with_text("old query"),
            );
            ui(&driver).set_text(&Locator::name("q"), "racquet").unwrap();
            assert_eq!(
                driver.actions(),
                vec!["clear [name=q]", "type [name=q]=racquet"]
            );
        }

        #[test]
        fn test_set_text_recovers_from_staleness() {
            let driver = MockDriver::new().with_element(
                Locator::name("q"),
                MockElement::new().stale_for_actions(1),
            );
            ui(&driver).set_text(&Locator::name("q"), "racquet").unwrap();
            assert_eq!(driver.action_count("type [name=q]=racquet"), 1);
        }
    }

    mod chaining_tests {
        use super::*;

        #[test]
        fn test_operations_chain() {
            let driver = MockDriver::new()
                .with_element(Locator::name("user"), MockElement::new())
                .with_element(Locator::name("pass"), MockElement::new())
                .with_element(Locator::id("login"), MockElement::new());
            let ui = ui(&driver);
            ui.set_text(&Locator::name("user"), "standard_user")
                .unwrap()
                .set_text(&Locator::name("pass"), "secret")
                .unwrap()
                .click(&Locator::id("login"))
                .unwrap();
            assert_eq!(driver.actions().len(), 5);
        }

        #[test]
        fn test_chain_stops_at_first_failure() {
            let driver =
                MockDriver::new().with_element(Locator::name("user"), MockElement::new());
            let ui = ui(&driver);
            let result = ui
                .set_text(&Locator::name("user"), "standard_user")
                .and_then(|ui| ui.click(&Locator::id("missing")));
            assert!(result.is_err());
        }
    }

    mod query_tests {
        use super::*;

        #[test]
        fn test_text_of() {
            let driver = MockDriver::new().with_element(
                Locator::css(".total"),
                MockElement::new().with_text("₹ 2,499"),
            );
            let total = ui(&driver)
                .text_of(&Locator::css(".total"), WaitStrategy::Visible)
                .unwrap();
            assert_eq!(total, "₹ 2,499");
        }

        #[test]
        fn test_is_displayed() {
            let driver = MockDriver::new()
                .with_element(Locator::id("shown"), MockElement::new())
                .with_element(Locator::id("hidden"), MockElement::new().hidden());
            let ui = ui(&driver);
            assert!(ui.is_displayed(&Locator::id("shown")));
            assert!(!ui.is_displayed(&Locator::id("hidden")));
            assert!(!ui.is_displayed(&Locator::id("absent")));
        }
    }
}
