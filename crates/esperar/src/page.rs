//! Page object support.
//!
//! Concrete pages and their locator tables live in the embedding test
//! suite; the engine only defines the seam they plug into. A page object
//! names the URL fragment that identifies it and knows how to verify that
//! it is ready for interaction, using the same evaluator and interactor
//! every other operation goes through.

use crate::interact::Interactor;
use crate::result::EsperarResult;

/// A page or component of the application under test.
///
/// ```
/// use esperar::interact::Interactor;
/// use esperar::locator::Locator;
/// use esperar::page::PageObject;
/// use esperar::result::EsperarResult;
///
/// struct LoginPage {
///     username: Locator,
///     password: Locator,
///     submit: Locator,
/// }
///
/// impl LoginPage {
///     fn new() -> Self {
///         Self {
///             username: Locator::name("username"),
///             password: Locator::name("password"),
///             submit: Locator::css("button[type='submit']"),
///         }
///     }
///
///     fn login(&self, ui: &Interactor<'_>, user: &str, pass: &str) -> EsperarResult<()> {
///         ui.set_text(&self.username, user)?
///             .set_text(&self.password, pass)?
///             .click(&self.submit)?;
///         Ok(())
///     }
/// }
///
/// impl PageObject for LoginPage {
///     fn url_fragment(&self) -> &str {
///         "/login"
///     }
///
///     fn verify_loaded(&self, ui: &Interactor<'_>) -> EsperarResult<()> {
///         ui.evaluator()
///             .wait_for(&self.username, esperar::wait::WaitStrategy::Visible)?;
///         Ok(())
///     }
/// }
/// # let _ = LoginPage::new();
/// ```
pub trait PageObject {
    /// URL fragment that identifies this page (e.g. `/checkout`)
    fn url_fragment(&self) -> &str;

    /// Block until the page is ready for interaction
    ///
    /// # Errors
    ///
    /// Wait failures from the page's readiness checks.
    fn verify_loaded(&self, ui: &Interactor<'_>) -> EsperarResult<()> {
        let _ = ui;
        Ok(())
    }

    /// Page name for logging and reports
    fn page_name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Wait until the browser has navigated to this page, then verify it
    ///
    /// # Errors
    ///
    /// URL wait timeout, then any failure from [`PageObject::verify_loaded`].
    fn wait_until_open(&self, ui: &Interactor<'_>) -> EsperarResult<()> {
        ui.evaluator().wait_until_url_contains(self.url_fragment())?;
        self.verify_loaded(ui)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::Locator;
    use crate::mock::{MockDriver, MockElement};
    use crate::wait::{WaitOptions, WaitStrategy};
    use std::time::Duration;

    struct SearchPage;

    impl PageObject for SearchPage {
        fn url_fragment(&self) -> &str {
            "/search"
        }

        fn verify_loaded(&self, ui: &Interactor<'_>) -> EsperarResult<()> {
            ui.evaluator()
                .wait_for(&Locator::name("q"), WaitStrategy::Visible)?;
            Ok(())
        }
    }

    fn fast() -> WaitOptions {
        WaitOptions::new()
            .with_timeout(Duration::from_millis(200))
            .with_poll_interval(Duration::from_millis(10))
    }

    #[test]
    fn test_wait_until_open() {
        let driver =
            MockDriver::new().with_element(Locator::name("q"), MockElement::new());
        driver.set_url("https://shop.example.test/search?q=racquet");
        let ui = Interactor::with_options(&driver, fast());
        SearchPage.wait_until_open(&ui).unwrap();
    }

    #[test]
    fn test_wait_until_open_fails_on_wrong_page() {
        let driver = MockDriver::new();
        driver.set_url("https://shop.example.test/login");
        let ui = Interactor::with_options(&driver, fast());
        assert!(SearchPage.wait_until_open(&ui).is_err());
    }

    #[test]
    fn test_default_page_name_is_type_name() {
        assert!(SearchPage.page_name().contains("SearchPage"));
    }
}
