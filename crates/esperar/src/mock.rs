//! Scripted in-memory driver for deterministic engine tests.
//!
//! [`MockDriver`] implements [`UiDriver`] against a scripted DOM: elements
//! can appear after a delay, disappear again, report themselves hidden or
//! disabled, and raise a configurable number of synthetic stale-reference
//! failures. That is enough to exercise every wait and retry path without a
//! browser, and embedding projects can use it to test their own page
//! objects.

use crate::config::Settings;
use crate::driver::{BoundingBox, ElementHandle, SessionFactory, UiDriver};
use crate::locator::Locator;
use crate::result::{EsperarError, EsperarResult};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Scripted behavior for one element in the mock DOM
#[derive(Debug, Clone)]
pub struct MockElement {
    displayed: bool,
    enabled: bool,
    text: String,
    bounding_box: Option<BoundingBox>,
    appears_after: Duration,
    disappears_after: Option<Duration>,
    stale_actions: u32,
    stale_reads: u32,
}

impl Default for MockElement {
    fn default() -> Self {
        Self::new()
    }
}

impl MockElement {
    /// A visible, enabled element with a non-empty bounding box
    #[must_use]
    pub fn new() -> Self {
        Self {
            displayed: true,
            enabled: true,
            text: String::new(),
            bounding_box: Some(BoundingBox::new(0.0, 0.0, 120.0, 32.0)),
            appears_after: Duration::ZERO,
            disappears_after: None,
            stale_actions: 0,
            stale_reads: 0,
        }
    }

    /// Present in the document but not displayed
    #[must_use]
    pub const fn hidden(mut self) -> Self {
        self.displayed = false;
        self.bounding_box = None;
        self
    }

    /// Displayed but not accepting interaction
    #[must_use]
    pub const fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Displayed but rendered with a zero-area bounding box
    #[must_use]
    pub const fn zero_sized(mut self) -> Self {
        self.bounding_box = Some(BoundingBox::new(0.0, 0.0, 0.0, 0.0));
        self
    }

    /// Visible text content
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Absent from the document until `delay` after driver creation
    #[must_use]
    pub const fn appears_after(mut self, delay: Duration) -> Self {
        self.appears_after = delay;
        self
    }

    /// Removed from the document `delay` after driver creation
    #[must_use]
    pub const fn disappears_after(mut self, delay: Duration) -> Self {
        self.disappears_after = Some(delay);
        self
    }

    /// The first `count` clicks / text entries on this element raise a
    /// stale-reference failure (a re-render between resolve and act)
    #[must_use]
    pub const fn stale_for_actions(mut self, count: u32) -> Self {
        self.stale_actions = count;
        self
    }

    /// The first `count` state reads raise a stale-reference failure
    #[must_use]
    pub const fn stale_for_reads(mut self, count: u32) -> Self {
        self.stale_reads = count;
        self
    }
}

#[derive(Debug)]
struct Entry {
    locator: Locator,
    handle: ElementHandle,
    element: MockElement,
}

/// In-memory [`UiDriver`] over a scripted DOM
#[derive(Debug)]
pub struct MockDriver {
    started: Instant,
    entries: Mutex<Vec<Entry>>,
    url: Mutex<String>,
    title: Mutex<String>,
    log: Mutex<Vec<String>>,
    fail_quit: bool,
    quits: AtomicU32,
    shared_quits: Option<Arc<AtomicU32>>,
}

impl Default for MockDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDriver {
    /// An empty mock session
    #[must_use]
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            entries: Mutex::new(Vec::new()),
            url: Mutex::new(String::new()),
            title: Mutex::new(String::new()),
            log: Mutex::new(Vec::new()),
            fail_quit: false,
            quits: AtomicU32::new(0),
            shared_quits: None,
        }
    }

    /// Script an element into the DOM
    #[must_use]
    pub fn with_element(self, locator: Locator, element: MockElement) -> Self {
        {
            let mut entries = self.entries.lock().unwrap();
            let handle = ElementHandle::new(format!("e{}", entries.len()));
            entries.push(Entry {
                locator,
                handle,
                element,
            });
        }
        self
    }

    /// Make `quit` fail, for teardown-failure tests
    #[must_use]
    pub const fn failing_quit(mut self) -> Self {
        self.fail_quit = true;
        self
    }

    /// Also count `quit` calls in `counter`, observable after the driver
    /// has been boxed behind the trait
    #[must_use]
    pub fn with_shared_quit_counter(mut self, counter: Arc<AtomicU32>) -> Self {
        self.shared_quits = Some(counter);
        self
    }

    /// Set the current document URL
    pub fn set_url(&self, url: impl Into<String>) {
        *self.url.lock().unwrap() = url.into();
    }

    /// Set the current document title
    pub fn set_title(&self, title: impl Into<String>) {
        *self.title.lock().unwrap() = title.into();
    }

    /// Every mutating call recorded so far, in order
    #[must_use]
    pub fn actions(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    /// How many recorded actions contain `needle`
    #[must_use]
    pub fn action_count(&self, needle: &str) -> usize {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.contains(needle))
            .count()
    }

    /// How many times `quit` has been called
    #[must_use]
    pub fn quit_count(&self) -> u32 {
        self.quits.load(Ordering::SeqCst)
    }

    fn present(&self, element: &MockElement) -> bool {
        let elapsed = self.started.elapsed();
        elapsed >= element.appears_after
            && element.disappears_after.map_or(true, |gone| elapsed < gone)
    }

    fn record(&self, action: String) {
        self.log.lock().unwrap().push(action);
    }

    /// Run `f` against the entry behind `handle`. An element that has left
    /// the document since resolution surfaces as a stale reference, exactly
    /// like a re-rendered DOM would.
    fn with_entry<T>(
        &self,
        handle: &ElementHandle,
        f: impl FnOnce(&Self, &mut Entry) -> EsperarResult<T>,
    ) -> EsperarResult<T> {
        let mut entries = self.entries.lock().unwrap();
        let entry = entries
            .iter_mut()
            .find(|e| e.handle == *handle)
            .ok_or_else(|| EsperarError::Driver {
                message: format!("unknown element handle {}", handle.id),
            })?;
        if !self.present(&entry.element) {
            return Err(EsperarError::StaleElement {
                locator: entry.locator.clone(),
            });
        }
        f(self, entry)
    }

    fn checked_read<T>(entry: &mut Entry, value: T) -> EsperarResult<T> {
        if entry.element.stale_reads > 0 {
            entry.element.stale_reads -= 1;
            return Err(EsperarError::StaleElement {
                locator: entry.locator.clone(),
            });
        }
        Ok(value)
    }
}

impl UiDriver for MockDriver {
    fn find_element(&self, locator: &Locator) -> EsperarResult<ElementHandle> {
        let entries = self.entries.lock().unwrap();
        entries
            .iter()
            .find(|e| e.locator == *locator && self.present(&e.element))
            .map(|e| e.handle.clone())
            .ok_or_else(|| EsperarError::ElementNotFound {
                locator: locator.clone(),
            })
    }

    fn find_elements(&self, locator: &Locator) -> EsperarResult<Vec<ElementHandle>> {
        let entries = self.entries.lock().unwrap();
        Ok(entries
            .iter()
            .filter(|e| e.locator == *locator && self.present(&e.element))
            .map(|e| e.handle.clone())
            .collect())
    }

    fn is_displayed(&self, element: &ElementHandle) -> EsperarResult<bool> {
        self.with_entry(element, |_, entry| {
            let displayed = entry.element.displayed;
            Self::checked_read(entry, displayed)
        })
    }

    fn is_enabled(&self, element: &ElementHandle) -> EsperarResult<bool> {
        self.with_entry(element, |_, entry| {
            let enabled = entry.element.enabled;
            Self::checked_read(entry, enabled)
        })
    }

    fn bounding_box(&self, element: &ElementHandle) -> EsperarResult<Option<BoundingBox>> {
        self.with_entry(element, |_, entry| {
            let boxed = if entry.element.displayed {
                entry.element.bounding_box
            } else {
                None
            };
            Self::checked_read(entry, boxed)
        })
    }

    fn text(&self, element: &ElementHandle) -> EsperarResult<String> {
        self.with_entry(element, |_, entry| {
            let text = entry.element.text.clone();
            Self::checked_read(entry, text)
        })
    }

    fn click(&self, element: &ElementHandle) -> EsperarResult<()> {
        self.with_entry(element, |driver, entry| {
            if entry.element.stale_actions > 0 {
                entry.element.stale_actions -= 1;
                driver.record(format!("click {} -> stale", entry.locator));
                return Err(EsperarError::StaleElement {
                    locator: entry.locator.clone(),
                });
            }
            driver.record(format!("click {}", entry.locator));
            Ok(())
        })
    }

    fn clear(&self, element: &ElementHandle) -> EsperarResult<()> {
        self.with_entry(element, |driver, entry| {
            entry.element.text.clear();
            driver.record(format!("clear {}", entry.locator));
            Ok(())
        })
    }

    fn set_text(&self, element: &ElementHandle, text: &str) -> EsperarResult<()> {
        self.with_entry(element, |driver, entry| {
            if entry.element.stale_actions > 0 {
                entry.element.stale_actions -= 1;
                driver.record(format!("type {} -> stale", entry.locator));
                return Err(EsperarError::StaleElement {
                    locator: entry.locator.clone(),
                });
            }
            entry.element.text = text.to_string();
            driver.record(format!("type {}={text}", entry.locator));
            Ok(())
        })
    }

    fn current_url(&self) -> EsperarResult<String> {
        Ok(self.url.lock().unwrap().clone())
    }

    fn title(&self) -> EsperarResult<String> {
        Ok(self.title.lock().unwrap().clone())
    }

    fn screenshot(&self) -> EsperarResult<Vec<u8>> {
        // PNG magic header is enough for report-attachment tests
        Ok(vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A])
    }

    fn quit(&self) -> EsperarResult<()> {
        self.quits.fetch_add(1, Ordering::SeqCst);
        if let Some(counter) = &self.shared_quits {
            counter.fetch_add(1, Ordering::SeqCst);
        }
        if self.fail_quit {
            return Err(EsperarError::Driver {
                message: "browser process already gone".into(),
            });
        }
        Ok(())
    }
}

/// [`SessionFactory`] producing one scripted [`MockDriver`] per session
pub struct MockSessionFactory {
    builder: Box<dyn Fn() -> MockDriver + Send + Sync>,
    created: AtomicU32,
}

impl std::fmt::Debug for MockSessionFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSessionFactory")
            .field("created", &self.created)
            .finish_non_exhaustive()
    }
}

impl MockSessionFactory {
    /// Build sessions by calling `builder` once per `create`
    #[must_use]
    pub fn new(builder: impl Fn() -> MockDriver + Send + Sync + 'static) -> Self {
        Self {
            builder: Box::new(builder),
            created: AtomicU32::new(0),
        }
    }

    /// How many sessions have been created
    #[must_use]
    pub fn created(&self) -> u32 {
        self.created.load(Ordering::SeqCst)
    }
}

impl SessionFactory for MockSessionFactory {
    fn create(&self, _settings: &Settings) -> EsperarResult<Box<dyn UiDriver>> {
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new((self.builder)()))
    }
}

/// [`SessionFactory`] whose sessions always fail to launch
#[derive(Debug, Default)]
pub struct FailingSessionFactory;

impl SessionFactory for FailingSessionFactory {
    fn create(&self, settings: &Settings) -> EsperarResult<Box<dyn UiDriver>> {
        Err(EsperarError::SessionCreation {
            message: format!("unable to launch {}", settings.browser),
        })
    }
}
