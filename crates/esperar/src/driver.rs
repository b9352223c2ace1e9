//! Abstract UI driver seam.
//!
//! The engine never talks to a browser directly. It issues read-only queries
//! (find, visibility, enabled state, geometry) and per-interaction mutating
//! calls (click, clear, set text) through [`UiDriver`], and obtains fresh
//! sessions through [`SessionFactory`]. Launching and wiring an actual
//! browser binding behind these traits is the embedding project's concern.
//!
//! Any method taking an [`ElementHandle`] may fail with
//! [`StaleElement`](crate::result::EsperarError::StaleElement): handles are
//! live references into the document and a re-render can invalidate them
//! between resolution and use.

use crate::config::Settings;
use crate::locator::Locator;
use crate::result::EsperarResult;
use serde::{Deserialize, Serialize};

/// Axis-aligned element geometry in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Left edge
    pub x: f64,
    /// Top edge
    pub y: f64,
    /// Width
    pub width: f64,
    /// Height
    pub height: f64,
}

impl BoundingBox {
    /// Create a bounding box
    #[must_use]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// A zero-area box renders nothing and is not considered visible
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// A live reference to a resolved element.
///
/// The handle is only as fresh as the moment it was resolved; callers that
/// act on one must be prepared for staleness.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementHandle {
    /// Driver-assigned identifier for the live element
    pub id: String,
}

impl ElementHandle {
    /// Create a handle from a driver-assigned id
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Synchronous browser-control primitives the engine is built on.
///
/// Implementations wrap one live browser session. All methods take `&self`;
/// implementations that need mutability use interior locking, since one
/// session is only ever driven by its owning worker thread.
pub trait UiDriver: Send + Sync {
    /// Resolve the first element matching `locator`
    ///
    /// # Errors
    ///
    /// [`ElementNotFound`](crate::result::EsperarError::ElementNotFound) if
    /// nothing matches right now.
    fn find_element(&self, locator: &Locator) -> EsperarResult<ElementHandle>;

    /// Resolve every element matching `locator` (possibly none)
    ///
    /// # Errors
    ///
    /// Driver-level failures only; no matches is `Ok(vec![])`.
    fn find_elements(&self, locator: &Locator) -> EsperarResult<Vec<ElementHandle>>;

    /// Whether the element is rendered and displayed
    ///
    /// # Errors
    ///
    /// Stale handle, or driver-level failure.
    fn is_displayed(&self, element: &ElementHandle) -> EsperarResult<bool>;

    /// Whether the element accepts interaction
    ///
    /// # Errors
    ///
    /// Stale handle, or driver-level failure.
    fn is_enabled(&self, element: &ElementHandle) -> EsperarResult<bool>;

    /// Element geometry; `None` when the element is not rendered
    ///
    /// # Errors
    ///
    /// Stale handle, or driver-level failure.
    fn bounding_box(&self, element: &ElementHandle) -> EsperarResult<Option<BoundingBox>>;

    /// Visible text content of the element
    ///
    /// # Errors
    ///
    /// Stale handle, or driver-level failure.
    fn text(&self, element: &ElementHandle) -> EsperarResult<String>;

    /// Click the element
    ///
    /// # Errors
    ///
    /// Stale handle, or driver-level failure.
    fn click(&self, element: &ElementHandle) -> EsperarResult<()>;

    /// Clear the element's current value
    ///
    /// # Errors
    ///
    /// Stale handle, or driver-level failure.
    fn clear(&self, element: &ElementHandle) -> EsperarResult<()>;

    /// Type `text` into the element
    ///
    /// # Errors
    ///
    /// Stale handle, or driver-level failure.
    fn set_text(&self, element: &ElementHandle, text: &str) -> EsperarResult<()>;

    /// URL of the current document
    ///
    /// # Errors
    ///
    /// Driver-level failure.
    fn current_url(&self) -> EsperarResult<String>;

    /// Title of the current document
    ///
    /// # Errors
    ///
    /// Driver-level failure.
    fn title(&self) -> EsperarResult<String>;

    /// Capture the current viewport as PNG bytes
    ///
    /// # Errors
    ///
    /// Driver-level failure.
    fn screenshot(&self) -> EsperarResult<Vec<u8>>;

    /// Tear down the underlying session
    ///
    /// # Errors
    ///
    /// Driver-level failure. The session registry treats teardown failures
    /// as best-effort: logged and swallowed, never masking a test outcome.
    fn quit(&self) -> EsperarResult<()>;
}

/// Creates one fresh browser session per worker thread.
pub trait SessionFactory: Send + Sync {
    /// Launch a new session configured from `settings`
    ///
    /// # Errors
    ///
    /// [`SessionCreation`](crate::result::EsperarError::SessionCreation) —
    /// fatal; the registry never retries it.
    fn create(&self, settings: &Settings) -> EsperarResult<Box<dyn UiDriver>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounding_box_emptiness() {
        assert!(BoundingBox::default().is_empty());
        assert!(BoundingBox::new(10.0, 10.0, 0.0, 20.0).is_empty());
        assert!(!BoundingBox::new(0.0, 0.0, 120.0, 32.0).is_empty());
    }

    #[test]
    fn test_element_handle_equality() {
        assert_eq!(ElementHandle::new("e0"), ElementHandle::new("e0"));
        assert_ne!(ElementHandle::new("e0"), ElementHandle::new("e1"));
    }
}
