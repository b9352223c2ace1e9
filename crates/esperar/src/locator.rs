//! Locator abstraction for describing how to find UI elements.
//!
//! A [`Locator`] is an opaque, immutable description of how to find
//! zero-or-more elements on a page. Two locators are equal iff their selector
//! kind and selector value match, which makes them usable as map keys in
//! locator tables and in the mock driver's scripted DOM.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Selector kind + value for locating elements
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Selector {
    /// CSS selector (e.g. `button.primary`)
    Css(String),
    /// XPath expression
    XPath(String),
    /// Element id attribute
    Id(String),
    /// Element name attribute
    Name(String),
    /// Exact visible text content
    Text(String),
}

impl Selector {
    /// Short tag for the selector kind, used in diagnostics
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Css(_) => "css",
            Self::XPath(_) => "xpath",
            Self::Id(_) => "id",
            Self::Name(_) => "name",
            Self::Text(_) => "text",
        }
    }

    /// The raw selector value
    #[must_use]
    pub fn value(&self) -> &str {
        match self {
            Self::Css(v) | Self::XPath(v) | Self::Id(v) | Self::Name(v) | Self::Text(v) => v,
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.kind(), self.value())
    }
}

/// An opaque, immutable description of how to find UI elements
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Locator {
    selector: Selector,
}

impl Locator {
    /// Create a locator from a selector
    #[must_use]
    pub const fn from_selector(selector: Selector) -> Self {
        Self { selector }
    }

    /// Create a CSS locator
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::from_selector(Selector::Css(selector.into()))
    }

    /// Create an XPath locator
    #[must_use]
    pub fn xpath(expression: impl Into<String>) -> Self {
        Self::from_selector(Selector::XPath(expression.into()))
    }

    /// Create an id-attribute locator
    #[must_use]
    pub fn id(id: impl Into<String>) -> Self {
        Self::from_selector(Selector::Id(id.into()))
    }

    /// Create a name-attribute locator
    #[must_use]
    pub fn name(name: impl Into<String>) -> Self {
        Self::from_selector(Selector::Name(name.into()))
    }

    /// Create a visible-text locator
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::from_selector(Selector::Text(text.into()))
    }

    /// Build an XPath locator from a template with a single `{}` placeholder.
    ///
    /// Dynamic tables and product listings need locators parameterized by a
    /// runtime value:
    ///
    /// ```
    /// use esperar::locator::Locator;
    ///
    /// let row = Locator::xpath_template("//tr[td[text()='{}']]", "YONEX Smash Badminton Racquet");
    /// assert_eq!(
    ///     row,
    ///     Locator::xpath("//tr[td[text()='YONEX Smash Badminton Racquet']]")
    /// );
    /// ```
    #[must_use]
    pub fn xpath_template(template: &str, value: &str) -> Self {
        Self::xpath(template.replacen("{}", value, 1))
    }

    /// The underlying selector
    #[must_use]
    pub const fn selector(&self) -> &Selector {
        &self.selector
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.selector)
    }
}
