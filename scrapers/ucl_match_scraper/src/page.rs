//! The browser-automation surface the extractor is written against.
//!
//! Backends: [`crate::chrome`] drives a real Chrome instance, and
//! [`crate::snapshot`] answers the same queries from saved HTML.

use async_trait::async_trait;
use regex::Regex;
use std::time::Duration;

use crate::error::BrowserError;

/// A CSS selector, optionally narrowed to elements whose text matches a
/// pattern.
#[derive(Debug, Clone)]
pub struct Locator {
    pub selector: String,
    pub has_text: Option<Regex>,
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            has_text: None,
        }
    }

    pub fn with_text(mut self, pattern: Regex) -> Self {
        self.has_text = Some(pattern);
        self
    }

    pub fn accepts_text(&self, text: &str) -> bool {
        self.has_text.as_ref().map_or(true, |re| re.is_match(text))
    }
}

/// One open page (tab). Element handles are only valid for the page that
/// produced them.
#[async_trait]
pub trait PageHandle: Send + Sync {
    type Element: Send + Sync;

    /// Loads `url` and returns once the DOM has been parsed.
    async fn navigate(&self, url: &str) -> Result<(), BrowserError>;

    /// All matching elements in document order.
    async fn locate_all(&self, locator: &Locator) -> Result<Vec<Self::Element>, BrowserError>;

    /// Matching descendants of `scope`, in document order.
    async fn locate_within(
        &self,
        scope: &Self::Element,
        locator: &Locator,
    ) -> Result<Vec<Self::Element>, BrowserError>;

    async fn locate_first(&self, locator: &Locator) -> Result<Option<Self::Element>, BrowserError> {
        Ok(self.locate_all(locator).await?.into_iter().next())
    }

    /// The element's `textContent`: every descendant text node, unstyled.
    async fn text(&self, element: &Self::Element) -> Result<String, BrowserError>;

    /// Text of the first later sibling of `element` whose tag is `tag`
    /// (e.g. the `dd` belonging to a `dt`).
    async fn sibling_text(
        &self,
        element: &Self::Element,
        tag: &str,
    ) -> Result<Option<String>, BrowserError>;

    async fn click(&self, element: &Self::Element) -> Result<(), BrowserError>;

    async fn wait(&self, duration: Duration);

    async fn close(&self) -> Result<(), BrowserError>;
}

/// A browser session: one context that hands out fresh pages.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    type Page: PageHandle;

    async fn new_page(&self) -> Result<Self::Page, BrowserError>;

    async fn close(&mut self) -> Result<(), BrowserError>;
}
