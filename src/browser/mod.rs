//! Browser capability interface.
//!
//! The login and passcode flows only need three things from a browser: go to
//! a URL, find an element (with a bounded wait), and report where the browser
//! currently is. [`Browser`] and [`BrowserElement`] capture exactly that, so
//! the flows can be driven by a real WebDriver session or by a scripted fake.
//!
//! # Lookup semantics
//!
//! [`Browser::find`] waits up to the implementation's element timeout. An
//! element that is structurally absent from a fully rendered page fails with
//! [`FederationError::ElementMissing`]; a wait that elapses before the page
//! could show it fails with [`FederationError::ElementTimeout`]. The WebDriver
//! adapter tells the two apart by the document's `readyState` once the wait
//! elapses.
//!
//! [`FederationError::ElementTimeout`]: crate::error::FederationError::ElementTimeout
//! [`FederationError::ElementMissing`]: crate::error::FederationError::ElementMissing

#[cfg(feature = "webdriver")]
pub mod webdriver;

#[cfg(feature = "webdriver")]
pub use webdriver::{WebDriverBrowser, WebDriverElement};

use crate::error::FederationResult;
use std::fmt;
use std::future::Future;

/// How to locate an element on the current page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Locator {
    /// CSS selector
    Css(String),
    /// Element `id` attribute
    Id(String),
    /// Form field `name` attribute
    Name(String),
    /// Anchor whose visible text equals the given text exactly
    LinkText(String),
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    pub fn id(id: impl Into<String>) -> Self {
        Self::Id(id.into())
    }

    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    pub fn link_text(text: impl Into<String>) -> Self {
        Self::LinkText(text.into())
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Css(selector) => write!(f, "css `{selector}`"),
            Self::Id(id) => write!(f, "id `{id}`"),
            Self::Name(name) => write!(f, "name `{name}`"),
            Self::LinkText(text) => write!(f, "link text `{text}`"),
        }
    }
}

/// Handle to an element found on the current page.
pub trait BrowserElement: Send + Sync {
    /// Visible text of the element.
    fn text(&self) -> impl Future<Output = FederationResult<String>> + Send;

    fn click(&self) -> impl Future<Output = FederationResult<()>> + Send;

    /// Clear the value of an input field.
    fn clear(&self) -> impl Future<Output = FederationResult<()>> + Send;

    /// Type text into an input field.
    fn send_keys(&self, text: &str) -> impl Future<Output = FederationResult<()>> + Send;
}

/// A single stateful browser session.
///
/// Sessions keep cookies between calls, so an identity-provider session
/// established by one flow is still present for the next one.
pub trait Browser: Send + Sync {
    type Element: BrowserElement;

    /// Navigate to `url` and wait for the page load to finish.
    fn navigate(&self, url: &str) -> impl Future<Output = FederationResult<()>> + Send;

    /// Find an element, waiting a bounded time for it to appear.
    fn find(
        &self,
        locator: &Locator,
    ) -> impl Future<Output = FederationResult<Self::Element>> + Send;

    /// The URL the browser is currently showing.
    fn current_url(&self) -> impl Future<Output = FederationResult<String>> + Send;
}

/// Find an element and return its visible text.
pub async fn text_of<B: Browser>(browser: &B, locator: &Locator) -> FederationResult<String> {
    browser.find(locator).await?.text().await
}
