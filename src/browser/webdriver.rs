//! WebDriver-backed [`Browser`] implementation.
//!
//! Wraps a `fantoccini` client connected to a WebDriver endpoint
//! (chromedriver, geckodriver, a Selenium grid). Every element lookup is a
//! bounded wait of `element_timeout`.
//!
//! WebDriver waits retry on "no such element", so an element that never
//! appears always ends in a wait timeout. The document's `readyState` then
//! decides the error: a fully loaded page without the element reports
//! [`FederationError::ElementMissing`], a page still loading reports
//! [`FederationError::ElementTimeout`].

use super::{Browser, BrowserElement, Locator};
use crate::error::{FederationError, FederationResult};
use fantoccini::elements::Element;
use fantoccini::error::CmdError;
use fantoccini::{Client, ClientBuilder};
use log::debug;
use std::time::Duration;

/// A live WebDriver session.
pub struct WebDriverBrowser {
    client: Client,
    element_timeout: Duration,
}

impl WebDriverBrowser {
    /// Open a new session against the WebDriver endpoint.
    pub async fn connect(webdriver_url: &str, element_timeout: Duration) -> FederationResult<Self> {
        let client = ClientBuilder::native()
            .connect(webdriver_url)
            .await
            .map_err(|e| {
                FederationError::driver(format!(
                    "cannot open WebDriver session at {webdriver_url}: {e}"
                ))
            })?;
        debug!("WebDriver session opened at {}", webdriver_url);
        Ok(Self::from_client(client, element_timeout))
    }

    /// Wrap an already connected client.
    pub fn from_client(client: Client, element_timeout: Duration) -> Self {
        Self {
            client,
            element_timeout,
        }
    }

    /// End the session and close the browser window.
    pub async fn close(self) -> FederationResult<()> {
        self.client.close().await.map_err(command_error)
    }

    async fn page_loaded(&self) -> bool {
        match self.client.execute("return document.readyState", Vec::new()).await {
            Ok(state) => state == "complete",
            Err(e) => {
                debug!("Cannot read document.readyState: {}", e);
                false
            }
        }
    }
}

impl Browser for WebDriverBrowser {
    type Element = WebDriverElement;

    async fn navigate(&self, url: &str) -> FederationResult<()> {
        debug!("Navigating to {}", url);
        self.client.goto(url).await.map_err(command_error)
    }

    async fn find(&self, locator: &Locator) -> FederationResult<WebDriverElement> {
        let name_selector;
        let target = match locator {
            Locator::Css(selector) => fantoccini::Locator::Css(selector),
            Locator::Id(id) => fantoccini::Locator::Id(id),
            Locator::LinkText(text) => fantoccini::Locator::LinkText(text),
            Locator::Name(name) => {
                name_selector = format!("[name=\"{}\"]", name.replace('"', "\\\""));
                fantoccini::Locator::Css(&name_selector)
            }
        };

        match self
            .client
            .wait()
            .at_most(self.element_timeout)
            .for_element(target)
            .await
        {
            Ok(element) => Ok(WebDriverElement { element }),
            Err(e) => {
                let page_loaded = matches!(e, CmdError::WaitTimeout) && self.page_loaded().await;
                Err(lookup_error(locator, self.element_timeout, e, page_loaded))
            }
        }
    }

    async fn current_url(&self) -> FederationResult<String> {
        let url = self.client.current_url().await.map_err(command_error)?;
        Ok(url.to_string())
    }
}

/// An element found through a WebDriver session.
#[derive(Debug, Clone)]
pub struct WebDriverElement {
    element: Element,
}

impl BrowserElement for WebDriverElement {
    async fn text(&self) -> FederationResult<String> {
        self.element.text().await.map_err(command_error)
    }

    async fn click(&self) -> FederationResult<()> {
        self.element.click().await.map_err(command_error)
    }

    async fn clear(&self) -> FederationResult<()> {
        self.element.clear().await.map_err(command_error)
    }

    async fn send_keys(&self, text: &str) -> FederationResult<()> {
        self.element.send_keys(text).await.map_err(command_error)
    }
}

/// Map a failed element wait onto the error taxonomy.
fn lookup_error(
    locator: &Locator,
    waited: Duration,
    error: CmdError,
    page_loaded: bool,
) -> FederationError {
    match error {
        CmdError::WaitTimeout if page_loaded => FederationError::ElementMissing {
            locator: locator.to_string(),
        },
        CmdError::WaitTimeout => FederationError::ElementTimeout {
            locator: locator.to_string(),
            waited,
        },
        e if e.is_no_such_element() => FederationError::ElementMissing {
            locator: locator.to_string(),
        },
        e => command_error(e),
    }
}

fn command_error(error: CmdError) -> FederationError {
    FederationError::driver(error.to_string())
}
