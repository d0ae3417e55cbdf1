use std::fmt;

use async_trait::async_trait;
use serde::Serialize;

use super::error::BrowserResult;

/// Opaque reference to one tab of a browser session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TabHandle(String);

impl TabHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TabHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Capability surface over a remote, stateful browser.
///
/// Element lookups and interactions target the focused tab. `navigate` and
/// `reload` report [`BrowserError::Navigation`](super::BrowserError::Navigation)
/// on failure; everything else reports element or session errors and leaves
/// retry decisions to the caller.
#[async_trait(?Send)]
pub trait BrowserSession {
    type Element;

    async fn navigate(&mut self, url: &str) -> BrowserResult<()>;

    async fn reload(&mut self) -> BrowserResult<()>;

    fn current_handle(&self) -> TabHandle;

    /// Open handles in the order they were opened.
    async fn current_handles(&mut self) -> BrowserResult<Vec<TabHandle>>;

    /// Opens `url` in a new tab without moving focus to it.
    async fn open_background(&mut self, url: &str) -> BrowserResult<TabHandle>;

    async fn switch_to(&mut self, handle: &TabHandle) -> BrowserResult<()>;

    async fn close(&mut self, handle: &TabHandle) -> BrowserResult<()>;

    async fn find_by_selector(&mut self, selector: &str) -> BrowserResult<Self::Element>;

    async fn find_by_id(&mut self, id: &str) -> BrowserResult<Self::Element>;

    async fn attribute(
        &mut self,
        element: &Self::Element,
        name: &str,
    ) -> BrowserResult<Option<String>>;

    async fn text(&mut self, element: &Self::Element) -> BrowserResult<Option<String>>;

    async fn click(&mut self, element: &Self::Element) -> BrowserResult<()>;

    async fn run_script(&mut self, script: &str) -> BrowserResult<serde_json::Value>;

    /// Releases the session. Called exactly once when a crawl terminates.
    async fn shutdown(self) -> BrowserResult<()>;
}
