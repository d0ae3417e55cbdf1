use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig as ChromiumConfig};
use chromiumoxide::cdp::browser_protocol::page::NavigateParams;
use chromiumoxide::cdp::browser_protocol::target::CreateTargetParams;
use chromiumoxide::element::Element;
use chromiumoxide::page::Page;
use futures::StreamExt;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::ChromiumSection;

use super::error::{BrowserError, BrowserResult};
use super::session::{BrowserSession, TabHandle};

#[derive(Debug, Clone)]
pub struct ChromiumLauncher {
    config: ChromiumSection,
}

#[derive(Debug, Clone, Default)]
pub struct LaunchOverrides {
    pub headless: Option<bool>,
}

impl ChromiumLauncher {
    pub fn new(config: ChromiumSection) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ChromiumSection {
        &self.config
    }

    pub async fn launch(&self) -> BrowserResult<ChromiumSession> {
        self.launch_with_overrides(LaunchOverrides::default()).await
    }

    pub async fn launch_with_overrides(
        &self,
        overrides: LaunchOverrides,
    ) -> BrowserResult<ChromiumSession> {
        let headless = overrides.headless.unwrap_or(self.config.headless);
        let chromium_config = self.build_chromium_config(headless)?;
        info!(
            headless,
            sandbox = self.config.sandbox,
            executable = self.config.executable_path.as_deref().unwrap_or("auto"),
            "Launching Chromium instance"
        );

        let (browser, mut handler) = Browser::launch(chromium_config)
            .await
            .map_err(|err| BrowserError::Launch(err.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    debug!(error = %err, "Chromium handler reported error");
                }
            }
        });

        let page = browser.new_page(CreateTargetParams::new("about:blank")).await?;
        let origin = handle_of(&page);
        Ok(ChromiumSession {
            browser,
            handler_task: Some(handler_task),
            tabs: vec![(origin.clone(), page)],
            focused: origin,
        })
    }

    fn build_chromium_config(&self, headless: bool) -> BrowserResult<ChromiumConfig> {
        let mut builder = ChromiumConfig::builder();
        if let Some(path) = &self.config.executable_path {
            builder = builder.chrome_executable(path);
        }
        if !headless {
            builder = builder.with_head();
        }
        if !self.config.sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(timeout) = self.config.request_timeout_seconds {
            builder = builder.request_timeout(Duration::from_secs(timeout));
        }
        if let Some([width, height]) = self.config.window_size {
            builder = builder.window_size(width, height);
        }

        let mut args = vec![
            "--no-first-run".to_string(),
            "--password-store=basic".to_string(),
        ];
        if self.config.disable_gpu {
            args.push("--disable-gpu".into());
        }
        if let Some(agent) = &self.config.user_agent {
            args.push(format!("--user-agent={agent}"));
        }
        builder = builder.args(args);

        builder.build().map_err(BrowserError::Configuration)
    }
}

fn handle_of(page: &Page) -> TabHandle {
    TabHandle::new(page.target_id().inner().clone())
}

/// A running Chromium instance driven over CDP. Tabs are tracked in the order
/// they were opened; focus is whichever tab element lookups go to.
#[derive(Debug)]
pub struct ChromiumSession {
    browser: Browser,
    handler_task: Option<JoinHandle<()>>,
    tabs: Vec<(TabHandle, Page)>,
    focused: TabHandle,
}

impl ChromiumSession {
    fn page(&self, handle: &TabHandle) -> BrowserResult<&Page> {
        self.tabs
            .iter()
            .find(|(candidate, _)| candidate == handle)
            .map(|(_, page)| page)
            .ok_or_else(|| BrowserError::UnknownHandle(handle.to_string()))
    }

    fn focused_page(&self) -> BrowserResult<&Page> {
        self.page(&self.focused)
    }

    /// Picks up tabs the site opened on its own so they are visible to callers.
    async fn adopt_untracked(&mut self) -> BrowserResult<()> {
        for page in self.browser.pages().await? {
            let handle = handle_of(&page);
            if !self.tabs.iter().any(|(known, _)| *known == handle) {
                debug!(handle = %handle, "Adopting tab opened by page");
                self.tabs.push((handle, page));
            }
        }
        Ok(())
    }
}

#[async_trait(?Send)]
impl BrowserSession for ChromiumSession {
    type Element = Element;

    async fn navigate(&mut self, url: &str) -> BrowserResult<()> {
        let navigation_error = |reason: String| BrowserError::Navigation {
            url: url.to_string(),
            reason,
        };
        let params = NavigateParams::builder()
            .url(url)
            .build()
            .map_err(BrowserError::Configuration)?;
        let page = self.focused_page()?;
        page.goto(params)
            .await
            .map_err(|err| navigation_error(err.to_string()))?;
        page.wait_for_navigation()
            .await
            .map_err(|err| navigation_error(err.to_string()))?;
        Ok(())
    }

    async fn reload(&mut self) -> BrowserResult<()> {
        let page = self.focused_page()?;
        let url = page.url().await.ok().flatten().unwrap_or_default();
        page.reload()
            .await
            .map_err(|err| BrowserError::Navigation {
                url: url.clone(),
                reason: err.to_string(),
            })?;
        debug!(url = %url, "Reloaded page");
        Ok(())
    }

    fn current_handle(&self) -> TabHandle {
        self.focused.clone()
    }

    async fn current_handles(&mut self) -> BrowserResult<Vec<TabHandle>> {
        self.adopt_untracked().await?;
        Ok(self.tabs.iter().map(|(handle, _)| handle.clone()).collect())
    }

    async fn open_background(&mut self, url: &str) -> BrowserResult<TabHandle> {
        let params = CreateTargetParams::builder()
            .url(url)
            .background(true)
            .build()
            .map_err(BrowserError::Configuration)?;
        let page = self.browser.new_page(params).await?;
        let handle = handle_of(&page);
        debug!(handle = %handle, url, "Opened background tab");
        self.tabs.push((handle.clone(), page));
        Ok(handle)
    }

    async fn switch_to(&mut self, handle: &TabHandle) -> BrowserResult<()> {
        self.page(handle)?.bring_to_front().await?;
        self.focused = handle.clone();
        Ok(())
    }

    async fn close(&mut self, handle: &TabHandle) -> BrowserResult<()> {
        let position = self
            .tabs
            .iter()
            .position(|(candidate, _)| candidate == handle)
            .ok_or_else(|| BrowserError::UnknownHandle(handle.to_string()))?;
        let (_, page) = self.tabs.remove(position);
        page.close().await?;
        Ok(())
    }

    async fn find_by_selector(&mut self, selector: &str) -> BrowserResult<Element> {
        self.focused_page()?
            .find_element(selector)
            .await
            .map_err(|err| BrowserError::ElementNotFound(format!("{selector}: {err}")))
    }

    async fn find_by_id(&mut self, id: &str) -> BrowserResult<Element> {
        let selector = format!("[id=\"{}\"]", id.replace('"', "\\\""));
        self.focused_page()?
            .find_element(selector)
            .await
            .map_err(|err| BrowserError::ElementNotFound(format!("#{id}: {err}")))
    }

    async fn attribute(&mut self, element: &Element, name: &str) -> BrowserResult<Option<String>> {
        // The DOM property carries the absolute form of src/href.
        if let Some(Value::String(value)) = element.property(name).await? {
            if !value.is_empty() {
                return Ok(Some(value));
            }
        }
        Ok(element.attribute(name).await?)
    }

    async fn text(&mut self, element: &Element) -> BrowserResult<Option<String>> {
        Ok(element.inner_text().await?)
    }

    async fn click(&mut self, element: &Element) -> BrowserResult<()> {
        element.click().await?;
        Ok(())
    }

    async fn run_script(&mut self, script: &str) -> BrowserResult<Value> {
        let result = self.focused_page()?.evaluate(script).await?;
        Ok(result.value().cloned().unwrap_or(Value::Null))
    }

    async fn shutdown(mut self) -> BrowserResult<()> {
        info!(tabs = self.tabs.len(), "Shutting down Chromium instance");
        if let Err(err) = self.browser.close().await {
            warn!(error = %err, "Failed to close browser gracefully");
        }
        if let Some(handle) = self.handler_task.take() {
            handle.await?;
        }
        Ok(())
    }
}

impl Drop for ChromiumSession {
    fn drop(&mut self) {
        if let Some(handle) = &self.handler_task {
            if !handle.is_finished() {
                warn!("ChromiumSession dropped without explicit shutdown");
            }
        }
    }
}
