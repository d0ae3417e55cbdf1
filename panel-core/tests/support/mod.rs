#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use async_trait::async_trait;
use serde_json::Value;

use panel_core::browser::{BrowserError, BrowserResult, BrowserSession, TabHandle};
use panel_core::config::{CrawlSection, ExhaustionPolicy, SiteSection};
use panel_core::CrawlerConfig;

/// What the site serves for one resolution attempt of a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    Resolves,
    NoCarrier,
    NoImage,
    RelativeImage,
}

#[derive(Debug, Default)]
pub struct Journal {
    pub navigations: Vec<String>,
    pub reloads: usize,
    pub clicks: usize,
    pub shutdowns: usize,
    pub attempts: HashMap<usize, usize>,
    /// Open tab count observed whenever an attempt starts on the origin tab.
    pub tabs_at_attempt: Vec<usize>,
    pub open_tabs: usize,
    pub focused_origin: bool,
}

pub fn image_url(page: usize) -> String {
    format!("https://img.example/ch1/{page}.jpg")
}

#[derive(Debug, Clone)]
pub enum FakeElement {
    LastPage,
    Carrier(usize),
    Image(String),
    Next,
}

pub struct ScriptedSession {
    journal: Rc<RefCell<Journal>>,
    last_page_text: Option<String>,
    scripts: HashMap<usize, Vec<Attempt>>,
    fail_navigation: bool,
    fail_reload: bool,
    fail_click_on: Option<usize>,
    page: usize,
    origin: TabHandle,
    tabs: Vec<TabHandle>,
    tab_content: HashMap<TabHandle, (usize, Attempt)>,
    focused: TabHandle,
    next_tab: usize,
}

impl ScriptedSession {
    pub fn new(last_page_text: &str) -> (Self, Rc<RefCell<Journal>>) {
        let journal = Rc::new(RefCell::new(Journal {
            open_tabs: 1,
            focused_origin: true,
            ..Journal::default()
        }));
        let origin = TabHandle::new("tab-0");
        let session = Self {
            journal: Rc::clone(&journal),
            last_page_text: Some(last_page_text.to_string()),
            scripts: HashMap::new(),
            fail_navigation: false,
            fail_reload: false,
            fail_click_on: None,
            page: 1,
            origin: origin.clone(),
            tabs: vec![origin.clone()],
            tab_content: HashMap::new(),
            focused: origin,
            next_tab: 1,
        };
        (session, journal)
    }

    /// Attempts for `page` (1-based); the last entry repeats once exhausted.
    pub fn script(mut self, page: usize, attempts: &[Attempt]) -> Self {
        self.scripts.insert(page, attempts.to_vec());
        self
    }

    pub fn without_page_indicator(mut self) -> Self {
        self.last_page_text = None;
        self
    }

    pub fn failing_navigation(mut self) -> Self {
        self.fail_navigation = true;
        self
    }

    pub fn failing_reload(mut self) -> Self {
        self.fail_reload = true;
        self
    }

    pub fn failing_click_on(mut self, page: usize) -> Self {
        self.fail_click_on = Some(page);
        self
    }

    /// Adds a tab opened before the crawl, listed ahead of the origin tab.
    pub fn with_extra_tab(mut self) -> Self {
        let handle = TabHandle::new(format!("tab-{}", self.next_tab));
        self.next_tab += 1;
        self.tabs.insert(0, handle);
        self.sync_journal();
        self
    }

    fn attempt_for(&self, page: usize, attempt: usize) -> Attempt {
        match self.scripts.get(&page) {
            Some(script) if !script.is_empty() => {
                let step = script.get(attempt).or_else(|| script.last());
                step.copied().unwrap_or(Attempt::Resolves)
            }
            _ => Attempt::Resolves,
        }
    }

    fn sync_journal(&self) {
        let mut journal = self.journal.borrow_mut();
        journal.open_tabs = self.tabs.len();
        journal.focused_origin = self.focused == self.origin;
    }
}

#[async_trait(?Send)]
impl BrowserSession for ScriptedSession {
    type Element = FakeElement;

    async fn navigate(&mut self, url: &str) -> BrowserResult<()> {
        self.journal.borrow_mut().navigations.push(url.to_string());
        if self.fail_navigation {
            return Err(BrowserError::Navigation {
                url: url.to_string(),
                reason: "net::ERR_NAME_NOT_RESOLVED".into(),
            });
        }
        self.page = 1;
        Ok(())
    }

    async fn reload(&mut self) -> BrowserResult<()> {
        self.journal.borrow_mut().reloads += 1;
        if self.fail_reload {
            return Err(BrowserError::Navigation {
                url: format!("https://reader.example/ch1/{}", self.page),
                reason: "net::ERR_CONNECTION_RESET".into(),
            });
        }
        Ok(())
    }

    fn current_handle(&self) -> TabHandle {
        self.focused.clone()
    }

    async fn current_handles(&mut self) -> BrowserResult<Vec<TabHandle>> {
        Ok(self.tabs.clone())
    }

    async fn open_background(&mut self, url: &str) -> BrowserResult<TabHandle> {
        let page = url
            .rsplit('/')
            .next()
            .and_then(|segment| segment.parse::<usize>().ok())
            .unwrap_or(self.page);
        let attempt = self.journal.borrow().attempts.get(&page).copied().unwrap_or(1) - 1;
        let handle = TabHandle::new(format!("tab-{}", self.next_tab));
        self.next_tab += 1;
        self.tabs.push(handle.clone());
        self.tab_content
            .insert(handle.clone(), (page, self.attempt_for(page, attempt)));
        self.sync_journal();
        Ok(handle)
    }

    async fn switch_to(&mut self, handle: &TabHandle) -> BrowserResult<()> {
        if !self.tabs.contains(handle) {
            return Err(BrowserError::UnknownHandle(handle.to_string()));
        }
        self.focused = handle.clone();
        self.sync_journal();
        Ok(())
    }

    async fn close(&mut self, handle: &TabHandle) -> BrowserResult<()> {
        let before = self.tabs.len();
        self.tabs.retain(|tab| tab != handle);
        if self.tabs.len() == before {
            return Err(BrowserError::UnknownHandle(handle.to_string()));
        }
        self.sync_journal();
        Ok(())
    }

    async fn find_by_selector(&mut self, selector: &str) -> BrowserResult<FakeElement> {
        if self.focused == self.origin {
            if selector.starts_with("#pageSelect") && self.last_page_text.is_some() {
                return Ok(FakeElement::LastPage);
            }
            return Err(BrowserError::ElementNotFound(selector.to_string()));
        }
        match self.tab_content.get(&self.focused) {
            Some((page, Attempt::Resolves)) if selector == "img" => {
                Ok(FakeElement::Image(image_url(*page)))
            }
            Some((page, Attempt::RelativeImage)) if selector == "img" => {
                Ok(FakeElement::Image(format!("images/{page}.jpg")))
            }
            _ => Err(BrowserError::ElementNotFound(selector.to_string())),
        }
    }

    async fn find_by_id(&mut self, id: &str) -> BrowserResult<FakeElement> {
        if self.focused != self.origin {
            return Err(BrowserError::ElementNotFound(format!("#{id}")));
        }
        match id {
            "next" => Ok(FakeElement::Next),
            "mangaFile" => {
                let page = self.page;
                let attempt = {
                    let mut journal = self.journal.borrow_mut();
                    let open_tabs = self.tabs.len();
                    journal.tabs_at_attempt.push(open_tabs);
                    let counter = journal.attempts.entry(page).or_insert(0);
                    *counter += 1;
                    *counter - 1
                };
                match self.attempt_for(page, attempt) {
                    Attempt::NoCarrier => Err(BrowserError::ElementNotFound(format!("#{id}"))),
                    _ => Ok(FakeElement::Carrier(page)),
                }
            }
            other => Err(BrowserError::ElementNotFound(format!("#{other}"))),
        }
    }

    async fn attribute(
        &mut self,
        element: &FakeElement,
        name: &str,
    ) -> BrowserResult<Option<String>> {
        if name != "src" {
            return Ok(None);
        }
        Ok(match element {
            FakeElement::Carrier(page) => Some(format!("https://reader.example/frame/{page}")),
            FakeElement::Image(url) => Some(url.clone()),
            FakeElement::LastPage | FakeElement::Next => None,
        })
    }

    async fn text(&mut self, element: &FakeElement) -> BrowserResult<Option<String>> {
        Ok(match element {
            FakeElement::LastPage => self.last_page_text.clone(),
            _ => None,
        })
    }

    async fn click(&mut self, element: &FakeElement) -> BrowserResult<()> {
        if !matches!(element, FakeElement::Next) {
            return Ok(());
        }
        self.journal.borrow_mut().clicks += 1;
        if self.fail_click_on == Some(self.page) {
            return Err(BrowserError::Session("click intercepted".into()));
        }
        self.page += 1;
        Ok(())
    }

    async fn run_script(&mut self, _script: &str) -> BrowserResult<Value> {
        Ok(Value::Null)
    }

    async fn shutdown(self) -> BrowserResult<()> {
        self.journal.borrow_mut().shutdowns += 1;
        Ok(())
    }
}

pub fn crawler_config(policy: ExhaustionPolicy) -> CrawlerConfig {
    let crawl = CrawlSection {
        on_exhausted: policy,
        ..CrawlSection::default()
    };
    CrawlerConfig::from_sections(&SiteSection::default(), &crawl)
}
