use crate::{Error, Result};
use async_trait::async_trait;
use chromiumoxide::browser::Browser;
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::page::Page;
use futures::StreamExt;
use keyfill_autofill::executor::is_restricted_url;
use keyfill_autofill::{FillReport, Injection, PageExecutor, TabId, TabInfo, TabResolver};
use serde::Deserialize;
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Port Chrome listens on when started with `--remote-debugging-port`
pub const DEFAULT_DEBUGGING_PORT: u16 = 9222;

const CONNECT_ATTEMPTS: u32 = 5;
const CONNECT_RETRY_DELAY: Duration = Duration::from_millis(500);

const PAGE_WAIT_ATTEMPTS: u32 = 20;
const PAGE_WAIT_DELAY: Duration = Duration::from_millis(100);

const FOCUS_EXPRESSION: &str =
    "({ visible: document.visibilityState === 'visible', focused: document.hasFocus() })";

/// What a page reports about its own visibility and focus
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
struct PageFocus {
    visible: bool,
    focused: bool,
}

/// Page host driving a running Chrome over the DevTools Protocol
///
/// Each page target is a tab. The active tab is the one page that has focus,
/// or failing that the one page that is visible; any ambiguity means there is
/// no active tab.
pub struct CdpHost {
    browser: Browser,
    handler_task: JoinHandle<()>,
    debugging_port: u16,
}

impl CdpHost {
    /// Connect to Chrome's debugging endpoint on `debugging_port`
    pub async fn connect(debugging_port: u16) -> Result<Self> {
        let url = format!("http://localhost:{}", debugging_port);
        tracing::info!("Connecting to Chrome on port {}", debugging_port);

        // Chrome may still be starting up.
        let (mut browser, mut handler) = {
            let mut retries = CONNECT_ATTEMPTS;
            loop {
                tracing::debug!("Attempting CDP connection to {}...", url);
                match Browser::connect(&url).await {
                    Ok(result) => {
                        tracing::info!("CDP connection established");
                        break result;
                    }
                    Err(e) => {
                        retries -= 1;
                        if retries == 0 {
                            return Err(Error::Browser(format!(
                                "Failed to connect to Chrome after {} attempts: {}. \
                                 Start Chrome with --remote-debugging-port={}",
                                CONNECT_ATTEMPTS, e, debugging_port
                            )));
                        }
                        tracing::debug!("CDP connection attempt failed, retrying... ({} left)", retries);
                        tokio::time::sleep(CONNECT_RETRY_DELAY).await;
                    }
                }
            }
        };

        // The handler must be polled for any browser command to complete.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("CDP handler event error (continuing): {}", e);
                }
            }
        });

        // Tabs that were already open only become pages once their targets are
        // discovered and attached.
        let expected = match browser.fetch_targets().await {
            Ok(targets) => targets.iter().filter(|t| t.r#type == "page").count(),
            Err(e) => {
                handler_task.abort();
                return Err(e.into());
            }
        };
        tracing::debug!("Chrome reports {} page target(s)", expected);

        let browser_ref = &browser;
        let attached = wait_for_pages(expected, PAGE_WAIT_ATTEMPTS, PAGE_WAIT_DELAY, || async move {
            browser_ref.pages().await.map(|pages| pages.len()).map_err(Error::from)
        })
        .await;
        match attached {
            Ok(count) if count < expected => tracing::warn!(
                "Only {} of {} tab(s) attached; some tabs may be missing",
                count,
                expected
            ),
            Ok(_) => {}
            Err(e) => {
                handler_task.abort();
                return Err(e);
            }
        }

        Ok(Self {
            browser,
            handler_task,
            debugging_port,
        })
    }

    pub fn debugging_port(&self) -> u16 {
        self.debugging_port
    }

    async fn find_page(&self, tab: &TabId) -> Result<Option<Page>> {
        let pages = self.browser.pages().await?;
        Ok(pages
            .into_iter()
            .find(|page| page.target_id().inner() == tab.as_str()))
    }

    async fn evaluate(&self, page: &Page, injection: &Injection) -> Result<FillReport> {
        let url = page.url().await?.unwrap_or_default();
        if is_restricted_url(&url) {
            return Err(Error::Browser(format!("cannot access contents of {}", url)));
        }

        let params = EvaluateParams::builder()
            .expression(injection.to_javascript())
            .return_by_value(true)
            .await_promise(true)
            .build()
            .map_err(Error::Cdp)?;

        let result = page.evaluate_expression(params).await?;
        result
            .into_value::<FillReport>()
            .map_err(|e| Error::Cdp(format!("unexpected autofill result: {}", e)))
    }

    async fn page_focus(&self, page: &Page) -> Result<PageFocus> {
        let params = EvaluateParams::builder()
            .expression(FOCUS_EXPRESSION)
            .return_by_value(true)
            .build()
            .map_err(Error::Cdp)?;

        page.evaluate_expression(params)
            .await?
            .into_value::<PageFocus>()
            .map_err(|e| Error::Cdp(format!("unexpected focus result: {}", e)))
    }
}

/// Poll `count_pages` until it reaches `expected` or the attempts run out,
/// returning the last count seen
async fn wait_for_pages<F, Fut>(
    expected: usize,
    attempts: u32,
    delay: Duration,
    mut count_pages: F,
) -> Result<usize>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<usize>>,
{
    let mut count = count_pages().await?;
    for _ in 1..attempts {
        if count >= expected {
            break;
        }
        tokio::time::sleep(delay).await;
        count = count_pages().await?;
    }
    Ok(count)
}

/// The single focused tab, else the single visible one
fn pick_active<T: Clone>(tabs: &[(T, PageFocus)]) -> Option<T> {
    let focused: Vec<_> = tabs.iter().filter(|(_, focus)| focus.focused).collect();
    match focused.as_slice() {
        [(tab, _)] => return Some(tab.clone()),
        [] => {}
        _ => return None,
    }

    let visible: Vec<_> = tabs.iter().filter(|(_, focus)| focus.visible).collect();
    match visible.as_slice() {
        [(tab, _)] => Some(tab.clone()),
        _ => None,
    }
}

impl Drop for CdpHost {
    fn drop(&mut self) {
        self.handler_task.abort();
    }
}

#[async_trait]
impl PageExecutor for CdpHost {
    async fn run(&self, tab: &TabId, injection: &Injection) -> keyfill_autofill::Result<FillReport> {
        let Some(page) = self.find_page(tab).await? else {
            tracing::warn!("Tab {} is not open", tab);
            return Err(keyfill_autofill::Error::NoActiveTab);
        };

        Ok(self.evaluate(&page, injection).await?)
    }
}

#[async_trait]
impl TabResolver for CdpHost {
    async fn active_tab(&self) -> keyfill_autofill::Result<Option<TabId>> {
        let pages = self.browser.pages().await.map_err(Error::from)?;
        let mut states = Vec::with_capacity(pages.len());

        for page in &pages {
            let id = TabId::new(page.target_id().inner().clone());
            let focus = self.page_focus(page).await.unwrap_or_else(|e| {
                tracing::debug!("Could not read focus state of tab {}: {}", id, e);
                PageFocus::default()
            });
            states.push((id, focus));
        }

        let active = pick_active(&states);
        if active.is_none() {
            tracing::debug!("No single focused or visible tab among {} page(s)", states.len());
        }
        Ok(active)
    }

    async fn tabs(&self) -> keyfill_autofill::Result<Vec<TabInfo>> {
        let pages = self.browser.pages().await.map_err(Error::from)?;
        let mut tabs = Vec::with_capacity(pages.len());

        for page in pages {
            let url = page.url().await.map_err(Error::from)?.unwrap_or_default();
            let title = page.get_title().await.map_err(Error::from)?;
            tabs.push(TabInfo {
                id: TabId::new(page.target_id().inner().clone()),
                url,
                title,
            });
        }

        Ok(tabs)
    }
}
