//! Capabilities the autofill engine consumes from its host: running the
//! injection routine inside a tab, and finding tabs to run it in.

use crate::dom::Document;
use crate::injection::{FillReport, Injection};
use crate::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::Mutex;

/// Browsers refuse to run extension script on these pages
const RESTRICTED_PREFIXES: &[&str] = &[
    "chrome://",
    "chrome-extension://",
    "edge://",
    "devtools://",
    "view-source:",
    "https://chrome.google.com/webstore",
];

/// Opaque identifier of a browser tab
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TabId(String);

impl TabId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TabId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A tab as reported by the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabInfo {
    pub id: TabId,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// Runs the injection routine inside a tab's own page context
///
/// Implementations return [`Error::NoActiveTab`] when the tab does not exist
/// and [`Error::InjectionFailed`] when the page refuses to run the routine.
/// Once `run` has been called the in-page side effects cannot be cancelled.
#[async_trait]
pub trait PageExecutor: Send + Sync {
    async fn run(&self, tab: &TabId, injection: &Injection) -> Result<FillReport>;
}

/// Finds the tab a fill should target
#[async_trait]
pub trait TabResolver: Send + Sync {
    /// The active tab of the current window, if any
    async fn active_tab(&self) -> Result<Option<TabId>>;

    /// Every open tab
    async fn tabs(&self) -> Result<Vec<TabInfo>>;
}

/// Whether browsers forbid script injection into `url`
pub fn is_restricted_url(url: &str) -> bool {
    let url = url.to_ascii_lowercase();
    RESTRICTED_PREFIXES
        .iter()
        .any(|prefix| url.starts_with(prefix))
}

struct LocalTab {
    info: TabInfo,
    document: Document,
}

#[derive(Default)]
struct LocalTabs {
    tabs: Vec<LocalTab>,
    active: Option<TabId>,
    next_id: u64,
}

/// Page host backed by in-memory [`Document`]s
///
/// Opening a tab makes it active, the way a browser focuses a new tab.
/// Tabs on restricted URLs reject injection.
#[derive(Default)]
pub struct LocalExecutor {
    state: Mutex<LocalTabs>,
}

impl LocalExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a tab showing `document` at `url` and make it active
    pub async fn open_tab(&self, url: &str, document: Document) -> TabId {
        let mut state = self.state.lock().await;
        state.next_id += 1;
        let id = TabId::new(format!("tab-{}", state.next_id));

        state.tabs.push(LocalTab {
            info: TabInfo {
                id: id.clone(),
                url: url.to_string(),
                title: None,
            },
            document,
        });
        state.active = Some(id.clone());
        id
    }

    /// Make an existing tab active; returns false for unknown tabs
    pub async fn activate(&self, tab: &TabId) -> bool {
        let mut state = self.state.lock().await;
        if state.tabs.iter().any(|local| &local.info.id == tab) {
            state.active = Some(tab.clone());
            true
        } else {
            false
        }
    }

    /// Close a tab; closing the active tab leaves no tab active
    pub async fn close_tab(&self, tab: &TabId) {
        let mut state = self.state.lock().await;
        state.tabs.retain(|local| &local.info.id != tab);
        if state.active.as_ref() == Some(tab) {
            state.active = None;
        }
    }

    /// Copy of a tab's current document
    pub async fn document(&self, tab: &TabId) -> Option<Document> {
        let state = self.state.lock().await;
        state
            .tabs
            .iter()
            .find(|local| &local.info.id == tab)
            .map(|local| local.document.clone())
    }
}

#[async_trait]
impl PageExecutor for LocalExecutor {
    async fn run(&self, tab: &TabId, injection: &Injection) -> Result<FillReport> {
        let mut state = self.state.lock().await;
        let local = state
            .tabs
            .iter_mut()
            .find(|local| &local.info.id == tab)
            .ok_or(Error::NoActiveTab)?;

        if is_restricted_url(&local.info.url) {
            return Err(Error::InjectionFailed(format!(
                "cannot access contents of {}",
                local.info.url
            )));
        }

        Ok(injection.apply(&mut local.document))
    }
}

#[async_trait]
impl TabResolver for LocalExecutor {
    async fn active_tab(&self) -> Result<Option<TabId>> {
        Ok(self.state.lock().await.active.clone())
    }

    async fn tabs(&self) -> Result<Vec<TabInfo>> {
        Ok(self
            .state
            .lock()
            .await
            .tabs
            .iter()
            .map(|local| local.info.clone())
            .collect())
    }
}
