use crate::executor::{PageExecutor, TabId, TabResolver};
use crate::injection::{FillReport, Injection};
use crate::{Error, Result};

/// Fills login forms through a page host
pub struct Autofill<H> {
    host: H,
}

impl<H> Autofill<H> {
    pub fn new(host: H) -> Self {
        Self { host }
    }

    pub fn host(&self) -> &H {
        &self.host
    }
}

impl<H: PageExecutor> Autofill<H> {
    /// Run the injection routine in `tab`
    ///
    /// A page with no recognisable fields is still a success; the report
    /// then counts zero fields. Host failures are returned unchanged and
    /// never retried.
    pub async fn inject(&self, tab: &TabId, email: &str, password: &str) -> Result<FillReport> {
        tracing::debug!("Injecting credentials into tab {}", tab);

        let injection = Injection::new(email, password);
        let report = self.host.run(tab, &injection).await.map_err(|e| {
            tracing::warn!("Autofill in tab {} failed: {}", tab, e);
            e
        })?;

        if report.is_empty() {
            tracing::info!("No email or password fields found in tab {}", tab);
        } else {
            tracing::info!(
                "Filled {} email and {} password field(s) in tab {}",
                report.email,
                report.password,
                tab
            );
        }

        Ok(report)
    }
}

impl<H: PageExecutor + TabResolver> Autofill<H> {
    /// Resolve the active tab and fill it
    pub async fn fill_active(&self, email: &str, password: &str) -> Result<FillReport> {
        let tab = self.host.active_tab().await?.ok_or(Error::NoActiveTab)?;
        self.inject(&tab, email, password).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Document, EventKind, LocalExecutor};
    use async_trait::async_trait;

    fn login_page() -> Document {
        let mut doc = Document::new();
        let form = doc.append(None, "form", &[("id", "login")]);
        doc.append(Some(form), "input", &[("type", "email")]);
        doc.append(Some(form), "input", &[("type", "password")]);
        doc
    }

    #[tokio::test]
    async fn test_fill_active_tab() {
        let host = LocalExecutor::new();
        let tab = host.open_tab("https://example.com/login", login_page()).await;
        let autofill = Autofill::new(host);

        let report = autofill
            .fill_active("user@example.com", "hunter2")
            .await
            .unwrap();

        assert_eq!(report, FillReport { email: 1, password: 1 });
        let doc = autofill.host().document(&tab).await.unwrap();
        assert_eq!(doc.value(1), Some("user@example.com"));
        assert_eq!(doc.value(2), Some("hunter2"));
        assert_eq!(doc.events_targeting(1), vec![EventKind::Input, EventKind::Change]);
        assert_eq!(doc.events_targeting(2), vec![EventKind::Input, EventKind::Change]);
    }

    #[tokio::test]
    async fn test_inject_targets_given_tab_only() {
        let host = LocalExecutor::new();
        let target = host.open_tab("https://a.example", login_page()).await;
        let other = host.open_tab("https://b.example", login_page()).await;
        let autofill = Autofill::new(host);

        autofill.inject(&target, "a@b.c", "pw").await.unwrap();

        let untouched = autofill.host().document(&other).await.unwrap();
        assert_eq!(untouched, login_page());
    }

    #[tokio::test]
    async fn test_no_active_tab() {
        let autofill = Autofill::new(LocalExecutor::new());
        let result = autofill.fill_active("a@b.c", "pw").await;
        assert!(matches!(result, Err(Error::NoActiveTab)));
    }

    #[tokio::test]
    async fn test_page_without_fields_succeeds() {
        let host = LocalExecutor::new();
        let mut page = Document::new();
        page.append(None, "p", &[]);
        let tab = host.open_tab("https://example.com", page.clone()).await;
        let autofill = Autofill::new(host);

        let report = autofill.inject(&tab, "a@b.c", "pw").await.unwrap();

        assert!(report.is_empty());
        assert_eq!(autofill.host().document(&tab).await, Some(page));
    }

    struct RejectingHost;

    #[async_trait]
    impl PageExecutor for RejectingHost {
        async fn run(&self, _tab: &TabId, _injection: &Injection) -> Result<FillReport> {
            Err(Error::InjectionFailed("Cannot access a chrome:// URL".to_string()))
        }
    }

    #[tokio::test]
    async fn test_host_rejection_is_injection_failed() {
        let autofill = Autofill::new(RejectingHost);
        let result = autofill.inject(&TabId::from("1"), "a@b.c", "pw").await;
        assert!(matches!(result, Err(Error::InjectionFailed(_))));
    }
}
