use crate::OutputFormat;
use crate::config::runtime;
use anyhow::Result;
use console::style;
use keyfill_autofill::{TabInfo, TabResolver};
use keyfill_browser::CdpHost;

pub fn execute(port: u16, format: OutputFormat) -> Result<()> {
    let (tabs, active) = runtime()?.block_on(async {
        let host = CdpHost::connect(port).await?;
        let tabs = host.tabs().await?;
        let active = host.active_tab().await?;
        anyhow::Ok((tabs, active))
    })?;

    let output = match format {
        OutputFormat::Json => format!("{}\n", serde_json::to_string_pretty(&tabs)?),
        OutputFormat::Table => format_table(&tabs),
        OutputFormat::Pretty => format_pretty(&tabs, active.as_ref().map(|id| id.as_str())),
    };

    print!("{}", output);
    Ok(())
}

fn format_pretty(tabs: &[TabInfo], active: Option<&str>) -> String {
    if tabs.is_empty() {
        return "No open tabs.\n".to_string();
    }

    let mut output = String::new();
    for tab in tabs {
        let marker = if Some(tab.id.as_str()) == active {
            "* "
        } else {
            "  "
        };
        output.push_str(&format!(
            "{}{}  {}\n",
            marker,
            style(tab.id.as_str()).dim(),
            tab.title.as_deref().unwrap_or(&tab.url)
        ));
        if tab.title.is_some() {
            output.push_str(&format!("      {}\n", tab.url));
        }
    }
    output
}

fn format_table(tabs: &[TabInfo]) -> String {
    let mut output = String::from("Id,Url,Title\n");
    for tab in tabs {
        output.push_str(&format!(
            "{},{},\"{}\"\n",
            tab.id,
            tab.url,
            tab.title.as_deref().unwrap_or_default()
        ));
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use keyfill_autofill::TabId;

    fn tabs() -> Vec<TabInfo> {
        vec![
            TabInfo {
                id: TabId::new("A1"),
                url: "https://example.com/login".to_string(),
                title: Some("Sign in".to_string()),
            },
            TabInfo {
                id: TabId::new("B2"),
                url: "about:blank".to_string(),
                title: None,
            },
        ]
    }

    #[test]
    fn test_pretty_marks_active_tab() {
        let output = console::strip_ansi_codes(&format_pretty(&tabs(), Some("A1"))).to_string();
        assert!(output.contains("* A1  Sign in"));
        assert!(output.contains("  B2  about:blank"));
        assert!(!output.contains("* B2"));
    }

    #[test]
    fn test_table_rows() {
        let output = format_table(&tabs());
        assert!(output.contains("A1,https://example.com/login,\"Sign in\""));
        assert!(output.contains("B2,about:blank,\"\""));
    }
}
