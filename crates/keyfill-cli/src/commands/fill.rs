use crate::OutputFormat;
use crate::config::{StoreConfig, runtime};
use anyhow::{Result, anyhow};
use keyfill_autofill::{Autofill, FillReport, TabId};
use keyfill_browser::CdpHost;

pub fn execute(
    config: &StoreConfig,
    id: &str,
    tab: Option<String>,
    port: u16,
    format: OutputFormat,
) -> Result<()> {
    let runtime = runtime()?;
    let store = runtime.block_on(config.open_store())?;
    let record = store
        .get(id)
        .ok_or_else(|| anyhow!("Credential '{}' not found", id))?;

    let report = runtime.block_on(async {
        let autofill = Autofill::new(CdpHost::connect(port).await?);
        let report = match tab {
            Some(tab) => {
                autofill
                    .inject(&TabId::new(tab), &record.email, &record.password)
                    .await?
            }
            None => autofill.fill_active(&record.email, &record.password).await?,
        };
        anyhow::Ok(report)
    })?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Table => println!("Email,Password\n{},{}", report.email, report.password),
        OutputFormat::Pretty => println!("{}", describe(&report, &record.email)),
    }

    Ok(())
}

fn describe(report: &FillReport, email: &str) -> String {
    if report.is_empty() {
        return "⚠️  No email or password fields found on the page".to_string();
    }
    format!(
        "✅ Filled {} email and {} password field(s) as {}",
        report.email, report.password, email
    )
}
