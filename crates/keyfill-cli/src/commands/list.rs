use crate::OutputFormat;
use crate::config::{StoreConfig, runtime};
use anyhow::Result;
use console::style;
use keyfill_core::CredentialRecord;
use serde::Serialize;

/// What `list` shows for a credential; passwords are never printed
#[derive(Debug, Serialize)]
struct CredentialSummary<'a> {
    id: &'a str,
    email: &'a str,
    #[serde(rename = "createdAt")]
    created_at: i64,
}

pub fn execute(config: &StoreConfig, format: OutputFormat) -> Result<()> {
    let store = runtime()?.block_on(config.open_store())?;
    let credentials = store.credentials();

    let output = match format {
        OutputFormat::Json => format_json(credentials)?,
        OutputFormat::Table => format_table(credentials),
        OutputFormat::Pretty => format_pretty(credentials),
    };

    print!("{}", output);
    Ok(())
}

pub(crate) fn added_date(record: &CredentialRecord) -> String {
    record
        .created()
        .map(|created| created.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn format_pretty(credentials: &[CredentialRecord]) -> String {
    if credentials.is_empty() {
        return "No saved credentials yet. Add one with 'keyfill add'.\n".to_string();
    }

    let mut output = String::new();
    let noun = if credentials.len() == 1 {
        "Credential"
    } else {
        "Credentials"
    };
    output.push_str(&format!(
        "{}\n\n",
        style(format!("{} {}", credentials.len(), noun)).bold().cyan()
    ));

    for record in credentials {
        output.push_str(&format!(
            "  {}  {}\n      Added: {}\n",
            style(&record.id).dim(),
            style(&record.email).bold(),
            added_date(record)
        ));
    }

    output
}

fn format_json(credentials: &[CredentialRecord]) -> Result<String> {
    let summaries: Vec<_> = credentials
        .iter()
        .map(|record| CredentialSummary {
            id: &record.id,
            email: &record.email,
            created_at: record.created_at,
        })
        .collect();
    Ok(format!("{}\n", serde_json::to_string_pretty(&summaries)?))
}

fn format_table(credentials: &[CredentialRecord]) -> String {
    let mut output = String::from("Id,Email,Added\n");
    for record in credentials {
        output.push_str(&format!(
            "{},{},{}\n",
            record.id,
            record.email,
            added_date(record)
        ));
    }
    output
}
