use crate::OutputFormat;
use crate::config::{StoreConfig, runtime};
use anyhow::Result;
use console::Term;
use std::io::{self, BufRead, IsTerminal, Write};

pub fn execute(
    config: &StoreConfig,
    email: &str,
    password: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let password = match password {
        Some(password) => password,
        None if io::stdin().is_terminal() && Term::stderr().is_term() => prompt_password()?,
        None => read_password(&mut io::stdin().lock())?,
    };

    let record = runtime()?.block_on(async {
        let mut store = config.open_store().await?;
        anyhow::Ok(store.add(email, &password).await?)
    })?;

    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::json!({
                "id": record.id,
                "email": record.email,
                "createdAt": record.created_at,
            })
        ),
        OutputFormat::Table => println!("{},{}", record.id, record.email),
        OutputFormat::Pretty => {
            println!("✅ Saved credential for {} (id {})", record.email, record.id)
        }
    }

    Ok(())
}

/// Ask on the terminal without echoing what is typed
fn prompt_password() -> Result<String> {
    let term = Term::stderr();
    term.write_str("Password: ")?;
    Ok(term.read_secure_line()?)
}

/// Read one line from piped `input`, without its line ending
fn read_password(input: &mut dyn BufRead) -> Result<String> {
    eprint!("Password: ");
    io::stderr().flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim_end_matches(['\n', '\r']).to_string())
}
