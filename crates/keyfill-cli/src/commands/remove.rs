use crate::config::{StoreConfig, runtime};
use anyhow::Result;
use keyfill_core::CredentialRecord;
use std::io::{self, BufRead, Write};

pub fn execute(config: &StoreConfig, id: &str, force: bool) -> Result<()> {
    let runtime = runtime()?;
    let mut store = runtime.block_on(config.open_store())?;

    // Removing an unknown id is a no-op, not a failure.
    let Some(record) = store.get(id).cloned() else {
        println!("Credential '{}' not found; nothing to remove", id);
        return Ok(());
    };

    if !force && !confirm(&record, &mut io::stdin().lock())? {
        println!("Deletion cancelled.");
        return Ok(());
    }

    runtime.block_on(store.remove(id))?;
    println!("✅ Credential for {} removed", record.email);
    Ok(())
}

fn confirm(record: &CredentialRecord, input: &mut dyn BufRead) -> Result<bool> {
    print!(
        "⚠️  Delete the credential for {}? Type 'yes' to confirm: ",
        record.email
    );
    io::stdout().flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(answer.trim().eq_ignore_ascii_case("yes"))
}
