//! Sync, pull, and reset commands

use std::io::Write;

use anyhow::{bail, Context, Result};
use givlog_core::{Config, DataState, SyncOption};

use crate::output::Output;

/// Fetch the remote document, creating it if it does not exist yet
pub async fn sync(config: &Config, output: &Output) -> Result<()> {
    let store = super::open_store(config)?;

    if let Err(e) = store.sync(SyncOption::Pull).await {
        bail!("Sync failed: {}", e);
    }

    if matches!(store.state().data, DataState::New(_)) {
        // Nothing remote yet; push the initial document to create it.
        if let Err(e) = store.sync(SyncOption::PushThenPull).await {
            bail!("Failed to create remote document: {}", e);
        }
        output.success("Created remote document");
    } else {
        output.success("Up to date");
    }
    Ok(())
}

/// Fetch the remote document and show what it holds
pub async fn pull(config: &Config, output: &Output) -> Result<()> {
    let store = super::open_store(config)?;

    if let Err(e) = store.sync(SyncOption::Pull).await {
        bail!("Pull failed: {}", e);
    }

    let remote = match &config.sync_url {
        Some(url) => url.clone(),
        None => format!("local file {}", config.local_store_path().display()),
    };
    output.print_status(&remote, &store.state());
    Ok(())
}

/// Delete the remote document and start over
pub async fn reset(config: &Config, output: &Output, yes: bool) -> Result<()> {
    if !yes {
        if !output.should_prompt() {
            bail!("Refusing to reset without --yes");
        }
        print!("This permanently deletes the remote document. Type 'yes' to continue: ");
        std::io::stdout().flush().context("Failed to flush stdout")?;

        let mut answer = String::new();
        std::io::stdin()
            .read_line(&mut answer)
            .context("Failed to read confirmation")?;
        if answer.trim() != "yes" {
            output.message("Aborted.");
            return Ok(());
        }
    }

    let store = super::open_store(config)?;
    if let Err(e) = store.delete().await {
        bail!("Reset failed: {}", e);
    }
    output.success("Remote document deleted");
    Ok(())
}
