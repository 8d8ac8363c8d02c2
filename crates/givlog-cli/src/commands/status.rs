//! Status command

use anyhow::Result;
use givlog_core::Config;

use crate::output::Output;

pub async fn execute(config: &Config, output: &Output) -> Result<()> {
    let store = super::open_store(config)?;
    super::pull_or_warn(&store, output).await?;

    let remote = match &config.sync_url {
        Some(url) => url.clone(),
        None => format!("local file {}", config.local_store_path().display()),
    };
    output.print_status(&remote, &store.state());
    Ok(())
}
