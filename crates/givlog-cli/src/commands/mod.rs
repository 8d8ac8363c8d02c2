//! CLI command implementations

pub mod config;
pub mod donation;
pub mod org;
pub mod status;
pub mod sync;

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use givlog_core::{
    Config, DonationBook, OfflineStore, StorageState, SyncError, SyncOption, SyncStatus,
};
use tracing::debug;

use crate::output::Output;

/// Build the sync engine the configuration selects
pub fn open_store(config: &Config) -> Result<Arc<OfflineStore<DonationBook>>> {
    let remote = config.remote_store()?;
    Ok(Arc::new(OfflineStore::new(remote, DonationBook::default())))
}

/// Fetch the remote document before reading or editing
///
/// A network failure is downgraded to a warning so edits still work
/// offline; the optimistic concurrency check protects the remote document
/// if it turns out someone else wrote in the meantime.
pub async fn pull_or_warn(
    store: &Arc<OfflineStore<DonationBook>>,
    output: &Output,
) -> Result<()> {
    if let Err(e) = store.sync(SyncOption::Pull).await {
        debug!("pull failed: {}", e);
        match e {
            SyncError::Network => {
                output.message("Warning: remote unreachable, starting from an empty book.");
            }
            other => bail!("Failed to fetch remote document: {}", other),
        }
    }
    Ok(())
}

/// The current document, as an owned copy the caller can edit
pub fn current_book(store: &OfflineStore<DonationBook>) -> DonationBook {
    store.state().data.into_data()
}

/// Save an edited document and wait for the background push to finish
pub async fn commit(store: &Arc<OfflineStore<DonationBook>>, book: DonationBook) -> Result<()> {
    store.save(book);
    let state = wait_settled(store).await?;
    if let SyncStatus::Error(e) = state.status {
        match e {
            SyncError::EtagMismatch => bail!(
                "The remote document changed since it was fetched. \
                 Run 'giv pull' and re-apply your change."
            ),
            other => bail!("Sync failed: {}. The change was not saved remotely.", other),
        }
    }
    Ok(())
}

/// Wait for the sync cycle a save triggers to reach a terminal state
async fn wait_settled(
    store: &OfflineStore<DonationBook>,
) -> Result<StorageState<DonationBook>> {
    let mut rx = store.subscribe();
    let state = rx
        .wait_for(|s| {
            matches!(
                s.status,
                SyncStatus::Error(_)
                    | SyncStatus::Idle {
                        requires_sync: false
                    }
            )
        })
        .await
        .context("sync engine dropped its state channel")?;
    Ok(state.clone())
}

/// Parse a decimal amount like "25" or "12.50" into cents
pub fn parse_amount_cents(input: &str) -> Result<i64> {
    let input = input.trim();
    let (whole, frac) = match input.split_once('.') {
        Some((w, f)) => (w, f),
        None => (input, ""),
    };

    if whole.is_empty() && frac.is_empty() {
        bail!("Invalid amount: {:?}", input);
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
        bail!("Invalid amount: {:?} (expected e.g. 25 or 12.50)", input);
    }
    if frac.len() > 2 {
        bail!("Amounts have at most two decimal places: {:?}", input);
    }

    let whole: i64 = if whole.is_empty() {
        0
    } else {
        whole
            .parse()
            .with_context(|| format!("Amount too large: {:?}", input))?
    };
    let cents = match frac.len() {
        0 => 0,
        1 => frac.parse::<i64>()? * 10,
        _ => frac.parse::<i64>()?,
    };
    Ok(whole * 100 + cents)
}

/// Parse a YYYY-MM-DD date, defaulting to today
pub fn parse_date(input: Option<&str>) -> Result<NaiveDate> {
    match input {
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .with_context(|| format!("Invalid date {:?}, expected YYYY-MM-DD", s)),
        None => Ok(chrono::Local::now().date_naive()),
    }
}
