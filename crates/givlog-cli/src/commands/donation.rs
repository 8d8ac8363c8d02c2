//! Donation commands

use anyhow::{bail, Result};
use clap::Subcommand;
use givlog_core::{Config, Donation};

use crate::output::{format_amount, Output};

#[derive(Subcommand)]
pub enum DonationCommands {
    /// Record a donation
    Add {
        /// Organization name
        organization: String,

        /// Amount, e.g. 25 or 12.50
        amount: String,

        /// Donation date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<String>,

        /// ISO 4217 currency code, defaults to USD
        #[arg(long)]
        currency: Option<String>,

        /// Free-form note
        #[arg(long)]
        note: Option<String>,
    },
    /// List donations
    List {
        /// Only donations to this organization
        #[arg(long)]
        organization: Option<String>,

        /// Only donations on or after this date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,

        /// Only donations on or before this date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,
    },
}

pub async fn execute(command: DonationCommands, config: &Config, output: &Output) -> Result<()> {
    let store = super::open_store(config)?;
    super::pull_or_warn(&store, output).await?;

    match command {
        DonationCommands::Add {
            organization,
            amount,
            date,
            currency,
            note,
        } => {
            let mut book = super::current_book(&store);
            let org = match book.organization_by_name(&organization) {
                Some(org) => org,
                None => bail!(
                    "No organization named {:?}. Add it first with:\n  giv org add {:?}",
                    organization,
                    organization
                ),
            };
            let org_name = org.name.clone();
            let org_id = org.id;

            let amount_cents = super::parse_amount_cents(&amount)?;
            let date = super::parse_date(date.as_deref())?;

            let mut donation = Donation::new(org_id, amount_cents, date);
            if let Some(currency) = currency {
                donation.set_currency(currency.to_uppercase());
            }
            donation.set_note(note);
            let currency = donation.currency.clone();
            book.donations.push(donation);

            super::commit(&store, book).await?;
            output.success(&format!(
                "Recorded {} {} to {}",
                format_amount(amount_cents),
                currency,
                org_name
            ));
        }
        DonationCommands::List {
            organization,
            from,
            to,
        } => {
            let book = super::current_book(&store);

            let org_id = match &organization {
                Some(name) => match book.organization_by_name(name) {
                    Some(org) => Some(org.id),
                    None => bail!("No organization named {:?}", name),
                },
                None => None,
            };
            let from = from.as_deref().map(|s| super::parse_date(Some(s))).transpose()?;
            let to = to.as_deref().map(|s| super::parse_date(Some(s))).transpose()?;

            let mut donations: Vec<_> = book
                .donations
                .iter()
                .filter(|d| org_id.map_or(true, |id| d.organization_id == id))
                .filter(|d| from.map_or(true, |from| d.date >= from))
                .filter(|d| to.map_or(true, |to| d.date <= to))
                .collect();
            donations.sort_by_key(|d| d.date);

            output.print_donations(&book, &donations);
        }
    }
    Ok(())
}
