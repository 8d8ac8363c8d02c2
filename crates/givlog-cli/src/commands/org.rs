//! Organization commands

use anyhow::{bail, Result};
use clap::Subcommand;
use givlog_core::{Config, Organization};

use crate::output::Output;

#[derive(Subcommand)]
pub enum OrgCommands {
    /// Add an organization
    Add {
        /// Organization name
        name: String,

        /// Category label, e.g. "education" or "relief"
        #[arg(long)]
        category: Option<String>,

        /// Website URL
        #[arg(long)]
        website: Option<String>,
    },
    /// List all organizations
    List,
}

pub async fn execute(command: OrgCommands, config: &Config, output: &Output) -> Result<()> {
    let store = super::open_store(config)?;
    super::pull_or_warn(&store, output).await?;

    match command {
        OrgCommands::Add {
            name,
            category,
            website,
        } => {
            let mut book = super::current_book(&store);
            if book.organization_by_name(&name).is_some() {
                bail!("An organization named {:?} already exists", name);
            }

            let mut org = Organization::new(name);
            org.set_category(category);
            org.set_website(website);
            let added = org.clone();
            book.organizations.push(org);

            super::commit(&store, book).await?;
            output.print_organization(&added);
        }
        OrgCommands::List => {
            let book = super::current_book(&store);
            output.print_organizations(&book.organizations);
        }
    }
    Ok(())
}
