//! givlog CLI
//!
//! `giv` tracks charitable donations in a single document that syncs across
//! devices. Every command pulls the latest remote document, applies its edit
//! locally, and pushes the result; conflicts surface as errors with a
//! suggested resolution.

mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use givlog_core::Config;
use tracing_subscriber::EnvFilter;

use commands::{config::ConfigCommands, donation::DonationCommands, org::OrgCommands};
use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "giv")]
#[command(about = "Track charitable donations, synced across devices")]
#[command(version)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Minimal output for scripting
    #[arg(long, short, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage organizations
    Org {
        #[command(subcommand)]
        command: OrgCommands,
    },
    /// Record and list donations
    Donation {
        #[command(subcommand)]
        command: DonationCommands,
    },
    /// Show sync status and a summary of the document
    Status,
    /// Fetch the remote document, creating it if missing
    Sync,
    /// Fetch the remote document and show what it holds
    Pull,
    /// Delete the remote document and start over
    Reset {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// View or edit configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));
    let config = Config::load()?;

    match cli.command {
        Commands::Org { command } => commands::org::execute(command, &config, &output).await,
        Commands::Donation { command } => {
            commands::donation::execute(command, &config, &output).await
        }
        Commands::Status => commands::status::execute(&config, &output).await,
        Commands::Sync => commands::sync::sync(&config, &output).await,
        Commands::Pull => commands::sync::pull(&config, &output).await,
        Commands::Reset { yes } => commands::sync::reset(&config, &output, yes).await,
        Commands::Config { command } => commands::config::execute(command, &config, &output),
    }
}
