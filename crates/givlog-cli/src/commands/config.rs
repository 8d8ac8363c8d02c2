//! Configuration commands

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use givlog_core::Config;

use crate::output::{Output, OutputFormat};

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the current configuration
    Show,
    /// Set a configuration value and write it to the config file
    ///
    /// Keys: data_dir, sync_url, api_key, request_timeout_secs.
    /// An empty value clears optional keys.
    Set {
        /// Configuration key
        key: String,
        /// New value
        value: String,
    },
    /// Print the config file path
    Path,
}

pub fn execute(command: ConfigCommands, config: &Config, output: &Output) -> Result<()> {
    match command {
        ConfigCommands::Show => {
            let api_key = match &config.api_key {
                Some(_) => "(set)",
                None => "(not set)",
            };
            match output.format {
                OutputFormat::Json => {
                    println!(
                        "{}",
                        serde_json::json!({
                            "data_dir": config.data_dir,
                            "sync_url": config.sync_url,
                            "api_key": api_key,
                            "request_timeout_secs": config.request_timeout_secs,
                        })
                    );
                }
                _ => {
                    println!("data_dir:             {}", config.data_dir.display());
                    println!(
                        "sync_url:             {}",
                        config.sync_url.as_deref().unwrap_or("(not set)")
                    );
                    println!("api_key:              {}", api_key);
                    println!("request_timeout_secs: {}", config.request_timeout_secs);
                }
            }
        }
        ConfigCommands::Set { key, value } => {
            let mut updated = config.clone();
            match key.as_str() {
                "data_dir" => updated.data_dir = PathBuf::from(&value),
                "sync_url" => updated.sync_url = none_if_empty(value),
                "api_key" => updated.api_key = none_if_empty(value),
                "request_timeout_secs" => {
                    updated.request_timeout_secs = value
                        .parse()
                        .with_context(|| format!("Invalid timeout: {:?}", value))?;
                }
                other => bail!(
                    "Unknown key {:?}. Valid keys: data_dir, sync_url, api_key, \
                     request_timeout_secs",
                    other
                ),
            }
            updated.save()?;
            output.success(&format!("Set {}", key));
        }
        ConfigCommands::Path => {
            println!("{}", Config::config_file_path().display());
        }
    }
    Ok(())
}

fn none_if_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}
