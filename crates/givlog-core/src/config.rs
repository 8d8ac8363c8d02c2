//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/givlog/config.toml)
//! 3. Environment variables (GIVLOG_* prefix)
//!
//! Environment variables take precedence over config file values.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::models::DonationBook;
use crate::remote::{LocalStore, RemoteStore, WebApiStore};

/// Environment variable prefix
const ENV_PREFIX: &str = "GIVLOG";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory for local data storage
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Remote document endpoint URL (optional)
    #[serde(default)]
    pub sync_url: Option<String>,

    /// Shared secret for the remote endpoint
    #[serde(default)]
    pub api_key: Option<String>,

    /// Timeout for remote requests, in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            sync_url: None,
            api_key: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (GIVLOG_DATA_DIR, GIVLOG_SYNC_URL, GIVLOG_API_KEY)
    /// 2. Config file (~/.config/givlog/config.toml or GIVLOG_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &PathBuf) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        config.ensure_data_dir()?;
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // GIVLOG_DATA_DIR
        if let Ok(val) = std::env::var(format!("{}_DATA_DIR", ENV_PREFIX)) {
            self.data_dir = PathBuf::from(val);
        }

        // GIVLOG_SYNC_URL
        if let Ok(val) = std::env::var(format!("{}_SYNC_URL", ENV_PREFIX)) {
            self.sync_url = if val.is_empty() { None } else { Some(val) };
        }

        // GIVLOG_API_KEY
        if let Ok(val) = std::env::var(format!("{}_API_KEY", ENV_PREFIX)) {
            self.api_key = if val.is_empty() { None } else { Some(val) };
        }
    }

    /// Ensure data directory exists
    fn ensure_data_dir(&self) -> Result<()> {
        if !self.data_dir.exists() {
            std::fs::create_dir_all(&self.data_dir)
                .with_context(|| format!("Failed to create data directory: {:?}", self.data_dir))?;
        }
        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_file_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with GIVLOG_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("givlog")
            .join("config.toml")
    }

    /// Get the path the local simulated remote persists to
    pub fn local_store_path(&self) -> PathBuf {
        self.data_dir.join("donations.json")
    }

    /// The configured request timeout
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Whether a remote endpoint is configured
    pub fn has_remote(&self) -> bool {
        self.sync_url.is_some()
    }

    /// Build the remote store this configuration selects
    ///
    /// When a sync URL and API key are configured, documents sync against
    /// the HTTP endpoint. Otherwise the file-backed local store under
    /// `data_dir` stands in for the remote side.
    pub fn remote_store(&self) -> Result<Box<dyn RemoteStore<DonationBook>>> {
        match (&self.sync_url, &self.api_key) {
            (Some(url), Some(key)) => {
                let store = WebApiStore::new(url, key, self.request_timeout())
                    .context("Failed to build HTTP client")?;
                Ok(Box::new(store))
            }
            (Some(_), None) => {
                bail!(
                    "sync_url is set but api_key is missing. Set it with:\n  \
                     giv config set api_key <your-key>"
                )
            }
            _ => Ok(Box::new(LocalStore::new(self.local_store_path()))),
        }
    }
}

/// Get the default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("givlog")
}

fn default_request_timeout_secs() -> u64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Mutex to serialize tests that touch environment variables
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// Guard that locks env access and saves/restores env vars
    struct EnvGuard<'a> {
        _lock: std::sync::MutexGuard<'a, ()>,
        saved: Vec<(String, Option<String>)>,
    }

    impl<'a> EnvGuard<'a> {
        fn new(vars: &[&str]) -> Self {
            let lock = ENV_MUTEX.lock().unwrap();
            let saved = vars
                .iter()
                .map(|&name| (name.to_string(), env::var(name).ok()))
                .collect();
            // Clear all the vars
            for name in vars {
                env::remove_var(name);
            }
            Self { _lock: lock, saved }
        }
    }

    impl Drop for EnvGuard<'_> {
        fn drop(&mut self) {
            for (name, value) in &self.saved {
                match value {
                    Some(v) => env::set_var(name, v),
                    None => env::remove_var(name),
                }
            }
        }
    }

    const ENV_VARS: &[&str] = &["GIVLOG_DATA_DIR", "GIVLOG_SYNC_URL", "GIVLOG_API_KEY"];

    #[test]
    fn test_default_config() {
        let _guard = EnvGuard::new(ENV_VARS);

        let config = Config::default();
        assert!(config.sync_url.is_none());
        assert!(config.api_key.is_none());
        assert_eq!(config.request_timeout_secs, 30);
        assert!(config.data_dir.ends_with("givlog"));
    }

    #[test]
    fn test_local_store_path() {
        let config = Config {
            data_dir: PathBuf::from("/data/givlog"),
            ..Config::default()
        };
        assert!(config.local_store_path().ends_with("donations.json"));
    }

    #[test]
    fn test_env_override_data_dir() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();

        env::set_var("GIVLOG_DATA_DIR", "/tmp/givlog-test");
        config.apply_env_overrides();

        assert_eq!(config.data_dir, PathBuf::from("/tmp/givlog-test"));
    }

    #[test]
    fn test_env_override_sync_url() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();
        assert!(config.sync_url.is_none());

        env::set_var("GIVLOG_SYNC_URL", "https://sync.example.com/document");
        config.apply_env_overrides();
        assert_eq!(
            config.sync_url,
            Some("https://sync.example.com/document".to_string())
        );

        // Empty string clears it
        env::set_var("GIVLOG_SYNC_URL", "");
        config.apply_env_overrides();
        assert!(config.sync_url.is_none());
    }

    #[test]
    fn test_env_override_api_key() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();

        env::set_var("GIVLOG_API_KEY", "secret");
        config.apply_env_overrides();
        assert_eq!(config.api_key, Some("secret".to_string()));
    }

    #[test]
    fn test_serialization() {
        let _guard = EnvGuard::new(ENV_VARS);

        let config = Config {
            data_dir: PathBuf::from("/data/givlog"),
            sync_url: Some("https://sync.example.com/document".to_string()),
            api_key: Some("secret".to_string()),
            request_timeout_secs: 10,
        };

        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("data_dir"));
        assert!(toml_str.contains("sync_url"));
        assert!(toml_str.contains("api_key"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.data_dir, config.data_dir);
        assert_eq!(parsed.sync_url, config.sync_url);
        assert_eq!(parsed.api_key, config.api_key);
        assert_eq!(parsed.request_timeout_secs, 10);
    }

    #[test]
    fn test_load_from_str() {
        let _guard = EnvGuard::new(ENV_VARS);

        let toml = r#"
            data_dir = "/custom/data"
            sync_url = "https://example.com/doc"
            api_key = "secret"
        "#;

        let config = Config::load_from_str(toml).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/custom/data"));
        assert_eq!(config.sync_url, Some("https://example.com/doc".to_string()));
        assert_eq!(config.api_key, Some("secret".to_string()));
        assert_eq!(config.request_timeout_secs, 30);
    }

    #[test]
    fn test_load_from_path_missing_file() {
        let _guard = EnvGuard::new(ENV_VARS);
        let temp_dir = tempfile::TempDir::new().unwrap();
        env::set_var("GIVLOG_DATA_DIR", temp_dir.path().join("data"));

        let path = PathBuf::from("/nonexistent/config.toml");
        let config = Config::load_from_path(&path).unwrap();
        // Should return defaults (plus env overrides) when file doesn't exist
        assert!(config.sync_url.is_none());
        assert!(config.data_dir.exists());
    }

    #[test]
    fn test_remote_store_requires_key_with_url() {
        let _guard = EnvGuard::new(ENV_VARS);

        let config = Config {
            sync_url: Some("https://example.com/doc".to_string()),
            api_key: None,
            ..Config::default()
        };
        assert!(config.remote_store().is_err());
    }

    #[test]
    fn test_remote_store_defaults_to_local() {
        let _guard = EnvGuard::new(ENV_VARS);

        let config = Config::default();
        assert!(config.remote_store().is_ok());
    }
}
