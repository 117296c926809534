//! Configuration management for linkpost

pub mod schema;

pub use schema::Config;

use crate::error::{FeedError, FeedResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

const ENV_API_URL: &str = "LINKPOST_API_URL";
const ENV_TIMEOUT_SECS: &str = "LINKPOST_TIMEOUT_SECS";

/// Configuration manager
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new config manager with default path
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
        }
    }

    /// Create a config manager with a custom path
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("linkpost")
            .join("config.toml")
    }

    /// Get the state directory path
    pub fn state_dir() -> PathBuf {
        dirs::state_dir()
            .or_else(dirs::data_local_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("linkpost")
    }

    /// Default location of the persisted credential
    pub fn session_path() -> PathBuf {
        Self::state_dir().join("session.json")
    }

    /// Load configuration, using defaults if the file does not exist.
    ///
    /// `LINKPOST_API_URL` and `LINKPOST_TIMEOUT_SECS` override the file.
    pub async fn load(&self) -> FeedResult<Config> {
        let mut config = if self.config_path.exists() {
            self.read_file(&self.config_path).await?
        } else {
            debug!("Config file not found, using defaults");
            Config::default()
        };

        apply_env_overrides(&mut config, |name| std::env::var(name).ok())
            .map_err(|reason| self.invalid(reason))?;
        config.validate().map_err(|reason| self.invalid(reason))?;
        Ok(config)
    }

    async fn read_file(&self, path: &Path) -> FeedResult<Config> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| FeedError::io(format!("reading config from {}", path.display()), e))?;

        toml::from_str(&content).map_err(|e| FeedError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    fn invalid(&self, reason: String) -> FeedError {
        FeedError::ConfigInvalid {
            path: self.config_path.clone(),
            reason,
        }
    }

    /// Save configuration to file
    pub async fn save(&self, config: &Config) -> FeedResult<()> {
        self.ensure_config_dir().await?;

        let content = toml::to_string_pretty(config)?;
        fs::write(&self.config_path, content).await.map_err(|e| {
            FeedError::io(
                format!("writing config to {}", self.config_path.display()),
                e,
            )
        })?;

        info!("Configuration saved to {}", self.config_path.display());
        Ok(())
    }

    /// Ensure the config directory exists
    async fn ensure_config_dir(&self) -> FeedResult<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| FeedError::ConfigDirCreate {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }
        Ok(())
    }

    /// Get the config file path
    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

/// Overlay environment variables read through `lookup`
fn apply_env_overrides<F>(config: &mut Config, lookup: F) -> Result<(), String>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
        debug!("{} overrides api.base_url", ENV_API_URL);
        config.api.base_url = url.trim().trim_end_matches('/').to_string();
    }
    if let Some(secs) = lookup(ENV_TIMEOUT_SECS) {
        config.api.timeout_secs = secs
            .trim()
            .parse()
            .map_err(|_| format!("{} must be a number of seconds, got '{}'", ENV_TIMEOUT_SECS, secs))?;
    }
    Ok(())
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn load_default_when_missing() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nonexistent.toml");
        let manager = ConfigManager::with_path(path);

        let config = manager.load().await.unwrap();
        assert_eq!(config.api.base_url, "https://linked-posts.routemisr.com");
    }

    #[tokio::test]
    async fn save_and_load_roundtrip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        let manager = ConfigManager::with_path(path);

        let mut config = Config::default();
        config.api.base_url = "http://localhost:8080".to_string();

        manager.save(&config).await.unwrap();
        let loaded = manager.load().await.unwrap();

        assert_eq!(loaded.api.base_url, "http://localhost:8080");
    }

    #[tokio::test]
    async fn invalid_values_are_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        tokio::fs::write(&path, "[api]\ntimeout_secs = 0\n")
            .await
            .unwrap();

        let err = ConfigManager::with_path(path).load().await.unwrap_err();
        assert!(matches!(err, FeedError::ConfigInvalid { .. }));
    }

    #[test]
    fn env_overrides_apply_on_top_of_file() {
        let mut config = Config::default();
        apply_env_overrides(&mut config, |name| match name {
            "LINKPOST_API_URL" => Some("http://127.0.0.1:3000/".to_string()),
            "LINKPOST_TIMEOUT_SECS" => Some("5".to_string()),
            _ => None,
        })
        .unwrap();

        assert_eq!(config.api.base_url, "http://127.0.0.1:3000");
        assert_eq!(config.api.timeout_secs, 5);
    }

    #[test]
    fn malformed_timeout_override_is_rejected() {
        let mut config = Config::default();
        let err = apply_env_overrides(&mut config, |name| {
            (name == "LINKPOST_TIMEOUT_SECS").then(|| "soon".to_string())
        })
        .unwrap_err();
        assert!(err.contains("LINKPOST_TIMEOUT_SECS"));
        assert_eq!(config.api.timeout_secs, 30);
    }
}
