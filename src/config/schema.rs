//! Configuration schema for linkpost
//!
//! Configuration is stored at `~/.config/linkpost/config.toml`

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Remote API settings
    pub api: ApiConfig,

    /// Credential storage
    pub session: SessionConfig,

    /// Upload limits
    pub upload: UploadConfig,
}

impl Config {
    /// Check values that deserialize fine but make no sense
    pub fn validate(&self) -> Result<(), String> {
        if self.api.base_url.trim().is_empty() {
            return Err("api.base_url must not be empty".to_string());
        }
        if !self.api.base_url.starts_with("http://") && !self.api.base_url.starts_with("https://")
        {
            return Err(format!(
                "api.base_url must start with http:// or https://, got '{}'",
                self.api.base_url
            ));
        }
        if self.api.timeout_secs == 0 {
            return Err("api.timeout_secs must be at least 1".to_string());
        }
        if !matches!(self.general.log_format.as_str(), "text" | "json") {
            return Err(format!(
                "general.log_format must be \"text\" or \"json\", got '{}'",
                self.general.log_format
            ));
        }
        Ok(())
    }
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Enable verbose logging
    pub verbose: bool,

    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            log_format: "text".to_string(),
        }
    }
}

/// Remote API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Origin of the REST API
    pub base_url: String,

    /// Per-request timeout in seconds; expiry counts as a network failure
    pub timeout_secs: u64,

    /// Page size for the feed
    pub feed_limit: u32,

    /// Page size for a user's posts
    pub user_posts_limit: u32,
}

impl ApiConfig {
    /// Request timeout as a `Duration`
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://linked-posts.routemisr.com".to_string(),
            timeout_secs: 30,
            feed_limit: 50,
            user_posts_limit: 50,
        }
    }
}

/// Credential storage settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Where the credential is persisted (defaults to the state directory)
    pub path: Option<PathBuf>,
}

/// Upload settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Largest accepted profile photo, in bytes
    pub max_photo_bytes: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_photo_bytes: 4 * 1024 * 1024,
        }
    }
}
