//! Engine configuration.
//!
//! Base URLs, deadlines, and retry knobs for the two backends, loadable
//! from a JSON settings file. Missing files yield the defaults so the
//! engine works against a local development backend with no setup.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::resolve::RetryPolicy;

/// Default backend base URL for local development.
const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Engine settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    /// Base URL of the local repository mirror service.
    #[serde(default = "default_base_url")]
    pub local_base_url: String,

    /// Base URL of the remote hosting API proxy.
    #[serde(default = "default_base_url")]
    pub remote_base_url: String,

    /// Per-call deadline for the local mirror, in seconds.
    ///
    /// Generous because the mirror may run a targeted fetch for commits
    /// outside its cached history.
    #[serde(default = "default_local_timeout")]
    pub local_timeout_secs: u64,

    /// Per-call deadline for the hosting API, in seconds.
    #[serde(default = "default_remote_timeout")]
    pub remote_timeout_secs: u64,

    /// Base backoff delay between retries, in seconds.
    #[serde(default = "default_retry_base")]
    pub retry_base_delay_secs: u64,

    /// Cap on any computed backoff delay, in seconds.
    #[serde(default = "default_retry_cap")]
    pub retry_max_delay_secs: u64,

    /// Attempts allowed per backend, including the first.
    #[serde(default = "default_retry_attempts")]
    pub retry_max_attempts: u32,

    /// Access token handed through to the backends for private
    /// repositories.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_local_timeout() -> u64 {
    240
}

fn default_remote_timeout() -> u64 {
    60
}

fn default_retry_base() -> u64 {
    1
}

fn default_retry_cap() -> u64 {
    60
}

fn default_retry_attempts() -> u32 {
    3
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            local_base_url: default_base_url(),
            remote_base_url: default_base_url(),
            local_timeout_secs: default_local_timeout(),
            remote_timeout_secs: default_remote_timeout(),
            retry_base_delay_secs: default_retry_base(),
            retry_max_delay_secs: default_retry_cap(),
            retry_max_attempts: default_retry_attempts(),
            access_token: None,
        }
    }
}

impl EngineConfig {
    /// The retry policy described by this configuration.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            base_delay: Duration::from_secs(self.retry_base_delay_secs),
            max_delay: Duration::from_secs(self.retry_max_delay_secs),
            factor: 2,
            max_attempts: self.retry_max_attempts,
        }
    }

    /// Local mirror deadline as a duration.
    pub fn local_timeout(&self) -> Duration {
        Duration::from_secs(self.local_timeout_secs)
    }

    /// Hosting API deadline as a duration.
    pub fn remote_timeout(&self) -> Duration {
        Duration::from_secs(self.remote_timeout_secs)
    }
}

/// Loads and saves engine settings from a JSON file.
pub struct ConfigManager {
    settings_path: PathBuf,
}

impl ConfigManager {
    /// Creates a manager for the given settings path.
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            settings_path: path,
        }
    }

    /// Loads settings, falling back to defaults when the file is absent.
    pub fn load(&self) -> Result<EngineConfig> {
        if !self.settings_path.exists() {
            return Ok(EngineConfig::default());
        }

        let content = std::fs::read_to_string(&self.settings_path)
            .with_context(|| format!("failed to read settings file: {:?}", self.settings_path))?;

        let config: EngineConfig = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse settings file: {:?}", self.settings_path))?;

        Ok(config)
    }

    /// Writes settings to the file, creating parent directories.
    pub fn save(&self, config: &EngineConfig) -> Result<()> {
        if let Some(parent) = self.settings_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create settings directory: {parent:?}"))?;
        }

        let content =
            serde_json::to_string_pretty(config).context("failed to serialize settings")?;

        std::fs::write(&self.settings_path, content)
            .with_context(|| format!("failed to write settings file: {:?}", self.settings_path))?;

        Ok(())
    }
}
