//! Runtime settings for the bridge.
//!
//! Settings are loaded from a TOML file and can be overridden by environment
//! variables. Precedence (highest to lowest):
//!
//! 1. Environment variables
//! 2. Settings file values
//! 3. Defaults
//!
//! These are distinct from [`NodeConfig`](crate::NodeConfig): settings tune the
//! bridge itself (timeouts, limits, where state lives), the node config says
//! which node to talk to.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ConfigError;
use crate::store::{ConfigManager, FileStore};

/// Smallest accepted response bound.
pub const MIN_RESPONSE_BYTES: usize = 1024;

/// Bridge settings.
///
/// # Example
///
/// ```
/// use warpnet_common::BridgeSettings;
///
/// let settings = BridgeSettings::default();
/// assert_eq!(settings.connect_timeout_secs, 30);
/// assert!(settings.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeSettings {
    /// Directory holding the persisted node configuration.
    ///
    /// Supports a leading `~`. Environment variable: `WARPNET_DATA_DIR`
    pub data_dir: String,

    /// Upper bound for transport setup plus the target handshake.
    ///
    /// Environment variable: `WARPNET_CONNECT_TIMEOUT`
    pub connect_timeout_secs: u64,

    /// Upper bound for one request/response exchange.
    ///
    /// Environment variable: `WARPNET_REQUEST_TIMEOUT`
    pub request_timeout_secs: u64,

    /// How often bootstrap nodes are re-resolved while connected.
    pub bootstrap_refresh_secs: u64,

    /// Largest response body accepted from the node.
    pub max_response_bytes: usize,

    /// Presented to the node during the handshake.
    pub user_agent: String,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            data_dir: dirs::home_dir()
                .map(|h| h.join(".warpnet").to_string_lossy().to_string())
                .unwrap_or_else(|| ".warpnet".to_string()),
            connect_timeout_secs: 30,
            request_timeout_secs: 30,
            bootstrap_refresh_secs: 300,
            max_response_bytes: 4 * 1024 * 1024,
            user_agent: concat!("warpnet-bridge/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl BridgeSettings {
    /// Defaults with environment overrides applied.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if the result is invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        tracing::debug!("Loading bridge settings from environment variables");
        let mut settings = Self::default();
        settings.apply_env_overrides();
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from `path`, writing defaults there first if it does not
    /// exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] on I/O, parse or validation failure.
    pub fn load_or_create(path: &Path) -> Result<Self, ConfigError> {
        tracing::debug!(path = %path.display(), "Loading or creating bridge settings");

        let exists = path.exists();
        let mut settings = if exists {
            Self::load(path)?
        } else {
            tracing::info!(path = %path.display(), "Settings file doesn't exist, creating with defaults");
            Self::default()
        };

        if !exists {
            settings.save(path)?;
        }

        settings.apply_env_overrides();
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file can't be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            tracing::error!(path = %path.display(), error = %e, "Failed to read settings file");
            ConfigError::Io(e)
        })?;

        toml::from_str(&contents).map_err(|e| {
            tracing::error!(path = %path.display(), error = %e, "Failed to parse settings file");
            ConfigError::Parse(e)
        })
    }

    /// Save settings as TOML, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] on serialization or I/O failure.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        tracing::info!(path = %path.display(), "Saved bridge settings");
        Ok(())
    }

    /// Validate setting values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if a timeout or interval is zero,
    /// the response bound is below [`MIN_RESPONSE_BYTES`], or the data
    /// directory or user agent is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.data_dir.trim().is_empty() {
            return Err(ConfigError::Validation("data_dir must not be empty".into()));
        }

        for (name, value) in [
            ("connect_timeout_secs", self.connect_timeout_secs),
            ("request_timeout_secs", self.request_timeout_secs),
            ("bootstrap_refresh_secs", self.bootstrap_refresh_secs),
        ] {
            if value == 0 {
                return Err(ConfigError::Validation(format!("{name} must be non-zero")));
            }
        }

        if self.max_response_bytes < MIN_RESPONSE_BYTES {
            return Err(ConfigError::Validation(format!(
                "max_response_bytes must be at least {MIN_RESPONSE_BYTES}, got {}",
                self.max_response_bytes
            )));
        }

        if self.user_agent.trim().is_empty() {
            return Err(ConfigError::Validation("user_agent must not be empty".into()));
        }

        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn bootstrap_refresh(&self) -> Duration {
        Duration::from_secs(self.bootstrap_refresh_secs)
    }

    /// `data_dir` with a leading `~` expanded.
    pub fn data_dir(&self) -> PathBuf {
        match self.data_dir.strip_prefix("~/") {
            Some(rest) => dirs::home_dir()
                .map(|h| h.join(rest))
                .unwrap_or_else(|| PathBuf::from(&self.data_dir)),
            None => PathBuf::from(&self.data_dir),
        }
    }

    /// File-backed configuration manager under [`Self::data_dir`].
    pub fn config_manager(&self) -> ConfigManager<FileStore> {
        ConfigManager::in_dir(self.data_dir())
    }

    /// Apply `WARPNET_*` environment overrides.
    ///
    /// Unparsable numeric values are logged and ignored.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(data_dir) = std::env::var("WARPNET_DATA_DIR") {
            tracing::debug!(env_var = "WARPNET_DATA_DIR", value = %data_dir, "Applying environment override");
            self.data_dir = data_dir;
        }

        override_secs("WARPNET_CONNECT_TIMEOUT", &mut self.connect_timeout_secs);
        override_secs("WARPNET_REQUEST_TIMEOUT", &mut self.request_timeout_secs);
    }
}

fn override_secs(env_var: &'static str, target: &mut u64) {
    let Ok(raw) = std::env::var(env_var) else {
        return;
    };
    match raw.parse::<u64>() {
        Ok(secs) => {
            tracing::debug!(env_var, value = secs, "Applying environment override");
            *target = secs;
        }
        Err(e) => {
            tracing::warn!(
                env_var,
                value = %raw,
                error = %e,
                current = *target,
                "Invalid number in environment variable, keeping current value"
            );
        }
    }
}
