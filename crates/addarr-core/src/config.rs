use std::path::{Path, PathBuf};
use std::time::Duration;

use addarr_api::ResolverOptions;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

const DEFAULT_CONFIG: &str = include_str!("../../../config/default.toml");

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub network: NetworkConfig,
    pub updates: UpdatesConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub origin: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub resolve_timeout_ms: u64,
    pub request_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdatesConfig {
    pub poll_interval_secs: u64,
    pub check_applied_on_start: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    /// Also write a daily rolling log file under the data directory.
    pub file: bool,
}

impl AppConfig {
    /// Load config: user file (if exists) merged over built-in defaults.
    pub fn load() -> Result<Self, CoreError> {
        Self::load_from(&Self::config_path())
    }

    /// Like [`load`](Self::load) but reading the user file from `path`.
    pub fn load_from(path: &Path) -> Result<Self, CoreError> {
        let mut merged: toml::Value =
            toml::from_str(DEFAULT_CONFIG).map_err(|e| CoreError::Config(e.to_string()))?;

        if path.exists() {
            let user_str = std::fs::read_to_string(path)?;
            let user: toml::Value = toml::from_str(&user_str)
                .map_err(|e| CoreError::Config(format!("{}: {e}", path.display())))?;
            merge(&mut merged, user);
        }

        merged
            .try_into()
            .map_err(|e: toml::de::Error| CoreError::Config(e.to_string()))
    }

    /// Path to user config file (XDG on Linux, AppData on Windows).
    pub fn config_path() -> PathBuf {
        Self::project_dirs()
            .map(|d| d.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }

    /// Directory for the preference file and logs.
    pub fn data_dir() -> PathBuf {
        Self::project_dirs()
            .map(|d| d.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn preferences_path() -> PathBuf {
        Self::data_dir().join("preferences.json")
    }

    pub fn log_dir() -> PathBuf {
        Self::data_dir().join("logs")
    }

    pub fn resolver_options(&self) -> ResolverOptions {
        ResolverOptions {
            origin: self.server.origin.clone(),
            resolve_timeout: Duration::from_millis(self.network.resolve_timeout_ms.max(1)),
            request_timeout: Duration::from_millis(self.network.request_timeout_ms.max(1)),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.updates.poll_interval_secs.max(1))
    }

    fn project_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from("", "", "addarr")
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        toml::from_str(DEFAULT_CONFIG).expect("built-in default config is valid TOML")
    }
}

/// Overlay `user` onto `base`, table by table.
fn merge(base: &mut toml::Value, user: toml::Value) {
    match (base, user) {
        (toml::Value::Table(base), toml::Value::Table(user)) => {
            for (key, value) in user {
                match base.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, user) => *base = user,
    }
}
