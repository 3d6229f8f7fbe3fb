//! Application-level configuration loading.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "TRIALCARDS_CONFIG_PATH";
const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_CATALOG_PATH: &str = "config/cards.json";
const DEFAULT_RECENT_ANSWERS_LIMIT: usize = 20;
const DEFAULT_REMOTE_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Directory holding the local stats records.
    pub data_dir: PathBuf,
    /// JSON card catalog.
    pub catalog_path: PathBuf,
    /// Number of recent answers kept for streak and trend views.
    pub recent_answers_limit: usize,
    /// Per-request timeout of the remote store client.
    pub remote_timeout: Duration,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        data_dir = %app_config.data_dir.display(),
                        catalog = %app_config.catalog_path.display(),
                        "loaded config"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        RawConfig::default().into()
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    data_dir: PathBuf,
    catalog_path: PathBuf,
    recent_answers_limit: usize,
    remote_timeout_ms: u64,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            catalog_path: PathBuf::from(DEFAULT_CATALOG_PATH),
            recent_answers_limit: DEFAULT_RECENT_ANSWERS_LIMIT,
            remote_timeout_ms: DEFAULT_REMOTE_TIMEOUT_MS,
        }
    }
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        Self {
            data_dir: value.data_dir,
            catalog_path: value.catalog_path,
            recent_answers_limit: value.recent_answers_limit.max(1),
            remote_timeout: Duration::from_millis(value.remote_timeout_ms),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let raw: RawConfig =
            serde_json::from_str(r#"{"data_dir": "/var/lib/trialcards", "remote_timeout_ms": 2500}"#)
                .unwrap();
        let config = AppConfig::from(raw);
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/trialcards"));
        assert_eq!(config.catalog_path, PathBuf::from(DEFAULT_CATALOG_PATH));
        assert_eq!(config.recent_answers_limit, DEFAULT_RECENT_ANSWERS_LIMIT);
        assert_eq!(config.remote_timeout, Duration::from_millis(2500));
    }

    #[test]
    fn zero_recent_limit_is_clamped() {
        let raw: RawConfig = serde_json::from_str(r#"{"recent_answers_limit": 0}"#).unwrap();
        assert_eq!(AppConfig::from(raw).recent_answers_limit, 1);
    }
}
