//! User configuration at `~/.subsync/config.yaml`.
//!
//! A missing or unreadable config is never fatal: it degrades to
//! [`Config::default`] with a warning. Only resolving a channel that is not
//! configured (or has a malformed id) is an error.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::store::root_at;

pub const CONFIG_FILE: &str = "config.yaml";
pub const DEFAULT_CACHE_FRESHNESS_SECS: u64 = 60 * 60;
pub const DEFAULT_DAILY_QUOTA: u64 = 10_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Channel nickname → channel id (`UC…`).
    pub channels: BTreeMap<String, String>,
    pub cache_freshness_secs: u64,
    pub daily_quota: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            channels: BTreeMap::new(),
            cache_freshness_secs: DEFAULT_CACHE_FRESHNESS_SECS,
            daily_quota: DEFAULT_DAILY_QUOTA,
        }
    }
}

/// `<home>/.subsync/config.yaml`
pub fn config_path_at(home: &Path) -> PathBuf {
    root_at(home).join(CONFIG_FILE)
}

impl Config {
    /// Load the config under `home`, falling back to defaults.
    pub fn load_at(home: &Path) -> Self {
        let path = config_path_at(home);
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Self::default(),
            Err(err) => {
                tracing::warn!("cannot read {}: {err}; using defaults", path.display());
                return Self::default();
            }
        };
        match serde_yaml::from_str::<Config>(&contents) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!("ignoring malformed {}: {err}", path.display());
                Self::default()
            }
        }
    }

    /// Response cache freshness window. A value chrono cannot represent
    /// falls back to the default.
    pub fn cache_freshness(&self) -> Duration {
        i64::try_from(self.cache_freshness_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or_else(|| {
                tracing::warn!(
                    "cache_freshness_secs {} is out of range; using {DEFAULT_CACHE_FRESHNESS_SECS}",
                    self.cache_freshness_secs
                );
                Duration::seconds(DEFAULT_CACHE_FRESHNESS_SECS as i64)
            })
    }

    /// `load_at` convenience wrapper.
    pub fn load() -> Result<Self, ConfigError> {
        let home = dirs::home_dir().ok_or(ConfigError::HomeNotFound)?;
        Ok(Self::load_at(&home))
    }

    /// Resolve a channel nickname to its validated channel id.
    pub fn channel_id(&self, nickname: &str, home: &Path) -> Result<&str, ConfigError> {
        let channel_id =
            self.channels
                .get(nickname)
                .ok_or_else(|| ConfigError::UnknownChannel {
                    nickname: nickname.to_string(),
                    path: config_path_at(home),
                })?;
        if !channel_id.starts_with("UC") {
            return Err(ConfigError::InvalidChannelId {
                nickname: nickname.to_string(),
                channel_id: channel_id.clone(),
            });
        }
        Ok(channel_id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(home: &Path, body: &str) {
        let path = config_path_at(home);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, body).unwrap();
    }

    #[test]
    fn missing_config_is_default() {
        let home = TempDir::new().unwrap();
        assert_eq!(Config::load_at(home.path()), Config::default());
    }

    #[test]
    fn malformed_config_degrades_to_default() {
        let home = TempDir::new().unwrap();
        write_config(home.path(), "channels: [not, a, map");
        assert_eq!(Config::load_at(home.path()), Config::default());
    }

    #[test]
    fn partial_config_fills_defaults() {
        let home = TempDir::new().unwrap();
        write_config(home.path(), "channels:\n  main: UC123\n");
        let config = Config::load_at(home.path());
        assert_eq!(config.channel_id("main", home.path()).unwrap(), "UC123");
        assert_eq!(config.daily_quota, DEFAULT_DAILY_QUOTA);
    }

    #[test]
    fn oversized_freshness_falls_back_to_default() {
        let home = TempDir::new().unwrap();
        write_config(home.path(), "cache_freshness_secs: 100000000000000000\n");
        let config = Config::load_at(home.path());
        assert_eq!(config.cache_freshness_secs, 100_000_000_000_000_000);
        assert_eq!(config.cache_freshness(), Duration::hours(1));

        let wrapping = Config {
            cache_freshness_secs: u64::MAX,
            ..Config::default()
        };
        assert_eq!(wrapping.cache_freshness(), Duration::hours(1));
        assert_eq!(Config::default().cache_freshness(), Duration::hours(1));
    }

    #[test]
    fn channel_id_must_start_with_uc() {
        let home = TempDir::new().unwrap();
        write_config(home.path(), "channels:\n  bad: XY123\n");
        let config = Config::load_at(home.path());
        let err = config.channel_id("bad", home.path()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidChannelId { .. }));
        let err = config.channel_id("nope", home.path()).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownChannel { .. }));
    }
}
