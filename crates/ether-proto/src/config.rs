use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::platform;

pub const DEFAULT_STREAM_URL: &str = "https://q2stream.wqxr.org/q2";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub paths: PathsConfig,
}

/// The one stream being watched and how often its title may be re-fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamConfig {
    #[serde(default = "default_url")]
    pub url: String,
    /// Minimum number of seconds between two network fetches.
    #[serde(default = "default_update_interval")]
    pub update_interval: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Upper bound for one whole fetch, headers and metadata block included.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// JSON journal of liked tracks.
    #[serde(default = "default_liked_file")]
    pub liked_file: PathBuf,
}

impl StreamConfig {
    pub fn new(url: impl Into<String>, update_interval: u64) -> Self {
        Self {
            url: url.into(),
            update_interval,
        }
    }
}

impl HttpConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            update_interval: default_update_interval(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            connect_timeout_secs: default_connect_timeout(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            liked_file: default_liked_file(),
        }
    }
}

fn default_url() -> String {
    DEFAULT_STREAM_URL.to_string()
}

fn default_update_interval() -> u64 {
    5
}

fn default_user_agent() -> String {
    concat!("ethermemo/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_connect_timeout() -> u64 {
    5
}

fn default_request_timeout() -> u64 {
    15
}

fn default_liked_file() -> PathBuf {
    platform::data_dir().join("liked_tracks.json")
}

impl Config {
    /// Load from the default location, writing the defaults there on first run.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            let config = Self::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.stream.url, DEFAULT_STREAM_URL);
        assert_eq!(config.stream.update_interval, 5);
        assert_eq!(config.http.request_timeout(), Duration::from_secs(15));
        assert!(config.http.user_agent.starts_with("ethermemo/"));
        assert!(config
            .paths
            .liked_file
            .ends_with("ethermemo/liked_tracks.json"));
    }

    #[test]
    fn test_partial_toml_falls_back_to_defaults() {
        let config: Config = toml::from_str(
            r#"
            [stream]
            url = "http://example.com/live"
            "#,
        )
        .unwrap();
        assert_eq!(config.stream.url, "http://example.com/live");
        assert_eq!(config.stream.update_interval, 5);
        assert_eq!(config.http.connect_timeout_secs, 5);
    }

    #[test]
    fn test_load_from_missing_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.stream.url, DEFAULT_STREAM_URL);

        let mut changed = config.clone();
        changed.stream.url = "http://example.com/other".to_string();
        changed.save_to(&path).unwrap();

        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.stream.url, "http://example.com/other");
    }
}
