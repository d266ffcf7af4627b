//! Rate-limited "now playing" state.
//!
//! The UI ticks once a second; the cache only goes to the network when the
//! stored result is older than `update_interval`. Fetch failures are folded
//! into an invalid `FetchResult` so a flaky stream never breaks the loop.

use std::future::Future;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::StreamConfig;
use crate::error::FetchError;
use crate::icy::IcyFetcher;

/// Prefix shown in front of the title when the last fetch failed.
pub const INVALID_PREFIX: &str = "[!]";

/// Anything that can produce the current title of a stream.
pub trait TitleSource {
    fn fetch_title(
        &self,
        config: &StreamConfig,
    ) -> impl Future<Output = Result<String, FetchError>> + Send;
}

impl TitleSource for IcyFetcher {
    async fn fetch_title(&self, config: &StreamConfig) -> Result<String, FetchError> {
        IcyFetcher::fetch_title(self, config).await
    }
}

/// Last attempted refresh. When `is_valid` is false, `title` is the error text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchResult {
    pub title: String,
    pub is_valid: bool,
    /// Epoch seconds of the attempt.
    pub timestamp: i64,
}

impl FetchResult {
    pub fn status_line(&self) -> String {
        if self.is_valid {
            self.title.clone()
        } else {
            format!("{}{}", INVALID_PREFIX, self.title)
        }
    }
}

pub struct MetadataCache<S> {
    source: S,
    config: StreamConfig,
    last: Option<FetchResult>,
}

impl<S: TitleSource> MetadataCache<S> {
    pub fn new(source: S, config: StreamConfig) -> Self {
        Self {
            source,
            config,
            last: None,
        }
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    pub fn last_result(&self) -> Option<&FetchResult> {
        self.last.as_ref()
    }

    /// Point the cache at another stream. The stored title belongs to the
    /// old one, so it is dropped and the next `refresh` fetches right away.
    pub fn set_config(&mut self, config: StreamConfig) {
        if config != self.config {
            info!("[cache] stream changed: {} -> {}", self.config.url, config.url);
            self.last = None;
        }
        self.config = config;
    }

    fn is_stale(&self, now: i64) -> bool {
        match &self.last {
            None => true,
            Some(last) => now.saturating_sub(last.timestamp) > self.interval(),
        }
    }

    fn interval(&self) -> i64 {
        i64::try_from(self.config.update_interval).unwrap_or(i64::MAX)
    }

    /// Return the stored result, fetching a new one first if it is missing
    /// or older than `update_interval` seconds at `now`.
    pub async fn refresh(&mut self, now: i64) -> FetchResult {
        if !self.is_stale(now) {
            if let Some(last) = &self.last {
                return last.clone();
            }
        }

        let result = match self.source.fetch_title(&self.config).await {
            Ok(title) => {
                debug!("[cache] fetched title {:?}", title);
                if self.last.as_ref().map(|l| &l.title) != Some(&title) {
                    info!("[cache] now playing: {}", title);
                }
                FetchResult {
                    title,
                    is_valid: true,
                    timestamp: now,
                }
            }
            Err(e) => {
                warn!("[cache] fetch from {} failed: {}", self.config.url, e);
                FetchResult {
                    title: e.to_string(),
                    is_valid: false,
                    timestamp: now,
                }
            }
        };

        self.last = Some(result.clone());
        result
    }

    /// Seconds until the next `refresh` would go to the network. Display
    /// only; `None` before the first fetch.
    pub fn next_refresh_in(&self, now: i64) -> Option<i64> {
        self.last
            .as_ref()
            .map(|last| {
                last.timestamp
                    .saturating_add(self.interval())
                    .saturating_sub(now)
                    .max(0)
            })
    }
}
