use std::path::PathBuf;

use anyhow::anyhow;
use ether_proto::cache::{FetchResult, MetadataCache, TitleSource};
use ether_proto::config::Config;
use ether_proto::icy::IcyFetcher;
use ether_proto::journal::{Journal, LikedTrack};
use tracing::info;

/// Everything a command needs: settings, the title cache and the journal.
pub struct App<S = IcyFetcher> {
    pub config: Config,
    config_path: PathBuf,
    pub cache: MetadataCache<S>,
    pub journal: Journal,
}

impl App {
    pub fn open(config_path: Option<PathBuf>) -> anyhow::Result<Self> {
        let config_path = config_path.unwrap_or_else(Config::config_path);
        let config = Config::load_from(&config_path)?;
        info!("Config loaded from: {:?}", config_path);

        let fetcher = IcyFetcher::new(&config.http)?;
        Ok(Self::with_source(config, config_path, fetcher))
    }
}

impl<S: TitleSource> App<S> {
    pub fn with_source(config: Config, config_path: PathBuf, source: S) -> Self {
        let cache = MetadataCache::new(source, config.stream.clone());
        let journal = Journal::new(config.paths.liked_file.clone());
        Self {
            config,
            config_path,
            cache,
            journal,
        }
    }

    pub async fn refresh(&mut self) -> FetchResult {
        self.cache.refresh(now_secs()).await
    }

    /// Like whatever the cache currently shows, fetching first if it has
    /// nothing yet.
    pub async fn like(&mut self, comment: &str) -> anyhow::Result<LikedTrack> {
        let result = match self.cache.last_result() {
            Some(last) => last.clone(),
            None => self.refresh().await,
        };
        let track = LikedTrack::from_result(&result, comment)
            .ok_or_else(|| anyhow!("nothing to like: {}", result.title))?;
        self.journal.append(track.clone()).await?;
        Ok(track)
    }

    pub fn set_station(&mut self, url: &str) -> anyhow::Result<()> {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            anyhow::bail!("not an http(s) URL: {}", url);
        }
        self.config.stream.url = url.to_string();
        self.config.save_to(&self.config_path)?;
        self.cache.set_config(self.config.stream.clone());
        info!("Station set to {}", url);
        Ok(())
    }
}

pub fn now_secs() -> i64 {
    chrono::Utc::now().timestamp()
}
