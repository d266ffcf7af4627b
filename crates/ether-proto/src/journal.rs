//! Liked tracks, persisted as `{ "tracks": [ {title, comment, stamp}, ... ] }`.
//!
//! Append-only from the app's point of view: tracks keep like order and are
//! never deduplicated, edited or removed here.

use chrono::{Local, TimeZone};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::cache::FetchResult;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikedTrack {
    pub title: String,
    #[serde(default)]
    pub comment: String,
    /// Epoch seconds of the refresh the title came from.
    pub stamp: i64,
}

impl LikedTrack {
    /// Only a valid result names a track; an invalid one holds an error text.
    pub fn from_result(result: &FetchResult, comment: impl Into<String>) -> Option<Self> {
        result.is_valid.then(|| Self {
            title: result.title.clone(),
            comment: comment.into(),
            stamp: result.timestamp,
        })
    }
}

impl fmt::Display for LikedTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match Local.timestamp_opt(self.stamp, 0).single() {
            Some(ts) => write!(f, "{} {}", ts.format("%c"), self.title)?,
            None => write!(f, "@{} {}", self.stamp, self.title)?,
        }
        if !self.comment.is_empty() {
            write!(f, " \"{}\"", self.comment)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikedTracks {
    #[serde(default)]
    pub tracks: Vec<LikedTrack>,
}

pub struct Journal {
    path: PathBuf,
}

impl Journal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A journal that was never written is empty; a corrupt one is an error
    /// so a later append cannot silently overwrite it.
    pub async fn load(&self) -> anyhow::Result<LikedTracks> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(LikedTracks::default())
            }
            Err(e) => return Err(e.into()),
        };
        let saved = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("{}: {}", self.path.display(), e))?;
        Ok(saved)
    }

    pub async fn append(&self, track: LikedTrack) -> anyhow::Result<()> {
        let mut saved = self.load().await?;
        info!("[journal] liked {:?} (#{})", track.title, saved.tracks.len() + 1);
        saved.tracks.push(track);

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(&saved)?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }
}
