//! The persisted playback-state file.
//!
//! One compact JSON object, replaced wholesale on every write. The file may
//! instead hold a raw diagnostic payload; readers treat that as absent.

use crate::error::Result;
use crate::sync::state::{PlaybackSample, PlaybackState};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::io;
use std::path::{Path, PathBuf};

pub struct StateStore {
    path: PathBuf,
    /// Last `savedAt` written, so stamps never go backwards
    last_saved: Mutex<Option<DateTime<Utc>>>,
}

impl StateStore {
    /// Open the store at `path`, remembering the stamp of any state already
    /// on disk.
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let last_saved = match tokio::fs::read_to_string(&path).await {
            Ok(text) => serde_json::from_str::<PlaybackState>(&text)
                .ok()
                .map(|s| s.saved_at),
            Err(_) => None,
        };
        Self {
            path,
            last_saved: Mutex::new(last_saved),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stamp `sample` with `now`, or with the previous stamp if the clock
    /// went backwards since.
    pub fn stamp(&self, sample: PlaybackSample, now: DateTime<Utc>) -> PlaybackState {
        let mut last = self.last_saved.lock();
        let saved_at = match *last {
            Some(prev) if prev > now => prev,
            _ => now,
        };
        *last = Some(saved_at);
        sample.stamp(saved_at)
    }

    /// Replace the stored state.
    pub async fn save(&self, state: &PlaybackState) -> Result<()> {
        let text = serde_json::to_string(state)?;
        self.replace(text.as_bytes()).await
    }

    /// Replace the stored state with `raw` verbatim.
    pub async fn save_raw(&self, raw: &str) -> Result<()> {
        self.replace(raw.as_bytes()).await
    }

    /// Read the stored sample. `None` when the file is missing, unreadable or
    /// does not hold a JSON object.
    pub async fn load(&self) -> Option<PlaybackSample> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!("No saved playback state at {:?}", self.path);
                return None;
            }
            Err(e) => {
                tracing::warn!("Failed to read playback state {:?}: {}", self.path, e);
                return None;
            }
        };

        let sample = PlaybackSample::parse(&text);
        if sample.is_none() {
            tracing::debug!("Ignoring malformed playback state in {:?}", self.path);
        }
        sample
    }

    /// Write to a sibling temp file and rename it over the target.
    async fn replace(&self, bytes: &[u8]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}
