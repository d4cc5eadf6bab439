use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tokio::fs;
use tracing::{debug, info, warn};

use super::summary::WaveformSummary;
use crate::error::WaveformError;

const CACHE_EXTENSION: &str = "wave";

/// On-disk cache of waveform summaries, one file per source recording.
///
/// Entries are named by a SHA-256 of the source path and replaced atomically
/// (write to a temporary file, then rename), so readers never observe a
/// half-written summary.
#[derive(Debug, Clone)]
pub struct WaveformCache {
    dir: PathBuf,
}

impl WaveformCache {
    /// Open the cache, creating the directory if needed. A plain file in the
    /// way of the directory is removed.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, WaveformError> {
        let dir = dir.into();

        if let Ok(meta) = fs::metadata(&dir).await {
            if !meta.is_dir() {
                warn!("Waveform cache path {} is not a directory, replacing it", dir.display());
                fs::remove_file(&dir).await.map_err(cache_error)?;
            }
        }
        fs::create_dir_all(&dir).await.map_err(cache_error)?;

        debug!("Waveform cache at {}", dir.display());
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Cache file for a source recording
    pub fn entry_path(&self, source: &Path) -> PathBuf {
        let digest = Sha256::digest(source.to_string_lossy().as_bytes());
        self.dir.join(format!("{:x}.{}", digest, CACHE_EXTENSION))
    }

    /// Load the cached summary for `source` if it still matches the file's
    /// measured duration. Stale or unreadable entries are deleted.
    pub async fn load(&self, source: &Path, measured_duration: f64) -> Option<WaveformSummary> {
        let entry = self.entry_path(source);
        let data = fs::read(&entry).await.ok()?;

        match serde_json::from_slice::<WaveformSummary>(&data) {
            Ok(summary) if summary.matches_duration(measured_duration) => {
                debug!("Waveform cache hit for {}", source.display());
                Some(summary)
            }
            Ok(summary) => {
                info!(
                    "Discarding stale waveform for {} (cached {:.2}s, measured {:.2}s)",
                    source.display(),
                    summary.total_duration,
                    measured_duration
                );
                self.remove_entry(&entry).await;
                None
            }
            Err(e) => {
                warn!("Discarding corrupt waveform cache {}: {}", entry.display(), e);
                self.remove_entry(&entry).await;
                None
            }
        }
    }

    /// Write (or atomically replace) the entry for `source`
    pub async fn store(&self, source: &Path, summary: &WaveformSummary) -> Result<(), WaveformError> {
        let entry = self.entry_path(source);
        let tmp = entry.with_extension(format!("{}.tmp", CACHE_EXTENSION));

        let data = serde_json::to_vec(summary).map_err(cache_error)?;
        fs::write(&tmp, &data).await.map_err(cache_error)?;
        if let Err(e) = fs::rename(&tmp, &entry).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(cache_error(e));
        }

        debug!("Cached waveform for {} at {}", source.display(), entry.display());
        Ok(())
    }

    /// Drop the entry for `source`, if any
    pub async fn invalidate(&self, source: &Path) {
        self.remove_entry(&self.entry_path(source)).await;
    }

    async fn remove_entry(&self, entry: &Path) {
        if let Err(e) = fs::remove_file(entry).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to remove waveform cache {}: {}", entry.display(), e);
            }
        }
    }
}

fn cache_error(err: impl std::fmt::Display) -> WaveformError {
    WaveformError::Cache(err.to_string())
}
