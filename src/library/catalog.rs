use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::metadata::{AudioAttributes, AudioFormat, Bookmark, FileMeta};
use super::storage::Storage;
use crate::audio::{AudioFile, AudioInfo};
use crate::waveform::WaveformCache;

/// Extensions listed as recordings
pub const AUDIO_EXTENSIONS: &[&str] = &["m4a", "aac", "wav", "mp3", "flac", "ogg", "caf"];

const META_SUFFIX: &str = ".meta.json";

/// One entry of the recordings list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordingFileInfo {
    pub path: PathBuf,
    pub name: String,
    pub size: u64,
    pub created: Option<DateTime<Utc>>,
    pub duration: Option<f64>,
}

/// Recordings on disk together with their sidecar metadata
pub struct RecordingLibrary {
    storage: Arc<dyn Storage>,
    waveforms: Option<WaveformCache>,
}

impl RecordingLibrary {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            waveforms: None,
        }
    }

    /// Also drop cached waveforms when recordings are moved or deleted
    pub fn with_waveform_cache(mut self, cache: WaveformCache) -> Self {
        self.waveforms = Some(cache);
        self
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// Sidecar metadata path for a recording: `<file>.meta.json`
    pub fn meta_path(audio: &Path) -> PathBuf {
        let mut name = OsString::from(audio.as_os_str());
        name.push(META_SUFFIX);
        PathBuf::from(name)
    }

    pub fn is_recording(path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| AUDIO_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
            .unwrap_or(false)
    }

    /// All recordings, newest first
    pub async fn list(&self) -> Result<Vec<RecordingFileInfo>> {
        let dir = self
            .storage
            .recordings_directory()
            .await
            .context("Failed to open recordings directory")?;
        let entries = self
            .storage
            .list_directory(&dir)
            .await
            .with_context(|| format!("Failed to list {}", dir.display()))?;

        let mut files = Vec::new();
        for path in entries.into_iter().filter(|p| Self::is_recording(p)) {
            let duration = probe(&path).await.map(|info| info.duration_seconds);
            files.push(RecordingFileInfo {
                name: file_name(&path),
                size: self.storage.size(&path).await,
                created: self.storage.created_at(&path).await,
                duration,
                path,
            });
        }

        files.sort_by(|a, b| b.created.cmp(&a.created));
        debug!("Listed {} recordings in {}", files.len(), dir.display());
        Ok(files)
    }

    /// Metadata for a recording, synthesized from the audio file when no
    /// sidecar exists yet.
    pub async fn meta(&self, audio: &Path) -> Result<FileMeta> {
        let meta_path = Self::meta_path(audio);
        if let Ok(data) = self.storage.read(&meta_path).await {
            let mut meta: FileMeta = serde_json::from_slice(&data)
                .with_context(|| format!("Corrupt metadata file {}", meta_path.display()))?;
            meta.bookmarks.sort_by(|a, b| a.time.total_cmp(&b.time));
            return Ok(meta);
        }

        if !self.storage.exists(audio).await {
            bail!("Recording not found: {}", audio.display());
        }

        let info = probe(audio).await;
        let format = audio
            .extension()
            .and_then(|e| e.to_str())
            .map(AudioFormat::from_extension)
            .unwrap_or(AudioFormat::Unknown);

        Ok(FileMeta {
            id: audio.display().to_string(),
            display_name: file_name(audio),
            created_at: self.storage.created_at(audio).await.unwrap_or_else(Utc::now),
            last_played_position: None,
            bookmarks: Vec::new(),
            audio: AudioAttributes {
                duration: info.map(|i| i.duration_seconds).unwrap_or(0.0),
                bitrate_kbps: None,
                sample_rate: info.map(|i| i.sample_rate).unwrap_or(0),
                channels: info.map(|i| i.channels).unwrap_or(0),
                format,
                file_size_bytes: self.storage.size(audio).await,
            },
            user_tags: Vec::new(),
            custom: None,
        })
    }

    /// Persist metadata next to its recording (atomic replace)
    pub async fn save_meta(&self, audio: &Path, meta: &FileMeta) -> Result<()> {
        let meta_path = Self::meta_path(audio);
        let data = serde_json::to_vec_pretty(meta).context("Failed to serialize metadata")?;
        self.storage
            .write_atomic(&meta_path, &data)
            .await
            .with_context(|| format!("Failed to write {}", meta_path.display()))?;
        Ok(())
    }

    pub async fn add_bookmark(
        &self,
        audio: &Path,
        time: f64,
        title: Option<String>,
        note: Option<String>,
    ) -> Result<Bookmark> {
        let mut meta = self.meta(audio).await?;
        let bookmark = Bookmark::new(time.max(0.0), title, note);
        meta.add_bookmark(bookmark.clone());
        self.save_meta(audio, &meta).await?;
        info!("Bookmark at {:.2}s added to {}", bookmark.time, audio.display());
        Ok(bookmark)
    }

    /// Returns false if the bookmark does not exist
    pub async fn update_bookmark(&self, audio: &Path, bookmark: Bookmark) -> Result<bool> {
        let mut meta = self.meta(audio).await?;
        if !meta.update_bookmark(bookmark) {
            return Ok(false);
        }
        self.save_meta(audio, &meta).await?;
        Ok(true)
    }

    /// Returns false if the bookmark does not exist
    pub async fn remove_bookmark(&self, audio: &Path, id: Uuid) -> Result<bool> {
        let mut meta = self.meta(audio).await?;
        if !meta.remove_bookmark(id) {
            return Ok(false);
        }
        self.save_meta(audio, &meta).await?;
        Ok(true)
    }

    pub async fn set_last_played_position(&self, audio: &Path, position: f64) -> Result<()> {
        let mut meta = self.meta(audio).await?;
        meta.last_played_position = Some(position.max(0.0));
        self.save_meta(audio, &meta).await
    }

    /// Copy a recording (and its metadata) to `<stem> copy.<ext>`
    pub async fn duplicate(&self, audio: &Path) -> Result<PathBuf> {
        let stem = audio
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let ext = audio
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default();
        let target = audio.with_file_name(format!("{} copy.{}", stem, ext));
        if self.storage.exists(&target).await {
            bail!("{} already exists", target.display());
        }

        self.storage
            .copy(audio, &target)
            .await
            .with_context(|| format!("Failed to copy {}", audio.display()))?;

        if self.storage.exists(&Self::meta_path(audio)).await {
            let mut meta = self.meta(audio).await?;
            meta.id = target.display().to_string();
            meta.display_name = file_name(&target);
            self.save_meta(&target, &meta).await?;
        }

        info!("Duplicated {} -> {}", audio.display(), target.display());
        Ok(target)
    }

    /// Rename a recording within its directory, carrying its metadata along
    pub async fn rename(&self, audio: &Path, new_name: &str) -> Result<PathBuf> {
        if new_name.is_empty() || new_name.contains(std::path::MAIN_SEPARATOR) {
            bail!("Invalid recording name: {:?}", new_name);
        }
        let target = audio.with_file_name(new_name);
        if self.storage.exists(&target).await {
            bail!("{} already exists", target.display());
        }

        self.storage
            .move_file(audio, &target)
            .await
            .with_context(|| format!("Failed to move {}", audio.display()))?;

        let old_meta = Self::meta_path(audio);
        if self.storage.exists(&old_meta).await {
            let mut meta = self.meta(audio).await?;
            meta.id = target.display().to_string();
            meta.display_name = file_name(&target);
            self.save_meta(&target, &meta).await?;
            self.storage.delete(&old_meta).await;
        }

        if let Some(cache) = &self.waveforms {
            cache.invalidate(audio).await;
        }

        info!("Renamed {} -> {}", audio.display(), target.display());
        Ok(target)
    }

    /// Delete a recording, its metadata and its cached waveform
    pub async fn delete(&self, audio: &Path) -> Result<()> {
        if !self.storage.delete(audio).await && self.storage.exists(audio).await {
            bail!("Failed to delete {}", audio.display());
        }

        let meta_path = Self::meta_path(audio);
        if self.storage.exists(&meta_path).await && !self.storage.delete(&meta_path).await {
            warn!("Orphaned metadata left at {}", meta_path.display());
        }

        if let Some(cache) = &self.waveforms {
            cache.invalidate(audio).await;
        }

        info!("Deleted recording {}", audio.display());
        Ok(())
    }

    pub fn free_space(&self) -> Option<u64> {
        self.storage.free_disk_space_bytes()
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

async fn probe(path: &Path) -> Option<AudioInfo> {
    let owned = path.to_path_buf();
    match tokio::task::spawn_blocking(move || AudioFile::probe(&owned)).await {
        Ok(Ok(info)) => Some(info),
        Ok(Err(e)) => {
            debug!("Could not probe {}: {}", path.display(), e);
            None
        }
        Err(e) => {
            warn!("Probe worker failed for {}: {}", path.display(), e);
            None
        }
    }
}
