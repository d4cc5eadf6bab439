use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::fs;
use tracing::{debug, info, warn};

/// File-system collaborator used for recordings.
///
/// All operations may suspend; none of them block the control loop.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn exists(&self, path: &Path) -> bool;

    /// Returns false if the file could not be removed
    async fn delete(&self, path: &Path) -> bool;

    /// Size in bytes, 0 if the file is missing
    async fn size(&self, path: &Path) -> u64;

    async fn copy(&self, src: &Path, dst: &Path) -> io::Result<()>;

    async fn move_file(&self, src: &Path, dst: &Path) -> io::Result<()>;

    async fn list_directory(&self, path: &Path) -> io::Result<Vec<PathBuf>>;

    async fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Replace `path` with `data` so readers never observe a partial file
    async fn write_atomic(&self, path: &Path, data: &[u8]) -> io::Result<()>;

    async fn created_at(&self, path: &Path) -> Option<DateTime<Utc>>;

    /// Directory holding recordings, created on demand
    async fn recordings_directory(&self) -> io::Result<PathBuf>;

    fn free_disk_space_bytes(&self) -> Option<u64>;
}

/// [`Storage`] over the local file system
#[derive(Debug, Clone)]
pub struct FsStorage {
    recordings_dir: PathBuf,
}

impl FsStorage {
    pub fn new(recordings_dir: impl Into<PathBuf>) -> Self {
        Self {
            recordings_dir: recordings_dir.into(),
        }
    }
}

#[async_trait]
impl Storage for FsStorage {
    async fn exists(&self, path: &Path) -> bool {
        fs::try_exists(path).await.unwrap_or(false)
    }

    async fn delete(&self, path: &Path) -> bool {
        match fs::remove_file(path).await {
            Ok(()) => {
                debug!("Deleted {}", path.display());
                true
            }
            Err(e) => {
                warn!("Failed to delete {}: {}", path.display(), e);
                false
            }
        }
    }

    async fn size(&self, path: &Path) -> u64 {
        fs::metadata(path).await.map(|m| m.len()).unwrap_or(0)
    }

    async fn copy(&self, src: &Path, dst: &Path) -> io::Result<()> {
        fs::copy(src, dst).await?;
        debug!("Copied {} -> {}", src.display(), dst.display());
        Ok(())
    }

    async fn move_file(&self, src: &Path, dst: &Path) -> io::Result<()> {
        fs::rename(src, dst).await?;
        debug!("Moved {} -> {}", src.display(), dst.display());
        Ok(())
    }

    async fn list_directory(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let mut entries = fs::read_dir(path).await?;
        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let hidden = entry.file_name().to_string_lossy().starts_with('.');
            if !hidden {
                paths.push(entry.path());
            }
        }
        Ok(paths)
    }

    async fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path).await
    }

    async fn write_atomic(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, data).await?;
        if let Err(e) = fs::rename(&tmp, path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e);
        }
        debug!("Wrote {} ({} bytes)", path.display(), data.len());
        Ok(())
    }

    async fn created_at(&self, path: &Path) -> Option<DateTime<Utc>> {
        let meta = fs::metadata(path).await.ok()?;
        let time = meta.created().or_else(|_| meta.modified()).ok()?;
        Some(DateTime::<Utc>::from(time))
    }

    async fn recordings_directory(&self) -> io::Result<PathBuf> {
        if !fs::try_exists(&self.recordings_dir).await.unwrap_or(false) {
            info!("Creating recordings directory: {}", self.recordings_dir.display());
        }
        fs::create_dir_all(&self.recordings_dir).await?;
        Ok(self.recordings_dir.clone())
    }

    fn free_disk_space_bytes(&self) -> Option<u64> {
        let probe = if self.recordings_dir.exists() {
            self.recordings_dir.as_path()
        } else {
            self.recordings_dir.parent().unwrap_or(Path::new("."))
        };
        free_space(probe)
    }
}

#[cfg(unix)]
fn free_space(path: &Path) -> Option<u64> {
    match rustix::fs::statvfs(path) {
        Ok(stat) => Some((stat.f_bavail as u64).saturating_mul(stat.f_frsize as u64)),
        Err(e) => {
            debug!("statvfs failed for {}: {}", path.display(), e);
            None
        }
    }
}

#[cfg(not(unix))]
fn free_space(_path: &Path) -> Option<u64> {
    None
}
