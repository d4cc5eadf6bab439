//! Recordings on disk
//!
//! This module provides:
//! - The `Storage` collaborator and its local file-system implementation
//! - Per-recording sidecar metadata (bookmarks, playback position, audio attributes)
//! - `RecordingLibrary`, which lists, copies, renames and deletes recordings

mod catalog;
mod metadata;
mod storage;

pub use catalog::{RecordingFileInfo, RecordingLibrary, AUDIO_EXTENSIONS};
pub use metadata::{AudioAttributes, AudioFormat, Bookmark, FileMeta};
pub use storage::{FsStorage, Storage};
