use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A named position inside a recording
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bookmark {
    pub id: Uuid,
    /// Seconds from the start of the recording
    pub time: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Bookmark {
    pub fn new(time: f64, title: Option<String>, note: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            time,
            title,
            note,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    Aac,
    Mp3,
    Wav,
    Flac,
    Ogg,
    Caf,
    Unknown,
}

impl AudioFormat {
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "m4a" | "aac" | "mp4" => AudioFormat::Aac,
            "mp3" => AudioFormat::Mp3,
            "wav" | "wave" => AudioFormat::Wav,
            "flac" => AudioFormat::Flac,
            "ogg" | "oga" => AudioFormat::Ogg,
            "caf" => AudioFormat::Caf,
            _ => AudioFormat::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioAttributes {
    pub duration: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bitrate_kbps: Option<u32>,
    pub sample_rate: u32,
    pub channels: u16,
    pub format: AudioFormat,
    pub file_size_bytes: u64,
}

/// Sidecar metadata of one recording.
///
/// Bookmarks are kept sorted by time after every mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMeta {
    /// Path of the recording this record describes
    pub id: String,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub last_played_position: Option<f64>,
    #[serde(default)]
    pub bookmarks: Vec<Bookmark>,
    pub audio: AudioAttributes,
    #[serde(default)]
    pub user_tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom: Option<HashMap<String, String>>,
}

impl FileMeta {
    pub fn add_bookmark(&mut self, bookmark: Bookmark) {
        self.bookmarks.push(bookmark);
        self.sort_bookmarks();
    }

    /// Replace the bookmark with the same id. Returns false if there is none.
    pub fn update_bookmark(&mut self, bookmark: Bookmark) -> bool {
        let Some(existing) = self.bookmarks.iter_mut().find(|b| b.id == bookmark.id) else {
            return false;
        };
        *existing = bookmark;
        self.sort_bookmarks();
        true
    }

    pub fn remove_bookmark(&mut self, id: Uuid) -> bool {
        let before = self.bookmarks.len();
        self.bookmarks.retain(|b| b.id != id);
        self.bookmarks.len() != before
    }

    pub fn bookmark(&self, id: Uuid) -> Option<&Bookmark> {
        self.bookmarks.iter().find(|b| b.id == id)
    }

    fn sort_bookmarks(&mut self) {
        self.bookmarks.sort_by(|a, b| a.time.total_cmp(&b.time));
    }
}
