use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use super::input::Input;
use crate::error::BackendError;

/// What the backend reports after opening a file for playback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackInfo {
    /// Total number of sample frames in the file
    pub frame_count: u64,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
}

impl PlaybackInfo {
    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frame_count as f64 / self.sample_rate as f64
    }

    /// Frame offset for a position in seconds, never past the end of the file.
    pub fn frame_at(&self, seconds: f64) -> u64 {
        let frame = (seconds.max(0.0) * self.sample_rate as f64) as u64;
        frame.min(self.frame_count)
    }
}

/// Capture settings passed to the backend when a recording file is opened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingSettings {
    /// Sample rate in Hz (44100 or 48000)
    pub sample_rate: u32,
    /// Encoder bitrate (128, 256, 320)
    pub bitrate_kbps: u32,
    /// Number of channels (1 = mono, 2 = stereo)
    pub channels: u16,
    /// Container/codec name, also used as the file extension
    pub format: String,
}

impl Default for RecordingSettings {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            bitrate_kbps: 128,
            channels: 2,
            format: "aac".to_string(),
        }
    }
}

impl RecordingSettings {
    /// File extension for the configured format
    pub fn extension(&self) -> &str {
        match self.format.as_str() {
            "aac" => "m4a",
            other => other,
        }
    }

    /// Human readable label, e.g. "AAC 128kbps"
    pub fn label(&self) -> String {
        format!("{} {}kbps", self.format.to_uppercase(), self.bitrate_kbps)
    }
}

/// Terminal event of a capture stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// Encoder finished and the file is complete
    Finished,
    /// Hardware or encoder failure ended the recording
    Failed(String),
}

/// Playback side of the audio backend
///
/// Implementations own the platform engine; each opened file is an exclusive
/// [`PlaybackStream`] that is released when dropped.
#[async_trait]
pub trait PlaybackBackend: Send + Sync {
    /// Open a file for playback. May suspend while the file is probed.
    async fn open(&self, path: &Path) -> Result<Box<dyn PlaybackStream>, BackendError>;

    /// Get backend name for logging
    fn name(&self) -> &str;
}

/// An opened, exclusively owned playback handle.
pub trait PlaybackStream: Send {
    fn info(&self) -> PlaybackInfo;

    /// Resume the transport from the scheduled offset
    fn play(&mut self) -> Result<(), BackendError>;

    fn pause(&mut self);

    /// Halt the transport and drop any scheduled audio
    fn stop(&mut self);

    /// Schedule playback to start at the given sample frame. The transport is
    /// left paused until [`PlaybackStream::play`] is called.
    fn schedule_from(&mut self, frame: u64) -> Result<(), BackendError>;

    fn set_rate(&mut self, rate: f32);

    fn set_pitch_cents(&mut self, cents: f32);

    /// Master volume in 0..=1, channel gains in dB
    fn set_gains(&mut self, master: f32, left_db: f32, right_db: f32);

    /// Instantaneous average power in dB, `None` if the channel does not exist
    fn average_power(&mut self, channel: usize) -> Option<f32>;

    /// Render position in seconds, `None` while the engine has not rendered yet
    fn current_time(&self) -> Option<f64>;

    /// True once the scheduled audio has played out
    fn reached_end(&self) -> bool;
}

/// Capture side of the audio backend
#[async_trait]
pub trait CaptureBackend: Send + Sync {
    /// Inputs the hardware currently offers. Never cached.
    fn available_inputs(&self) -> Result<Vec<Input>, BackendError>;

    /// Make the named input the preferred data source.
    fn select_input(&self, name: &str) -> Result<(), BackendError>;

    /// Open a capture file.
    ///
    /// `completion` is fired by the backend exactly once, when the recording
    /// terminates on its own (encoder finished or hardware failure).
    async fn open_capture(
        &self,
        path: &Path,
        settings: &RecordingSettings,
        completion: oneshot::Sender<CaptureOutcome>,
    ) -> Result<Box<dyn CaptureStream>, BackendError>;

    /// Get backend name for logging
    fn name(&self) -> &str;
}

/// An opened, exclusively owned capture handle.
pub trait CaptureStream: Send {
    fn record(&mut self) -> Result<(), BackendError>;

    fn pause(&mut self);

    fn stop(&mut self);

    /// Instantaneous average power in dB, `None` if the channel does not exist
    fn average_power(&mut self, channel: usize) -> Option<f32>;

    fn channel_count(&self) -> u16;

    /// Seconds captured so far
    fn current_time(&self) -> f64;
}
