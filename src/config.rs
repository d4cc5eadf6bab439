use anyhow::{Context, Result};
use serde::Deserialize;

use crate::audio::RecordingSettings;
use crate::recorder::{RecorderConfig, DEFAULT_LIVE_CAPACITY};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub recording: RecordingSettings,
    pub playback: PlaybackConfig,
    pub metering: MeteringConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub recordings_dir: String,
    pub waveform_cache_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            recordings_dir: "recordings".to_string(),
            waveform_cache_dir: "recordings/.waveforms".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Seconds moved by the skip forward/back controls
    pub skip_seconds: f64,
    /// Seconds moved on each hold-seek repeat
    pub hold_seek_step: f64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            skip_seconds: 10.0,
            hold_seek_step: 2.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MeteringConfig {
    pub live_capacity: usize,
}

impl Default for MeteringConfig {
    fn default() -> Self {
        Self {
            live_capacity: DEFAULT_LIVE_CAPACITY,
        }
    }
}

impl Config {
    /// Load from `path` (any extension the `config` crate knows, or none),
    /// then apply `DICTAPHONE__SECTION__KEY` environment overrides.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("DICTAPHONE").separator("__"))
            .build()
            .with_context(|| format!("Failed to load config from {}", path))?;

        Ok(settings.try_deserialize()?)
    }

    pub fn recorder(&self) -> RecorderConfig {
        RecorderConfig {
            settings: self.recording.clone(),
            live_capacity: self.metering.live_capacity.max(1),
        }
    }
}
