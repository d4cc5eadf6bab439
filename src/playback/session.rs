use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::recorder::SILENCE_DB;

pub const MIN_RATE: f32 = 0.5;
pub const MAX_RATE: f32 = 2.0;
pub const MIN_PITCH_CENTS: f32 = -1200.0;
pub const MAX_PITCH_CENTS: f32 = 1200.0;

/// Readings further than this from the tracked position are discarded
pub const MAX_POSITION_JUMP_SECS: f64 = 5.0;

/// Observable playback state.
///
/// Position, duration and loop points belong to the loaded file and are reset
/// on every load; rate, pitch and volumes are listener settings and carry over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackSession {
    pub current_file: Option<PathBuf>,
    /// Seconds, always within `0..=duration`
    pub position: f64,
    pub duration: f64,
    pub is_playing: bool,
    pub rate: f32,
    pub pitch_cents: f32,
    /// 0.0..=1.0
    pub master_volume: f32,
    /// Channel gains in dB
    pub gain_left_db: f32,
    pub gain_right_db: f32,
    pub loop_a: Option<f64>,
    pub loop_b: Option<f64>,
    pub is_holding_seek: bool,
    pub left_level: f32,
    pub right_level: f32,
}

impl Default for PlaybackSession {
    fn default() -> Self {
        Self {
            current_file: None,
            position: 0.0,
            duration: 0.0,
            is_playing: false,
            rate: 1.0,
            pitch_cents: 0.0,
            master_volume: 1.0,
            gain_left_db: 0.0,
            gain_right_db: 0.0,
            loop_a: None,
            loop_b: None,
            is_holding_seek: false,
            left_level: SILENCE_DB,
            right_level: SILENCE_DB,
        }
    }
}

impl PlaybackSession {
    /// A fresh session that keeps this session's listener settings
    pub fn reset_keeping_settings(&self) -> Self {
        Self {
            rate: self.rate,
            pitch_cents: self.pitch_cents,
            master_volume: self.master_volume,
            gain_left_db: self.gain_left_db,
            gain_right_db: self.gain_right_db,
            ..Self::default()
        }
    }

    /// Both loop bounds, when loop mode is fully set
    pub fn loop_region(&self) -> Option<(f64, f64)> {
        match (self.loop_a, self.loop_b) {
            (Some(a), Some(b)) => Some((a, b)),
            _ => None,
        }
    }

    /// Clamp a target time into the file, then into the loop region if one is set.
    pub fn clamp_position(&self, target: f64) -> f64 {
        let target = if target.is_nan() { 0.0 } else { target };
        let mut clamped = target.max(0.0).min(self.duration.max(0.0));

        if let Some((a, b)) = self.loop_region() {
            if clamped < a {
                clamped = a;
            } else if clamped > b {
                clamped = b;
            }
        }

        clamped
    }

    /// Advance the A-B control by one tap at `position`.
    ///
    /// No loop: A is set. A only: B is set if after A, otherwise the two swap
    /// so the earlier point becomes A. Both set: loop mode is cleared.
    pub fn toggle_loop_at(&mut self, position: f64) {
        match (self.loop_a, self.loop_b) {
            (None, _) => {
                self.loop_a = Some(position);
                self.loop_b = None;
            }
            (Some(a), None) => {
                if position > a {
                    self.loop_b = Some(position);
                } else {
                    self.loop_b = Some(a);
                    self.loop_a = Some(position);
                }
            }
            (Some(_), Some(_)) => {
                self.loop_a = None;
                self.loop_b = None;
            }
        }
    }

    /// True if a backend reading is close enough to the tracked position to adopt
    pub fn accepts_reading(&self, reading: f64) -> bool {
        (reading - self.position).abs() <= MAX_POSITION_JUMP_SECS
    }
}
