use std::path::Path;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::session::{
    PlaybackSession, MAX_PITCH_CENTS, MAX_RATE, MIN_PITCH_CENTS, MIN_RATE,
};
use crate::audio::{PlaybackBackend, PlaybackStream};
use crate::recorder::{clamp_level, SILENCE_DB};
use crate::timer::{Cadence, Timer};

/// Owns the playback transport for one file at a time.
///
/// Nothing here fails outward: backend errors are logged and the session
/// falls back to a stopped, well-defined state.
pub struct PlaybackController {
    backend: Arc<dyn PlaybackBackend>,
    stream: Option<Box<dyn PlaybackStream>>,
    session: PlaybackSession,
    timer: Box<dyn Timer>,
    hold_step: Option<f64>,
    // Loop end of a wrap still in flight: readings at or past it are stale
    wrap_bound: Option<f64>,
    events: watch::Sender<PlaybackSession>,
}

impl PlaybackController {
    pub fn new(backend: Arc<dyn PlaybackBackend>, timer: Box<dyn Timer>) -> Self {
        let (events, _) = watch::channel(PlaybackSession::default());
        Self {
            backend,
            stream: None,
            session: PlaybackSession::default(),
            timer,
            hold_step: None,
            wrap_bound: None,
            events,
        }
    }

    pub fn session(&self) -> &PlaybackSession {
        &self.session
    }

    pub fn subscribe(&self) -> watch::Receiver<PlaybackSession> {
        self.events.subscribe()
    }

    pub fn is_loaded(&self) -> bool {
        self.stream.is_some()
    }

    pub fn is_scheduled(&self, cadence: Cadence) -> bool {
        self.timer.is_scheduled(cadence)
    }

    /// Load a file, replacing the current session.
    ///
    /// A file that cannot be opened leaves an empty session behind; returns
    /// whether the load succeeded.
    pub async fn load(&mut self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();

        self.stop();
        if self.stream.take().is_some() {
            debug!("Released previous playback stream");
        }
        self.session = self.session.reset_keeping_settings();

        let mut stream = match self.backend.open(path).await {
            Ok(stream) => stream,
            Err(e) => {
                warn!("Failed to load {} on {}: {}", path.display(), self.backend.name(), e);
                self.publish();
                return false;
            }
        };

        let info = stream.info();
        stream.set_rate(self.session.rate);
        stream.set_pitch_cents(self.session.pitch_cents);
        stream.set_gains(
            self.session.master_volume,
            self.session.gain_left_db,
            self.session.gain_right_db,
        );
        if let Err(e) = stream.schedule_from(0) {
            warn!("Failed to schedule {}: {}", path.display(), e);
            self.publish();
            return false;
        }

        self.session.duration = info.duration_seconds();
        self.session.current_file = Some(path.to_path_buf());
        self.stream = Some(stream);

        info!(
            "Loaded {}: {:.1}s, {}Hz, {} channels",
            path.display(),
            self.session.duration,
            info.sample_rate,
            info.channels
        );
        self.publish();
        true
    }

    pub fn play(&mut self) {
        let Some(stream) = self.stream.as_mut() else {
            return;
        };

        if let Err(e) = stream.play() {
            warn!("Failed to start playback: {}", e);
            self.session.is_playing = false;
            self.stop_timers();
            self.publish();
            return;
        }

        self.session.is_playing = true;
        self.start_timers();
        self.publish();
    }

    pub fn pause(&mut self) {
        let Some(stream) = self.stream.as_mut() else {
            return;
        };

        stream.pause();
        self.session.is_playing = false;
        self.stop_timers();
        self.stop_hold_seek();
        self.publish();
    }

    /// Rewind to the start and halt. Valid in any state.
    pub fn stop(&mut self) {
        if let Some(stream) = self.stream.as_mut() {
            stream.stop();
            if let Err(e) = stream.schedule_from(0) {
                warn!("Failed to rewind after stop: {}", e);
            }
        }

        self.session.position = 0.0;
        self.session.is_playing = false;
        self.wrap_bound = None;
        self.session.left_level = SILENCE_DB;
        self.session.right_level = SILENCE_DB;
        self.stop_timers();
        self.stop_hold_seek();
        self.publish();
    }

    /// Move to `target` seconds, clamped to the file and to the A-B loop.
    /// Playback resumes afterwards if it was running.
    pub fn seek(&mut self, target: f64) {
        let Some(stream) = self.stream.as_mut() else {
            return;
        };

        let position = self.session.clamp_position(target);
        self.wrap_bound = None;
        let frame = stream.info().frame_at(position);
        self.session.position = position;

        stream.stop();
        let restarted = stream.schedule_from(frame).and_then(|_| {
            if self.session.is_playing {
                stream.play()
            } else {
                Ok(())
            }
        });

        if let Err(e) = restarted {
            warn!("Failed to restart playback after seek to {:.2}s: {}", position, e);
            self.session.is_playing = false;
            self.stop_timers();
            self.stop_hold_seek();
        }

        self.publish();
    }

    /// Seek relative to the current position
    pub fn nudge(&mut self, delta: f64) {
        self.seek(self.session.position + delta);
    }

    /// Repeat `nudge(step)` every 200 ms until stopped. Only while playing.
    pub fn hold_seek(&mut self, step: f64) {
        if !self.session.is_playing {
            return;
        }

        self.hold_step = Some(step);
        self.session.is_holding_seek = true;
        self.timer.schedule(Cadence::HoldSeek);
        self.publish();
    }

    pub fn stop_hold_seek(&mut self) {
        self.timer.cancel(Cadence::HoldSeek);
        if self.hold_step.take().is_some() || self.session.is_holding_seek {
            self.session.is_holding_seek = false;
            self.publish();
        }
    }

    pub fn set_rate(&mut self, rate: f32) {
        let rate = rate.clamp(MIN_RATE, MAX_RATE);
        self.session.rate = rate;
        if let Some(stream) = self.stream.as_mut() {
            stream.set_rate(rate);
        }
        self.publish();
    }

    pub fn set_pitch_cents(&mut self, cents: f32) {
        let cents = cents.clamp(MIN_PITCH_CENTS, MAX_PITCH_CENTS);
        self.session.pitch_cents = cents;
        if let Some(stream) = self.stream.as_mut() {
            stream.set_pitch_cents(cents);
        }
        self.publish();
    }

    pub fn set_master_volume(&mut self, volume: f32) {
        self.session.master_volume = volume.clamp(0.0, 1.0);
        self.apply_gains();
    }

    pub fn set_channel_gains(&mut self, left_db: f32, right_db: f32) {
        self.session.gain_left_db = left_db;
        self.session.gain_right_db = right_db;
        self.apply_gains();
    }

    /// One tap on the A-B control at the current position
    pub fn toggle_loop(&mut self) {
        self.session.toggle_loop_at(self.session.position);
        self.wrap_bound = None;
        match self.session.loop_region() {
            Some((a, b)) => info!("Loop set: {:.2}s - {:.2}s", a, b),
            None if self.session.loop_a.is_some() => {
                debug!("Loop start set at {:.2}s", self.session.position)
            }
            None => info!("Loop cleared"),
        }
        self.publish();
    }

    pub fn clear_loop(&mut self) {
        self.session.loop_a = None;
        self.session.loop_b = None;
        self.wrap_bound = None;
        self.publish();
    }

    pub fn on_tick(&mut self, cadence: Cadence) {
        match cadence {
            Cadence::PlaybackPosition => self.reconcile_position(),
            Cadence::PlaybackMeters => self.update_meters(),
            Cadence::HoldSeek => match self.hold_step {
                Some(step) if self.session.is_playing => self.nudge(step),
                _ => self.stop_hold_seek(),
            },
            _ => {}
        }
    }

    fn reconcile_position(&mut self) {
        if !self.session.is_playing {
            self.stop_timers();
            self.stop_hold_seek();
            return;
        }
        let Some(stream) = self.stream.as_ref() else {
            return;
        };

        if let Some(reading) = stream.current_time() {
            let stale = match self.wrap_bound {
                Some(bound) if reading >= bound => true,
                Some(_) => {
                    self.wrap_bound = None;
                    false
                }
                None => false,
            };
            if stale {
                debug!("Ignoring pre-wrap reading {:.2}s", reading);
            } else if self.session.accepts_reading(reading) {
                self.session.position = reading.max(0.0).min(self.session.duration);
            } else {
                debug!(
                    "Discarding position reading {:.2}s (tracked {:.2}s)",
                    reading, self.session.position
                );
            }
        }
        let reached_end = stream.reached_end();

        // A zero-length region (both taps at one point) never wraps
        if let Some((a, b)) = self.session.loop_region() {
            if b > a && self.session.position >= b {
                debug!("Loop wrap {:.2}s -> {:.2}s", b, a);
                self.seek(a);
                if self.session.is_playing {
                    self.wrap_bound = Some(b);
                }
                return;
            }
        }

        if reached_end {
            info!("Playback reached end of file");
            self.stop();
            return;
        }

        self.publish();
    }

    fn update_meters(&mut self) {
        if !self.session.is_playing {
            return;
        }
        let Some(stream) = self.stream.as_mut() else {
            return;
        };

        let left = stream.average_power(0).map(clamp_level).unwrap_or(SILENCE_DB);
        let right = if stream.info().channels > 1 {
            stream.average_power(1).map(clamp_level).unwrap_or(left)
        } else {
            left
        };

        self.session.left_level = left;
        self.session.right_level = right;
        self.publish();
    }

    fn apply_gains(&mut self) {
        if let Some(stream) = self.stream.as_mut() {
            stream.set_gains(
                self.session.master_volume,
                self.session.gain_left_db,
                self.session.gain_right_db,
            );
        }
        self.publish();
    }

    fn start_timers(&mut self) {
        self.timer.schedule(Cadence::PlaybackPosition);
        self.timer.schedule(Cadence::PlaybackMeters);
    }

    fn stop_timers(&mut self) {
        self.timer.cancel(Cadence::PlaybackPosition);
        self.timer.cancel(Cadence::PlaybackMeters);
    }

    fn publish(&self) {
        self.events.send_replace(self.session.clone());
    }
}
