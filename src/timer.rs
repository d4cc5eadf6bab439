//! Periodic callback scheduling
//!
//! Components never own a clock. They ask a [`Timer`] to start or stop a
//! [`Cadence`]; the control loop receives the resulting ticks and hands them
//! back to the component through its `on_tick` method, so every tick runs on
//! the same task as user commands.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

/// A named periodic callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cadence {
    /// Recorder dB meters (20 Hz)
    RecorderMeters,
    /// Live waveform refresh while recording (30 Hz)
    LiveWaveform,
    /// Playback position reconciliation (10 Hz)
    PlaybackPosition,
    /// Playback dB meters (20 Hz)
    PlaybackMeters,
    /// Continuous seek while a skip button is held (5 Hz)
    HoldSeek,
}

impl Cadence {
    pub fn period(self) -> Duration {
        match self {
            Cadence::RecorderMeters | Cadence::PlaybackMeters => Duration::from_millis(50),
            Cadence::LiveWaveform => Duration::from_secs_f64(1.0 / 30.0),
            Cadence::PlaybackPosition => Duration::from_millis(100),
            Cadence::HoldSeek => Duration::from_millis(200),
        }
    }
}

/// Clock/timer collaborator.
///
/// Scheduling a cadence that is already running restarts it.
pub trait Timer: Send {
    fn schedule(&mut self, cadence: Cadence);

    fn cancel(&mut self, cadence: Cadence);

    fn is_scheduled(&self, cadence: Cadence) -> bool;
}

/// Timer backed by one tokio interval task per cadence.
///
/// Ticks are delivered as [`Cadence`] values on the channel passed to
/// [`TokioTimer::new`]. Must be used from within a tokio runtime.
pub struct TokioTimer {
    ticks: mpsc::UnboundedSender<Cadence>,
    tasks: HashMap<Cadence, JoinHandle<()>>,
}

impl TokioTimer {
    pub fn new(ticks: mpsc::UnboundedSender<Cadence>) -> Self {
        Self {
            ticks,
            tasks: HashMap::new(),
        }
    }
}

impl Timer for TokioTimer {
    fn schedule(&mut self, cadence: Cadence) {
        self.cancel(cadence);

        let ticks = self.ticks.clone();
        let period = cadence.period();
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                if ticks.send(cadence).is_err() {
                    break;
                }
            }
        });

        debug!("Scheduled {:?} every {:?}", cadence, period);
        self.tasks.insert(cadence, task);
    }

    fn cancel(&mut self, cadence: Cadence) {
        if let Some(task) = self.tasks.remove(&cadence) {
            task.abort();
            debug!("Cancelled {:?}", cadence);
        }
    }

    fn is_scheduled(&self, cadence: Cadence) -> bool {
        self.tasks.contains_key(&cadence)
    }
}

impl Drop for TokioTimer {
    fn drop(&mut self) {
        for (_, task) in self.tasks.drain() {
            task.abort();
        }
    }
}

/// Timer that only records which cadences are scheduled.
///
/// The owner fires ticks by hand; used for offline drivers and tests.
#[derive(Debug, Default)]
pub struct ManualTimer {
    scheduled: HashSet<Cadence>,
}

impl ManualTimer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Timer for ManualTimer {
    fn schedule(&mut self, cadence: Cadence) {
        self.scheduled.insert(cadence);
    }

    fn cancel(&mut self, cadence: Cadence) {
        self.scheduled.remove(&cadence);
    }

    fn is_scheduled(&self, cadence: Cadence) -> bool {
        self.scheduled.contains(&cadence)
    }
}
