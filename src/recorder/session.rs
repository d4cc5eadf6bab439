use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use tokio::sync::{oneshot, watch};
use tracing::{debug, info, warn};

use super::metering::{MeteringSampler, DEFAULT_LIVE_CAPACITY, SILENCE_DB};
use super::state::{RecorderState, RecorderStateMachine};
use crate::audio::{CaptureBackend, CaptureOutcome, CaptureStream, Input, InputRegistry, RecordingSettings};
use crate::error::{RecorderError, SelectionError};
use crate::library::Storage;
use crate::timer::{Cadence, Timer};

/// Configuration for the recorder
#[derive(Debug, Clone)]
pub struct RecorderConfig {
    /// Encoder settings applied at the next `prepare`
    pub settings: RecordingSettings,
    /// Number of samples kept for the live waveform
    pub live_capacity: usize,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            settings: RecordingSettings::default(),
            live_capacity: DEFAULT_LIVE_CAPACITY,
        }
    }
}

/// The capture file currently owned by the recorder.
pub struct RecordingSession {
    path: PathBuf,
    stream: Box<dyn CaptureStream>,
    input: Input,
    started_at: DateTime<Utc>,
}

impl RecordingSession {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Input in use when the session was opened (the sentinel for the default input)
    pub fn input(&self) -> &Input {
        &self.input
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }
}

/// Observable recorder state for UI bindings
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecorderSnapshot {
    pub state: RecorderState,
    /// Seconds captured so far
    pub elapsed_secs: f64,
    pub file_name: String,
    /// e.g. "AAC 128kbps"
    pub format: String,
    pub left_level: f32,
    pub right_level: f32,
    /// Recent averaged levels, oldest first
    pub live_samples: Vec<f32>,
}

impl RecorderSnapshot {
    fn initial(format: String) -> Self {
        Self {
            state: RecorderState::Inited,
            elapsed_secs: 0.0,
            file_name: String::new(),
            format,
            left_level: SILENCE_DB,
            right_level: SILENCE_DB,
            live_samples: Vec::new(),
        }
    }
}

/// Drives the capture backend through the recorder lifecycle.
pub struct Recorder {
    machine: RecorderStateMachine,
    backend: Arc<dyn CaptureBackend>,
    storage: Arc<dyn Storage>,
    inputs: InputRegistry,
    metering: MeteringSampler,
    timer: Box<dyn Timer>,
    settings: RecordingSettings,
    session: Option<RecordingSession>,
    completion: Option<oneshot::Receiver<CaptureOutcome>>,
    snapshot: watch::Sender<RecorderSnapshot>,
}

impl Recorder {
    pub fn new(
        backend: Arc<dyn CaptureBackend>,
        storage: Arc<dyn Storage>,
        timer: Box<dyn Timer>,
        config: RecorderConfig,
    ) -> Self {
        let (snapshot, _) = watch::channel(RecorderSnapshot::initial(config.settings.label()));

        Self {
            machine: RecorderStateMachine::new(),
            inputs: InputRegistry::new(Arc::clone(&backend)),
            backend,
            storage,
            metering: MeteringSampler::new(config.live_capacity),
            timer,
            settings: config.settings,
            session: None,
            completion: None,
            snapshot,
        }
    }

    pub fn state(&self) -> RecorderState {
        self.machine.state()
    }

    pub fn session(&self) -> Option<&RecordingSession> {
        self.session.as_ref()
    }

    pub fn settings(&self) -> &RecordingSettings {
        &self.settings
    }

    /// Replace the encoder settings; they take effect at the next `prepare`.
    pub fn set_settings(&mut self, settings: RecordingSettings) {
        info!("Recording settings updated: {:?}", settings);
        self.settings = settings;
    }

    pub fn subscribe(&self) -> watch::Receiver<RecorderSnapshot> {
        self.snapshot.subscribe()
    }

    pub fn snapshot(&self) -> RecorderSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn metering(&self) -> &MeteringSampler {
        &self.metering
    }

    pub fn is_scheduled(&self, cadence: Cadence) -> bool {
        self.timer.is_scheduled(cadence)
    }

    pub fn available_inputs(&self) -> Vec<Input> {
        self.inputs.available_inputs()
    }

    pub fn select_input(&mut self, input: &Input) -> Result<(), SelectionError> {
        self.inputs.select_input(input)
    }

    pub fn preferred_input_name(&self) -> Option<&str> {
        self.inputs.preferred_name()
    }

    /// Completion channel of the current capture file, handed to the control loop
    pub fn take_completion(&mut self) -> Option<oneshot::Receiver<CaptureOutcome>> {
        self.completion.take()
    }

    /// Open a new capture file and move to `Prepared`.
    ///
    /// Any previous session is released first. On failure the state is unchanged.
    pub async fn prepare(&mut self) -> Result<RecorderState, RecorderError> {
        self.machine.check(RecorderState::Prepared)?;

        if let Some(previous) = self.session.take() {
            info!("Releasing recording session: {}", previous.path.display());
        }
        self.completion = None;
        self.metering.reset();

        let input = match self.inputs.preferred_input() {
            Some(input) => {
                self.backend.select_input(&input.name)?;
                input
            }
            None => {
                if let Some(name) = self.inputs.preferred_name() {
                    warn!("Preferred input '{}' is gone, using the default input", name);
                }
                Input::unselected()
            }
        };

        let dir = self
            .storage
            .recordings_directory()
            .await
            .map_err(|e| RecorderError::Storage(e.to_string()))?;
        let path = dir.join(recording_file_name(Local::now(), &self.settings));
        if self.storage.exists(&path).await && !self.storage.delete(&path).await {
            return Err(RecorderError::Storage(format!(
                "cannot clean up {}",
                path.display()
            )));
        }

        let (completion_tx, completion_rx) = oneshot::channel();
        let stream = self
            .backend
            .open_capture(&path, &self.settings, completion_tx)
            .await?;

        info!(
            "Prepared recording {} on {} ({})",
            path.display(),
            self.backend.name(),
            self.settings.label()
        );

        self.session = Some(RecordingSession {
            path,
            stream,
            input,
            started_at: Utc::now(),
        });
        self.completion = Some(completion_rx);
        let state = self.machine.transition(RecorderState::Prepared)?;
        self.publish();
        Ok(state)
    }

    /// Start or resume capture
    pub fn record(&mut self) -> Result<RecorderState, RecorderError> {
        self.machine.check(RecorderState::Recording)?;
        let session = self.session.as_mut().ok_or(RecorderError::NoActiveSession)?;

        session.stream.record()?;
        let state = self.machine.transition(RecorderState::Recording)?;
        info!("Recording: {}", session.path.display());

        self.start_metering();
        self.publish();
        Ok(state)
    }

    pub fn pause(&mut self) -> Result<RecorderState, RecorderError> {
        self.machine.check(RecorderState::Paused)?;
        let session = self.session.as_mut().ok_or(RecorderError::NoActiveSession)?;

        session.stream.pause();
        let state = self.machine.transition(RecorderState::Paused)?;
        info!("Recording paused at {:.1}s", session.stream.current_time());

        self.stop_metering();
        self.publish();
        Ok(state)
    }

    /// Finish capture and return the recorded file.
    pub fn stop(&mut self) -> Result<PathBuf, RecorderError> {
        self.machine.check(RecorderState::Stopped)?;
        let session = self.session.as_mut().ok_or(RecorderError::NoActiveSession)?;

        session.stream.stop();
        self.machine.transition(RecorderState::Stopped)?;
        let path = session.path.clone();
        info!("Recording stopped: {}", path.display());

        self.stop_metering();
        self.publish();
        Ok(path)
    }

    /// Terminal event from the backend: the capture ended on its own.
    pub fn on_capture_finished(&mut self, outcome: CaptureOutcome) {
        match self.machine.state() {
            RecorderState::Recording | RecorderState::Paused => {
                match &outcome {
                    CaptureOutcome::Finished => info!("Capture finished by backend"),
                    CaptureOutcome::Failed(reason) => warn!("Capture failed: {}", reason),
                }
                if let Err(e) = self.machine.transition(RecorderState::Stopped) {
                    warn!("Ignoring capture completion: {}", e);
                    return;
                }
                self.stop_metering();
                self.publish();
            }
            state => debug!("Capture completion {:?} ignored in state {}", outcome, state),
        }
    }

    pub fn on_tick(&mut self, cadence: Cadence) {
        if self.machine.state() != RecorderState::Recording {
            return;
        }
        let Some(session) = self.session.as_mut() else {
            return;
        };

        match cadence {
            Cadence::RecorderMeters => {
                let left = session.stream.average_power(0).unwrap_or(SILENCE_DB);
                let right = if session.stream.channel_count() > 1 {
                    session.stream.average_power(1)
                } else {
                    None
                };
                self.metering.record(left, right);

                let elapsed = session.stream.current_time();
                let (left_level, right_level) =
                    (self.metering.left_level(), self.metering.right_level());
                self.snapshot.send_modify(|snapshot| {
                    snapshot.elapsed_secs = elapsed;
                    snapshot.left_level = left_level;
                    snapshot.right_level = right_level;
                });
            }
            Cadence::LiveWaveform => {
                let live = self.metering.live_samples();
                self.snapshot.send_modify(|snapshot| snapshot.live_samples = live);
            }
            _ => {}
        }
    }

    fn start_metering(&mut self) {
        self.metering.start();
        self.timer.schedule(Cadence::RecorderMeters);
        self.timer.schedule(Cadence::LiveWaveform);
    }

    fn stop_metering(&mut self) {
        self.timer.cancel(Cadence::RecorderMeters);
        self.timer.cancel(Cadence::LiveWaveform);
        self.metering.stop();
    }

    fn publish(&self) {
        let (file_name, elapsed_secs) = match &self.session {
            Some(session) => (
                session
                    .path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                session.stream.current_time(),
            ),
            None => (String::new(), 0.0),
        };

        self.snapshot.send_replace(RecorderSnapshot {
            state: self.machine.state(),
            elapsed_secs,
            file_name,
            format: self.settings.label(),
            left_level: self.metering.left_level(),
            right_level: self.metering.right_level(),
            live_samples: self.metering.live_samples(),
        });
    }
}

/// `YYYYMMDD_HHMMSS.<ext>` for a capture started at `now`
pub fn recording_file_name(now: DateTime<Local>, settings: &RecordingSettings) -> String {
    format!("{}.{}", now.format("%Y%m%d_%H%M%S"), settings.extension())
}
