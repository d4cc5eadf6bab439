//! Control loop
//!
//! One task owns the [`Recorder`] and the [`PlaybackController`]. User
//! commands, timer ticks and the capture completion event are handled strictly
//! in arrival order on that task; callers talk to it through an
//! [`EngineHandle`] and observe it through `watch` receivers.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Result};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::audio::{CaptureBackend, CaptureOutcome, Input, PlaybackBackend, RecordingSettings};
use crate::config::PlaybackConfig;
use crate::error::{EngineError, RecorderError, SelectionError};
use crate::library::{Bookmark, RecordingLibrary};
use crate::playback::{PlaybackController, PlaybackSession};
use crate::recorder::{Recorder, RecorderConfig, RecorderSnapshot, RecorderState};
use crate::timer::{Cadence, TokioTimer};

const COMMAND_BUFFER: usize = 64;

/// Everything the control loop is built from
pub struct EngineParts {
    pub capture: Arc<dyn CaptureBackend>,
    pub playback: Arc<dyn PlaybackBackend>,
    pub library: Arc<RecordingLibrary>,
    pub recorder: RecorderConfig,
    pub playback_config: PlaybackConfig,
}

/// Transport operations, each answered with the resulting session
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackCommand {
    Play,
    Pause,
    Stop,
    Seek(f64),
    Nudge(f64),
    HoldSeek(f64),
    StopHoldSeek,
    SetRate(f32),
    SetPitch(f32),
    SetVolume(f32),
    SetChannelGains(f32, f32),
    ToggleLoop,
    ClearLoop,
}

enum Command {
    Prepare(oneshot::Sender<Result<RecorderState, RecorderError>>),
    Record(oneshot::Sender<Result<RecorderState, RecorderError>>),
    PauseRecording(oneshot::Sender<Result<RecorderState, RecorderError>>),
    StopRecording(oneshot::Sender<Result<PathBuf, RecorderError>>),
    Inputs(oneshot::Sender<Vec<Input>>),
    SelectInput(Input, oneshot::Sender<Result<(), SelectionError>>),
    SetRecordingSettings(RecordingSettings, oneshot::Sender<()>),
    Load(PathBuf, oneshot::Sender<bool>),
    Playback(PlaybackCommand, oneshot::Sender<PlaybackSession>),
    Shutdown,
}

pub struct Engine {
    recorder: Recorder,
    player: PlaybackController,
    completion: Option<oneshot::Receiver<CaptureOutcome>>,
}

impl Engine {
    /// Start the control loop on the current tokio runtime.
    pub fn spawn(parts: EngineParts) -> (EngineHandle, JoinHandle<()>) {
        let (tick_tx, tick_rx) = mpsc::unbounded_channel();
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);

        let recorder = Recorder::new(
            parts.capture,
            Arc::clone(parts.library.storage()),
            Box::new(TokioTimer::new(tick_tx.clone())),
            parts.recorder,
        );
        let player = PlaybackController::new(parts.playback, Box::new(TokioTimer::new(tick_tx)));

        let handle = EngineHandle {
            commands: command_tx,
            recorder: recorder.subscribe(),
            playback: player.subscribe(),
            library: parts.library,
            playback_config: parts.playback_config,
        };

        let engine = Engine {
            recorder,
            player,
            completion: None,
        };
        let task = tokio::spawn(engine.run(command_rx, tick_rx));

        (handle, task)
    }

    async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut ticks: mpsc::UnboundedReceiver<Cadence>,
    ) {
        info!("Engine started");

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => {
                        self.handle(command).await;
                        if let Some(completion) = self.recorder.take_completion() {
                            self.completion = Some(completion);
                        }
                    }
                },
                Some(cadence) = ticks.recv() => self.on_tick(cadence),
                Some(outcome) = next_capture_outcome(&mut self.completion) => {
                    self.recorder.on_capture_finished(outcome);
                }
            }
        }

        self.player.stop();
        if matches!(
            self.recorder.state(),
            RecorderState::Recording | RecorderState::Paused
        ) {
            if let Ok(path) = self.recorder.stop() {
                info!("Recording closed on shutdown: {}", path.display());
            }
        }
        info!("Engine stopped");
    }

    async fn handle(&mut self, command: Command) {
        // A dropped reply receiver only means the caller stopped waiting.
        match command {
            Command::Prepare(reply) => {
                let _ = reply.send(self.recorder.prepare().await);
            }
            Command::Record(reply) => {
                let _ = reply.send(self.recorder.record());
            }
            Command::PauseRecording(reply) => {
                let _ = reply.send(self.recorder.pause());
            }
            Command::StopRecording(reply) => {
                let _ = reply.send(self.recorder.stop());
            }
            Command::Inputs(reply) => {
                let _ = reply.send(self.recorder.available_inputs());
            }
            Command::SelectInput(input, reply) => {
                let _ = reply.send(self.recorder.select_input(&input));
            }
            Command::SetRecordingSettings(settings, reply) => {
                self.recorder.set_settings(settings);
                let _ = reply.send(());
            }
            Command::Load(path, reply) => {
                let _ = reply.send(self.player.load(&path).await);
            }
            Command::Playback(command, reply) => {
                self.apply(command);
                let _ = reply.send(self.player.session().clone());
            }
            Command::Shutdown => {}
        }
    }

    fn apply(&mut self, command: PlaybackCommand) {
        debug!("Playback command {:?}", command);
        match command {
            PlaybackCommand::Play => self.player.play(),
            PlaybackCommand::Pause => self.player.pause(),
            PlaybackCommand::Stop => self.player.stop(),
            PlaybackCommand::Seek(target) => self.player.seek(target),
            PlaybackCommand::Nudge(delta) => self.player.nudge(delta),
            PlaybackCommand::HoldSeek(step) => self.player.hold_seek(step),
            PlaybackCommand::StopHoldSeek => self.player.stop_hold_seek(),
            PlaybackCommand::SetRate(rate) => self.player.set_rate(rate),
            PlaybackCommand::SetPitch(cents) => self.player.set_pitch_cents(cents),
            PlaybackCommand::SetVolume(volume) => self.player.set_master_volume(volume),
            PlaybackCommand::SetChannelGains(left, right) => {
                self.player.set_channel_gains(left, right)
            }
            PlaybackCommand::ToggleLoop => self.player.toggle_loop(),
            PlaybackCommand::ClearLoop => self.player.clear_loop(),
        }
    }

    fn on_tick(&mut self, cadence: Cadence) {
        match cadence {
            Cadence::RecorderMeters | Cadence::LiveWaveform => self.recorder.on_tick(cadence),
            Cadence::PlaybackPosition | Cadence::PlaybackMeters | Cadence::HoldSeek => {
                self.player.on_tick(cadence)
            }
        }
    }
}

/// Resolves with the capture outcome once, then stays pending until a new
/// capture file registers its completion channel.
async fn next_capture_outcome(
    completion: &mut Option<oneshot::Receiver<CaptureOutcome>>,
) -> Option<CaptureOutcome> {
    match completion.as_mut() {
        Some(receiver) => {
            let outcome = receiver.await.ok();
            *completion = None;
            outcome
        }
        None => std::future::pending().await,
    }
}

/// Cloneable command API of a running [`Engine`]
#[derive(Clone)]
pub struct EngineHandle {
    commands: mpsc::Sender<Command>,
    recorder: watch::Receiver<RecorderSnapshot>,
    playback: watch::Receiver<PlaybackSession>,
    library: Arc<RecordingLibrary>,
    playback_config: PlaybackConfig,
}

impl EngineHandle {
    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(command(reply_tx))
            .await
            .map_err(|_| EngineError::Closed)?;
        reply_rx.await.map_err(|_| EngineError::Closed)
    }

    pub fn recorder_updates(&self) -> watch::Receiver<RecorderSnapshot> {
        self.recorder.clone()
    }

    pub fn playback_updates(&self) -> watch::Receiver<PlaybackSession> {
        self.playback.clone()
    }

    pub fn library(&self) -> &Arc<RecordingLibrary> {
        &self.library
    }

    pub async fn prepare_recording(&self) -> Result<RecorderState, EngineError> {
        Ok(self.request(Command::Prepare).await??)
    }

    pub async fn record(&self) -> Result<RecorderState, EngineError> {
        Ok(self.request(Command::Record).await??)
    }

    pub async fn pause_recording(&self) -> Result<RecorderState, EngineError> {
        Ok(self.request(Command::PauseRecording).await??)
    }

    pub async fn stop_recording(&self) -> Result<PathBuf, EngineError> {
        Ok(self.request(Command::StopRecording).await??)
    }

    pub async fn available_inputs(&self) -> Result<Vec<Input>, EngineError> {
        self.request(Command::Inputs).await
    }

    pub async fn select_input(&self, input: Input) -> Result<(), EngineError> {
        Ok(self.request(|reply| Command::SelectInput(input, reply)).await??)
    }

    pub async fn set_recording_settings(&self, settings: RecordingSettings) -> Result<(), EngineError> {
        self.request(|reply| Command::SetRecordingSettings(settings, reply)).await
    }

    pub async fn load(&self, path: impl Into<PathBuf>) -> Result<bool, EngineError> {
        let path = path.into();
        self.request(|reply| Command::Load(path, reply)).await
    }

    pub async fn playback(&self, command: PlaybackCommand) -> Result<PlaybackSession, EngineError> {
        self.request(|reply| Command::Playback(command, reply)).await
    }

    pub async fn skip_forward(&self) -> Result<PlaybackSession, EngineError> {
        self.playback(PlaybackCommand::Nudge(self.playback_config.skip_seconds))
            .await
    }

    pub async fn skip_back(&self) -> Result<PlaybackSession, EngineError> {
        self.playback(PlaybackCommand::Nudge(-self.playback_config.skip_seconds))
            .await
    }

    /// Start continuous seeking in the given direction (held skip button)
    pub async fn hold_skip(&self, forward: bool) -> Result<PlaybackSession, EngineError> {
        let step = self.playback_config.hold_seek_step;
        self.playback(PlaybackCommand::HoldSeek(if forward { step } else { -step }))
            .await
    }

    /// Bookmark the current playback position of the loaded file
    pub async fn add_bookmark_here(
        &self,
        title: Option<String>,
        note: Option<String>,
    ) -> Result<Bookmark> {
        let session = self.playback.borrow().clone();
        let Some(file) = session.current_file else {
            bail!("No recording loaded");
        };
        self.library
            .add_bookmark(&file, session.position, title, note)
            .await
    }

    /// Persist the current position so playback can resume there later
    pub async fn remember_position(&self) -> Result<()> {
        let session = self.playback.borrow().clone();
        match session.current_file {
            Some(file) => {
                self.library
                    .set_last_played_position(&file, session.position)
                    .await
            }
            None => Ok(()),
        }
    }

    /// Load a recording and seek to where it was last left off
    pub async fn resume(&self, path: &Path) -> Result<bool> {
        if !self.load(path).await? {
            return Ok(false);
        }
        if let Some(position) = self.library.meta(path).await?.last_played_position {
            self.playback(PlaybackCommand::Seek(position)).await?;
        }
        Ok(true)
    }

    /// Stop the control loop; in-progress capture is finalized.
    pub async fn shutdown(&self) {
        let _ = self.commands.send(Command::Shutdown).await;
    }
}
