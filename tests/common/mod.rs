// Shared test doubles: in-memory capture/playback backends and WAV fixtures.
//
// Backends keep their state behind Arc<Mutex<_>> so tests can inspect and
// steer what the code under test sees.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use dictaphone::audio::{
    CaptureBackend, CaptureOutcome, CaptureStream, Input, Location, PlaybackBackend, PlaybackInfo,
    PlaybackStream, RecordingSettings,
};
use dictaphone::error::BackendError;
use tokio::sync::oneshot;

// ---------------------------------------------------------------------------
// Capture
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct CaptureState {
    pub inputs: Vec<Input>,
    pub selected: Option<String>,
    pub reject_selection: bool,
    pub inputs_error: Option<BackendError>,
    pub open_error: Option<BackendError>,
    pub opened: Vec<(PathBuf, RecordingSettings)>,
    pub completion: Option<oneshot::Sender<CaptureOutcome>>,
    pub recording: bool,
    pub stopped: bool,
    pub channels: u16,
    pub left_db: Option<f32>,
    pub right_db: Option<f32>,
    pub elapsed: f64,
}

#[derive(Clone)]
pub struct MockCapture {
    pub state: Arc<Mutex<CaptureState>>,
}

impl MockCapture {
    pub fn new() -> Self {
        let state = CaptureState {
            inputs: vec![
                Input::new("Built-In Microphone", Location::Bottom),
                Input::new("Headset Microphone", Location::Unknown),
            ],
            channels: 2,
            ..CaptureState::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn with_state<T>(&self, f: impl FnOnce(&mut CaptureState) -> T) -> T {
        f(&mut self.state.lock().unwrap())
    }

    /// Fire the completion channel registered by the last open
    pub fn finish(&self, outcome: CaptureOutcome) -> bool {
        let sender = self.with_state(|s| s.completion.take());
        match sender {
            Some(sender) => sender.send(outcome).is_ok(),
            None => false,
        }
    }
}

#[async_trait]
impl CaptureBackend for MockCapture {
    fn available_inputs(&self) -> Result<Vec<Input>, BackendError> {
        let state = self.state.lock().unwrap();
        match &state.inputs_error {
            Some(err) => Err(err.clone()),
            None => Ok(state.inputs.clone()),
        }
    }

    fn select_input(&self, name: &str) -> Result<(), BackendError> {
        let mut state = self.state.lock().unwrap();
        if state.reject_selection {
            return Err(BackendError::InputRejected(name.to_string()));
        }
        state.selected = Some(name.to_string());
        Ok(())
    }

    async fn open_capture(
        &self,
        path: &Path,
        settings: &RecordingSettings,
        completion: oneshot::Sender<CaptureOutcome>,
    ) -> Result<Box<dyn CaptureStream>, BackendError> {
        let mut state = self.state.lock().unwrap();
        if let Some(err) = state.open_error.clone() {
            return Err(err);
        }
        state.opened.push((path.to_path_buf(), settings.clone()));
        state.completion = Some(completion);
        state.recording = false;
        state.stopped = false;
        state.elapsed = 0.0;
        Ok(Box::new(MockCaptureStream {
            state: Arc::clone(&self.state),
        }))
    }

    fn name(&self) -> &str {
        "mock-capture"
    }
}

pub struct MockCaptureStream {
    state: Arc<Mutex<CaptureState>>,
}

impl CaptureStream for MockCaptureStream {
    fn record(&mut self) -> Result<(), BackendError> {
        self.state.lock().unwrap().recording = true;
        Ok(())
    }

    fn pause(&mut self) {
        self.state.lock().unwrap().recording = false;
    }

    fn stop(&mut self) {
        let mut state = self.state.lock().unwrap();
        state.recording = false;
        state.stopped = true;
    }

    fn average_power(&mut self, channel: usize) -> Option<f32> {
        let state = self.state.lock().unwrap();
        match channel {
            0 => state.left_db,
            1 if state.channels > 1 => state.right_db,
            _ => None,
        }
    }

    fn channel_count(&self) -> u16 {
        self.state.lock().unwrap().channels
    }

    fn current_time(&self) -> f64 {
        self.state.lock().unwrap().elapsed
    }
}

// ---------------------------------------------------------------------------
// Playback
// ---------------------------------------------------------------------------

pub struct PlayerState {
    pub info: PlaybackInfo,
    pub fail_open: bool,
    pub fail_play: bool,
    pub fail_schedule: bool,
    pub opened: Vec<PathBuf>,
    pub playing: bool,
    pub scheduled_frames: Vec<u64>,
    pub play_calls: usize,
    pub stop_calls: usize,
    pub current_time: Option<f64>,
    pub reached_end: bool,
    pub levels: Vec<f32>,
    pub rate: f32,
    pub pitch_cents: f32,
    pub gains: (f32, f32, f32),
}

impl Default for PlayerState {
    fn default() -> Self {
        Self {
            info: PlaybackInfo {
                frame_count: 100 * 1000,
                sample_rate: 1000,
                channels: 2,
            },
            fail_open: false,
            fail_play: false,
            fail_schedule: false,
            opened: Vec::new(),
            playing: false,
            scheduled_frames: Vec::new(),
            play_calls: 0,
            stop_calls: 0,
            current_time: None,
            reached_end: false,
            levels: vec![-12.0, -18.0],
            rate: 1.0,
            pitch_cents: 0.0,
            gains: (1.0, 0.0, 0.0),
        }
    }
}

#[derive(Clone)]
pub struct MockPlayback {
    pub state: Arc<Mutex<PlayerState>>,
}

impl MockPlayback {
    /// A backend whose files last `duration` seconds (1 kHz frame clock)
    pub fn with_duration(duration: f64) -> Self {
        let mut state = PlayerState::default();
        state.info.frame_count = (duration * 1000.0) as u64;
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn with_state<T>(&self, f: impl FnOnce(&mut PlayerState) -> T) -> T {
        f(&mut self.state.lock().unwrap())
    }

    pub fn set_time(&self, seconds: f64) {
        self.with_state(|s| s.current_time = Some(seconds));
    }

    pub fn last_scheduled_frame(&self) -> Option<u64> {
        self.with_state(|s| s.scheduled_frames.last().copied())
    }
}

#[async_trait]
impl PlaybackBackend for MockPlayback {
    async fn open(&self, path: &Path) -> Result<Box<dyn PlaybackStream>, BackendError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_open {
            return Err(BackendError::Open {
                path: path.to_path_buf(),
                reason: "unsupported file".to_string(),
            });
        }
        state.opened.push(path.to_path_buf());
        state.current_time = None;
        state.reached_end = false;
        Ok(Box::new(MockPlaybackStream {
            state: Arc::clone(&self.state),
        }))
    }

    fn name(&self) -> &str {
        "mock-playback"
    }
}

pub struct MockPlaybackStream {
    state: Arc<Mutex<PlayerState>>,
}

impl PlaybackStream for MockPlaybackStream {
    fn info(&self) -> PlaybackInfo {
        self.state.lock().unwrap().info
    }

    fn play(&mut self) -> Result<(), BackendError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_play {
            return Err(BackendError::Transport("engine stopped".to_string()));
        }
        state.playing = true;
        state.play_calls += 1;
        Ok(())
    }

    fn pause(&mut self) {
        self.state.lock().unwrap().playing = false;
    }

    fn stop(&mut self) {
        let mut state = self.state.lock().unwrap();
        state.playing = false;
        state.stop_calls += 1;
    }

    fn schedule_from(&mut self, frame: u64) -> Result<(), BackendError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_schedule {
            return Err(BackendError::Transport("cannot schedule".to_string()));
        }
        state.scheduled_frames.push(frame);
        Ok(())
    }

    fn set_rate(&mut self, rate: f32) {
        self.state.lock().unwrap().rate = rate;
    }

    fn set_pitch_cents(&mut self, cents: f32) {
        self.state.lock().unwrap().pitch_cents = cents;
    }

    fn set_gains(&mut self, master: f32, left_db: f32, right_db: f32) {
        self.state.lock().unwrap().gains = (master, left_db, right_db);
    }

    fn average_power(&mut self, channel: usize) -> Option<f32> {
        self.state.lock().unwrap().levels.get(channel).copied()
    }

    fn current_time(&self) -> Option<f64> {
        self.state.lock().unwrap().current_time
    }

    fn reached_end(&self) -> bool {
        self.state.lock().unwrap().reached_end
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Write a 32-bit float WAV whose samples come from `sample(frame, channel)`
pub fn write_float_wav(
    path: &Path,
    sample_rate: u32,
    channels: u16,
    frames: u32,
    sample: impl Fn(u32, u16) -> f32,
) -> anyhow::Result<()> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    for frame in 0..frames {
        for channel in 0..channels {
            writer.write_sample(sample(frame, channel))?;
        }
    }
    writer.finalize()?;
    Ok(())
}

/// Write a 16-bit mono sine WAV
pub fn write_sine_wav(path: &Path, sample_rate: u32, seconds: f64) -> anyhow::Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    let frames = (seconds * sample_rate as f64) as u32;
    for i in 0..frames {
        let t = i as f64 / sample_rate as f64;
        let value = (t * 440.0 * 2.0 * std::f64::consts::PI).sin() * 0.5;
        writer.write_sample((value * i16::MAX as f64) as i16)?;
    }
    writer.finalize()?;
    Ok(())
}

/// Write a Matroska container that declares no tracks at all
pub fn write_trackless_mkv(path: &Path) -> anyhow::Result<()> {
    let mut bytes = Vec::new();
    // EBML header with DocType "matroska"
    bytes.extend_from_slice(&[0x1A, 0x45, 0xDF, 0xA3, 0x8B, 0x42, 0x82, 0x88]);
    bytes.extend_from_slice(b"matroska");
    // Segment: Info (TimestampScale 1_000_000) then an empty Tracks element
    bytes.extend_from_slice(&[0x18, 0x53, 0x80, 0x67, 0x91]);
    bytes.extend_from_slice(&[0x15, 0x49, 0xA9, 0x66, 0x87, 0x2A, 0xD7, 0xB1, 0x83, 0x0F, 0x42, 0x40]);
    bytes.extend_from_slice(&[0x16, 0x54, 0xAE, 0x6B, 0x80]);
    std::fs::write(path, bytes)?;
    Ok(())
}
