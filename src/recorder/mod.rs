//! Recorder lifecycle
//!
//! - `state`: the route table every lifecycle change is validated against
//! - `metering`: level meters and the live waveform ring buffer
//! - `session`: the `Recorder` that drives the capture backend around the state machine

pub mod metering;
pub mod session;
pub mod state;

pub use metering::{clamp_level, LevelRing, MeteringSampler, DEFAULT_LIVE_CAPACITY, SILENCE_DB};
pub use session::{recording_file_name, Recorder, RecorderConfig, RecorderSnapshot, RecordingSession};
pub use state::{RecorderState, RecorderStateMachine};
