use std::path::PathBuf;

use thiserror::Error;

use crate::recorder::RecorderState;

/// Recorder asked to move to a state that is not reachable from the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("illegal recorder transition: {from} -> {to}")]
    Illegal { from: RecorderState, to: RecorderState },
}

/// Failures reported by an audio backend implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("audio session unavailable: {0}")]
    Unavailable(String),
    #[error("no audio input available")]
    NoInput,
    #[error("no audio input port available")]
    NoInputPort,
    #[error("input '{0}' rejected by hardware")]
    InputRejected(String),
    #[error("failed to open {path:?}: {reason}")]
    Open { path: PathBuf, reason: String },
    #[error("transport error: {0}")]
    Transport(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("input '{0}' is not currently available")]
    NoSuchPort(String),
    #[error("backend rejected input '{name}': {source}")]
    BackendRejected {
        name: String,
        #[source]
        source: BackendError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecorderError {
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("no active recording session")]
    NoActiveSession,
    #[error("recordings storage error: {0}")]
    Storage(String),
}

/// Errors from opening or decoding an audio file.
#[derive(Debug, Error)]
pub enum AudioFileError {
    #[error("failed to open {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unreadable audio container {path:?}: {reason}")]
    Unreadable { path: PathBuf, reason: String },
    #[error("no audio track in {0:?}")]
    NoAudioTrack(PathBuf),
}

/// Errors from waveform analysis.
///
/// Cloneable so one in-flight analysis can report the same failure to every
/// caller waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WaveformError {
    #[error("invalid or unreadable audio file {path:?}: {reason}")]
    InvalidAudioFile { path: PathBuf, reason: String },
    #[error("no audio track available in {0:?}")]
    NoAudioTrack(PathBuf),
    #[error("waveform cache error: {0}")]
    Cache(String),
    #[error("waveform worker failed: {0}")]
    Worker(String),
}

impl From<AudioFileError> for WaveformError {
    fn from(err: AudioFileError) -> Self {
        match err {
            AudioFileError::NoAudioTrack(path) => WaveformError::NoAudioTrack(path),
            AudioFileError::Io { path, source } => WaveformError::InvalidAudioFile {
                path,
                reason: source.to_string(),
            },
            AudioFileError::Unreadable { path, reason } => {
                WaveformError::InvalidAudioFile { path, reason }
            }
        }
    }
}

/// Errors surfaced through an [`EngineHandle`](crate::engine::EngineHandle).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("engine control loop has shut down")]
    Closed,
    #[error(transparent)]
    Recorder(#[from] RecorderError),
    #[error(transparent)]
    Selection(#[from] SelectionError),
}
