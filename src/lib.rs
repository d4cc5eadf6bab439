pub mod audio;
pub mod config;
pub mod engine;
pub mod error;
pub mod library;
pub mod playback;
pub mod recorder;
pub mod timer;
pub mod waveform;

pub use audio::{
    AudioFile, AudioInfo, CaptureBackend, CaptureOutcome, CaptureStream, Input, InputRegistry,
    Location, PlaybackBackend, PlaybackInfo, PlaybackStream, RecordingSettings,
};
pub use config::Config;
pub use engine::{Engine, EngineHandle, EngineParts, PlaybackCommand};
pub use error::{
    AudioFileError, BackendError, EngineError, RecorderError, SelectionError, TransitionError,
    WaveformError,
};
pub use library::{Bookmark, FileMeta, FsStorage, RecordingFileInfo, RecordingLibrary, Storage};
pub use playback::{PlaybackController, PlaybackSession};
pub use recorder::{
    MeteringSampler, Recorder, RecorderConfig, RecorderSnapshot, RecorderState,
    RecorderStateMachine,
};
pub use timer::{Cadence, ManualTimer, Timer, TokioTimer};
pub use waveform::{WaveformAnalyzer, WaveformCache, WaveformSegment, WaveformSummary};
