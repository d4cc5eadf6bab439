pub mod backend;
pub mod file;
pub mod input;

pub use backend::{
    CaptureBackend, CaptureOutcome, CaptureStream, PlaybackBackend, PlaybackInfo, PlaybackStream,
    RecordingSettings,
};
pub use file::{AudioFile, AudioInfo};
pub use input::{Input, InputRegistry, Location};
