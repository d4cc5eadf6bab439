//! Offline waveform summaries
//!
//! A recording is reduced to a fixed number of RMS/peak segments and cached
//! on disk next to other summaries, keyed by the recording's path.

pub mod analyzer;
pub mod cache;
pub mod summary;

pub use analyzer::WaveformAnalyzer;
pub use cache::WaveformCache;
pub use summary::{amplitude_to_db, SummaryBuilder, WaveformSegment, WaveformSummary, FLOOR_DB, SEGMENT_COUNT};
