use serde::{Deserialize, Serialize};

/// Segments per summary, independent of the recording's length
pub const SEGMENT_COUNT: usize = 1000;

/// Floor for segment levels, in dB
pub const FLOOR_DB: f32 = -60.0;

/// Convert a linear amplitude to dB, floored at [`FLOOR_DB`] and capped at 0.
/// Zero (and anything below the floor) maps to the floor exactly.
pub fn amplitude_to_db(amplitude: f32) -> f32 {
    let amplitude = amplitude.abs();
    if amplitude <= 0.0 || amplitude.is_nan() {
        return FLOOR_DB;
    }
    (20.0 * amplitude.log10()).clamp(FLOOR_DB, 0.0)
}

/// RMS and peak level of one slice of a recording
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaveformSegment {
    pub rms_db: f32,
    pub peak_db: f32,
}

impl WaveformSegment {
    pub const SILENT: WaveformSegment = WaveformSegment {
        rms_db: FLOOR_DB,
        peak_db: FLOOR_DB,
    };
}

/// Compact amplitude summary of a whole recording
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaveformSummary {
    pub segments: Vec<WaveformSegment>,
    /// Seconds covered by each segment
    pub segment_duration: f64,
    /// Seconds covered by the whole summary
    pub total_duration: f64,
}

impl WaveformSummary {
    /// Summaries stay valid while the file's measured duration is within this many seconds
    pub const DURATION_TOLERANCE_SECS: f64 = 0.5;

    pub fn matches_duration(&self, measured: f64) -> bool {
        (self.total_duration - measured).abs() < Self::DURATION_TOLERANCE_SECS
    }

    /// Reduce to `width` columns by taking the loudest segment in each column
    pub fn downsample(&self, width: usize) -> Vec<WaveformSegment> {
        if width == 0 || self.segments.is_empty() {
            return Vec::new();
        }

        let per_column = self.segments.len() as f64 / width as f64;
        (0..width)
            .map(|column| {
                let start = (column as f64 * per_column) as usize;
                let end = (((column + 1) as f64 * per_column) as usize)
                    .max(start + 1)
                    .min(self.segments.len());
                self.segments[start..end].iter().fold(
                    WaveformSegment::SILENT,
                    |acc, s| WaveformSegment {
                        rms_db: acc.rms_db.max(s.rms_db),
                        peak_db: acc.peak_db.max(s.peak_db),
                    },
                )
            })
            .collect()
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Accumulator {
    sum_squares: f64,
    peak: f32,
    count: u64,
}

impl Accumulator {
    fn push(&mut self, sample: f32) {
        self.sum_squares += sample as f64 * sample as f64;
        self.peak = self.peak.max(sample.abs());
        self.count += 1;
    }

    fn segment(&self) -> WaveformSegment {
        if self.count == 0 {
            return WaveformSegment::SILENT;
        }
        let rms = (self.sum_squares / self.count as f64).sqrt() as f32;
        WaveformSegment {
            rms_db: amplitude_to_db(rms),
            peak_db: amplitude_to_db(self.peak),
        }
    }
}

/// Streams interleaved samples into a fixed number of segments.
///
/// Each segment closes once it has collected `samples_per_segment` samples;
/// the last segment keeps everything that arrives after the previous one
/// closed. Segments that never receive samples stay silent.
#[derive(Debug, Clone)]
pub struct SummaryBuilder {
    segments: Vec<WaveformSegment>,
    current: Accumulator,
    index: usize,
    samples_per_segment: u64,
    total_duration: f64,
}

impl SummaryBuilder {
    /// `expected_samples` is the total number of interleaved samples the
    /// stream is expected to deliver.
    pub fn new(total_duration: f64, expected_samples: u64) -> Self {
        Self::with_segment_count(total_duration, expected_samples, SEGMENT_COUNT)
    }

    pub fn with_segment_count(total_duration: f64, expected_samples: u64, count: usize) -> Self {
        let count = count.max(1);
        Self {
            segments: vec![WaveformSegment::SILENT; count],
            current: Accumulator::default(),
            index: 0,
            samples_per_segment: expected_samples.div_ceil(count as u64).max(1),
            total_duration,
        }
    }

    pub fn samples_per_segment(&self) -> u64 {
        self.samples_per_segment
    }

    pub fn push_samples(&mut self, samples: &[f32]) {
        let last = self.segments.len() - 1;
        for &sample in samples {
            self.current.push(sample);
            if self.index < last && self.current.count >= self.samples_per_segment {
                self.segments[self.index] = self.current.segment();
                self.current = Accumulator::default();
                self.index += 1;
            }
        }
    }

    pub fn finish(mut self) -> WaveformSummary {
        if self.current.count > 0 {
            self.segments[self.index] = self.current.segment();
        }

        let segment_duration = self.total_duration / self.segments.len() as f64;
        WaveformSummary {
            segments: self.segments,
            segment_duration,
            total_duration: self.total_duration,
        }
    }
}
