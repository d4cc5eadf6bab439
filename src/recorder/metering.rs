use std::collections::VecDeque;

/// Floor of every level meter, in dB
pub const SILENCE_DB: f32 = -60.0;

/// Default live buffer length: about four seconds at 30 Hz
pub const DEFAULT_LIVE_CAPACITY: usize = 120;

/// Clamp a backend power reading into the meter range
pub fn clamp_level(db: f32) -> f32 {
    if db.is_nan() {
        return SILENCE_DB;
    }
    db.clamp(SILENCE_DB, 0.0)
}

/// Fixed-capacity FIFO of recent levels. Oldest samples are dropped first.
#[derive(Debug, Clone)]
pub struct LevelRing {
    samples: VecDeque<f32>,
    capacity: usize,
}

impl LevelRing {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, level: f32) {
        self.samples.push_back(level);
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Samples oldest first
    pub fn to_vec(&self) -> Vec<f32> {
        self.samples.iter().copied().collect()
    }
}

/// Turns raw per-channel power readings into meter levels and a live
/// waveform feed. Readings are accepted only while the sampler is running.
#[derive(Debug, Clone)]
pub struct MeteringSampler {
    left_level: f32,
    right_level: f32,
    ring: LevelRing,
    running: bool,
}

impl MeteringSampler {
    pub fn new(capacity: usize) -> Self {
        Self {
            left_level: SILENCE_DB,
            right_level: SILENCE_DB,
            ring: LevelRing::new(capacity),
            running: false,
        }
    }

    pub fn start(&mut self) {
        self.running = true;
    }

    /// Stop accepting readings. The live buffer is kept for display.
    pub fn stop(&mut self) {
        self.running = false;
        self.left_level = SILENCE_DB;
        self.right_level = SILENCE_DB;
    }

    /// Drop the live buffer, e.g. when a new recording is prepared
    pub fn reset(&mut self) {
        self.stop();
        self.ring.clear();
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Record one reading. A missing right channel mirrors the left one.
    /// Returns false if the sampler is stopped and the reading was ignored.
    pub fn record(&mut self, left_db: f32, right_db: Option<f32>) -> bool {
        if !self.running {
            return false;
        }

        self.left_level = clamp_level(left_db);
        self.right_level = right_db.map(clamp_level).unwrap_or(self.left_level);
        self.ring.push((self.left_level + self.right_level) / 2.0);
        true
    }

    pub fn left_level(&self) -> f32 {
        self.left_level
    }

    pub fn right_level(&self) -> f32 {
        self.right_level
    }

    pub fn live_samples(&self) -> Vec<f32> {
        self.ring.to_vec()
    }

    pub fn ring(&self) -> &LevelRing {
        &self.ring
    }
}

impl Default for MeteringSampler {
    fn default() -> Self {
        Self::new(DEFAULT_LIVE_CAPACITY)
    }
}
