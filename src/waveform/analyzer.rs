use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::cache::WaveformCache;
use super::summary::{SummaryBuilder, WaveformSummary};
use crate::audio::AudioFile;
use crate::error::WaveformError;

type Analysis = Shared<BoxFuture<'static, Result<Arc<WaveformSummary>, WaveformError>>>;

/// Produces waveform summaries for finished recordings.
///
/// Cache first; on a miss the file is decoded on a blocking worker thread.
/// Concurrent requests for the same file share one analysis.
#[derive(Clone)]
pub struct WaveformAnalyzer {
    cache: WaveformCache,
    in_flight: Arc<Mutex<HashMap<PathBuf, Analysis>>>,
}

impl WaveformAnalyzer {
    pub fn new(cache: WaveformCache) -> Self {
        Self {
            cache,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn cache(&self) -> &WaveformCache {
        &self.cache
    }

    /// Summarize `path`, from cache when the cached entry is still valid.
    ///
    /// Failed analyses are never cached.
    pub async fn summarize(&self, path: impl AsRef<Path>) -> Result<Arc<WaveformSummary>, WaveformError> {
        let path = path.as_ref().to_path_buf();

        let analysis = {
            let mut in_flight = self.in_flight.lock().await;
            match in_flight.get(&path) {
                Some(analysis) => {
                    debug!("Joining in-flight waveform analysis for {}", path.display());
                    analysis.clone()
                }
                None => {
                    let analysis = analyze(self.cache.clone(), path.clone()).boxed().shared();
                    in_flight.insert(path.clone(), analysis.clone());
                    analysis
                }
            }
        };

        let result = analysis.clone().await;

        let mut in_flight = self.in_flight.lock().await;
        if in_flight
            .get(&path)
            .is_some_and(|current| current.ptr_eq(&analysis))
        {
            in_flight.remove(&path);
        }

        result
    }

    /// Number of analyses currently running
    pub async fn in_flight(&self) -> usize {
        self.in_flight.lock().await.len()
    }
}

async fn analyze(cache: WaveformCache, path: PathBuf) -> Result<Arc<WaveformSummary>, WaveformError> {
    let probe_path = path.clone();
    let info = tokio::task::spawn_blocking(move || AudioFile::probe(&probe_path))
        .await
        .map_err(|e| WaveformError::Worker(e.to_string()))??;

    if let Some(summary) = cache.load(&path, info.duration_seconds).await {
        return Ok(Arc::new(summary));
    }

    let decode_path = path.clone();
    let summary = tokio::task::spawn_blocking(move || compute(&decode_path, info.duration_seconds))
        .await
        .map_err(|e| WaveformError::Worker(e.to_string()))??;

    if let Err(e) = cache.store(&path, &summary).await {
        warn!("Failed to cache waveform for {}: {}", path.display(), e);
    }

    Ok(Arc::new(summary))
}

/// Decode `path` and build its summary. Blocking.
pub fn compute(path: &Path, total_duration: f64) -> Result<WaveformSummary, WaveformError> {
    let mut file = AudioFile::open(path)?;
    let expected_samples =
        (total_duration * file.sample_rate as f64).round() as u64 * file.channels as u64;

    let mut builder = SummaryBuilder::new(total_duration, expected_samples);
    let frames = file.read_samples(|block| builder.push_samples(block))?;
    let summary = builder.finish();

    info!(
        "Computed waveform for {}: {} frames, {} segments of {:.3}s",
        path.display(),
        frames,
        summary.segments.len(),
        summary.segment_duration
    );

    Ok(summary)
}
