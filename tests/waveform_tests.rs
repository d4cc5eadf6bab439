// Tests for waveform summaries: segment math, the on-disk cache and the
// coalescing analyzer over real WAV files.

mod common;

use std::sync::Arc;

use anyhow::Result;
use common::{write_float_wav, write_sine_wav, write_trackless_mkv};
use dictaphone::error::WaveformError;
use dictaphone::waveform::{
    amplitude_to_db, SummaryBuilder, WaveformAnalyzer, WaveformCache, WaveformSegment,
    WaveformSummary, FLOOR_DB, SEGMENT_COUNT,
};
use tempfile::TempDir;

fn summary(total_duration: f64) -> WaveformSummary {
    WaveformSummary {
        segments: vec![WaveformSegment::SILENT; SEGMENT_COUNT],
        segment_duration: total_duration / SEGMENT_COUNT as f64,
        total_duration,
    }
}

#[test]
fn test_amplitude_to_db() {
    assert_eq!(amplitude_to_db(0.0), FLOOR_DB);
    assert_eq!(amplitude_to_db(1.0), 0.0);
    assert_eq!(amplitude_to_db(-1.0), 0.0);
    assert_eq!(amplitude_to_db(1e-6), FLOOR_DB);
    assert!((amplitude_to_db(0.5) - (-6.0206)).abs() < 1e-3);
}

#[test]
fn test_silent_segment_is_floor() {
    let mut builder = SummaryBuilder::with_segment_count(1.0, 8, 4);
    builder.push_samples(&[0.0; 8]);

    let summary = builder.finish();

    assert!(summary
        .segments
        .iter()
        .all(|s| s.rms_db == FLOOR_DB && s.peak_db == FLOOR_DB));
}

#[test]
fn test_samples_per_segment_rounds_up() {
    assert_eq!(SummaryBuilder::new(1.0, 2500).samples_per_segment(), 3);
    assert_eq!(SummaryBuilder::new(1.0, 2000).samples_per_segment(), 2);
    assert_eq!(SummaryBuilder::new(0.0, 0).samples_per_segment(), 1);
    assert_eq!(SummaryBuilder::new(0.1, 10).samples_per_segment(), 1);
}

#[test]
fn test_last_segment_absorbs_leftovers() {
    // 3 segments over 10 expected samples: 4 per segment, the last one takes the rest
    let mut builder = SummaryBuilder::with_segment_count(1.0, 10, 3);
    builder.push_samples(&[0.1; 4]);
    builder.push_samples(&[0.1; 4]);
    builder.push_samples(&[1.0; 6]);

    let summary = builder.finish();

    assert_eq!(summary.segments.len(), 3);
    assert_eq!(summary.segments[0].peak_db, amplitude_to_db(0.1));
    assert_eq!(summary.segments[1].peak_db, amplitude_to_db(0.1));
    assert_eq!(summary.segments[2].peak_db, 0.0);
    assert_eq!(summary.segments[2].rms_db, 0.0);
}

#[test]
fn test_short_stream_leaves_trailing_segments_silent() {
    let mut builder = SummaryBuilder::with_segment_count(1.0, 100, 10);
    builder.push_samples(&[0.5; 25]);

    let summary = builder.finish();

    assert!(summary.segments[0].peak_db > FLOOR_DB);
    assert!(summary.segments[2].peak_db > FLOOR_DB);
    assert_eq!(summary.segments[3], WaveformSegment::SILENT);
    assert_eq!(summary.segments[9], WaveformSegment::SILENT);
}

#[test]
fn test_segment_duration() {
    let summary = SummaryBuilder::new(60.0, 60 * 44100).finish();

    assert_eq!(summary.segments.len(), SEGMENT_COUNT);
    assert!((summary.segment_duration - 0.06).abs() < 1e-9);
    assert_eq!(summary.total_duration, 60.0);
}

#[test]
fn test_duration_tolerance_is_strict() {
    let cached = summary(60.0);

    assert!(cached.matches_duration(60.0));
    assert!(cached.matches_duration(60.3));
    assert!(cached.matches_duration(59.7));
    assert!(!cached.matches_duration(60.5));
    assert!(!cached.matches_duration(61.0));
}

#[test]
fn test_downsample_keeps_loudest() {
    let mut summary = summary(10.0);
    summary.segments[5] = WaveformSegment {
        rms_db: -20.0,
        peak_db: -3.0,
    };

    let columns = summary.downsample(100);

    assert_eq!(columns.len(), 100);
    assert_eq!(columns[0].peak_db, -3.0);
    assert_eq!(columns[1], WaveformSegment::SILENT);
    assert!(summary.downsample(0).is_empty());
    assert_eq!(summary.downsample(2000).len(), 2000);
}

#[tokio::test]
async fn test_cache_round_trip_within_tolerance() -> Result<()> {
    let dir = TempDir::new()?;
    let cache = WaveformCache::open(dir.path().join("waveforms")).await?;
    let source = dir.path().join("memo.m4a");

    cache.store(&source, &summary(60.0)).await?;

    let hit = cache.load(&source, 60.3).await;
    assert_eq!(hit.map(|s| s.total_duration), Some(60.0));
    Ok(())
}

#[tokio::test]
async fn test_stale_cache_entry_is_deleted() -> Result<()> {
    let dir = TempDir::new()?;
    let cache = WaveformCache::open(dir.path().join("waveforms")).await?;
    let source = dir.path().join("memo.m4a");
    cache.store(&source, &summary(60.0)).await?;

    assert!(cache.load(&source, 61.0).await.is_none());
    assert!(!cache.entry_path(&source).exists());
    Ok(())
}

#[tokio::test]
async fn test_corrupt_cache_entry_is_deleted() -> Result<()> {
    let dir = TempDir::new()?;
    let cache = WaveformCache::open(dir.path().join("waveforms")).await?;
    let source = dir.path().join("memo.m4a");
    std::fs::write(cache.entry_path(&source), b"{ not json")?;

    assert!(cache.load(&source, 60.0).await.is_none());
    assert!(!cache.entry_path(&source).exists());
    Ok(())
}

#[tokio::test]
async fn test_cache_entries_keyed_by_path() -> Result<()> {
    let dir = TempDir::new()?;
    let cache = WaveformCache::open(dir.path().join("waveforms")).await?;

    let a = cache.entry_path(&dir.path().join("a.m4a"));
    let b = cache.entry_path(&dir.path().join("b.m4a"));

    assert_ne!(a, b);
    assert_eq!(a, cache.entry_path(&dir.path().join("a.m4a")));
    assert_eq!(a.extension().and_then(|e| e.to_str()), Some("wave"));
    Ok(())
}

#[tokio::test]
async fn test_cache_replaces_file_in_the_way() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("waveforms");
    std::fs::write(&path, b"stray")?;

    let cache = WaveformCache::open(&path).await?;

    assert!(cache.dir().is_dir());
    Ok(())
}

#[tokio::test]
async fn test_full_scale_file_peaks_at_zero() -> Result<()> {
    let dir = TempDir::new()?;
    let wav = dir.path().join("full_scale.wav");
    write_float_wav(&wav, 4000, 2, 4000, |frame, _| if frame % 2 == 0 { 1.0 } else { -1.0 })?;
    let analyzer = WaveformAnalyzer::new(WaveformCache::open(dir.path().join("cache")).await?);

    let summary = analyzer.summarize(&wav).await?;

    assert_eq!(summary.segments.len(), SEGMENT_COUNT);
    assert!((summary.total_duration - 1.0).abs() < 1e-9);
    assert!(summary.segments.iter().all(|s| s.peak_db == 0.0 && s.rms_db == 0.0));
    Ok(())
}

#[tokio::test]
async fn test_analysis_is_cached() -> Result<()> {
    let dir = TempDir::new()?;
    let wav = dir.path().join("sine.wav");
    write_sine_wav(&wav, 8000, 1.0)?;
    let cache = WaveformCache::open(dir.path().join("cache")).await?;
    let analyzer = WaveformAnalyzer::new(cache.clone());

    let first = analyzer.summarize(&wav).await?;

    let loudest = first
        .segments
        .iter()
        .map(|s| s.peak_db)
        .fold(FLOOR_DB, f32::max);
    assert!((loudest - (-6.02)).abs() < 0.1, "sine at half scale peaks near -6 dB, got {}", loudest);
    assert!(cache.entry_path(&wav).exists());

    let cached = cache.load(&wav, first.total_duration).await;
    assert_eq!(cached.as_ref(), Some(first.as_ref()));

    let second = analyzer.summarize(&wav).await?;
    assert_eq!(second.as_ref(), first.as_ref());
    Ok(())
}

#[tokio::test]
async fn test_concurrent_requests_share_one_analysis() -> Result<()> {
    let dir = TempDir::new()?;
    let wav = dir.path().join("sine.wav");
    write_sine_wav(&wav, 8000, 2.0)?;
    let analyzer = WaveformAnalyzer::new(WaveformCache::open(dir.path().join("cache")).await?);

    let (a, b) = tokio::join!(analyzer.summarize(&wav), analyzer.summarize(&wav));

    assert!(Arc::ptr_eq(&a?, &b?));
    assert_eq!(analyzer.in_flight().await, 0);
    Ok(())
}

#[tokio::test]
async fn test_invalid_file_is_reported_and_not_cached() -> Result<()> {
    let dir = TempDir::new()?;
    let bogus = dir.path().join("bogus.wav");
    std::fs::write(&bogus, b"definitely not audio")?;
    let cache = WaveformCache::open(dir.path().join("cache")).await?;
    let analyzer = WaveformAnalyzer::new(cache.clone());

    let err = analyzer.summarize(&bogus).await.unwrap_err();

    assert!(matches!(err, WaveformError::InvalidAudioFile { .. }));
    assert!(!cache.entry_path(&bogus).exists());
    assert_eq!(analyzer.in_flight().await, 0);
    Ok(())
}

#[tokio::test]
async fn test_container_without_audio_is_reported_and_not_cached() -> Result<()> {
    let dir = TempDir::new()?;
    let trackless = dir.path().join("screen.mkv");
    write_trackless_mkv(&trackless)?;
    let cache = WaveformCache::open(dir.path().join("cache")).await?;
    let analyzer = WaveformAnalyzer::new(cache.clone());

    let err = analyzer.summarize(&trackless).await.unwrap_err();

    assert!(matches!(err, WaveformError::NoAudioTrack(ref path) if path == &trackless));
    assert!(!cache.entry_path(&trackless).exists());
    assert_eq!(analyzer.in_flight().await, 0);
    Ok(())
}

#[tokio::test]
async fn test_missing_file_is_reported() -> Result<()> {
    let dir = TempDir::new()?;
    let analyzer = WaveformAnalyzer::new(WaveformCache::open(dir.path().join("cache")).await?);

    let result = analyzer.summarize(dir.path().join("missing.wav")).await;

    assert!(matches!(result, Err(WaveformError::InvalidAudioFile { .. })));
    Ok(())
}
