use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dictaphone::{AudioFile, Config, FsStorage, RecordingLibrary, WaveformAnalyzer, WaveformCache};
use tracing::info;

#[derive(Parser)]
#[command(name = "dictaphone", version, about = "Voice recordings: listing, waveforms and bookmarks")]
struct Cli {
    /// Config file (extension optional)
    #[arg(long, default_value = "config/dictaphone")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List recordings, newest first
    List,
    /// Show duration and format of an audio file
    Probe { file: PathBuf },
    /// Print the waveform summary of a recording
    Waveform {
        file: PathBuf,
        /// Number of columns to reduce the summary to
        #[arg(long, default_value_t = 80)]
        width: usize,
    },
    /// List the bookmarks of a recording
    Bookmarks { file: PathBuf },
    /// Add a bookmark to a recording
    Bookmark {
        file: PathBuf,
        /// Position in seconds
        #[arg(long)]
        at: f64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        note: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;
    info!("Recordings directory: {}", cfg.storage.recordings_dir);

    let cache = WaveformCache::open(&cfg.storage.waveform_cache_dir)
        .await
        .context("Failed to open waveform cache")?;
    let library = RecordingLibrary::new(Arc::new(FsStorage::new(&cfg.storage.recordings_dir)))
        .with_waveform_cache(cache.clone());

    match cli.command {
        Command::List => {
            let files = library.list().await?;
            if files.is_empty() {
                println!("No recordings in {}", cfg.storage.recordings_dir);
            }
            for file in files {
                let created = file
                    .created
                    .map(|c| c.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_else(|| "-".to_string());
                let duration = file
                    .duration
                    .map(format_time)
                    .unwrap_or_else(|| "--:--".to_string());
                println!("{}  {:>8}  {:>10} B  {}", created, duration, file.size, file.name);
            }
            if let Some(free) = library.free_space() {
                println!("{:.1} MB free", free as f64 / 1_048_576.0);
            }
        }
        Command::Probe { file } => {
            let probed = file.clone();
            let info = tokio::task::spawn_blocking(move || AudioFile::probe(probed)).await??;
            println!("{}", file.display());
            println!("  duration:    {}", format_time(info.duration_seconds));
            println!("  sample rate: {} Hz", info.sample_rate);
            println!("  channels:    {}", info.channels);
            println!("  frames:      {}", info.frame_count);
        }
        Command::Waveform { file, width } => {
            let analyzer = WaveformAnalyzer::new(cache);
            let summary = analyzer.summarize(&file).await?;
            println!(
                "{}: {} segments of {:.3}s",
                file.display(),
                summary.segments.len(),
                summary.segment_duration
            );
            let columns: String = summary
                .downsample(width)
                .iter()
                .map(|segment| level_glyph(segment.peak_db))
                .collect();
            println!("{}", columns);
        }
        Command::Bookmarks { file } => {
            let meta = library.meta(&file).await?;
            if meta.bookmarks.is_empty() {
                println!("No bookmarks in {}", meta.display_name);
            }
            for bookmark in &meta.bookmarks {
                println!(
                    "{}  {}  {}",
                    format_time(bookmark.time),
                    bookmark.title.as_deref().unwrap_or("-"),
                    bookmark.note.as_deref().unwrap_or("")
                );
            }
        }
        Command::Bookmark {
            file,
            at,
            title,
            note,
        } => {
            let bookmark = library.add_bookmark(&file, at, title, note).await?;
            println!("Added bookmark {} at {}", bookmark.id, format_time(bookmark.time));
        }
    }

    Ok(())
}

fn format_time(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    format!("{:02}:{:02}", total / 60, total % 60)
}

fn level_glyph(db: f32) -> char {
    const GLYPHS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];
    let normalized = ((db + 60.0) / 60.0).clamp(0.0, 1.0);
    GLYPHS[((normalized * (GLYPHS.len() - 1) as f32).round()) as usize]
}
