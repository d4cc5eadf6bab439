use std::fs::File;
use std::path::{Path, PathBuf};

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, info};

use crate::error::AudioFileError;

/// Basic properties of an audio file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioInfo {
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub frame_count: u64,
}

/// An audio file opened for sequential decoding.
pub struct AudioFile {
    path: PathBuf,
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    pub sample_rate: u32,
    pub channels: u16,
    frame_count: Option<u64>,
}

impl AudioFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AudioFileError> {
        let path = path.as_ref();
        debug!("Opening audio file: {}", path.display());

        let file = File::open(path).map_err(|source| AudioFileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .map_err(|e| unreadable(path, e))?;
        let format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| AudioFileError::NoAudioTrack(path.to_path_buf()))?;

        let track_id = track.id;
        let params = track.codec_params.clone();
        let sample_rate = params
            .sample_rate
            .ok_or_else(|| AudioFileError::Unreadable {
                path: path.to_path_buf(),
                reason: "missing sample rate".to_string(),
            })?;
        let channels = params.channels.map(|c| c.count() as u16).unwrap_or(1);

        let decoder = symphonia::default::get_codecs()
            .make(&params, &DecoderOptions::default())
            .map_err(|e| unreadable(path, e))?;

        Ok(Self {
            path: path.to_path_buf(),
            format,
            decoder,
            track_id,
            sample_rate,
            channels,
            frame_count: params.n_frames,
        })
    }

    /// Open a file and report its properties. Containers that do not declare
    /// their length are scanned to count frames.
    pub fn probe(path: impl AsRef<Path>) -> Result<AudioInfo, AudioFileError> {
        let mut file = Self::open(path)?;
        let frame_count = match file.frame_count {
            Some(frames) => frames,
            None => file.read_samples(|_| {})?,
        };

        let info = AudioInfo {
            duration_seconds: frame_count as f64 / file.sample_rate as f64,
            sample_rate: file.sample_rate,
            channels: file.channels,
            frame_count,
        };

        info!(
            "Probed {}: {:.1}s, {}Hz, {} channels",
            file.path.display(),
            info.duration_seconds,
            info.sample_rate,
            info.channels
        );

        Ok(info)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Frame count declared by the container, if any
    pub fn frame_count(&self) -> Option<u64> {
        self.frame_count
    }

    pub fn duration_seconds(&self) -> Option<f64> {
        self.frame_count
            .map(|frames| frames as f64 / self.sample_rate as f64)
    }

    /// Decode the whole track, handing each block of interleaved samples
    /// (normalized to -1.0..=1.0) to `on_block`. Returns the number of frames read.
    pub fn read_samples(
        &mut self,
        mut on_block: impl FnMut(&[f32]),
    ) -> Result<u64, AudioFileError> {
        let mut frames_read = 0u64;
        let mut sample_buf: Option<SampleBuffer<f32>> = None;

        loop {
            let packet = match self.format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break
                }
                Err(SymphoniaError::ResetRequired) => break,
                Err(e) => return Err(unreadable(&self.path, e)),
            };

            if packet.track_id() != self.track_id {
                continue;
            }

            let decoded = match self.decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(e)) => {
                    debug!("Skipping undecodable packet in {}: {}", self.path.display(), e);
                    continue;
                }
                Err(e) => return Err(unreadable(&self.path, e)),
            };

            let spec = *decoded.spec();
            let capacity = decoded.capacity() as u64;
            frames_read += decoded.frames() as u64;

            let buf = match sample_buf.take() {
                Some(buf) if buf.capacity() as u64 >= capacity * spec.channels.count() as u64 => buf,
                _ => SampleBuffer::<f32>::new(capacity, spec),
            };
            let buf = sample_buf.insert(buf);
            buf.copy_interleaved_ref(decoded);
            on_block(buf.samples());
        }

        Ok(frames_read)
    }
}

fn unreadable(path: &Path, err: SymphoniaError) -> AudioFileError {
    AudioFileError::Unreadable {
        path: path.to_path_buf(),
        reason: err.to_string(),
    }
}
