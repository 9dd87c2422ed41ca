use anyhow::{Context, Result};
use hound::WavReader;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, info};

/// Fully decoded 16-bit WAV file
pub struct AudioFile {
    pub path: String,
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<i16>,
}

impl AudioFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening audio file: {}", path.display());

        let reader = WavReader::open(path)
            .with_context(|| format!("Failed to open WAV file: {}", path.display()))?;

        let spec = reader.spec();
        let samples: Vec<i16> = reader
            .into_samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read audio samples")?;

        let duration_seconds = samples.len() as f64 /
            (spec.sample_rate as f64 * spec.channels as f64);

        info!(
            "Audio file loaded: {:.1}s, {}Hz, {} channels, {} samples",
            duration_seconds,
            spec.sample_rate,
            spec.channels,
            samples.len()
        );

        Ok(Self {
            path: path.display().to_string(),
            duration_seconds,
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            samples,
        })
    }
}

/// Format facts about a playable asset, gathered without decoding it fully
#[derive(Debug, Clone)]
pub struct AssetInfo {
    pub path: PathBuf,
    pub duration: Duration,
    pub sample_rate: u32,
    pub channels: u16,
}

impl AssetInfo {
    /// Probe any container symphonia understands (WAV takes, MP3 backing tracks, ...)
    ///
    /// Fails when the file is missing, the container is unknown, or no decoder
    /// exists for its codec.
    pub fn probe(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open asset: {}", path.display()))?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .with_context(|| format!("Unsupported audio container: {}", path.display()))?;
        let mut format = probed.format;

        let track = format
            .default_track()
            .with_context(|| format!("No audio track in {}", path.display()))?;
        let params = track.codec_params.clone();
        let track_id = track.id;

        symphonia::default::get_codecs()
            .make(&params, &DecoderOptions::default())
            .with_context(|| format!("No decoder for {}", path.display()))?;

        let sample_rate = params
            .sample_rate
            .with_context(|| format!("Unknown sample rate in {}", path.display()))?;
        let channels = params.channels.map(|c| c.count()).unwrap_or(1) as u16;

        // Some containers (streamed MP3s) carry no frame count; sum packet durations instead
        let frames = match params.n_frames {
            Some(n) => n,
            None => {
                debug!("No frame count in header, scanning packets: {}", path.display());
                let mut total = 0u64;
                loop {
                    match format.next_packet() {
                        Ok(packet) if packet.track_id() == track_id => total += packet.dur,
                        Ok(_) => {}
                        Err(SymphoniaError::IoError(e))
                            if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                        {
                            break;
                        }
                        Err(e) => return Err(e).context("Failed to scan audio packets"),
                    }
                }
                total
            }
        };

        let duration = Duration::from_secs_f64(frames as f64 / sample_rate as f64);

        Ok(Self {
            path: path.to_path_buf(),
            duration,
            sample_rate,
            channels,
        })
    }
}
