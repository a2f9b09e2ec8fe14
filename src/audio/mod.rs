use anyhow::Context;
use hound::SampleFormat;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio::process::Command;
use tracing::debug;

use crate::Result;

/// Sample rate whisper models expect
pub const WHISPER_SAMPLE_RATE: u32 = 16_000;

/// Resolve the ffmpeg binary, honoring a configured location
pub fn ffmpeg_bin(location: Option<&Path>) -> PathBuf {
    resolve_tool(location, "ffmpeg")
}

/// Resolve the ffprobe binary, honoring a configured location
pub fn ffprobe_bin(location: Option<&Path>) -> PathBuf {
    resolve_tool(location, "ffprobe")
}

fn resolve_tool(location: Option<&Path>, tool: &str) -> PathBuf {
    match location {
        // ffmpeg_location may point at the directory holding the binaries
        Some(loc) if loc.is_dir() => loc.join(tool),
        // or at one of them; the other tools live next to it
        Some(loc) => {
            if loc.file_name().and_then(|name| name.to_str()) == Some(tool) {
                loc.to_path_buf()
            } else {
                loc.parent().unwrap_or(Path::new("")).join(tool)
            }
        }
        None => PathBuf::from(tool),
    }
}

/// Decode any audio or video file into 16 kHz mono f32 samples.
///
/// Runs ffmpeg to resample into a temporary WAV file, then reads it back.
/// The intermediate file lives in its own temp directory and is removed
/// when this function returns.
pub async fn decode_to_samples(
    ffmpeg_location: Option<&Path>,
    input: &Path,
) -> Result<Vec<f32>> {
    let work_dir = TempDir::new().context("Failed to create temporary directory")?;
    let wav_path = work_dir.path().join("decoded.wav");

    debug!("Decoding {} for transcription", input.display());

    let ffmpeg = ffmpeg_bin(ffmpeg_location);
    let output = Command::new(&ffmpeg)
        .args([
            "-i",
            &input.to_string_lossy(),
            "-vn",
            "-ac",
            "1",
            "-ar",
            "16000",
            "-acodec",
            "pcm_s16le",
            "-y",
            &wav_path.to_string_lossy(),
        ])
        .output()
        .await
        .with_context(|| format!("Failed to run {} (is ffmpeg installed?)", ffmpeg.display()))?;

    if !output.status.success() {
        let error = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("ffmpeg failed to decode audio: {}", error.trim());
    }

    let samples = samples_from_wav(&wav_path)?;

    if samples.is_empty() {
        anyhow::bail!("Audio file contains no samples: {}", input.display());
    }

    Ok(samples)
}

/// Read a WAV file into f32 samples
fn samples_from_wav(path: &Path) -> Result<Vec<f32>> {
    let mut reader = hound::WavReader::open(path)
        .with_context(|| format!("Failed to open WAV file: {}", path.display()))?;
    let spec = reader.spec();

    match spec.sample_format {
        SampleFormat::Float => {
            let samples: std::result::Result<Vec<f32>, _> = reader.samples::<f32>().collect();
            Ok(samples?)
        }
        SampleFormat::Int => {
            let samples: std::result::Result<Vec<i16>, _> = reader.samples::<i16>().collect();
            let samples = samples?;
            let mut float_samples = vec![0.0f32; samples.len()];
            whisper_rs::convert_integer_to_float_audio(&samples, &mut float_samples)?;
            Ok(float_samples)
        }
    }
}
