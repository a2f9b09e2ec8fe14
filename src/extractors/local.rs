use anyhow::Context;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::process::Command;
use tracing::debug;

use super::{AudioFormat, MediaExtractor, MediaInfo};
use crate::config::DownloadConfig;
use crate::Result;

/// Extractor for audio and video files already on disk
pub struct LocalFileExtractor {
    ffmpeg_location: Option<PathBuf>,
}

impl LocalFileExtractor {
    pub fn new(download: &DownloadConfig) -> Self {
        Self {
            ffmpeg_location: download.ffmpeg_location.clone(),
        }
    }

    /// Check if the file exists and is accessible
    async fn validate_file(&self, path: &Path) -> Result<()> {
        if !path.exists() {
            anyhow::bail!("File does not exist: {}", path.display());
        }

        if !path.is_file() {
            anyhow::bail!("Path is not a file: {}", path.display());
        }

        match fs::metadata(path).await {
            Ok(metadata) => {
                if metadata.len() == 0 {
                    anyhow::bail!("File is empty: {}", path.display());
                }
            }
            Err(e) => {
                anyhow::bail!("Cannot access file {}: {}", path.display(), e);
            }
        }

        Ok(())
    }

    /// Get duration and check for audio streams using ffprobe
    async fn get_file_info(&self, path: &Path) -> Result<Option<f64>> {
        let ffprobe = crate::audio::ffprobe_bin(self.ffmpeg_location.as_deref());
        let output = Command::new(&ffprobe)
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
                &path.to_string_lossy(),
            ])
            .output()
            .await
            .with_context(|| {
                format!("Failed to run {} (is ffprobe installed?)", ffprobe.display())
            })?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("Failed to analyze file with ffprobe: {}", error.trim());
        }

        let info: serde_json::Value = serde_json::from_slice(&output.stdout)?;

        let duration = info["format"]["duration"]
            .as_str()
            .and_then(|d| d.parse::<f64>().ok());

        let empty_vec = vec![];
        let streams = info["streams"].as_array().unwrap_or(&empty_vec);
        let has_audio = streams
            .iter()
            .any(|stream| stream["codec_type"].as_str() == Some("audio"));

        if !has_audio {
            anyhow::bail!("File does not contain any audio streams: {}", path.display());
        }

        Ok(duration)
    }

    /// Convert file to MP3 using ffmpeg
    async fn convert_to_mp3(&self, source_path: &Path, target_path: &Path) -> Result<()> {
        debug!("Converting {} to MP3", source_path.display());

        let ffmpeg = crate::audio::ffmpeg_bin(self.ffmpeg_location.as_deref());
        let output = Command::new(&ffmpeg)
            .args([
                "-i",
                &source_path.to_string_lossy(),
                "-vn",
                "-acodec",
                "mp3",
                "-ab",
                "192k",
                "-ar",
                "44100",
                "-y",
                &target_path.to_string_lossy(),
            ])
            .output()
            .await
            .with_context(|| {
                format!("Failed to run {} (is ffmpeg installed?)", ffmpeg.display())
            })?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("Failed to convert file with ffmpeg: {}", error.trim());
        }

        Ok(())
    }
}

#[async_trait]
impl MediaExtractor for LocalFileExtractor {
    async fn probe(&self, path: &str) -> Result<MediaInfo> {
        let file_path = Path::new(path);

        self.validate_file(file_path).await?;
        let duration_seconds = self.get_file_info(file_path).await?;

        let title = file_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("Local file")
            .to_string();

        // Video containers report no format; their audio track gets pulled
        // into mp3 during fetch_audio.
        let format = file_path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(AudioFormat::from_extension);

        Ok(MediaInfo {
            title,
            duration_seconds,
            thumbnail_url: None,
            format,
            original_url: path.to_string(),
        })
    }

    async fn fetch_audio(&self, path: &str, dest_stem: &Path) -> Result<PathBuf> {
        let source_path = Path::new(path);
        self.validate_file(source_path).await?;

        let extension = source_path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("");

        // Audio files are copied as-is so the source is never touched.
        // Video and unknown containers get their audio track pulled out.
        if let Some(format) = AudioFormat::from_extension(extension) {
            let audio_path = dest_stem.with_extension(format.as_str());
            fs::copy(source_path, &audio_path).await?;
            Ok(audio_path)
        } else {
            let audio_path = dest_stem.with_extension("mp3");
            self.convert_to_mp3(source_path, &audio_path).await?;
            Ok(audio_path)
        }
    }

    fn supports(&self, _url: &str) -> bool {
        // Local paths are routed by the registry, not by URL matching
        false
    }

    fn name(&self) -> &'static str {
        "Local File"
    }
}
