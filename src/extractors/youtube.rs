use anyhow::Context;
use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use super::{AudioFormat, MediaExtractor, MediaInfo};
use crate::config::DownloadConfig;
use crate::Result;

/// YouTube audio extractor using yt-dlp
pub struct YoutubeExtractor {
    yt_dlp_path: String,
    ffmpeg_location: Option<PathBuf>,
    audio_quality: String,
}

impl YoutubeExtractor {
    pub fn new() -> Self {
        Self::with_config(&crate::config::Config::default().download)
    }

    pub fn with_config(download: &DownloadConfig) -> Self {
        Self {
            yt_dlp_path: download.yt_dlp_path.clone(),
            ffmpeg_location: download.ffmpeg_location.clone(),
            audio_quality: download.audio_quality.clone(),
        }
    }

    /// Check if yt-dlp is available
    pub async fn check_availability(&self) -> bool {
        Command::new(&self.yt_dlp_path)
            .arg("--version")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map(|output| output.status.success())
            .unwrap_or(false)
    }

    /// Get video information using yt-dlp
    async fn get_video_info(&self, url: &str) -> Result<Value> {
        debug!("Extracting video info for: {}", url);

        let output = Command::new(&self.yt_dlp_path)
            .args(["--dump-json", "--no-playlist", "--no-warnings", url])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .with_context(|| {
                format!("Failed to run {} (is yt-dlp installed?)", self.yt_dlp_path)
            })?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("yt-dlp failed: {}", error.trim());
        }

        let json_str = String::from_utf8(output.stdout)?;
        let info: Value = serde_json::from_str(&json_str)?;

        Ok(info)
    }
}

#[async_trait]
impl MediaExtractor for YoutubeExtractor {
    async fn probe(&self, url: &str) -> Result<MediaInfo> {
        let info = self.get_video_info(url).await?;

        let title = info["title"]
            .as_str()
            .unwrap_or("Untitled video")
            .to_string();
        let duration_seconds = info["duration"].as_f64();
        let thumbnail_url = info["thumbnail"].as_str().map(|s| s.to_string());

        Ok(MediaInfo {
            title,
            duration_seconds,
            thumbnail_url,
            // fetch_audio always converts to mp3
            format: Some(AudioFormat::Mp3),
            original_url: url.to_string(),
        })
    }

    async fn fetch_audio(&self, url: &str, dest_stem: &Path) -> Result<PathBuf> {
        if !self.check_availability().await {
            anyhow::bail!(
                "yt-dlp is not available. Please install it: https://github.com/yt-dlp/yt-dlp"
            );
        }

        debug!("Downloading audio for: {}", url);

        let progress = ProgressBar::new_spinner();
        progress.set_style(
            ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?,
        );
        progress.set_message("Downloading audio with yt-dlp...");
        progress.enable_steady_tick(std::time::Duration::from_millis(120));

        // yt-dlp picks the container itself, so hand it a template and
        // let --extract-audio convert the result to mp3.
        let output_template = format!("{}.%(ext)s", dest_stem.to_string_lossy());

        let mut command = Command::new(&self.yt_dlp_path);
        command.args([
            "--format",
            "bestaudio/best",
            "--extract-audio",
            "--audio-format",
            "mp3",
            "--audio-quality",
            self.audio_quality.as_str(),
            "--no-playlist",
            "--output",
            output_template.as_str(),
        ]);

        if let Some(location) = &self.ffmpeg_location {
            command.arg("--ffmpeg-location").arg(location);
        }

        let output = command
            .arg(url)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            progress.finish_and_clear();
            let error = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("Failed to download audio: {}", error.trim());
        }

        progress.finish_with_message("Download complete");

        let audio_path = dest_stem.with_extension("mp3");
        if !audio_path.exists() {
            anyhow::bail!(
                "yt-dlp reported success but {} was not created",
                audio_path.display()
            );
        }

        Ok(audio_path)
    }

    fn supports(&self, url: &str) -> bool {
        // Support various YouTube URL formats
        let url_lower = url.to_lowercase();
        url_lower.contains("youtube.com/watch")
            || url_lower.contains("youtu.be/")
            || url_lower.contains("youtube.com/embed/")
            || url_lower.contains("youtube.com/v/")
            || url_lower.contains("youtube.com/shorts/")
            || url_lower.contains("m.youtube.com/")
    }

    fn name(&self) -> &'static str {
        "YouTube"
    }
}

impl Default for YoutubeExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supports_youtube_urls() {
        let extractor = YoutubeExtractor::new();
        assert!(extractor.supports("https://www.youtube.com/watch?v=dQw4w9WgXcQ"));
        assert!(extractor.supports("https://youtu.be/dQw4w9WgXcQ"));
        assert!(extractor.supports("https://www.youtube.com/shorts/abc123"));
        assert!(extractor.supports("https://m.youtube.com/watch?v=abc123"));
        assert!(!extractor.supports("https://vimeo.com/12345"));
        assert!(!extractor.supports("https://example.com/audio.mp3"));
    }
}
