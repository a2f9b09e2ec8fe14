use async_trait::async_trait;
use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;
use url::Url;

use super::{AudioFormat, MediaExtractor, MediaInfo};
use crate::Result;

/// Direct URL extractor for audio and video files
pub struct DirectExtractor {
    client: Client,
}

impl DirectExtractor {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    /// Determine audio format from URL or content type
    fn determine_format(&self, url: &str, content_type: Option<&str>) -> AudioFormat {
        // Try to determine from URL extension first
        if let Ok(parsed_url) = Url::parse(url) {
            if let Some(path) = parsed_url.path_segments() {
                if let Some(filename) = path.last() {
                    if let Some(extension) = Path::new(filename).extension() {
                        if let Some(format) =
                            AudioFormat::from_extension(&extension.to_string_lossy())
                        {
                            return format;
                        }
                    }
                }
            }
        }

        // Try to determine from content type
        if let Some(content_type) = content_type {
            match content_type {
                ct if ct.contains("mp3") || ct.contains("mpeg") => return AudioFormat::Mp3,
                ct if ct.contains("mp4") || ct.contains("m4a") => return AudioFormat::M4a,
                ct if ct.contains("wav") => return AudioFormat::Wav,
                ct if ct.contains("flac") => return AudioFormat::Flac,
                ct if ct.contains("ogg") => return AudioFormat::Ogg,
                ct if ct.contains("webm") => return AudioFormat::Webm,
                _ => {}
            }
        }

        // Default to MP3
        AudioFormat::Mp3
    }

    /// Check if URL points to an audio or video file
    fn is_media_url(&self, url: &str) -> bool {
        let url_lower = url.to_lowercase();

        // Check for common audio/video extensions
        let media_extensions = [
            ".mp3", ".m4a", ".wav", ".flac", ".ogg", ".aac", ".mp4", ".avi", ".mov", ".mkv",
            ".webm", ".m4v",
        ];

        media_extensions.iter().any(|ext| url_lower.contains(ext))
    }

    /// Get content information via HEAD request
    async fn get_content_info(&self, url: &str) -> Result<(Option<String>, Option<u64>)> {
        let response = self.client.head(url).send().await?;

        if !response.status().is_success() {
            anyhow::bail!("Failed to access URL: HTTP {}", response.status());
        }

        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|ct| ct.to_str().ok())
            .map(|s| s.to_string());

        let content_length = response
            .headers()
            .get("content-length")
            .and_then(|cl| cl.to_str().ok())
            .and_then(|cl| cl.parse::<u64>().ok());

        Ok((content_type, content_length))
    }

    /// Extract a readable title from the last path segment
    fn title_from_url(url: &Url) -> Option<String> {
        url.path_segments()
            .and_then(|segments| segments.last())
            .filter(|filename| !filename.is_empty())
            .map(|filename| {
                // Remove extension and decode URL encoding
                let name = if let Some(dot_pos) = filename.rfind('.') {
                    &filename[..dot_pos]
                } else {
                    filename
                };
                urlencoding::decode(name)
                    .unwrap_or_else(|_| name.into())
                    .replace(['_', '-'], " ")
            })
    }
}

#[async_trait]
impl MediaExtractor for DirectExtractor {
    async fn probe(&self, url: &str) -> Result<MediaInfo> {
        let parsed_url = Url::parse(url).map_err(|_| anyhow::anyhow!("Invalid URL: {}", url))?;

        // The HEAD request checks reachability and gives us the content type
        let (content_type, _) = self.get_content_info(url).await?;
        let format = self.determine_format(url, content_type.as_deref());

        let title = Self::title_from_url(&parsed_url)
            .unwrap_or_else(|| "Untitled media".to_string());

        Ok(MediaInfo {
            title,
            duration_seconds: None,
            thumbnail_url: None,
            format: Some(format),
            original_url: url.to_string(),
        })
    }

    async fn fetch_audio(&self, url: &str, dest_stem: &Path) -> Result<PathBuf> {
        let (content_type, file_size) = self.get_content_info(url).await?;
        let format = self.determine_format(url, content_type.as_deref());
        let audio_path = dest_stem.with_extension(format.as_str());

        debug!("Downloading {} to {}", url, audio_path.display());

        let progress = ProgressBar::new(file_size.unwrap_or(0));
        progress.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg}")?,
        );
        progress.set_message("Downloading audio...");

        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            anyhow::bail!("Failed to download audio: HTTP {}", response.status());
        }

        let total_size = response.content_length().unwrap_or(0);
        progress.set_length(total_size);

        let mut file = fs_err::File::create(&audio_path)?;
        let mut downloaded = 0u64;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk)?;
            downloaded += chunk.len() as u64;
            progress.set_position(downloaded);
        }

        progress.finish_with_message("Download complete");

        Ok(audio_path)
    }

    fn supports(&self, url: &str) -> bool {
        // Parse URL to ensure it's valid
        if Url::parse(url).is_err() {
            return false;
        }

        // Check if it looks like a media file
        self.is_media_url(url)
    }

    fn name(&self) -> &'static str {
        "Direct URL"
    }
}

impl Default for DirectExtractor {
    fn default() -> Self {
        Self::new()
    }
}
