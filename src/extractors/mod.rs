use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;
use url::Url;

pub mod direct;
pub mod local;
pub mod youtube;

use crate::config::DownloadConfig;
use crate::Result;

/// Information about a piece of media, gathered before downloading it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaInfo {
    /// Title of the media
    pub title: String,

    /// Duration in seconds if known
    pub duration_seconds: Option<f64>,

    /// Thumbnail image URL if available
    pub thumbnail_url: Option<String>,

    /// Audio format the extractor will deliver, when known ahead of time
    pub format: Option<AudioFormat>,

    /// Original URL or path that was processed
    pub original_url: String,
}

/// Supported audio formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AudioFormat {
    Mp3,
    M4a,
    Wav,
    Flac,
    Ogg,
    Webm,
}

impl AudioFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::M4a => "m4a",
            AudioFormat::Wav => "wav",
            AudioFormat::Flac => "flac",
            AudioFormat::Ogg => "ogg",
            AudioFormat::Webm => "webm",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "mp3" => Some(AudioFormat::Mp3),
            "m4a" | "aac" => Some(AudioFormat::M4a),
            "wav" => Some(AudioFormat::Wav),
            "flac" => Some(AudioFormat::Flac),
            "ogg" | "opus" => Some(AudioFormat::Ogg),
            "webm" => Some(AudioFormat::Webm),
            _ => None,
        }
    }
}

/// Trait for fetching audio from different sources
#[async_trait]
pub trait MediaExtractor: Send + Sync {
    /// Gather metadata about the media without downloading it
    async fn probe(&self, url: &str) -> Result<MediaInfo>;

    /// Download the audio track next to `dest_stem` (a path without extension)
    /// and return the path of the file that was written.
    async fn fetch_audio(&self, url: &str, dest_stem: &Path) -> Result<PathBuf>;

    /// Check if this extractor supports the given URL
    fn supports(&self, url: &str) -> bool;

    /// Get the name of this source
    fn name(&self) -> &'static str;
}

/// Registry for managing multiple extractors
pub struct ExtractorRegistry {
    extractors: Vec<Box<dyn MediaExtractor>>,
    local: local::LocalFileExtractor,
    /// yt-dlp handles most video sites, so unmatched URLs go through it
    fallback: youtube::YoutubeExtractor,
}

impl ExtractorRegistry {
    /// Create a new registry with default extractors
    pub fn new(download: &DownloadConfig) -> Self {
        let mut registry = Self {
            extractors: Vec::new(),
            local: local::LocalFileExtractor::new(download),
            fallback: youtube::YoutubeExtractor::with_config(download),
        };

        // Direct media links are matched first so a plain .mp3 URL never
        // goes through yt-dlp.
        registry.register(Box::new(direct::DirectExtractor::new()));
        registry.register(Box::new(youtube::YoutubeExtractor::with_config(download)));

        registry
    }

    /// Register a new extractor
    pub fn register(&mut self, extractor: Box<dyn MediaExtractor>) {
        self.extractors.push(extractor);
    }

    /// Find a registered extractor that supports the given URL
    pub fn find_extractor(&self, url: &str) -> Option<&dyn MediaExtractor> {
        self.extractors
            .iter()
            .find(|extractor| extractor.supports(url))
            .map(|boxed| boxed.as_ref())
    }

    /// Check if input is a local file path
    pub fn is_local_file(&self, input: &str) -> bool {
        // Anything with an explicit scheme is a URL, not a path, even when
        // the scheme is one we reject later
        if input.contains("://") {
            return false;
        }

        // Check if the file exists (handles both absolute and relative paths)
        let path = Path::new(input);
        if path.exists() {
            return true;
        }

        // Check if it looks like a file path (has file extension or path separators)
        let has_extension = path.extension().is_some();
        let has_path_separators = input.contains('/') || input.contains('\\');
        let starts_with_dot = input.starts_with("./") || input.starts_with(".\\");

        has_extension || has_path_separators || starts_with_dot
    }

    /// Check that an input can be handled, without probing or downloading.
    /// Local paths must exist and URLs must be HTTP or HTTPS.
    pub fn validate(&self, input: &str) -> Result<()> {
        if self.is_local_file(input) {
            let path = Path::new(input);
            if !path.exists() {
                anyhow::bail!("File does not exist: {}", path.display());
            }
            return Ok(());
        }

        validate_url(input).map(|_| ())
    }

    /// Resolve the extractor for an input, validating URLs along the way
    fn resolve(&self, input: &str) -> Result<&dyn MediaExtractor> {
        if self.is_local_file(input) {
            return Ok(&self.local);
        }

        validate_url(input)?;

        let extractor = self
            .find_extractor(input)
            .unwrap_or(&self.fallback);

        debug!("Using {} extractor for {}", extractor.name(), input);
        Ok(extractor)
    }

    /// Gather media info using the appropriate extractor
    pub async fn probe(&self, input: &str) -> Result<MediaInfo> {
        self.resolve(input)?.probe(input).await
    }

    /// Download audio using the appropriate extractor
    pub async fn fetch_audio(&self, input: &str, dest_stem: &Path) -> Result<PathBuf> {
        self.resolve(input)?.fetch_audio(input, dest_stem).await
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::new(&crate::config::Config::default().download)
    }
}

/// Validate and parse a URL, rejecting non-HTTP schemes
pub fn validate_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url)
        .map_err(|_| anyhow::anyhow!("Invalid URL format: {}", url))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        anyhow::bail!("URL must use HTTP or HTTPS protocol");
    }

    Ok(parsed)
}
