use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tempfile::TempDir;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::extractors::{ExtractorRegistry, MediaInfo};

pub mod engine;
pub mod model;

use engine::WhisperEngine;

/// Transcription result with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionResult {
    /// The transcribed text
    pub transcript: String,

    /// Segments with timestamps
    pub segments: Vec<TranscriptSegment>,

    /// Information about the source media
    pub media: MediaInfo,

    /// Path to downloaded audio file (if preserved)
    pub audio_path: Option<PathBuf>,

    /// Transcription metadata
    pub metadata: TranscriptionMetadata,
}

/// Individual transcript segment with timing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Start time in seconds
    pub start_time: f64,

    /// End time in seconds
    pub end_time: f64,

    /// Segment text
    pub text: String,
}

/// Metadata about the transcription process
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionMetadata {
    /// Model that produced the transcript
    pub model: String,

    /// Language used ("auto" when detection was left to the model)
    pub language: String,

    /// Audio duration in seconds
    pub audio_duration: Option<f64>,

    /// Processing time in seconds
    pub processing_duration: f64,

    /// Timestamp when transcription completed
    pub completed_at: chrono::DateTime<chrono::Utc>,
}

/// Main transcription pipeline.
///
/// Downloads audio into a private temporary directory, decodes it, runs the
/// whisper engine over it, and cleans the audio up afterwards. The temporary
/// directory is removed when the pipeline is dropped, so partial downloads
/// never outlive a failed run.
pub struct TranscriptionPipeline {
    config: Config,
    registry: ExtractorRegistry,
    temp_dir: TempDir,
}

impl TranscriptionPipeline {
    /// Create a new transcription pipeline
    pub fn new(config: Config) -> Result<Self> {
        let registry = ExtractorRegistry::new(&config.download);
        let temp_dir = TempDir::new().context("Failed to create temporary directory")?;

        Ok(Self {
            config,
            registry,
            temp_dir,
        })
    }

    /// Gather media info without downloading anything
    pub async fn probe(&self, input: &str) -> Result<MediaInfo> {
        self.registry.probe(input).await
    }

    /// Check an input without touching the network. Callers run this before
    /// slow setup work such as a model download.
    pub fn validate_input(&self, input: &str) -> Result<()> {
        self.registry.validate(input)
    }

    /// Download, decode and transcribe a URL or local file.
    ///
    /// When `keep_audio_in` names a directory, the downloaded audio is copied
    /// there under a readable name instead of being discarded.
    pub async fn transcribe_url(
        &self,
        input: &str,
        engine: Arc<WhisperEngine>,
        language: &str,
        keep_audio_in: Option<&Path>,
    ) -> Result<TranscriptionResult> {
        info!("Gathering media information for: {}", input);
        let media = self.registry.probe(input).await?;

        let stem = self
            .temp_dir
            .path()
            .join(format!("audio_{}", &Uuid::new_v4().to_string()[..8]));

        info!("Downloading audio for: {}", media.title);
        let audio_path = self.registry.fetch_audio(input, &stem).await?;

        let result = self
            .transcribe_audio_file(&audio_path, &media, engine, language, keep_audio_in)
            .await;

        // The audio file is temporary either way. Remove it eagerly so long
        // running processes do not accumulate downloads; the TempDir guard
        // covers anything left behind on errors.
        if let Err(e) = fs_err::remove_file(&audio_path) {
            if audio_path.exists() {
                warn!("Failed to remove temporary audio file: {}", e);
            }
        }

        result
    }

    async fn transcribe_audio_file(
        &self,
        audio_path: &Path,
        media: &MediaInfo,
        engine: Arc<WhisperEngine>,
        language: &str,
        keep_audio_in: Option<&Path>,
    ) -> Result<TranscriptionResult> {
        let samples = crate::audio::decode_to_samples(
            self.config.download.ffmpeg_location.as_deref(),
            audio_path,
        )
        .await?;

        let audio_duration =
            Some(samples.len() as f64 / crate::audio::WHISPER_SAMPLE_RATE as f64);

        let lang = crate::utils::resolve_language(language);
        let started = Instant::now();

        info!(
            "Transcribing {} with model {}",
            media.title,
            engine.model()
        );

        let segments = {
            let engine = Arc::clone(&engine);
            let lang = lang.clone();
            tokio::task::spawn_blocking(move || engine.transcribe(&samples, lang.as_deref()))
                .await
                .context("Transcription task panicked")??
        };

        let transcript = segments
            .iter()
            .map(|segment| segment.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        let preserved_audio_path = match keep_audio_in {
            Some(dest_dir) => Some(self.preserve_audio_file(audio_path, media, dest_dir).await?),
            None => None,
        };

        Ok(TranscriptionResult {
            transcript,
            segments,
            media: media.clone(),
            audio_path: preserved_audio_path,
            metadata: TranscriptionMetadata {
                model: engine.model().to_string(),
                language: lang.unwrap_or_else(|| "auto".to_string()),
                audio_duration,
                processing_duration: started.elapsed().as_secs_f64(),
                completed_at: chrono::Utc::now(),
            },
        })
    }

    /// Copy the downloaded audio into `dest_dir` under a readable name
    async fn preserve_audio_file(
        &self,
        temp_path: &Path,
        media: &MediaInfo,
        dest_dir: &Path,
    ) -> Result<PathBuf> {
        let extension = temp_path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("mp3");

        let sanitized = crate::utils::sanitize_filename(&media.title);

        let filename = if sanitized.is_empty() {
            format!(
                "audio_{}.{}",
                chrono::Utc::now().format("%Y%m%d_%H%M%S"),
                extension
            )
        } else {
            format!("{}.{}", sanitized, extension)
        };

        let output_path = dest_dir.join(filename);
        fs_err::copy(temp_path, &output_path)?;
        info!("Saved audio to: {}", output_path.display());

        Ok(output_path)
    }
}
