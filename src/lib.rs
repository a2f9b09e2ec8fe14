//! Tubescribe - transcribe YouTube videos and other media URLs on your own machine
//!
//! This library downloads the audio track of a video URL with yt-dlp, runs a local
//! whisper.cpp model over it, and hands back plain text. Entry points are a CLI
//! (`tubescribe transcribe`) and a small browser form (`tubescribe serve`).

pub mod audio;
pub mod cli;
pub mod config;
pub mod extractors;
pub mod output;
pub mod server;
pub mod transcribe;
pub mod utils;

pub use cli::{Cli, Commands, OutputFormat};
pub use config::Config;
pub use extractors::{MediaExtractor, MediaInfo};
pub use transcribe::engine::{Device, WhisperEngine};
pub use transcribe::model::ModelKind;
pub use transcribe::{TranscriptionPipeline, TranscriptionResult};

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;

/// Error types specific to tubescribe
#[derive(thiserror::Error, Debug)]
pub enum TubescribeError {
    #[error("Unsupported URL format: {0}")]
    UnsupportedUrl(String),

    #[error("Audio extraction failed: {0}")]
    AudioExtractionFailed(String),

    #[error("Audio decoding failed: {0}")]
    AudioDecodeFailed(String),

    #[error("Transcription failed: {0}")]
    TranscriptionFailed(String),

    #[error("Unknown whisper model: {0} (see `tubescribe models`)")]
    UnknownModel(String),

    #[error("File operation failed: {0}")]
    FileError(String),
}
