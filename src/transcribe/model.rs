use anyhow::Context;
use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::info;

use crate::{Result, TubescribeError};

/// Whisper models from the whisper.cpp collection on Hugging Face
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    Tiny,
    TinyEn,
    Base,
    BaseEn,
    Small,
    SmallEn,
    Medium,
    MediumEn,
    LargeV3,
    LargeV3Turbo,
}

impl ModelKind {
    pub const ALL: [ModelKind; 10] = [
        ModelKind::Tiny,
        ModelKind::TinyEn,
        ModelKind::Base,
        ModelKind::BaseEn,
        ModelKind::Small,
        ModelKind::SmallEn,
        ModelKind::Medium,
        ModelKind::MediumEn,
        ModelKind::LargeV3,
        ModelKind::LargeV3Turbo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::Tiny => "tiny",
            ModelKind::TinyEn => "tiny.en",
            ModelKind::Base => "base",
            ModelKind::BaseEn => "base.en",
            ModelKind::Small => "small",
            ModelKind::SmallEn => "small.en",
            ModelKind::Medium => "medium",
            ModelKind::MediumEn => "medium.en",
            ModelKind::LargeV3 => "large-v3",
            ModelKind::LargeV3Turbo => "large-v3-turbo",
        }
    }

    /// File name used by the ggml releases
    pub fn file_name(&self) -> String {
        format!("ggml-{}.bin", self.as_str())
    }

    /// Download URL on Hugging Face
    pub fn download_url(&self) -> String {
        format!(
            "https://huggingface.co/ggerganov/whisper.cpp/resolve/main/{}?download=true",
            self.file_name()
        )
    }

    /// Rough download size, for display only
    pub fn approx_size_bytes(&self) -> u64 {
        const MB: u64 = 1024 * 1024;
        match self {
            ModelKind::Tiny | ModelKind::TinyEn => 75 * MB,
            ModelKind::Base | ModelKind::BaseEn => 142 * MB,
            ModelKind::Small | ModelKind::SmallEn => 466 * MB,
            ModelKind::Medium | ModelKind::MediumEn => 1536 * MB,
            ModelKind::LargeV3 => 2960 * MB,
            ModelKind::LargeV3Turbo => 1620 * MB,
        }
    }

    /// Check whether the model file is already downloaded
    pub fn is_cached(&self, model_dir: &Path) -> bool {
        model_dir.join(self.file_name()).exists()
    }
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ModelKind {
    type Err = TubescribeError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "tiny" => Ok(ModelKind::Tiny),
            "tiny.en" => Ok(ModelKind::TinyEn),
            "base" => Ok(ModelKind::Base),
            "base.en" => Ok(ModelKind::BaseEn),
            "small" => Ok(ModelKind::Small),
            "small.en" => Ok(ModelKind::SmallEn),
            "medium" => Ok(ModelKind::Medium),
            "medium.en" => Ok(ModelKind::MediumEn),
            "large" | "large-v3" => Ok(ModelKind::LargeV3),
            "large-v3-turbo" | "turbo" => Ok(ModelKind::LargeV3Turbo),
            other => Err(TubescribeError::UnknownModel(other.to_string())),
        }
    }
}

/// Default directory for downloaded models
pub fn default_model_dir() -> Result<PathBuf> {
    let cache_dir = dirs::cache_dir().context("Could not determine cache directory")?;
    Ok(cache_dir.join("tubescribe").join("models"))
}

/// Make sure the model file exists locally, downloading it if needed.
///
/// Downloads go to a `.part` file first so an interrupted transfer never
/// leaves a truncated model behind.
pub async fn ensure_model(kind: ModelKind, model_dir: &Path) -> Result<PathBuf> {
    let model_path = model_dir.join(kind.file_name());

    if model_path.exists() {
        return Ok(model_path);
    }

    fs_err::create_dir_all(model_dir)?;

    let url = kind.download_url();
    info!("Downloading whisper model {} from {}", kind, url);

    let response = reqwest::get(&url).await?;

    if !response.status().is_success() {
        anyhow::bail!("Failed to download model {}: HTTP {}", kind, response.status());
    }

    let total_size = response.content_length().unwrap_or(kind.approx_size_bytes());
    let progress = ProgressBar::new(total_size);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg}")?,
    );
    progress.set_message(format!("Downloading {} model...", kind));

    let partial_path = model_path.with_extension("bin.part");
    let mut file = fs_err::File::create(&partial_path)?;
    let mut downloaded = 0u64;
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk)?;
        downloaded += chunk.len() as u64;
        progress.set_position(downloaded);
    }

    file.flush()?;
    drop(file);

    fs_err::rename(&partial_path, &model_path)?;
    progress.finish_with_message("Model downloaded");

    Ok(model_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str_known_models() {
        assert_eq!(ModelKind::from_str("base").unwrap(), ModelKind::Base);
        assert_eq!(ModelKind::from_str("Base.EN").unwrap(), ModelKind::BaseEn);
        assert_eq!(ModelKind::from_str("large").unwrap(), ModelKind::LargeV3);
        assert_eq!(
            ModelKind::from_str("turbo").unwrap(),
            ModelKind::LargeV3Turbo
        );
    }

    #[test]
    fn test_from_str_unknown_model() {
        let err = ModelKind::from_str("enormous").unwrap_err();
        assert!(err.to_string().contains("Unknown whisper model"));
    }

    #[test]
    fn test_file_name_and_url() {
        assert_eq!(ModelKind::Base.file_name(), "ggml-base.bin");
        assert_eq!(
            ModelKind::LargeV3.download_url(),
            "https://huggingface.co/ggerganov/whisper.cpp/resolve/main/ggml-large-v3.bin?download=true"
        );
    }

    #[test]
    fn test_is_cached() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(!ModelKind::Tiny.is_cached(dir.path()));
        fs_err::write(dir.path().join("ggml-tiny.bin"), b"stub").unwrap();
        assert!(ModelKind::Tiny.is_cached(dir.path()));
    }
}
