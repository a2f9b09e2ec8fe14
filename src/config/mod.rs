use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

use crate::transcribe::engine::Device;
use crate::transcribe::model::ModelKind;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Whisper model settings
    pub whisper: WhisperConfig,

    /// Audio download settings
    pub download: DownloadConfig,

    /// Application settings
    pub app: AppConfig,

    /// Web server settings
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhisperConfig {
    /// Model to use (see `tubescribe models` for the list)
    pub model: String,

    /// Language spoken in the audio ("auto" to detect)
    pub language: String,

    /// Device to run inference on
    pub device: Device,

    /// Directory holding downloaded models (defaults to the user cache dir)
    pub model_dir: Option<PathBuf>,

    /// Number of inference threads (defaults to a sensible value for the machine)
    pub threads: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Path to the yt-dlp binary
    pub yt_dlp_path: String,

    /// Directory containing ffmpeg, if not on PATH
    pub ffmpeg_location: Option<PathBuf>,

    /// Audio quality passed to yt-dlp (e.g. "192K")
    pub audio_quality: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Keep audio files after transcription
    pub keep_audio: bool,

    /// Default output file for transcripts
    pub default_output: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the web server binds to
    pub host: String,

    /// Port the web server listens on
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            whisper: WhisperConfig {
                model: "base".to_string(),
                language: "en".to_string(),
                device: Device::Auto,
                model_dir: None,
                threads: None,
            },
            download: DownloadConfig {
                yt_dlp_path: "yt-dlp".to_string(),
                ffmpeg_location: None,
                audio_quality: "192K".to_string(),
            },
            app: AppConfig {
                keep_audio: false,
                default_output: "transcription.txt".to_string(),
            },
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8515,
            },
        }
    }
}

impl Config {
    /// Load configuration from file or create default
    pub async fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = fs_err::read_to_string(&config_path)
                .context("Failed to read config file")?;

            let config: Config = serde_yaml::from_str(&content)
                .context("Failed to parse config file")?;

            config.validate()?;
            Ok(config)
        } else {
            let config = Self::default();
            config.save().await?;
            Ok(config)
        }
    }

    /// Save configuration to file
    pub async fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self)
            .context("Failed to serialize config")?;

        fs_err::write(&config_path, content)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Get configuration file path
    pub fn config_path() -> Result<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?;

        Ok(config_dir.join("tubescribe").join("config.yaml"))
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        ModelKind::from_str(&self.whisper.model)
            .with_context(|| format!("Invalid model in config: {}", self.whisper.model))?;

        if self.whisper.language.trim().is_empty() {
            anyhow::bail!("Language must not be empty (use \"auto\" for detection)");
        }

        if self.download.audio_quality.trim().is_empty() {
            anyhow::bail!("Audio quality must not be empty (e.g. \"192K\")");
        }

        Ok(())
    }

    /// Directory where whisper models are stored
    pub fn model_dir(&self) -> Result<PathBuf> {
        match &self.whisper.model_dir {
            Some(dir) => Ok(dir.clone()),
            None => crate::transcribe::model::default_model_dir(),
        }
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  Model: {}", self.whisper.model);
        println!("  Language: {}", self.whisper.language);
        println!("  Device: {}", self.whisper.device);
        if let Some(dir) = &self.whisper.model_dir {
            println!("  Model Dir: {}", dir.display());
        }
        println!("  yt-dlp Path: {}", self.download.yt_dlp_path);
        if let Some(loc) = &self.download.ffmpeg_location {
            println!("  ffmpeg Location: {}", loc.display());
        }
        println!("  Audio Quality: {}", self.download.audio_quality);
        println!("  Keep Audio: {}", self.app.keep_audio);
        println!("  Default Output: {}", self.app.default_output);
        println!("  Server: {}:{}", self.server.host, self.server.port);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.whisper.model, "base");
        assert_eq!(config.whisper.language, "en");
        assert_eq!(config.server.port, 8515);
    }

    #[test]
    fn test_yaml_round_trip() {
        let config = Config::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.whisper.model, config.whisper.model);
        assert_eq!(parsed.download.yt_dlp_path, config.download.yt_dlp_path);
        assert_eq!(parsed.server.host, config.server.host);
    }

    #[test]
    fn test_invalid_model_rejected() {
        let mut config = Config::default();
        config.whisper.model = "enormous".to_string();
        assert!(config.validate().is_err());
    }
}
