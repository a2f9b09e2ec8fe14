use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::transcribe::engine::Device;

#[derive(Parser)]
#[command(
    name = "tubescribe",
    about = "Tubescribe - Transcribe YouTube videos and other media URLs with local whisper models",
    version,
    long_about = "Download the audio track of a video URL (via yt-dlp), run a local whisper.cpp \
model over it, and save the transcript to a file. Also ships a small web UI for doing the same \
from a browser."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Transcribe audio from a URL or local file
    Transcribe {
        /// URL or file path to transcribe (YouTube, direct media, or local audio/video files)
        #[arg(value_name = "URL_OR_FILE")]
        url: String,

        /// Output file path ("-" prints to stdout, default from config)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Language spoken in the audio ("auto" to detect, default from config)
        #[arg(short, long, value_name = "LANG")]
        language: Option<String>,

        /// Whisper model to use (see `tubescribe models`, default from config)
        #[arg(short, long, value_name = "MODEL")]
        model: Option<String>,

        /// Device to run inference on (default from config)
        #[arg(short, long, value_enum)]
        device: Option<Device>,

        /// Keep the downloaded audio file next to the output instead of deleting it
        #[arg(long)]
        keep_audio: bool,

        /// Include timestamps in text output (srt/vtt formats always include timestamps)
        #[arg(long)]
        timestamps: bool,
    },

    /// Run the web UI and HTTP API
    Serve {
        /// Address to bind (default from config)
        #[arg(long, value_name = "HOST")]
        host: Option<String>,

        /// Port to listen on (default from config)
        #[arg(short, long, value_name = "PORT")]
        port: Option<u16>,
    },

    /// List available whisper models and their download status
    Models,

    /// Manage configuration
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,
    },
}

#[derive(ValueEnum, Clone, Debug)]
pub enum OutputFormat {
    /// Plain text
    Text,
    /// JSON with timestamps
    Json,
    /// SRT subtitle format
    Srt,
    /// WebVTT format
    Vtt,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Srt => write!(f, "srt"),
            OutputFormat::Vtt => write!(f, "vtt"),
        }
    }
}
