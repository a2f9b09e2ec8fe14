use anyhow::Result;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tubescribe::cli::{Cli, Commands};
use tubescribe::config::Config;
use tubescribe::server::Server;
use tubescribe::transcribe::engine::WhisperEngine;
use tubescribe::transcribe::model::{self, ModelKind};
use tubescribe::transcribe::TranscriptionPipeline;
use tubescribe::{output, utils};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let default_filter = if cli.verbose {
        "tubescribe=debug"
    } else {
        "tubescribe=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Check for required external tools (non-fatal, they may still show up in PATH)
    if !cli.quiet {
        let missing_deps = utils::check_dependencies().await;
        if !missing_deps.is_empty() {
            eprintln!(
                "{}",
                console::style("⚠️  Dependency check warnings:").yellow().bold()
            );
            for dep in missing_deps {
                eprintln!("   • {}", dep);
            }
            eprintln!("   (Continuing anyway - tools may still be available)");
        }
    }

    let config = Config::load().await?;

    match cli.command {
        Commands::Transcribe {
            url,
            output,
            format,
            language,
            model,
            device,
            keep_audio,
            timestamps,
        } => {
            let quiet = cli.quiet;

            let model_name = model.as_deref().unwrap_or(&config.whisper.model);
            let model_kind = ModelKind::from_str(model_name)?;
            let device = device.unwrap_or(config.whisper.device);
            let language = language.unwrap_or_else(|| config.whisper.language.clone());
            let keep_audio = keep_audio || config.app.keep_audio;
            let threads = config.whisper.threads;
            let model_dir = config.model_dir()?;
            let default_output = PathBuf::from(&config.app.default_output);

            let pipeline = TranscriptionPipeline::new(config)?;

            // Reject bad inputs before the model download kicks in
            pipeline.validate_input(&url)?;

            // "-" goes to stdout, no flag means the configured default file
            let target = output.unwrap_or(default_output);

            // Preserved audio lands next to the transcript, or in the
            // working directory when printing to stdout
            let audio_dir = if keep_audio {
                Some(match target.parent() {
                    Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                    _ => std::env::current_dir()?,
                })
            } else {
                None
            };

            let model_path = model::ensure_model(model_kind, &model_dir).await?;

            // Status goes to stderr so `-o -` leaves stdout clean for piping
            if !quiet {
                eprintln!("Loading whisper model {}...", model_kind);
            }
            let engine = tokio::task::spawn_blocking(move || {
                WhisperEngine::load(&model_path, model_kind, device, threads)
            })
            .await??;
            let engine = Arc::new(engine);

            tracing::info!("Starting transcription for: {}", url);

            let result = pipeline
                .transcribe_url(&url, engine, &language, audio_dir.as_deref())
                .await?;

            if target == Path::new("-") {
                output::print_to_console(&result, &format, timestamps)?;
            } else {
                output::save_to_file(&result, &target, &format, timestamps).await?;
                println!("Transcription saved to: {}", target.display());
            }

            if !quiet {
                if let Some(duration) = result.metadata.audio_duration {
                    eprintln!(
                        "Transcribed {} of audio in {}",
                        utils::format_duration(duration),
                        utils::format_duration(result.metadata.processing_duration)
                    );
                }
            }

            if let Some(audio_path) = result.audio_path {
                eprintln!("Audio saved to: {}", audio_path.display());
            }
        }
        Commands::Serve { host, port } => {
            let mut config = config;
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            Server::new(config).start().await?;
        }
        Commands::Models => {
            let model_dir = config.model_dir()?;
            println!("Available whisper models (cache: {}):", model_dir.display());
            for kind in ModelKind::ALL {
                let status = if kind.is_cached(&model_dir) {
                    "downloaded"
                } else {
                    "not downloaded"
                };
                println!(
                    "  • {:<16} ~{:>9}  [{}]",
                    kind.as_str(),
                    utils::format_file_size(kind.approx_size_bytes()),
                    status
                );
            }
        }
        Commands::Config { show } => {
            if show {
                config.display();
            } else {
                println!("Edit the config file to change settings:");
                println!("  {}", Config::config_path()?.display());
            }
        }
    }

    Ok(())
}
