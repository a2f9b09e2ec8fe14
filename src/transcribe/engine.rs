use anyhow::Context;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use super::model::ModelKind;
use super::TranscriptSegment;
use crate::Result;

/// Device to run whisper inference on
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    /// Use the GPU when the build has GPU support, otherwise the CPU
    Auto,
    /// Force CPU inference
    Cpu,
    /// Force GPU inference (requires a GPU-enabled build)
    Gpu,
}

impl Device {
    pub fn use_gpu(&self) -> bool {
        match self {
            Device::Auto => cfg!(feature = "_gpu"),
            Device::Cpu => false,
            Device::Gpu => true,
        }
    }
}

impl std::fmt::Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Device::Auto => write!(f, "auto"),
            Device::Cpu => write!(f, "cpu"),
            Device::Gpu => write!(f, "gpu"),
        }
    }
}

/// A loaded whisper model, ready for inference.
///
/// Loading is expensive, so engines are shared behind an `Arc` and reused
/// across transcriptions. Each call to [`transcribe`](Self::transcribe)
/// creates its own inference state, so a shared engine is safe to use from
/// multiple threads.
pub struct WhisperEngine {
    ctx: WhisperContext,
    model: ModelKind,
    device: Device,
    threads: i32,
}

impl WhisperEngine {
    /// Load a model file into memory
    pub fn load(
        model_path: &Path,
        model: ModelKind,
        device: Device,
        threads: Option<usize>,
    ) -> Result<Self> {
        let use_gpu = device.use_gpu();
        info!(
            "Loading whisper model {} ({}) on {}",
            model,
            model_path.display(),
            if use_gpu { "gpu" } else { "cpu" }
        );

        let mut params = WhisperContextParameters::default();
        params.use_gpu(use_gpu);
        params.flash_attn(use_gpu);

        let path_str = model_path
            .to_str()
            .context("Model path is not valid UTF-8")?;
        let ctx = WhisperContext::new_with_params(path_str, params)
            .with_context(|| format!("Failed to load whisper model: {}", model_path.display()))?;

        let threads = threads
            .map(|t| t as i32)
            .unwrap_or_else(default_thread_count);

        Ok(Self {
            ctx,
            model,
            device,
            threads,
        })
    }

    pub fn model(&self) -> ModelKind {
        self.model
    }

    pub fn device(&self) -> Device {
        self.device
    }

    /// Run inference over 16 kHz mono samples.
    ///
    /// This blocks the calling thread for the duration of the inference,
    /// so async callers should wrap it in `spawn_blocking`.
    pub fn transcribe(
        &self,
        samples: &[f32],
        language: Option<&str>,
    ) -> Result<Vec<TranscriptSegment>> {
        if samples.is_empty() {
            anyhow::bail!("No audio samples to transcribe");
        }

        let mut state = self
            .ctx
            .create_state()
            .context("Failed to create whisper state")?;

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        params.set_n_threads(self.threads);
        params.set_translate(false);
        params.set_language(language);
        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);
        params.set_suppress_blank(true);

        debug!(
            "Running whisper over {:.1}s of audio with {} threads",
            samples.len() as f64 / crate::audio::WHISPER_SAMPLE_RATE as f64,
            self.threads
        );

        state
            .full(params, samples)
            .context("Whisper inference failed")?;

        let num_segments = state
            .full_n_segments()
            .context("Failed to get segment count")?;

        let mut segments = Vec::with_capacity(num_segments as usize);
        for i in 0..num_segments {
            let text = state
                .full_get_segment_text(i)
                .with_context(|| format!("Failed to get text for segment {}", i))?;
            // Timestamps come back in centiseconds
            let start_time = state.full_get_segment_t0(i)? as f64 * 0.01;
            let end_time = state.full_get_segment_t1(i)? as f64 * 0.01;

            let text = text.trim();
            if text.is_empty() {
                continue;
            }

            segments.push(TranscriptSegment {
                start_time,
                end_time,
                text: text.to_string(),
            });
        }

        Ok(segments)
    }
}

/// Pick a thread count for inference when none is configured
fn default_thread_count() -> i32 {
    let available = std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(2);
    available.min(4) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_use_gpu() {
        assert!(!Device::Cpu.use_gpu());
        assert!(Device::Gpu.use_gpu());
    }

    #[test]
    fn test_device_display() {
        assert_eq!(Device::Auto.to_string(), "auto");
        assert_eq!(Device::Cpu.to_string(), "cpu");
        assert_eq!(Device::Gpu.to_string(), "gpu");
    }

    #[test]
    fn test_default_thread_count_bounds() {
        let threads = default_thread_count();
        assert!(threads >= 1);
        assert!(threads <= 4);
    }

    #[test]
    fn test_load_missing_model_fails() {
        let result = WhisperEngine::load(
            Path::new("/nonexistent/ggml-base.bin"),
            ModelKind::Base,
            Device::Cpu,
            None,
        );
        assert!(result.is_err());
    }
}
