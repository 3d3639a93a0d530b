use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use tokio::{fs, process::Command};
use tracing::info;
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use crate::{
    config::Settings,
    error::{Result, VidbriefError},
    transcribe::{SpeechRecognizer, full_text},
    types::{Recognition, Segment},
};

/// Download the ggml model into `model_dir` unless it is already there
pub async fn ensure_model(model_dir: &Path, model_name: &str) -> Result<PathBuf> {
    let download_url = format!(
        "https://huggingface.co/ggerganov/whisper.cpp/resolve/main/{}",
        model_name
    );

    if !model_dir.exists() {
        fs::create_dir_all(model_dir).await?;
    }

    let model_path = model_dir.join(model_name);
    if !model_path.exists() {
        info!(url = %download_url, "downloading whisper model");
        let partial = model_path.with_extension("part");
        let output = Command::new("curl")
            .arg("-fL")
            .arg(&download_url)
            .arg("-o")
            .arg(&partial)
            .output()
            .await?;

        if !output.status.success() {
            let _ = fs::remove_file(&partial).await;
            return Err(VidbriefError::ModelDownloadFailed {
                url: download_url,
                reason: String::from_utf8_lossy(&output.stderr).to_string(),
            });
        }
        fs::rename(&partial, &model_path).await?;
    }

    Ok(model_path)
}

extern "C" fn whisper_log_callback(
    _level: u32,
    _message: *const std::ffi::c_char,
    _user_data: *mut std::ffi::c_void,
) {
    // silent
}

/// Keep whisper.cpp from writing its own logs to stderr
pub fn silence_whisper_logs() {
    unsafe {
        whisper_rs::set_log_callback(Some(whisper_log_callback), std::ptr::null_mut());
    }
}

/// Speech recognition backed by a local whisper.cpp model.
pub struct WhisperRecognizer {
    ctx: Arc<WhisperContext>,
}

impl WhisperRecognizer {
    pub async fn load(settings: &Settings) -> Result<Self> {
        let model_path = ensure_model(&settings.model_dir, &settings.whisper_model).await?;

        let ctx = tokio::task::spawn_blocking(move || {
            let ctx_params = WhisperContextParameters {
                use_gpu: true,
                flash_attn: true,
                ..Default::default()
            };
            let model_path_str = model_path.to_str().ok_or_else(|| VidbriefError::ModelLoadFailed {
                reason: format!("model path is not valid UTF-8: {}", model_path.display()),
            })?;
            WhisperContext::new_with_params(model_path_str, ctx_params).map_err(|e| {
                VidbriefError::ModelLoadFailed {
                    reason: e.to_string(),
                }
            })
        })
        .await??;

        Ok(Self { ctx: Arc::new(ctx) })
    }
}

#[async_trait]
impl SpeechRecognizer for WhisperRecognizer {
    async fn recognize(&self, audio_path: &Path, return_timestamps: bool) -> Result<Recognition> {
        let ctx = Arc::clone(&self.ctx);
        let audio_path = audio_path.to_path_buf();
        tokio::task::spawn_blocking(move || run_whisper(&ctx, &audio_path, return_timestamps))
            .await?
    }
}

fn run_whisper(
    ctx: &WhisperContext,
    audio_path: &Path,
    return_timestamps: bool,
) -> Result<Recognition> {
    let failed = |reason: String| VidbriefError::TranscriptFailed {
        audio_path: audio_path.to_path_buf(),
        reason,
    };

    let mut reader = hound::WavReader::open(audio_path)?;
    let samples: Vec<f32> = reader
        .samples::<i16>()
        .map(|s| s.map(|s| s as f32 / i16::MAX as f32))
        .collect::<std::result::Result<_, _>>()?;

    let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
    params.set_no_timestamps(!return_timestamps);
    params.set_print_progress(false);

    let mut state = ctx.create_state().map_err(|e| failed(e.to_string()))?;
    state
        .full(params, &samples)
        .map_err(|e| failed(e.to_string()))?;

    let segments: Vec<Segment> = state
        .as_iter()
        .map(|segment| Segment {
            start: segment.start_timestamp() as f64 / 100.0,
            end: segment.end_timestamp() as f64 / 100.0,
            text: segment.to_str().ok().map(|s| s.trim().to_string()),
        })
        .collect();

    Ok(full_text(&segments))
}
