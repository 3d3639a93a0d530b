use std::path::PathBuf;

use crate::{provider::Provider, storage::get_root_cache_dir};

pub const DEFAULT_MAX_FRAMES: usize = 5;
pub const DEFAULT_WHISPER_MODEL: &str = "ggml-small.bin";

/// Runtime settings shared by the pipeline stages.
#[derive(Debug, Clone)]
pub struct Settings {
    pub upload_dir: PathBuf,
    pub temp_dir: PathBuf,
    pub model_dir: PathBuf,
    pub whisper_model: String,
    pub provider: Provider,
    pub max_frames: usize,
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("uploads"),
            temp_dir: std::env::temp_dir(),
            model_dir: get_root_cache_dir().join("models"),
            whisper_model: DEFAULT_WHISPER_MODEL.to_string(),
            provider: Provider::default(),
            max_frames: DEFAULT_MAX_FRAMES,
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
        }
    }
}
