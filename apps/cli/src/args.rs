use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use vidbrief_core::{
    Provider, Settings,
    config::{DEFAULT_MAX_FRAMES, DEFAULT_WHISPER_MODEL},
};

/// CLI wrapper for Provider enum (needed for clap ValueEnum)
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum CliProvider {
    #[default]
    Grok,
    Openai,
    Gemini,
}

impl From<CliProvider> for Provider {
    fn from(cli: CliProvider) -> Self {
        match cli {
            CliProvider::Grok => Provider::Grok,
            CliProvider::Openai => Provider::Openai,
            CliProvider::Gemini => Provider::Gemini,
        }
    }
}

#[derive(Parser)]
#[command(name = "vidbrief")]
#[command(about = "Transcribe, summarize and sample key frames from videos")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP API
    Serve(ServeArgs),
    /// Process a single local video and print the result
    Process(ProcessArgs),
}

#[derive(Args)]
pub struct ServeArgs {
    #[arg(long, env = "VIDBRIEF_HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "VIDBRIEF_PORT", default_value_t = 5100)]
    pub port: u16,

    #[command(flatten)]
    pub pipeline: PipelineArgs,
}

#[derive(Args)]
pub struct ProcessArgs {
    /// Video file (mp4, avi, mov, mkv). It is copied first and left untouched.
    pub video: PathBuf,

    /// Print the raw JSON result instead of the readable report
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub pipeline: PipelineArgs,
}

#[derive(Args, Clone)]
pub struct PipelineArgs {
    /// Where uploads and key frames are stored
    #[arg(long, env = "VIDBRIEF_UPLOAD_DIR", default_value = "uploads")]
    pub upload_dir: PathBuf,

    /// Scratch directory for extracted audio. Defaults to the system temp dir.
    #[arg(long, env = "VIDBRIEF_TEMP_DIR")]
    pub temp_dir: Option<PathBuf>,

    /// AI provider for summaries
    #[arg(short, long, env = "VIDBRIEF_PROVIDER", default_value = "grok")]
    pub provider: CliProvider,

    /// ggml whisper model file name
    #[arg(long, env = "VIDBRIEF_WHISPER_MODEL", default_value = DEFAULT_WHISPER_MODEL)]
    pub whisper_model: String,

    /// Where whisper models are cached
    #[arg(long, env = "VIDBRIEF_MODEL_DIR")]
    pub model_dir: Option<PathBuf>,

    #[arg(long, env = "VIDBRIEF_MAX_FRAMES", default_value_t = DEFAULT_MAX_FRAMES)]
    pub max_frames: usize,

    #[arg(long, env = "VIDBRIEF_FFMPEG", default_value = "ffmpeg")]
    pub ffmpeg: PathBuf,

    #[arg(long, env = "VIDBRIEF_FFPROBE", default_value = "ffprobe")]
    pub ffprobe: PathBuf,
}

impl PipelineArgs {
    pub fn settings(&self) -> Settings {
        let defaults = Settings::default();
        Settings {
            upload_dir: self.upload_dir.clone(),
            temp_dir: self.temp_dir.clone().unwrap_or(defaults.temp_dir),
            model_dir: self.model_dir.clone().unwrap_or(defaults.model_dir),
            whisper_model: self.whisper_model.clone(),
            provider: self.provider.into(),
            max_frames: self.max_frames,
            ffmpeg: self.ffmpeg.clone(),
            ffprobe: self.ffprobe.clone(),
        }
    }
}
