//! Vidbrief Core Library
//!
//! Turns an uploaded video into a transcript, a summary of that transcript and
//! a handful of evenly spaced key frames.

pub mod audio;
pub mod capability;
pub mod config;
pub mod error;
pub mod frames;
pub mod llm;
pub mod media;
pub mod pipeline;
pub mod placeholders;
pub mod provider;
pub mod storage;
pub mod summarize;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod transcribe;
pub mod types;
pub mod whisper;

// Re-export commonly used items at crate root
pub use audio::{AudioExtractor, FfmpegAudioExtractor};
pub use capability::LazyCapability;
pub use config::Settings;
pub use error::{Result, VidbriefError};
pub use frames::{FfmpegFrameSampler, FrameSampler};
pub use pipeline::Pipeline;
pub use provider::{Endpoint, Provider};
pub use summarize::{Summarizer, SummaryModel};
pub use transcribe::{SpeechRecognizer, Transcriber};
pub use types::{GenerationParams, ModelStatus, Recognition, Segment, SummaryCandidate, SummaryResult};
