use serde::{Deserialize, Serialize};

/// Combined outcome of one pipeline run, as returned to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryResult {
    pub filename: String,
    pub transcription: String,
    pub summary: String,
    pub key_frames: Vec<String>,
    pub has_audio: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start: f64,
    pub end: f64,
    pub text: Option<String>,
}

/// Raw output of a speech recognizer before normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum Recognition {
    /// A single record carrying the full text.
    Text(String),
    /// Ordered timestamped segments.
    Segments(Vec<Segment>),
    /// Anything the recognizer could not express as text or segments.
    Unrecognized,
}

/// Generation bounds handed to the summarization model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationParams {
    pub max_length: usize,
    pub min_length: usize,
    pub do_sample: bool,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_length: 150,
            min_length: 30,
            do_sample: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryCandidate {
    pub summary_text: String,
}

/// Which inference models have been loaded so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelStatus {
    pub summarizer: bool,
    pub transcriber: bool,
}
