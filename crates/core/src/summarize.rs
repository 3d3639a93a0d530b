use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::{
    capability::LazyCapability,
    error::{Result, VidbriefError},
    placeholders::{TEXT_TOO_SHORT, summary_failed},
    types::{GenerationParams, SummaryCandidate},
};

/// Longest slice, in characters, handed to the model in one call.
pub const CHUNK_CHARS: usize = 1024;
/// Texts (and chunks) need more than this many trimmed characters to be summarized.
pub const MIN_TEXT_CHARS: usize = 50;

/// Text summarization model.
#[async_trait]
pub trait SummaryModel: Send + Sync {
    async fn summarize(
        &self,
        text: &str,
        params: &GenerationParams,
    ) -> Result<Vec<SummaryCandidate>>;
}

pub struct Summarizer {
    model: Arc<LazyCapability<dyn SummaryModel>>,
    params: GenerationParams,
}

impl Summarizer {
    pub fn new(model: Arc<LazyCapability<dyn SummaryModel>>) -> Self {
        Self {
            model,
            params: GenerationParams::default(),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.model.is_loaded()
    }

    /// Summarize `text`. Always returns readable text; model failures come back
    /// as a failure message instead of an error.
    pub async fn summarize(&self, text: &str) -> String {
        info!("generating summary from transcribed text");

        if text.trim().chars().count() < MIN_TEXT_CHARS {
            warn!(text, "text too short for summarization");
            return TEXT_TOO_SHORT.to_string();
        }

        match self.generate(text).await {
            Ok(summary) => summary,
            Err(e) => {
                error!(error = %e, "error generating summary");
                summary_failed(e)
            }
        }
    }

    async fn generate(&self, text: &str) -> Result<String> {
        let model = self.model.get().await?;

        if text.chars().count() <= CHUNK_CHARS {
            let candidates = model.summarize(text, &self.params).await?;
            return first_candidate(candidates);
        }

        let mut summaries = Vec::new();
        for chunk in chunk_text(text, CHUNK_CHARS) {
            if chunk.trim().chars().count() > MIN_TEXT_CHARS {
                let candidates = model.summarize(chunk, &self.params).await?;
                summaries.push(first_candidate(candidates)?);
            }
        }
        Ok(summaries.join(" "))
    }
}

fn first_candidate(candidates: Vec<SummaryCandidate>) -> Result<String> {
    candidates
        .into_iter()
        .next()
        .map(|c| c.summary_text)
        .ok_or_else(|| VidbriefError::SummaryFailed {
            reason: "model returned no candidates".to_string(),
        })
}

/// Split `text` into consecutive slices of `size` characters; the last one may
/// be shorter.
pub fn chunk_text(text: &str, size: usize) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut count = 0;
    for (idx, _) in text.char_indices() {
        if count == size {
            chunks.push(&text[start..idx]);
            start = idx;
            count = 0;
        }
        count += 1;
    }
    if start < text.len() {
        chunks.push(&text[start..]);
    }
    chunks
}
