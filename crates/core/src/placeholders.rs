//! Fixed strings a degraded [`SummaryResult`](crate::SummaryResult) carries in
//! place of a failed stage. Clients match on these literally.

pub const NO_AUDIO_TRANSCRIPTION: &str = "No audio detected or extraction failed.";
pub const SUMMARY_UNAVAILABLE: &str = "Summary unavailable due to audio processing failure.";

pub const AUDIO_FILE_NOT_FOUND: &str = "Audio file not found.";
pub const UNEXPECTED_TRANSCRIPTION_FORMAT: &str = "Unexpected transcription format.";
/// Prefix shared by every transcription failure message.
pub const TRANSCRIPTION_FAILED_MARKER: &str = "Failed to transcribe";

pub const TEXT_TOO_SHORT: &str = "Text too short or empty for summarization.";
pub const SUMMARY_FAILED_MARKER: &str = "Failed to generate summary";

pub fn transcription_failed(reason: impl std::fmt::Display) -> String {
    format!("{TRANSCRIPTION_FAILED_MARKER} audio: {reason}")
}

pub fn summary_failed(reason: impl std::fmt::Display) -> String {
    format!("{SUMMARY_FAILED_MARKER}: {reason}")
}

pub fn is_transcription_failure(text: &str) -> bool {
    text.starts_with(TRANSCRIPTION_FAILED_MARKER)
}
