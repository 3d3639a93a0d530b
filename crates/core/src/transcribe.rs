use std::{path::Path, sync::Arc};

use async_trait::async_trait;
use tracing::{error, info};

use crate::{
    capability::LazyCapability,
    error::Result,
    placeholders::{AUDIO_FILE_NOT_FOUND, UNEXPECTED_TRANSCRIPTION_FORMAT, transcription_failed},
    types::{Recognition, Segment},
};

/// Speech-to-text model.
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    async fn recognize(&self, audio_path: &Path, return_timestamps: bool) -> Result<Recognition>;
}

pub struct Transcriber {
    recognizer: Arc<LazyCapability<dyn SpeechRecognizer>>,
}

impl Transcriber {
    pub fn new(recognizer: Arc<LazyCapability<dyn SpeechRecognizer>>) -> Self {
        Self { recognizer }
    }

    pub fn is_loaded(&self) -> bool {
        self.recognizer.is_loaded()
    }

    /// Transcribe a WAV file. Always returns readable text; failures come back
    /// as messages starting with the transcription failure marker.
    pub async fn transcribe(&self, audio_path: &Path) -> String {
        info!(audio = %audio_path.display(), "transcribing audio");

        if !tokio::fs::try_exists(audio_path).await.unwrap_or(false) {
            error!(audio = %audio_path.display(), "audio file not found");
            return AUDIO_FILE_NOT_FOUND.to_string();
        }

        match self.recognize(audio_path).await {
            Ok(recognition) => normalize(recognition),
            Err(e) => {
                error!(error = %e, "error transcribing audio");
                transcription_failed(e)
            }
        }
    }

    async fn recognize(&self, audio_path: &Path) -> Result<Recognition> {
        let recognizer = self.recognizer.get().await?;
        recognizer.recognize(audio_path, true).await
    }
}

/// A single text record from decoded segments. No speech gives empty text.
pub fn full_text(segments: &[Segment]) -> Recognition {
    let text = segments
        .iter()
        .filter_map(|segment| segment.text.as_deref())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    Recognition::Text(text)
}

/// Flatten recognizer output into plain text
pub fn normalize(recognition: Recognition) -> String {
    match recognition {
        Recognition::Text(text) => text,
        Recognition::Segments(segments) if !segments.is_empty() => segments
            .into_iter()
            .filter_map(|segment| segment.text)
            .collect::<Vec<_>>()
            .join(" "),
        _ => UNEXPECTED_TRANSCRIPTION_FORMAT.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::{error::VidbriefError, placeholders::is_transcription_failure};

    struct Canned(Mutex<Option<Result<Recognition>>>);

    #[async_trait]
    impl SpeechRecognizer for Canned {
        async fn recognize(&self, _audio_path: &Path, return_timestamps: bool) -> Result<Recognition> {
            assert!(return_timestamps);
            self.0.lock().unwrap().take().expect("recognize called once")
        }
    }

    fn transcriber(result: Result<Recognition>) -> Transcriber {
        let recognizer: Arc<dyn SpeechRecognizer> = Arc::new(Canned(Mutex::new(Some(result))));
        Transcriber::new(Arc::new(LazyCapability::ready("transcription", recognizer)))
    }

    fn segment(text: Option<&str>) -> Segment {
        Segment {
            start: 0.0,
            end: 1.0,
            text: text.map(str::to_string),
        }
    }

    fn audio_file() -> tempfile::NamedTempFile {
        let file = tempfile::Builder::new().suffix(".wav").tempfile().unwrap();
        std::fs::write(file.path(), b"RIFF").unwrap();
        file
    }

    #[test]
    fn single_record_is_returned_verbatim() {
        assert_eq!(
            normalize(Recognition::Text(" hello there ".into())),
            " hello there "
        );
    }

    #[test]
    fn segments_are_space_joined_skipping_missing_text() {
        let segments = vec![segment(Some("one")), segment(None), segment(Some("two"))];
        assert_eq!(normalize(Recognition::Segments(segments)), "one two");
    }

    #[test]
    fn decoded_segments_become_one_text_record() {
        let segments = vec![
            segment(Some(" Hello")),
            segment(None),
            segment(Some("  ")),
            segment(Some("world. ")),
        ];
        assert_eq!(full_text(&segments), Recognition::Text("Hello world.".into()));
        assert_eq!(full_text(&[]), Recognition::Text(String::new()));
        assert_eq!(normalize(full_text(&[])), "");
    }

    #[test]
    fn empty_or_unknown_shapes_are_unexpected() {
        assert_eq!(
            normalize(Recognition::Segments(Vec::new())),
            UNEXPECTED_TRANSCRIPTION_FORMAT
        );
        assert_eq!(
            normalize(Recognition::Unrecognized),
            UNEXPECTED_TRANSCRIPTION_FORMAT
        );
    }

    #[tokio::test]
    async fn missing_audio_file_is_reported_as_text() {
        let transcriber = transcriber(Ok(Recognition::Text("unused".into())));
        let text = transcriber
            .transcribe(Path::new("/nonexistent/audio_missing.wav"))
            .await;
        assert_eq!(text, AUDIO_FILE_NOT_FOUND);
    }

    #[tokio::test]
    async fn recognizer_errors_become_failure_text() {
        let audio = audio_file();
        let transcriber = transcriber(Err(VidbriefError::TranscriptFailed {
            audio_path: audio.path().to_path_buf(),
            reason: "decoder exploded".into(),
        }));

        let text = transcriber.transcribe(audio.path()).await;
        assert!(is_transcription_failure(&text));
        assert!(text.starts_with("Failed to transcribe audio: "));
        assert!(text.contains("decoder exploded"));
    }

    #[tokio::test]
    async fn load_failure_becomes_failure_text() {
        let audio = audio_file();
        let capability = LazyCapability::<dyn SpeechRecognizer>::new("transcription", || async {
            Err(VidbriefError::ModelLoadFailed {
                reason: "no weights".into(),
            })
        });
        let transcriber = Transcriber::new(Arc::new(capability));

        let text = transcriber.transcribe(audio.path()).await;
        assert!(is_transcription_failure(&text));
        assert!(!transcriber.is_loaded());
    }

    #[tokio::test]
    async fn segments_from_recognizer_are_joined() {
        let audio = audio_file();
        let transcriber = transcriber(Ok(Recognition::Segments(vec![
            segment(Some("Hello")),
            segment(Some("world.")),
        ])));
        assert_eq!(transcriber.transcribe(audio.path()).await, "Hello world.");
    }
}
