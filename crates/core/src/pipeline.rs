use std::{path::Path, sync::Arc};

use tracing::info;

use crate::{
    audio::{AudioExtractor, FfmpegAudioExtractor},
    capability::LazyCapability,
    config::Settings,
    frames::{FfmpegFrameSampler, FrameSampler},
    llm::ChatSummaryModel,
    placeholders::{NO_AUDIO_TRANSCRIPTION, SUMMARY_UNAVAILABLE, is_transcription_failure},
    storage::{TransientFile, remove_quietly},
    summarize::{Summarizer, SummaryModel},
    transcribe::{SpeechRecognizer, Transcriber},
    types::{ModelStatus, SummaryResult},
    whisper::WhisperRecognizer,
};

/// Per-video workflow: audio → transcript → summary, plus key frames.
///
/// Every stage degrades to placeholder text instead of failing the run.
pub struct Pipeline {
    extractor: Arc<dyn AudioExtractor>,
    transcriber: Transcriber,
    summarizer: Summarizer,
    frames: Arc<dyn FrameSampler>,
    max_frames: usize,
}

impl Pipeline {
    pub fn new(
        extractor: Arc<dyn AudioExtractor>,
        transcriber: Transcriber,
        summarizer: Summarizer,
        frames: Arc<dyn FrameSampler>,
        max_frames: usize,
    ) -> Self {
        Self {
            extractor,
            transcriber,
            summarizer,
            frames,
            max_frames,
        }
    }

    /// ffmpeg for media work, whisper for speech, the configured provider for
    /// summaries. Neither model is loaded until first used.
    pub fn from_settings(settings: &Settings) -> Self {
        let whisper_settings = settings.clone();
        let recognizer = LazyCapability::<dyn SpeechRecognizer>::new("transcription", move || {
            let settings = whisper_settings.clone();
            async move {
                let recognizer: Arc<dyn SpeechRecognizer> =
                    Arc::new(WhisperRecognizer::load(&settings).await?);
                Ok(recognizer)
            }
        });

        let provider = settings.provider;
        let model = LazyCapability::<dyn SummaryModel>::new("summarization", move || async move {
            let model: Arc<dyn SummaryModel> = Arc::new(ChatSummaryModel::load(provider)?);
            Ok(model)
        });

        Self::new(
            Arc::new(FfmpegAudioExtractor::new(settings)),
            Transcriber::new(Arc::new(recognizer)),
            Summarizer::new(Arc::new(model)),
            Arc::new(FfmpegFrameSampler::new(settings)),
            settings.max_frames,
        )
    }

    pub fn model_status(&self) -> ModelStatus {
        ModelStatus {
            summarizer: self.summarizer.is_loaded(),
            transcriber: self.transcriber.is_loaded(),
        }
    }

    /// Run every stage for `video_path`, then delete the video.
    ///
    /// Key frame sampling does not depend on the audio and runs alongside it.
    pub async fn process(&self, video_path: &Path, filename: &str) -> SummaryResult {
        let ((transcription, summary, has_audio), key_frames) = tokio::join!(
            self.process_audio(video_path),
            self.frames.sample(video_path, self.max_frames)
        );

        remove_quietly(video_path, "uploaded video file").await;

        SummaryResult {
            filename: filename.to_string(),
            transcription,
            summary,
            key_frames,
            has_audio,
        }
    }

    async fn process_audio(&self, video_path: &Path) -> (String, String, bool) {
        let mut audio_path = self.extractor.extract(video_path).await;
        if audio_path.is_none() {
            info!("primary audio extraction failed, trying fallback method");
            audio_path = self.extractor.fallback_extract(video_path).await;
        }

        let Some(audio_path) = audio_path else {
            return (
                NO_AUDIO_TRANSCRIPTION.to_string(),
                SUMMARY_UNAVAILABLE.to_string(),
                false,
            );
        };

        let audio = TransientFile::new(audio_path);
        let transcription = self.transcriber.transcribe(audio.path()).await;
        info!(
            characters = transcription.chars().count(),
            "transcription complete"
        );
        audio.remove().await;

        let mut summary = SUMMARY_UNAVAILABLE.to_string();
        if !transcription.is_empty() && !is_transcription_failure(&transcription) {
            summary = self.summarizer.summarize(&transcription).await;
            info!(
                characters = summary.chars().count(),
                "summary generation complete"
            );
        }

        (transcription, summary, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        placeholders::transcription_failed,
        testing::{FakeExtractor, FakeSampler, FakeSummaryModel, fake_pipeline},
        transcribe::full_text,
        types::{Recognition, Segment},
    };

    const SPEECH: &str = "Welcome to the quarterly review. Revenue grew twelve percent, \
                          driven mostly by the new subscription tier.";

    fn video_in(dir: &Path) -> std::path::PathBuf {
        let video = dir.join("talk.mp4");
        std::fs::write(&video, b"\x00\x00\x00\x18ftypmp42").unwrap();
        video
    }

    #[tokio::test]
    async fn spoken_video_yields_transcript_summary_and_frames() {
        let dir = tempfile::tempdir().unwrap();
        let video = video_in(dir.path());
        let extractor = Arc::new(FakeExtractor::new(dir.path(), true, true));
        let sampler = Arc::new(FakeSampler::new(8));
        let model = Arc::new(FakeSummaryModel::default());
        let pipeline = fake_pipeline(
            Arc::clone(&extractor),
            Ok(Recognition::Text(SPEECH.to_string())),
            Arc::clone(&sampler),
            Arc::clone(&model),
        );

        let result = pipeline.process(&video, "talk.mp4").await;

        assert_eq!(result.filename, "talk.mp4");
        assert!(result.has_audio);
        assert_eq!(result.transcription, SPEECH);
        assert_eq!(
            result.summary,
            format!("Summary of {} characters.", SPEECH.chars().count())
        );
        assert_eq!(result.key_frames.len(), 5);
        assert_eq!(extractor.calls(), vec!["primary"]);
        assert_eq!(model.calls(), 1);
        assert!(pipeline.model_status().transcriber);
        assert!(pipeline.model_status().summarizer);

        // transient audio and the source video are gone
        assert!(extractor.produced().iter().all(|p| !p.exists()));
        assert!(!video.exists());
    }

    #[tokio::test]
    async fn silent_video_tries_fallback_and_keeps_frames() {
        let dir = tempfile::tempdir().unwrap();
        let video = video_in(dir.path());
        let extractor = Arc::new(FakeExtractor::new(dir.path(), false, false));
        let sampler = Arc::new(FakeSampler::new(3));
        let model = Arc::new(FakeSummaryModel::default());
        let pipeline = fake_pipeline(
            Arc::clone(&extractor),
            Ok(Recognition::Text(SPEECH.to_string())),
            Arc::clone(&sampler),
            Arc::clone(&model),
        );

        let result = pipeline.process(&video, "silent.mp4").await;

        assert_eq!(result, SummaryResult {
            filename: "silent.mp4".to_string(),
            transcription: NO_AUDIO_TRANSCRIPTION.to_string(),
            summary: SUMMARY_UNAVAILABLE.to_string(),
            key_frames: vec![
                "frame_0_test_0.jpg".to_string(),
                "frame_0_test_10.jpg".to_string(),
                "frame_0_test_20.jpg".to_string(),
            ],
            has_audio: false,
        });
        assert_eq!(extractor.calls(), vec!["primary", "fallback"]);
        assert_eq!(sampler.calls(), 1);
        assert_eq!(model.calls(), 0);
        assert_eq!(pipeline.model_status(), ModelStatus {
            summarizer: false,
            transcriber: false,
        });
        assert!(!video.exists());
    }

    #[tokio::test]
    async fn fallback_audio_is_transcribed() {
        let dir = tempfile::tempdir().unwrap();
        let video = video_in(dir.path());
        let extractor = Arc::new(FakeExtractor::new(dir.path(), false, true));
        let pipeline = fake_pipeline(
            Arc::clone(&extractor),
            Ok(Recognition::Segments(vec![
                Segment {
                    start: 0.0,
                    end: 2.5,
                    text: Some("Welcome to the quarterly review.".to_string()),
                },
                Segment {
                    start: 2.5,
                    end: 6.0,
                    text: Some("Revenue grew twelve percent this year.".to_string()),
                },
            ])),
            Arc::new(FakeSampler::new(5)),
            Arc::new(FakeSummaryModel::default()),
        );

        let result = pipeline.process(&video, "talk.mp4").await;

        assert!(result.has_audio);
        assert_eq!(
            result.transcription,
            "Welcome to the quarterly review. Revenue grew twelve percent this year."
        );
        assert!(result.summary.starts_with("Summary of"));
        assert_eq!(extractor.calls(), vec!["primary", "fallback"]);
        assert_eq!(extractor.produced().len(), 1);
        assert!(!extractor.produced()[0].exists());
    }

    #[tokio::test]
    async fn failed_transcription_skips_summary() {
        let dir = tempfile::tempdir().unwrap();
        let video = video_in(dir.path());
        let extractor = Arc::new(FakeExtractor::new(dir.path(), true, true));
        let model = Arc::new(FakeSummaryModel::default());
        let pipeline = fake_pipeline(
            Arc::clone(&extractor),
            Err("model crashed".to_string()),
            Arc::new(FakeSampler::new(5)),
            Arc::clone(&model),
        );

        let result = pipeline.process(&video, "talk.mp4").await;

        assert!(result.has_audio);
        assert!(is_transcription_failure(&result.transcription));
        assert!(result.transcription.contains("model crashed"));
        assert_eq!(result.summary, SUMMARY_UNAVAILABLE);
        assert_eq!(model.calls(), 0);
        assert!(extractor.produced().iter().all(|p| !p.exists()));
    }

    #[tokio::test]
    async fn empty_transcription_skips_summary() {
        let dir = tempfile::tempdir().unwrap();
        let video = video_in(dir.path());
        let model = Arc::new(FakeSummaryModel::default());
        let pipeline = fake_pipeline(
            Arc::new(FakeExtractor::new(dir.path(), true, true)),
            Ok(Recognition::Text(String::new())),
            Arc::new(FakeSampler::new(0)),
            Arc::clone(&model),
        );

        let result = pipeline.process(&video, "talk.mp4").await;

        assert_eq!(result.transcription, "");
        assert_eq!(result.summary, SUMMARY_UNAVAILABLE);
        assert!(result.key_frames.is_empty());
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn audio_without_speech_leaves_summary_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let video = video_in(dir.path());
        let model = Arc::new(FakeSummaryModel::default());
        let pipeline = fake_pipeline(
            Arc::new(FakeExtractor::new(dir.path(), true, true)),
            Ok(full_text(&[])),
            Arc::new(FakeSampler::new(2)),
            Arc::clone(&model),
        );

        let result = pipeline.process(&video, "ambient.mp4").await;

        assert!(result.has_audio);
        assert_eq!(result.transcription, "");
        assert_eq!(result.summary, SUMMARY_UNAVAILABLE);
        assert_eq!(result.key_frames.len(), 2);
        assert_eq!(model.calls(), 0);
        assert!(!pipeline.model_status().summarizer);
    }

    #[tokio::test]
    async fn unexpected_format_still_goes_through_summarizer() {
        let dir = tempfile::tempdir().unwrap();
        let video = video_in(dir.path());
        let model = Arc::new(FakeSummaryModel::default());
        let pipeline = fake_pipeline(
            Arc::new(FakeExtractor::new(dir.path(), true, true)),
            Ok(Recognition::Unrecognized),
            Arc::new(FakeSampler::new(1)),
            Arc::clone(&model),
        );

        let result = pipeline.process(&video, "talk.mp4").await;

        assert_eq!(result.transcription, "Unexpected transcription format.");
        assert_eq!(result.summary, "Text too short or empty for summarization.");
        assert_eq!(model.calls(), 0);
        assert_ne!(result.transcription, transcription_failed("x"));
    }
}
