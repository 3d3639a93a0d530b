//! In-memory stand-ins for the media tools and models, for exercising the
//! pipeline without ffmpeg, whisper or network access.

use std::{
    path::{Path, PathBuf},
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;

use crate::{
    audio::AudioExtractor,
    capability::LazyCapability,
    error::{Result, VidbriefError},
    frames::FrameSampler,
    pipeline::Pipeline,
    summarize::{Summarizer, SummaryModel},
    transcribe::{SpeechRecognizer, Transcriber},
    types::{GenerationParams, Recognition, SummaryCandidate},
};

/// Writes a small WAV-looking file for each enabled method.
pub struct FakeExtractor {
    dir: PathBuf,
    primary: bool,
    fallback: bool,
    calls: Mutex<Vec<&'static str>>,
    produced: Mutex<Vec<PathBuf>>,
}

impl FakeExtractor {
    pub fn new(dir: &Path, primary: bool, fallback: bool) -> Self {
        Self {
            dir: dir.to_path_buf(),
            primary,
            fallback,
            calls: Mutex::new(Vec::new()),
            produced: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().expect("calls poisoned").clone()
    }

    pub fn produced(&self) -> Vec<PathBuf> {
        self.produced.lock().expect("produced poisoned").clone()
    }

    async fn produce(&self, method: &'static str, enabled: bool) -> Option<PathBuf> {
        self.calls.lock().expect("calls poisoned").push(method);
        if !enabled {
            return None;
        }
        let path = self.dir.join(format!("{}_{}.wav", method, uuid::Uuid::new_v4().simple()));
        tokio::fs::write(&path, b"RIFF----WAVEfmt ").await.ok()?;
        self.produced.lock().expect("produced poisoned").push(path.clone());
        Some(path)
    }
}

#[async_trait]
impl AudioExtractor for FakeExtractor {
    async fn extract(&self, _video_path: &Path) -> Option<PathBuf> {
        self.produce("primary", self.primary).await
    }

    async fn fallback_extract(&self, _video_path: &Path) -> Option<PathBuf> {
        self.produce("fallback", self.fallback).await
    }
}

/// Returns up to `max_frames` of a fixed list of frame names.
pub struct FakeSampler {
    frames: Vec<String>,
    calls: AtomicUsize,
}

impl FakeSampler {
    pub fn new(count: usize) -> Self {
        Self {
            frames: (0..count).map(|i| format!("frame_0_test_{}.jpg", i * 10)).collect(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FrameSampler for FakeSampler {
    async fn sample(&self, _video_path: &Path, max_frames: usize) -> Vec<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.frames.iter().take(max_frames).cloned().collect()
    }
}

pub struct FakeRecognizer(pub std::result::Result<Recognition, String>);

#[async_trait]
impl SpeechRecognizer for FakeRecognizer {
    async fn recognize(&self, audio_path: &Path, _return_timestamps: bool) -> Result<Recognition> {
        self.0
            .clone()
            .map_err(|reason| VidbriefError::TranscriptFailed {
                audio_path: audio_path.to_path_buf(),
                reason,
            })
    }
}

/// Summaries of the form `Summary of N characters.`
#[derive(Default)]
pub struct FakeSummaryModel {
    calls: AtomicUsize,
}

impl FakeSummaryModel {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SummaryModel for FakeSummaryModel {
    async fn summarize(
        &self,
        text: &str,
        _params: &GenerationParams,
    ) -> Result<Vec<SummaryCandidate>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![SummaryCandidate {
            summary_text: format!("Summary of {} characters.", text.chars().count()),
        }])
    }
}

/// A pipeline over fakes. Both models start unloaded.
pub fn fake_pipeline(
    extractor: Arc<FakeExtractor>,
    recognition: std::result::Result<Recognition, String>,
    sampler: Arc<FakeSampler>,
    model: Arc<FakeSummaryModel>,
) -> Pipeline {
    let recognizer = LazyCapability::<dyn SpeechRecognizer>::new("transcription", move || {
        let recognition = recognition.clone();
        async move {
            let recognizer: Arc<dyn SpeechRecognizer> = Arc::new(FakeRecognizer(recognition));
            Ok(recognizer)
        }
    });
    let summary_model = LazyCapability::<dyn SummaryModel>::new("summarization", move || {
        let model: Arc<dyn SummaryModel> = Arc::<FakeSummaryModel>::clone(&model);
        async move { Ok(model) }
    });

    Pipeline::new(
        extractor,
        Transcriber::new(Arc::new(recognizer)),
        Summarizer::new(Arc::new(summary_model)),
        sampler,
        crate::config::DEFAULT_MAX_FRAMES,
    )
}

/// Write an executable `/bin/sh` script standing in for ffmpeg or ffprobe.
#[cfg(unix)]
pub fn fake_tool(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write fake tool");
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
        .expect("make fake tool executable");
    path
}

/// ffprobe output for a 12-frame, 12 fps video with an audio track.
pub const PROBE_TWELVE_FRAMES_WITH_AUDIO: &str = r#"cat <<'JSON'
{"streams":[{"codec_type":"video","nb_frames":"12","r_frame_rate":"12/1","avg_frame_rate":"12/1"},{"codec_type":"audio"}],"format":{"duration":"1.0"}}
JSON"#;
