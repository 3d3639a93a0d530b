use std::{
    path::{Path, PathBuf},
    process::Stdio,
};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{error, info, warn};

use crate::{
    config::Settings,
    error::{Result, VidbriefError},
    media::MediaInfo,
    storage::{audio_artifact_path, non_empty_file},
};

pub const SAMPLE_RATE: u32 = 16_000;

/// Produces a mono 16-bit PCM WAV from a video's audio track.
///
/// Neither method reports errors: failures are logged and surface as `None`.
/// A returned path always names an existing, non-empty file.
#[async_trait]
pub trait AudioExtractor: Send + Sync {
    /// Primary path: open the video, skip it when there is no audio stream,
    /// otherwise decode the audio into a fresh WAV.
    async fn extract(&self, video_path: &Path) -> Option<PathBuf>;

    /// Secondary path: hand the whole job to the external decoder binary.
    async fn fallback_extract(&self, video_path: &Path) -> Option<PathBuf>;
}

pub struct FfmpegAudioExtractor {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
    temp_dir: PathBuf,
}

impl FfmpegAudioExtractor {
    pub fn new(settings: &Settings) -> Self {
        Self {
            ffmpeg: settings.ffmpeg.clone(),
            ffprobe: settings.ffprobe.clone(),
            temp_dir: settings.temp_dir.clone(),
        }
    }

    /// Decode the audio as raw s16le and write the WAV container with hound
    async fn decode_to_wav(&self, video_path: &Path, audio_path: &Path) -> Result<()> {
        let output = Command::new(&self.ffmpeg)
            .arg("-v")
            .arg("error")
            .arg("-i")
            .arg(video_path)
            .arg("-vn")
            .arg("-f")
            .arg("s16le")
            .arg("-acodec")
            .arg("pcm_s16le")
            .arg("-ar")
            .arg(SAMPLE_RATE.to_string())
            .arg("-ac")
            .arg("1")
            .arg("-")
            .stdin(Stdio::null())
            .output()
            .await?;

        if !output.status.success() {
            return Err(VidbriefError::AudioExtractionFailed {
                video_path: video_path.to_path_buf(),
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        if output.stdout.len() < 2 {
            return Err(VidbriefError::AudioExtractionFailed {
                video_path: video_path.to_path_buf(),
                reason: "no audio samples decoded".to_string(),
            });
        }

        let audio_path = audio_path.to_path_buf();
        tokio::task::spawn_blocking(move || write_wav(&audio_path, &output.stdout)).await?
    }
}

fn write_wav(audio_path: &Path, pcm: &[u8]) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(audio_path, spec)?;
    for sample in pcm.chunks_exact(2) {
        writer.write_sample(i16::from_le_bytes([sample[0], sample[1]]))?;
    }
    writer.finalize()?;
    Ok(())
}

#[async_trait]
impl AudioExtractor for FfmpegAudioExtractor {
    async fn extract(&self, video_path: &Path) -> Option<PathBuf> {
        info!(video = %video_path.display(), "extracting audio");

        let media = match MediaInfo::probe(&self.ffprobe, video_path).await {
            Ok(media) => media,
            Err(e) => {
                error!(error = %e, "failed to open video");
                return None;
            }
        };

        if !media.has_audio() {
            warn!(video = %video_path.display(), "video does not have an audio track");
            return None;
        }

        let audio_path = audio_artifact_path(&self.temp_dir, "audio");
        if let Err(e) = self.decode_to_wav(video_path, &audio_path).await {
            error!(error = %e, "error writing audio file");
            let _ = tokio::fs::remove_file(&audio_path).await;
            return None;
        }

        if non_empty_file(&audio_path).await.is_none() {
            error!(path = %audio_path.display(), "audio extraction produced empty file");
            let _ = tokio::fs::remove_file(&audio_path).await;
            return None;
        }

        Some(audio_path)
    }

    async fn fallback_extract(&self, video_path: &Path) -> Option<PathBuf> {
        info!(video = %video_path.display(), "trying fallback audio extraction");

        let available = Command::new(&self.ffmpeg)
            .arg("-version")
            .stdin(Stdio::null())
            .output()
            .await
            .map(|out| out.status.success())
            .unwrap_or(false);
        if !available {
            warn!(ffmpeg = %self.ffmpeg.display(), "ffmpeg not available for fallback extraction");
            return None;
        }

        let audio_path = audio_artifact_path(&self.temp_dir, "audio_fallback");
        let output = Command::new(&self.ffmpeg)
            .arg("-i")
            .arg(video_path)
            .arg("-vn")
            .arg("-acodec")
            .arg("pcm_s16le")
            .arg("-ar")
            .arg(SAMPLE_RATE.to_string())
            .arg("-ac")
            .arg("1")
            .arg("-y")
            .arg(&audio_path)
            .stdin(Stdio::null())
            .output()
            .await;

        match output {
            Ok(out) if out.status.success() => {}
            Ok(out) => {
                error!(stderr = %String::from_utf8_lossy(&out.stderr), "ffmpeg subprocess error");
                let _ = tokio::fs::remove_file(&audio_path).await;
                return None;
            }
            Err(e) => {
                error!(error = %e, "error in fallback audio extraction");
                return None;
            }
        }

        if non_empty_file(&audio_path).await.is_none() {
            error!(path = %audio_path.display(), "fallback audio extraction produced empty file");
            let _ = tokio::fs::remove_file(&audio_path).await;
            return None;
        }

        Some(audio_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor(dir: &Path, ffmpeg: &Path, ffprobe: &Path) -> FfmpegAudioExtractor {
        FfmpegAudioExtractor::new(&Settings {
            temp_dir: dir.to_path_buf(),
            ffmpeg: ffmpeg.to_path_buf(),
            ffprobe: ffprobe.to_path_buf(),
            ..Settings::default()
        })
    }

    #[test]
    fn writes_mono_16bit_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.wav");
        let pcm: Vec<u8> = [0i16, 1000, -1000, i16::MAX]
            .iter()
            .flat_map(|s| s.to_le_bytes())
            .collect();

        write_wav(&path, &pcm).unwrap();

        let mut reader = hound::WavReader::open(&path).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, SAMPLE_RATE);
        assert_eq!(spec.bits_per_sample, 16);
        let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![0, 1000, -1000, i16::MAX]);
    }

    #[tokio::test]
    async fn missing_decoder_yields_none() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("clip.mp4");
        std::fs::write(&video, b"not really a video").unwrap();
        let extractor = extractor(
            dir.path(),
            Path::new("/nonexistent/vidbrief-ffmpeg"),
            Path::new("/nonexistent/vidbrief-ffprobe"),
        );

        assert_eq!(extractor.extract(&video).await, None);
        assert_eq!(extractor.fallback_extract(&video).await, None);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[cfg(unix)]
    mod with_fake_tools {
        use std::path::PathBuf;

        use super::*;
        use crate::audio::AudioExtractor;
        use crate::testing::{PROBE_TWELVE_FRAMES_WITH_AUDIO, fake_tool};

        struct Setup {
            _root: tempfile::TempDir,
            video: PathBuf,
            scratch: PathBuf,
            bin: PathBuf,
        }

        fn setup() -> Setup {
            let root = tempfile::tempdir().unwrap();
            let video = root.path().join("clip.mp4");
            std::fs::write(&video, b"video bytes").unwrap();
            let scratch = root.path().join("scratch");
            let bin = root.path().join("bin");
            std::fs::create_dir_all(&scratch).unwrap();
            std::fs::create_dir_all(&bin).unwrap();
            Setup {
                video,
                scratch,
                bin,
                _root: root,
            }
        }

        fn scratch_entries(setup: &Setup) -> usize {
            std::fs::read_dir(&setup.scratch).unwrap().count()
        }

        #[tokio::test]
        async fn decoder_that_writes_nothing_yields_none() {
            let setup = setup();
            let ffprobe = fake_tool(&setup.bin, "ffprobe", PROBE_TWELVE_FRAMES_WITH_AUDIO);
            let ffmpeg = fake_tool(&setup.bin, "ffmpeg", "exit 0");
            let extractor = extractor(&setup.scratch, &ffmpeg, &ffprobe);

            assert_eq!(extractor.extract(&setup.video).await, None);
            assert_eq!(extractor.fallback_extract(&setup.video).await, None);
            assert_eq!(scratch_entries(&setup), 0);
        }

        #[tokio::test]
        async fn zero_byte_output_is_rejected_and_removed() {
            let setup = setup();
            let ffprobe = fake_tool(&setup.bin, "ffprobe", PROBE_TWELVE_FRAMES_WITH_AUDIO);
            let ffmpeg = fake_tool(
                &setup.bin,
                "ffmpeg",
                r#"for out; do :; done
case "$out" in *.wav) : > "$out" ;; esac"#,
            );
            let extractor = extractor(&setup.scratch, &ffmpeg, &ffprobe);

            assert_eq!(extractor.fallback_extract(&setup.video).await, None);
            assert_eq!(scratch_entries(&setup), 0);
        }

        #[tokio::test]
        async fn fallback_returns_written_wav() {
            let setup = setup();
            let ffprobe = fake_tool(&setup.bin, "ffprobe", PROBE_TWELVE_FRAMES_WITH_AUDIO);
            let ffmpeg = fake_tool(
                &setup.bin,
                "ffmpeg",
                r#"for out; do :; done
case "$out" in *.wav) printf 'RIFFdata' > "$out" ;; esac"#,
            );
            let extractor = extractor(&setup.scratch, &ffmpeg, &ffprobe);

            let audio = extractor.fallback_extract(&setup.video).await.unwrap();
            assert!(audio.starts_with(&setup.scratch));
            assert!(
                audio
                    .file_name()
                    .unwrap()
                    .to_string_lossy()
                    .starts_with("audio_fallback_")
            );
            assert_eq!(std::fs::read(&audio).unwrap(), b"RIFFdata");
        }
    }
}
