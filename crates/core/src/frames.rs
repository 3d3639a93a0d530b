use std::{
    path::{Path, PathBuf},
    process::Stdio,
};

use async_trait::async_trait;
use tokio::{fs, process::Command};
use tracing::{debug, error, info, warn};

use crate::{
    config::Settings,
    error::Result,
    media::MediaInfo,
    storage::{frame_file_name, non_empty_file, remove_quietly},
};

/// Picks evenly spaced frames from a video and stores them as images.
#[async_trait]
pub trait FrameSampler: Send + Sync {
    /// File names of the stored frames, in frame order, at most `max_frames`.
    /// Empty when the video cannot be read.
    async fn sample(&self, video_path: &Path, max_frames: usize) -> Vec<String>;
}

/// `max(1, total / max_frames)`
pub fn sampling_stride(total_frames: u64, max_frames: usize) -> u64 {
    (total_frames / max_frames.max(1) as u64).max(1)
}

/// Candidate frame indices: 0, stride, 2*stride, ... below `total_frames`
pub fn frame_indices(total_frames: u64, max_frames: usize) -> impl Iterator<Item = u64> {
    let stride = sampling_stride(total_frames, max_frames);
    (0..total_frames).step_by(stride as usize)
}

pub struct FfmpegFrameSampler {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
    output_dir: PathBuf,
}

impl FfmpegFrameSampler {
    pub fn new(settings: &Settings) -> Self {
        Self {
            ffmpeg: settings.ffmpeg.clone(),
            ffprobe: settings.ffprobe.clone(),
            output_dir: settings.upload_dir.clone(),
        }
    }

    async fn collect(
        &self,
        video_path: &Path,
        max_frames: usize,
        frames: &mut Vec<String>,
    ) -> Result<()> {
        let media = match MediaInfo::probe(&self.ffprobe, video_path).await {
            Ok(media) => media,
            Err(e) => {
                error!(error = %e, "failed to open video file");
                return Ok(());
            }
        };

        let total_frames = media.frame_count();
        if total_frames == 0 {
            warn!(video = %video_path.display(), "video has no frames");
            return Ok(());
        }

        fs::create_dir_all(&self.output_dir).await?;
        let fps = media.frame_rate();

        for index in frame_indices(total_frames, max_frames) {
            let name = frame_file_name(index);
            let frame_path = self.output_dir.join(&name);
            if self.decode_frame(video_path, index, fps, &frame_path).await? {
                frames.push(name);
            }

            if frames.len() >= max_frames {
                break;
            }
        }

        Ok(())
    }

    /// Decode frame `index` into a JPEG. `Ok(false)` when nothing was decoded.
    async fn decode_frame(
        &self,
        video_path: &Path,
        index: u64,
        fps: Option<f64>,
        frame_path: &Path,
    ) -> Result<bool> {
        let mut cmd = Command::new(&self.ffmpeg);
        cmd.arg("-v").arg("error");
        match fps {
            Some(fps) => {
                cmd.arg("-ss")
                    .arg(format!("{:.6}", index as f64 / fps))
                    .arg("-i")
                    .arg(video_path);
            }
            None => {
                cmd.arg("-i")
                    .arg(video_path)
                    .arg("-vf")
                    .arg(format!("select=eq(n\\,{})", index))
                    .arg("-vsync")
                    .arg("0");
            }
        }
        let output = cmd
            .arg("-frames:v")
            .arg("1")
            .arg("-q:v")
            .arg("2")
            .arg("-y")
            .arg(frame_path)
            .stdin(Stdio::null())
            .output()
            .await?;

        let decoded = output.status.success() && non_empty_file(frame_path).await.is_some();
        if !decoded {
            debug!(
                index,
                stderr = %String::from_utf8_lossy(&output.stderr),
                "frame not decoded"
            );
            let _ = fs::remove_file(frame_path).await;
        }
        Ok(decoded)
    }
}

#[async_trait]
impl FrameSampler for FfmpegFrameSampler {
    async fn sample(&self, video_path: &Path, max_frames: usize) -> Vec<String> {
        info!(video = %video_path.display(), "extracting key frames");
        if max_frames == 0 {
            return Vec::new();
        }

        let mut frames = Vec::new();
        let collected = self.collect(video_path, max_frames, &mut frames).await;
        match collected {
            Ok(()) => frames,
            Err(e) => {
                error!(error = %e, "error extracting key frames");
                for name in frames {
                    remove_quietly(&self.output_dir.join(name), "partial key frame").await;
                }
                Vec::new()
            }
        }
    }
}
