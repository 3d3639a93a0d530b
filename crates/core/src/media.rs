use std::path::Path;

use serde::Deserialize;
use tokio::process::Command;

use crate::error::{Result, VidbriefError};

/// Container and stream facts reported by ffprobe.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MediaInfo {
    #[serde(default)]
    pub streams: Vec<StreamInfo>,
    #[serde(default)]
    pub format: FormatInfo,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StreamInfo {
    #[serde(default)]
    pub codec_type: String,
    pub nb_frames: Option<String>,
    pub r_frame_rate: Option<String>,
    pub avg_frame_rate: Option<String>,
    pub duration: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FormatInfo {
    pub duration: Option<String>,
}

impl MediaInfo {
    /// Open `video_path` with ffprobe. Fails when the file cannot be read as media.
    pub async fn probe(ffprobe: &Path, video_path: &Path) -> Result<MediaInfo> {
        let output = Command::new(ffprobe)
            .arg("-v")
            .arg("error")
            .arg("-show_streams")
            .arg("-show_format")
            .arg("-of")
            .arg("json")
            .arg(video_path)
            .output()
            .await?;

        if !output.status.success() {
            return Err(VidbriefError::ProbeFailed {
                video_path: video_path.to_path_buf(),
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Self::from_json(&output.stdout)
    }

    pub fn from_json(raw: &[u8]) -> Result<MediaInfo> {
        Ok(serde_json::from_slice(raw)?)
    }

    pub fn has_audio(&self) -> bool {
        self.streams.iter().any(|s| s.codec_type == "audio")
    }

    fn video_stream(&self) -> Option<&StreamInfo> {
        self.streams.iter().find(|s| s.codec_type == "video")
    }

    /// Frames per second of the first video stream
    pub fn frame_rate(&self) -> Option<f64> {
        let stream = self.video_stream()?;
        [&stream.avg_frame_rate, &stream.r_frame_rate]
            .into_iter()
            .flatten()
            .find_map(|rate| parse_rate(rate))
    }

    /// Total frames of the first video stream.
    ///
    /// Uses the container's `nb_frames` when present, otherwise estimates it
    /// from duration and frame rate. Zero when neither is known.
    pub fn frame_count(&self) -> u64 {
        let Some(stream) = self.video_stream() else {
            return 0;
        };

        if let Some(n) = stream
            .nb_frames
            .as_deref()
            .and_then(|n| n.parse::<u64>().ok())
            .filter(|n| *n > 0)
        {
            return n;
        }

        let duration = stream
            .duration
            .as_deref()
            .or(self.format.duration.as_deref())
            .and_then(|d| d.parse::<f64>().ok());

        match (duration, self.frame_rate()) {
            (Some(d), Some(fps)) if d > 0.0 => (d * fps).floor() as u64,
            _ => 0,
        }
    }
}

/// Parse an ffprobe rational such as `30000/1001`
fn parse_rate(rate: &str) -> Option<f64> {
    let (num, den) = rate.split_once('/')?;
    let num: f64 = num.parse().ok()?;
    let den: f64 = den.parse().ok()?;
    if num <= 0.0 || den <= 0.0 {
        return None;
    }
    Some(num / den)
}
