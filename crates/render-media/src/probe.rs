//! `ffprobe`-backed media inspection (§4.C Probe).

use serde::Deserialize;
use tokio::process::Command;
use tracing::debug;

use crate::error::{MediaError, MediaResult};

/// The subset of a media file's properties the pipeline needs (§4.C).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub duration_sec: f64,
    pub audio_channels: u32,
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: String,
    width: Option<u32>,
    height: Option<u32>,
    avg_frame_rate: Option<String>,
    channels: Option<u32>,
}

/// Probe a media file via `ffprobe -print_format json -show_format -show_streams`.
pub async fn probe_video(path: &str) -> MediaResult<VideoInfo> {
    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)?;

    debug!(path, "probing media file");

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
            path,
        ])
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::ffprobe_failed(
            format!("ffprobe exited with status {}", output.status),
            String::from_utf8_lossy(&output.stderr).to_string(),
        ));
    }

    let parsed: FfprobeOutput = serde_json::from_slice(&output.stdout)?;

    let video_stream = parsed
        .streams
        .iter()
        .find(|s| s.codec_type == "video")
        .ok_or_else(|| MediaError::InvalidProbe("no video stream found".to_string()))?;

    let width = video_stream
        .width
        .ok_or_else(|| MediaError::InvalidProbe("video stream missing width".to_string()))?;
    let height = video_stream
        .height
        .ok_or_else(|| MediaError::InvalidProbe("video stream missing height".to_string()))?;
    let fps = video_stream
        .avg_frame_rate
        .as_deref()
        .map(parse_frame_rate)
        .unwrap_or(0.0);

    let duration_sec: f64 = parsed
        .format
        .duration
        .as_deref()
        .and_then(|d| d.parse().ok())
        .ok_or_else(|| MediaError::InvalidProbe("format missing duration".to_string()))?;

    let audio_channels = parsed
        .streams
        .iter()
        .find(|s| s.codec_type == "audio")
        .and_then(|s| s.channels)
        .unwrap_or(0);

    Ok(VideoInfo {
        width,
        height,
        fps,
        duration_sec,
        audio_channels,
    })
}

/// Parse ffprobe's `avg_frame_rate` string, which is either `"num/den"` or a plain float.
fn parse_frame_rate(raw: &str) -> f64 {
    if let Some((num, den)) = raw.split_once('/') {
        let num: f64 = num.parse().unwrap_or(0.0);
        let den: f64 = den.parse().unwrap_or(1.0);
        if den == 0.0 {
            0.0
        } else {
            num / den
        }
    } else {
        raw.parse().unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fractional_frame_rate() {
        assert!((parse_frame_rate("30000/1001") - 29.97).abs() < 0.01);
    }

    #[test]
    fn parses_plain_frame_rate() {
        assert!((parse_frame_rate("60") - 60.0).abs() < f64::EPSILON);
    }

    #[test]
    fn zero_denominator_is_zero_not_a_panic() {
        assert_eq!(parse_frame_rate("30/0"), 0.0);
    }
}
