//! Scene normalization: force a raw scene recording onto the campaign's exact
//! frame grid (§4.C Normalize scene).

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::MediaResult;

/// Parameters every normalized scene file must match exactly, so concat (§4.C) can
/// stream-copy them together without a re-encode.
#[derive(Debug, Clone, Copy)]
pub struct NormalizeParams {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub duration_sec: u32,
    /// Leading offset to skip (white-leader trim, §4.F), in seconds.
    pub leader_offset_sec: f64,
}

impl NormalizeParams {
    /// Exact output frame count the encode must hit (§4.C: `durationSec × fps`).
    pub fn frame_count(&self) -> u64 {
        (self.duration_sec as f64 * self.fps).round() as u64
    }
}

/// Normalize a raw scene recording to `output_path`, forced to `params`' frame grid,
/// square pixels, a broadly-compatible pixel format, video-only, single-pass (§4.C).
pub async fn normalize_scene(
    input_path: &str,
    output_path: &str,
    params: NormalizeParams,
) -> MediaResult<()> {
    let scale_filter = format!(
        "scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2,setsar=1",
        w = params.width,
        h = params.height,
    );

    let cmd = FfmpegCommand::new(input_path, output_path)
        .seek(params.leader_offset_sec)
        .video_filter(scale_filter)
        .fps(params.fps)
        .pixel_format("yuv420p")
        .frame_count(params.frame_count())
        .no_audio()
        .video_codec("libx264")
        .preset("veryfast")
        .crf(20);

    FfmpegRunner::new().with_timeout(300).run(&cmd).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_count_matches_duration_times_fps() {
        let params = NormalizeParams {
            width: 1920,
            height: 1080,
            fps: 60.0,
            duration_sec: 8,
            leader_offset_sec: 4.5,
        };
        assert_eq!(params.frame_count(), 480);
    }
}
