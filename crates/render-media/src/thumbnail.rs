//! Thumbnail extraction (§4.C Thumbnail: "extract one frame at t=3s, scale to
//! 1280x720, high-quality JPEG").

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::MediaResult;

const THUMBNAIL_TIMESTAMP_SEC: f64 = 3.0;
const THUMBNAIL_WIDTH: u32 = 1280;
const THUMBNAIL_HEIGHT: u32 = 720;
/// Low qscale values mean higher JPEG quality in ffmpeg's mjpeg encoder.
const THUMBNAIL_QUALITY: u8 = 2;

pub async fn generate_thumbnail(video_path: &str, output_path: &str) -> MediaResult<()> {
    let cmd = FfmpegCommand::new(video_path, output_path)
        .seek(THUMBNAIL_TIMESTAMP_SEC)
        .single_frame()
        .video_filter(format!(
            "scale={THUMBNAIL_WIDTH}:{THUMBNAIL_HEIGHT}:force_original_aspect_ratio=decrease,pad={THUMBNAIL_WIDTH}:{THUMBNAIL_HEIGHT}:(ow-iw)/2:(oh-ih)/2"
        ))
        .quality(THUMBNAIL_QUALITY)
        .log_level("error");

    FfmpegRunner::new().with_timeout(30).run(&cmd).await
}
