//! Facecam picture-in-picture overlay, mixing audio from both sources
//! (§4.C Overlay facecam).

use render_models::campaign::{PipCorner, PipSettings};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::MediaResult;

fn overlay_position(corner: PipCorner, margin: u32) -> String {
    match corner {
        PipCorner::TopLeft => format!("{margin}:{margin}"),
        PipCorner::TopRight => format!("main_w-overlay_w-{margin}:{margin}"),
        PipCorner::BottomLeft => format!("{margin}:main_h-overlay_h-{margin}"),
        PipCorner::BottomRight => {
            format!("main_w-overlay_w-{margin}:main_h-overlay_h-{margin}")
        }
    }
}

/// Composite `facecam_path` as a scaled PIP onto `background_path`, in a single
/// re-encode pass. `background_path` is a normalized scene concat and never
/// carries an audio stream (§4.C normalize strips audio), so the output audio
/// comes from the facecam alone; it's mixed against a generated silent track
/// rather than referenced directly so a facecam with no audio track still
/// produces a valid (silent) output instead of failing the filtergraph.
pub async fn overlay_facecam(
    background_path: &str,
    facecam_path: &str,
    output_path: &str,
    pip: &PipSettings,
) -> MediaResult<()> {
    let position = overlay_position(pip.corner, pip.margin);
    let filter = format!(
        "[1:v]scale={pip_w}:-2[pip];[0:v][pip]overlay={position}[vout];\
         anullsrc=channel_layout=stereo:sample_rate=48000[silence];\
         [silence][1:a]amix=inputs=2:duration=shortest:dropout_transition=0[aout]",
        pip_w = pip.width,
    );

    let cmd = FfmpegCommand::new(background_path, output_path)
        .add_input(facecam_path)
        .filter_complex(filter)
        .map("[vout]")
        .map("[aout]")
        .video_codec("libx264")
        .audio_codec("aac")
        .preset("veryfast")
        .crf(20);

    FfmpegRunner::new().with_timeout(600).run(&cmd).await
}

/// Promote a background render to the final artifact when no facecam is configured
/// (§4.G step 5: "If no facecam, `background.mp4` is promoted to `final.mp4`").
pub async fn promote_background(background_path: &str, output_path: &str) -> MediaResult<()> {
    tokio::fs::copy(background_path, output_path).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bottom_right_keeps_margin_from_both_edges() {
        let pos = overlay_position(PipCorner::BottomRight, 24);
        assert_eq!(pos, "main_w-overlay_w-24:main_h-overlay_h-24");
    }

    #[test]
    fn top_left_is_pinned_to_the_margin() {
        let pos = overlay_position(PipCorner::TopLeft, 24);
        assert_eq!(pos, "24:24");
    }
}
