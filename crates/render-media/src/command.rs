//! FFmpeg command builder and subprocess runner (§4.C).

use std::path::PathBuf;
use std::process::Stdio;

use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};

/// A builder for `ffmpeg` invocations. Mirrors the handful of flags the five
/// required operations (§4.C) actually need; it is not a general-purpose wrapper.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    inputs: Vec<String>,
    input_args: Vec<String>,
    output: String,
    output_args: Vec<String>,
    overwrite: bool,
    log_level: String,
}

impl FfmpegCommand {
    pub fn new(input: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            inputs: vec![input.into()],
            input_args: Vec::new(),
            output: output.into(),
            output_args: Vec::new(),
            overwrite: true,
            log_level: "error".to_string(),
        }
    }

    /// Start a command with no primary input, for pure filter-complex/concat pipelines
    /// that supply their own `-i` flags via `input_arg`.
    pub fn without_input(output: impl Into<String>) -> Self {
        Self {
            inputs: Vec::new(),
            input_args: Vec::new(),
            output: output.into(),
            output_args: Vec::new(),
            overwrite: true,
            log_level: "error".to_string(),
        }
    }

    pub fn add_input(mut self, input: impl Into<String>) -> Self {
        self.inputs.push(input.into());
        self
    }

    pub fn input_arg(mut self, arg: impl Into<String>) -> Self {
        self.input_args.push(arg.into());
        self
    }

    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    pub fn seek(mut self, seconds: f64) -> Self {
        self.input_args.push("-ss".to_string());
        self.input_args.push(format!("{seconds:.3}"));
        self
    }

    pub fn duration(mut self, seconds: f64) -> Self {
        self.output_args.push("-t".to_string());
        self.output_args.push(format!("{seconds:.3}"));
        self
    }

    pub fn frame_count(mut self, frames: u64) -> Self {
        self.output_args.push("-frames:v".to_string());
        self.output_args.push(frames.to_string());
        self
    }

    pub fn video_filter(mut self, filter: impl Into<String>) -> Self {
        self.output_args.push("-vf".to_string());
        self.output_args.push(filter.into());
        self
    }

    pub fn filter_complex(mut self, filter: impl Into<String>) -> Self {
        self.output_args.push("-filter_complex".to_string());
        self.output_args.push(filter.into());
        self
    }

    pub fn map(mut self, spec: impl Into<String>) -> Self {
        self.output_args.push("-map".to_string());
        self.output_args.push(spec.into());
        self
    }

    pub fn video_codec(mut self, codec: impl Into<String>) -> Self {
        self.output_args.push("-c:v".to_string());
        self.output_args.push(codec.into());
        self
    }

    pub fn audio_codec(mut self, codec: impl Into<String>) -> Self {
        self.output_args.push("-c:a".to_string());
        self.output_args.push(codec.into());
        self
    }

    pub fn stream_copy(self) -> Self {
        self.video_codec("copy").audio_codec("copy")
    }

    pub fn no_audio(mut self) -> Self {
        self.output_args.push("-an".to_string());
        self
    }

    pub fn fps(mut self, fps: f64) -> Self {
        self.output_args.push("-r".to_string());
        self.output_args.push(format!("{fps:.3}"));
        self
    }

    pub fn pixel_format(mut self, format: impl Into<String>) -> Self {
        self.output_args.push("-pix_fmt".to_string());
        self.output_args.push(format.into());
        self
    }

    pub fn crf(mut self, value: u8) -> Self {
        self.output_args.push("-crf".to_string());
        self.output_args.push(value.to_string());
        self
    }

    pub fn preset(mut self, preset: impl Into<String>) -> Self {
        self.output_args.push("-preset".to_string());
        self.output_args.push(preset.into());
        self
    }

    pub fn single_frame(mut self) -> Self {
        self.output_args.push("-frames:v".to_string());
        self.output_args.push("1".to_string());
        self
    }

    pub fn quality(mut self, qscale: u8) -> Self {
        self.output_args.push("-qscale:v".to_string());
        self.output_args.push(qscale.to_string());
        self
    }

    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    pub fn build_args(&self) -> Vec<String> {
        let mut args = vec!["-y".to_string(), "-v".to_string(), self.log_level.clone()];
        if !self.overwrite {
            args.retain(|a| a != "-y");
        }
        args.extend(self.input_args.clone());
        for input in &self.inputs {
            args.push("-i".to_string());
            args.push(input.clone());
        }
        args.extend(self.output_args.clone());
        args.push(self.output.clone());
        args
    }
}

/// Runs an [`FfmpegCommand`] as a subprocess, with an optional timeout.
#[derive(Debug, Default, Clone)]
pub struct FfmpegRunner {
    timeout_secs: Option<u64>,
}

impl FfmpegRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = Some(timeout_secs);
        self
    }

    pub async fn run(&self, cmd: &FfmpegCommand) -> MediaResult<()> {
        which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)?;

        let args = cmd.build_args();
        debug!("running ffmpeg {}", args.join(" "));

        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()?;

        let mut stderr_buf = String::new();
        if let Some(mut stderr) = child.stderr.take() {
            stderr.read_to_string(&mut stderr_buf).await.ok();
        }

        let status = if let Some(timeout_secs) = self.timeout_secs {
            match tokio::time::timeout(
                std::time::Duration::from_secs(timeout_secs),
                child.wait(),
            )
            .await
            {
                Ok(status) => status?,
                Err(_) => {
                    warn!(timeout_secs, "ffmpeg timed out, killing process");
                    let _ = child.kill().await;
                    return Err(MediaError::Timeout(timeout_secs));
                }
            }
        } else {
            child.wait().await?
        };

        if status.success() {
            Ok(())
        } else {
            Err(MediaError::ffmpeg_failed(
                format!("ffmpeg exited with status {status}"),
                stderr_buf,
            ))
        }
    }
}

pub fn check_ffmpeg() -> MediaResult<PathBuf> {
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)
}

pub fn check_ffprobe() -> MediaResult<PathBuf> {
    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_normalize_style_args() {
        let cmd = FfmpegCommand::new("scene.webm", "scene.mp4")
            .seek(4.5)
            .frame_count(300)
            .fps(60.0)
            .video_filter("scale=1920:1080:force_original_aspect_ratio=decrease,pad=1920:1080")
            .pixel_format("yuv420p")
            .no_audio()
            .video_codec("libx264")
            .preset("veryfast")
            .crf(20);

        let args = cmd.build_args();
        assert!(args.contains(&"-ss".to_string()));
        assert!(args.contains(&"4.500".to_string()));
        assert!(args.contains(&"-frames:v".to_string()));
        assert!(args.contains(&"300".to_string()));
        assert!(args.contains(&"-an".to_string()));
        assert_eq!(args.last(), Some(&"scene.mp4".to_string()));
    }

    #[test]
    fn builds_stream_copy_concat_args() {
        let cmd = FfmpegCommand::new("concat:a.mp4|b.mp4", "background.mp4").stream_copy();
        let args = cmd.build_args();
        assert!(args.contains(&"-c:v".to_string()));
        assert!(args.contains(&"copy".to_string()));
    }
}
