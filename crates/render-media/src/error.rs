//! Media tool error types (§4.C: "all operations fail with a descriptive error
//! including the tool's stderr tail").

use thiserror::Error;

pub type MediaResult<T> = Result<T, MediaError>;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("ffmpeg binary not found on PATH")]
    FfmpegNotFound,

    #[error("ffprobe binary not found on PATH")]
    FfprobeNotFound,

    #[error("ffmpeg failed: {message} (stderr: {stderr})")]
    FfmpegFailed { message: String, stderr: String },

    #[error("ffprobe failed: {message} (stderr: {stderr})")]
    FfprobeFailed { message: String, stderr: String },

    #[error("invalid probe output: {0}")]
    InvalidProbe(String),

    #[error("ffmpeg timed out after {0}s")]
    Timeout(u64),

    #[error("recording/scene file not found: {0}")]
    FileNotFound(std::path::PathBuf),

    #[error("recorded file is empty: {0}")]
    EmptyFile(std::path::PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid JSON from ffprobe: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl MediaError {
    pub fn ffmpeg_failed(message: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr: stderr_tail(stderr.into()),
        }
    }

    pub fn ffprobe_failed(message: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self::FfprobeFailed {
            message: message.into(),
            stderr: stderr_tail(stderr.into()),
        }
    }
}

/// Keep only the last few lines of stderr so error messages stay readable.
fn stderr_tail(stderr: String) -> String {
    const MAX_LINES: usize = 20;
    let lines: Vec<&str> = stderr.lines().collect();
    if lines.len() <= MAX_LINES {
        stderr
    } else {
        lines[lines.len() - MAX_LINES..].join("\n")
    }
}
