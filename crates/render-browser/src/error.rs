//! Browser driver error types.

use thiserror::Error;

pub type BrowserResult<T> = Result<T, BrowserError>;

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("failed to launch browser: {0}")]
    LaunchFailed(String),

    #[error("failed to connect to remote browser: {0}")]
    RemoteConnectFailed(String),

    #[error("navigation failed: {0}")]
    NavigationFailed(String),

    #[error("page timed out waiting for readiness")]
    ReadyTimeout,

    #[error("recording failed: {0}")]
    RecordingFailed(String),

    #[error("recorded video file is empty or missing: {0}")]
    EmptyRecording(String),

    #[error("session is dead after repeated page-creation failures")]
    SessionDead,

    #[error("CDP protocol error: {0}")]
    Cdp(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
