//! Worker and pipeline error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("queue error: {0}")]
    Queue(#[from] render_db::QueueError),

    #[error("storage error: {0}")]
    Storage(#[from] render_storage::StorageError),

    #[error("media error: {0}")]
    Media(#[from] render_media::MediaError),

    #[error("browser error: {0}")]
    Browser(#[from] render_browser::BrowserError),

    #[error("input validation failed: {0}")]
    Validation(String),

    #[error("CSV column \"{column}\" is empty for lead row {row}")]
    EmptyLeadColumn { column: String, row: i64 },

    #[error("total scene duration {total}s must equal facecam duration {facecam}s")]
    DurationMismatch { total: u32, facecam: u32 },

    #[error("total scene duration {total}s exceeds the {max}s cap")]
    DurationTooLong { total: u32, max: u32 },

    #[error("scene recording failed after retries: {0}")]
    SceneRecordingFailed(String),

    #[error("render was cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}
