//! Postgres-backed render job queue: claim protocol, progress persistence
//! and the rescue sweep (§4.A).

pub mod config;
pub mod error;
pub mod progress;
pub mod queue;
pub mod rows;

pub use config::QueueConfig;
pub use error::{QueueError, QueueResult};
pub use progress::PostgresProgressSink;
pub use queue::{ClaimedJob, RenderQueue, TerminalState};
