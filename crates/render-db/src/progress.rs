//! `ProgressSink` implementation backed by the render jobs table.

use std::sync::Arc;

use render_models::{ProgressSink, ProgressUpdate};
use tracing::debug;

use crate::queue::RenderQueue;

/// Persists progress updates to the `renders` row so polling clients observe them.
pub struct PostgresProgressSink {
    queue: Arc<RenderQueue>,
}

impl PostgresProgressSink {
    pub fn new(queue: Arc<RenderQueue>) -> Self {
        Self { queue }
    }
}

#[async_trait::async_trait]
impl ProgressSink for PostgresProgressSink {
    async fn report(&self, update: ProgressUpdate) {
        if let Err(e) = self
            .queue
            .progress(update.render_id, update.stage, update.percent, None)
            .await
        {
            debug!(render_id = %update.render_id, error = %e, "failed to persist progress update");
        }
    }
}
