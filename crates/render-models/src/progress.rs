//! The `ProgressSink` abstraction: how the pipeline orchestrator reports progress
//! without depending on any particular transport (§9 design note: callback -> trait).

use async_trait::async_trait;

use crate::ids::RenderId;
use crate::render::RenderStatus;

/// One step of pipeline progress, emitted by the orchestrator as it works through
/// a render (§4.G). Percent is always within the band owned by `stage` (§4.G table).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressUpdate {
    pub render_id: RenderId,
    pub stage: RenderStatus,
    /// 0-100, monotonically non-decreasing across an unbroken sequence of
    /// updates for the same `render_id` while the render has not reached a
    /// terminal status (P2).
    pub percent: u8,
}

/// Destination for pipeline progress events.
///
/// Implementations persist the update (so polling clients can observe it) and/or
/// forward it to a live subscriber. The orchestrator never talks to storage or a
/// pub/sub transport directly; it only calls `report`, so unit tests can swap in
/// an in-memory sink that records the call sequence for monotonicity assertions.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn report(&self, update: ProgressUpdate);
}

/// A sink that drops every update. Useful as a default for code paths (CLI
/// one-off renders, tests of unrelated concerns) that don't care about progress.
pub struct NullProgressSink;

#[async_trait]
impl ProgressSink for NullProgressSink {
    async fn report(&self, _update: ProgressUpdate) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct RecordingProgressSink {
        pub updates: Mutex<Vec<ProgressUpdate>>,
    }

    #[async_trait]
    impl ProgressSink for RecordingProgressSink {
        async fn report(&self, update: ProgressUpdate) {
            self.updates.lock().unwrap().push(update);
        }
    }

    #[tokio::test]
    async fn recording_sink_preserves_call_order() {
        let sink = RecordingProgressSink::default();
        let render_id = RenderId::new();
        for (stage, pct) in [
            (RenderStatus::Recording, 10),
            (RenderStatus::Normalizing, 40),
            (RenderStatus::Completed, 100),
        ] {
            sink.report(ProgressUpdate {
                render_id,
                stage,
                percent: pct,
            })
            .await;
        }
        let updates = sink.updates.lock().unwrap();
        let pcts: Vec<u8> = updates.iter().map(|u| u.percent).collect();
        assert_eq!(pcts, vec![10, 40, 100]);
        assert!(pcts.windows(2).all(|w| w[0] <= w[1]));
    }
}
