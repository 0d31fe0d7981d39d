//! Queue-facing job wrapper around a `Render` (§4.A Job queue & claim protocol, §6 schema).

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::ids::{RenderId, RenderJobId};

/// State of a queued render job. Exactly one job exists per render (§6: `render_id unique`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Queued,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobState::Completed | JobState::Failed | JobState::Cancelled
        )
    }
}

/// A claimable unit of work over the render job queue (§4.A, §6).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RenderJob {
    pub id: RenderJobId,
    pub render_id: RenderId,
    pub state: JobState,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl RenderJob {
    pub fn new(render_id: RenderId) -> Self {
        let now = Utc::now();
        Self {
            id: RenderJobId::new(),
            render_id,
            state: JobState::Queued,
            error_message: None,
            created_at: now,
            updated_at: now,
            started_at: None,
            completed_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_job_is_queued_and_unstarted() {
        let job = RenderJob::new(RenderId::new());
        assert_eq!(job.state, JobState::Queued);
        assert!(job.started_at.is_none());
        assert!(!job.state.is_terminal());
    }

    #[test]
    fn terminal_states_are_recognised() {
        for state in [JobState::Completed, JobState::Failed, JobState::Cancelled] {
            assert!(state.is_terminal());
        }
        for state in [JobState::Queued, JobState::Processing] {
            assert!(!state.is_terminal());
        }
    }
}
