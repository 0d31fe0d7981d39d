//! Structured per-render logging, adapted from the teacher's `JobLogger`
//! (consistent tracing fields across a job's lifecycle) to carry both a
//! render id and its job id through the pipeline (§4.G, §4.A: one job per render).

use render_models::{RenderId, RenderJobId};
use tracing::{error, info, warn, Span};

/// Attaches `render_id`/`job_id` to every log line a pipeline run emits.
#[derive(Debug, Clone)]
pub struct RenderLogger {
    render_id: String,
    job_id: String,
}

impl RenderLogger {
    pub fn new(render_id: RenderId, job_id: RenderJobId) -> Self {
        Self {
            render_id: render_id.to_string(),
            job_id: job_id.to_string(),
        }
    }

    pub fn log_stage(&self, stage: &str) {
        info!(render_id = %self.render_id, job_id = %self.job_id, stage, "render entered stage");
    }

    pub fn log_warning(&self, message: &str) {
        warn!(render_id = %self.render_id, job_id = %self.job_id, "{}", message);
    }

    pub fn log_error(&self, message: &str) {
        error!(render_id = %self.render_id, job_id = %self.job_id, "{}", message);
    }

    pub fn log_completion(&self) {
        info!(render_id = %self.render_id, job_id = %self.job_id, "render completed");
    }

    pub fn render_id(&self) -> &str {
        &self.render_id
    }

    /// A span for wrapping the whole pipeline run so every nested log line
    /// (ffmpeg, browser driver, HME) inherits the render/job context.
    pub fn create_span(&self) -> Span {
        tracing::info_span!("render", render_id = %self.render_id, job_id = %self.job_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn carries_both_ids() {
        let logger = RenderLogger::new(RenderId::new(), RenderJobId::new());
        assert!(!logger.render_id().is_empty());
    }
}
