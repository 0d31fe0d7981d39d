//! Process-wide worker tuning knobs, as opposed to per-campaign `OutputSettings`.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The one worker-wide knob that lives in `system_settings` rather than process
/// env (§4.H step 2: "refresh max_concurrent_jobs from the settings table").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct WorkerSystemSettings {
    pub max_concurrent_jobs: u32,
}

impl Default for WorkerSystemSettings {
    fn default() -> Self {
        Self { max_concurrent_jobs: 4 }
    }
}
