//! Shared domain types for the rendering worker: campaigns, renders, jobs,
//! ids and the progress-reporting abstraction they all speak through.

pub mod campaign;
pub mod ids;
pub mod progress;
pub mod render;
pub mod render_job;
pub mod settings;

pub use campaign::{
    Campaign, CampaignValidationError, EndPadMode, OutputSettings, PipCorner, PipSettings,
    SceneAction, SceneDescriptor, SceneSource,
};
pub use ids::{CampaignId, PublicId, RenderId, RenderJobId};
pub use progress::{NullProgressSink, ProgressSink, ProgressUpdate};
pub use render::{Render, RenderStatus};
pub use render_job::{JobState, RenderJob};
pub use settings::WorkerSystemSettings;
