//! `sqlx::FromRow` row shapes and conversions into `render-models` domain types.

use chrono::{DateTime, Utc};
use render_models::{
    Campaign, CampaignId, JobState, OutputSettings, PublicId, Render, RenderId, RenderJob,
    RenderJobId, RenderStatus, SceneDescriptor,
};
use uuid::Uuid;

use crate::error::{QueueError, QueueResult};

#[derive(Debug, sqlx::FromRow)]
pub struct CampaignRow {
    pub id: Uuid,
    pub user_id: String,
    pub name: String,
    pub scenes: serde_json::Value,
    pub output_settings: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<CampaignRow> for Campaign {
    type Error = QueueError;

    fn try_from(row: CampaignRow) -> Result<Self, Self::Error> {
        let scenes: Vec<SceneDescriptor> = serde_json::from_value(row.scenes)?;
        let output_settings: OutputSettings = serde_json::from_value(row.output_settings)?;
        Ok(Campaign {
            id: CampaignId::from_uuid(row.id),
            user_id: row.user_id,
            name: row.name,
            scenes,
            output_settings,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct RenderRow {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub lead_csv_url: Option<String>,
    pub lead_row_index: Option<i64>,
    pub lead_identifier: Option<String>,
    pub facecam_url: Option<String>,
    pub video_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub status: String,
    pub progress: i16,
    pub error_message: Option<String>,
    pub public_id: String,
    pub duration_sec: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

pub fn parse_status(s: &str) -> QueueResult<RenderStatus> {
    Ok(match s {
        "queued" => RenderStatus::Queued,
        "recording" => RenderStatus::Recording,
        "normalizing" => RenderStatus::Normalizing,
        "concatenating" => RenderStatus::Concatenating,
        "overlaying" => RenderStatus::Overlaying,
        "uploading" => RenderStatus::Uploading,
        "completed" => RenderStatus::Completed,
        "failed" => RenderStatus::Failed,
        "cancelled" => RenderStatus::Cancelled,
        other => return Err(QueueError::Serialization(format!("unknown render status: {other}"))),
    })
}

pub fn status_str(status: RenderStatus) -> &'static str {
    match status {
        RenderStatus::Queued => "queued",
        RenderStatus::Recording => "recording",
        RenderStatus::Normalizing => "normalizing",
        RenderStatus::Concatenating => "concatenating",
        RenderStatus::Overlaying => "overlaying",
        RenderStatus::Uploading => "uploading",
        RenderStatus::Completed => "completed",
        RenderStatus::Failed => "failed",
        RenderStatus::Cancelled => "cancelled",
    }
}

impl TryFrom<RenderRow> for Render {
    type Error = QueueError;

    fn try_from(row: RenderRow) -> Result<Self, Self::Error> {
        Ok(Render {
            id: RenderId::from_uuid(row.id),
            public_id: PublicId::from(row.public_id),
            campaign_id: CampaignId::from_uuid(row.campaign_id),
            lead_csv_url: row.lead_csv_url,
            lead_row_index: row.lead_row_index,
            lead_identifier: row.lead_identifier,
            facecam_url: row.facecam_url,
            status: parse_status(&row.status)?,
            progress: row.progress.clamp(0, 100) as u8,
            error_message: row.error_message,
            video_url: row.video_url,
            thumbnail_url: row.thumbnail_url,
            duration_sec: row.duration_sec.max(0) as u32,
            created_at: row.created_at,
            updated_at: row.updated_at,
            completed_at: row.completed_at,
            cancelled_at: row.cancelled_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct RenderJobRow {
    pub id: Uuid,
    pub render_id: Uuid,
    pub state: String,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

pub fn parse_job_state(s: &str) -> QueueResult<JobState> {
    Ok(match s {
        "queued" => JobState::Queued,
        "processing" => JobState::Processing,
        "completed" => JobState::Completed,
        "failed" => JobState::Failed,
        "cancelled" => JobState::Cancelled,
        other => return Err(QueueError::Serialization(format!("unknown job state: {other}"))),
    })
}

pub fn job_state_str(state: JobState) -> &'static str {
    match state {
        JobState::Queued => "queued",
        JobState::Processing => "processing",
        JobState::Completed => "completed",
        JobState::Failed => "failed",
        JobState::Cancelled => "cancelled",
    }
}

impl TryFrom<RenderJobRow> for RenderJob {
    type Error = QueueError;

    fn try_from(row: RenderJobRow) -> Result<Self, Self::Error> {
        Ok(RenderJob {
            id: RenderJobId::from_uuid(row.id),
            render_id: RenderId::from_uuid(row.render_id),
            state: parse_job_state(&row.state)?,
            error_message: row.error_message,
            created_at: row.created_at,
            updated_at: row.updated_at,
            started_at: row.started_at,
            completed_at: row.completed_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_status_round_trips_through_its_string_form() {
        for status in [
            RenderStatus::Queued,
            RenderStatus::Recording,
            RenderStatus::Normalizing,
            RenderStatus::Concatenating,
            RenderStatus::Overlaying,
            RenderStatus::Uploading,
            RenderStatus::Completed,
            RenderStatus::Failed,
            RenderStatus::Cancelled,
        ] {
            assert_eq!(parse_status(status_str(status)).unwrap(), status);
        }
    }

    #[test]
    fn job_state_round_trips_through_its_string_form() {
        for state in [
            JobState::Queued,
            JobState::Processing,
            JobState::Completed,
            JobState::Failed,
            JobState::Cancelled,
        ] {
            assert_eq!(parse_job_state(job_state_str(state)).unwrap(), state);
        }
    }

    #[test]
    fn unknown_status_string_is_rejected() {
        assert!(parse_status("boiling").is_err());
    }
}
