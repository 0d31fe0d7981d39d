//! The Render aggregate: one execution instance of a campaign for one lead row (§3 Render).

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::ids::{CampaignId, PublicId, RenderId};

/// Lifecycle of a single render, driven by the pipeline orchestrator (§4.G).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RenderStatus {
    Queued,
    Recording,
    Normalizing,
    Concatenating,
    Overlaying,
    Uploading,
    Completed,
    Failed,
    Cancelled,
}

impl RenderStatus {
    /// Expected progress percentage for entering this state (§4.G state table).
    pub fn entry_progress_pct(self) -> u8 {
        match self {
            RenderStatus::Queued => 0,
            RenderStatus::Recording => 10,
            RenderStatus::Normalizing => 50,
            RenderStatus::Concatenating => 60,
            RenderStatus::Overlaying => 80,
            RenderStatus::Uploading => 90,
            RenderStatus::Completed => 100,
            // Terminal sinks keep whatever progress was last reported.
            RenderStatus::Failed | RenderStatus::Cancelled => 0,
        }
    }

    /// True once a render cannot transition any further (I7).
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RenderStatus::Completed | RenderStatus::Failed | RenderStatus::Cancelled
        )
    }

    /// Whether `self -> next` is a legal pipeline transition (§4.G state machine).
    pub fn can_transition_to(self, next: RenderStatus) -> bool {
        use RenderStatus::*;
        if self.is_terminal() {
            return false;
        }
        match (self, next) {
            (_, Cancelled) => true,
            (_, Failed) => true,
            (Queued, Recording) => true,
            (Recording, Normalizing) => true,
            (Normalizing, Concatenating) => true,
            (Concatenating, Overlaying) => true,
            (Overlaying, Uploading) => true,
            (Uploading, Completed) => true,
            _ => false,
        }
    }
}

/// One execution instance of a campaign for one lead row (§3 Render, §6 schema).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Render {
    pub id: RenderId,
    /// Short shareable public id (~21 char, collision-resistant); stable, used in viewer URLs.
    pub public_id: PublicId,
    pub campaign_id: CampaignId,
    /// Blob URL of the lead CSV, if this render was driven by a CSV row.
    pub lead_csv_url: Option<String>,
    /// Zero-based index into the CSV identified by `lead_csv_url`.
    pub lead_row_index: Option<i64>,
    /// Derived display identifier (§4.G step 1: first csv-scene column, trimmed, else "Lead N").
    pub lead_identifier: Option<String>,
    pub facecam_url: Option<String>,
    pub status: RenderStatus,
    /// 0-100, monotonically non-decreasing while not terminal (P2).
    pub progress: u8,
    pub error_message: Option<String>,
    pub video_url: Option<String>,
    pub thumbnail_url: Option<String>,
    /// Total scene duration in whole seconds, copied from the campaign at creation.
    pub duration_sec: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Render {
    pub fn new(campaign_id: CampaignId, duration_sec: u32) -> Self {
        let now = Utc::now();
        Self {
            id: RenderId::new(),
            public_id: PublicId::generate(),
            campaign_id,
            lead_csv_url: None,
            lead_row_index: None,
            lead_identifier: None,
            facecam_url: None,
            status: RenderStatus::Queued,
            progress: 0,
            error_message: None,
            video_url: None,
            thumbnail_url: None,
            duration_sec,
            created_at: now,
            updated_at: now,
            completed_at: None,
            cancelled_at: None,
        }
    }

    /// The object key a render's video must be uploaded to (§4.B, §6): `renders/<public_id>.mp4`.
    pub fn video_key(&self) -> String {
        format!("renders/{}.mp4", self.public_id)
    }

    /// The object key a render's thumbnail must be uploaded to: `renders/<public_id>.jpg`.
    pub fn thumbnail_key(&self) -> String {
        format!("renders/{}.jpg", self.public_id)
    }

    /// Default `leadIdentifier` when no CSV column value is available (§4.G step 1).
    pub fn default_lead_identifier(row_index: i64) -> String {
        format!("Lead {}", row_index + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states_reject_every_transition() {
        for terminal in [
            RenderStatus::Completed,
            RenderStatus::Failed,
            RenderStatus::Cancelled,
        ] {
            assert!(!terminal.can_transition_to(RenderStatus::Recording));
        }
    }

    #[test]
    fn happy_path_is_linear() {
        let path = [
            RenderStatus::Queued,
            RenderStatus::Recording,
            RenderStatus::Normalizing,
            RenderStatus::Concatenating,
            RenderStatus::Overlaying,
            RenderStatus::Uploading,
            RenderStatus::Completed,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]));
        }
    }

    #[test]
    fn entry_progress_matches_the_state_table() {
        assert_eq!(RenderStatus::Recording.entry_progress_pct(), 10);
        assert_eq!(RenderStatus::Normalizing.entry_progress_pct(), 50);
        assert_eq!(RenderStatus::Concatenating.entry_progress_pct(), 60);
        assert_eq!(RenderStatus::Overlaying.entry_progress_pct(), 80);
        assert_eq!(RenderStatus::Uploading.entry_progress_pct(), 90);
        assert_eq!(RenderStatus::Completed.entry_progress_pct(), 100);
    }

    #[test]
    fn object_keys_follow_the_contract() {
        let r = Render::new(CampaignId::new(), 120);
        assert_eq!(r.video_key(), format!("renders/{}.mp4", r.public_id));
        assert_eq!(r.thumbnail_key(), format!("renders/{}.jpg", r.public_id));
    }

    #[test]
    fn default_lead_identifier_is_one_based() {
        assert_eq!(Render::default_lead_identifier(0), "Lead 1");
        assert_eq!(Render::default_lead_identifier(4), "Lead 5");
    }
}
