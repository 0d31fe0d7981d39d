//! Campaign definitions: the immutable, user-owned input to a render.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::ids::CampaignId;

/// Maximum total scene duration across a campaign, in seconds (§3 Scene descriptor).
pub const MAX_TOTAL_DURATION_SECS: u32 = 300;

/// Minimum/maximum duration of a single scene, in seconds.
pub const MIN_SCENE_DURATION_SECS: u32 = 1;
pub const MAX_SCENE_DURATION_SECS: u32 = 300;

/// Where a scene's URL comes from (§9 "dynamically-typed scene descriptors -> tagged variant").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SceneSource {
    /// A literal URL baked into the campaign.
    Manual { url: String },
    /// A column name to look up in the lead's CSV row at render time.
    Csv { column: String },
}

/// An explicit, authored interaction step within a scene (§4.F). When a scene
/// carries one or more of these, the recorder executes them in order instead
/// of handing the page to the human-motion engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SceneAction {
    /// Navigate to a URL within the already-open page.
    GoTo { url: String },
    /// Do nothing for the given number of milliseconds.
    Wait { ms: u64 },
    /// Click the first element whose visible text matches.
    ClickText { text: String },
    /// Briefly highlight (select) the first matching text.
    Highlight { text: String },
    /// Scroll the page by the given pixel delta.
    Scroll { delta_px: i32 },
}

/// One URL-and-duration segment of a campaign (§3 Scene descriptor).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SceneDescriptor {
    /// Zero-based order index, unique and dense within the campaign (I5).
    pub order_index: u32,
    pub source: SceneSource,
    /// Whole seconds, [MIN_SCENE_DURATION_SECS, MAX_SCENE_DURATION_SECS].
    pub duration_secs: u32,
    /// Authored interaction steps. `None`/empty hands the scene to the human
    /// motion engine for the full duration instead (§4.F).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actions: Option<Vec<SceneAction>>,
}

impl SceneDescriptor {
    pub fn is_duration_valid(&self) -> bool {
        (MIN_SCENE_DURATION_SECS..=MAX_SCENE_DURATION_SECS).contains(&self.duration_secs)
    }
}

/// Which screen corner the facecam picture-in-picture sits in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "kebab-case")]
pub enum PipCorner {
    TopLeft,
    TopRight,
    #[default]
    BottomRight,
    BottomLeft,
}

/// Facecam picture-in-picture placement (§4.I defaults).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PipSettings {
    pub width: u32,
    pub margin: u32,
    pub corner: PipCorner,
}

impl Default for PipSettings {
    fn default() -> Self {
        Self {
            width: 320,
            margin: 24,
            corner: PipCorner::BottomRight,
        }
    }
}

/// How the background video should behave once its own content runs out (§4.I).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum EndPadMode {
    #[default]
    Freeze,
}

/// Per-campaign render output parameters, merged by the config loader (§4.I).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct OutputSettings {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub page_load_wait_ms: u32,
    pub pip: PipSettings,
    pub end_pad_mode: EndPadMode,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            fps: 60,
            page_load_wait_ms: 3000,
            pip: PipSettings::default(),
            end_pad_mode: EndPadMode::Freeze,
        }
    }
}

/// Immutable, user-owned campaign definition (§3 Campaign).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Campaign {
    pub id: CampaignId,
    pub user_id: String,
    pub name: String,
    pub scenes: Vec<SceneDescriptor>,
    pub output_settings: OutputSettings,
    pub created_at: DateTime<Utc>,
}

/// Why a campaign failed structural validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CampaignValidationError {
    #[error("scene order indices must be dense and zero-based")]
    NonDenseOrder,
    #[error("scene {index} has out-of-range duration {secs}s")]
    SceneDurationOutOfRange { index: u32, secs: u32 },
    #[error("total scene duration {total}s exceeds the {max}s budget")]
    TotalDurationExceeded { total: u32, max: u32 },
}

impl Campaign {
    /// Scenes in `order_index` ascending order (I5).
    pub fn ordered_scenes(&self) -> Vec<&SceneDescriptor> {
        let mut scenes: Vec<&SceneDescriptor> = self.scenes.iter().collect();
        scenes.sort_by_key(|s| s.order_index);
        scenes
    }

    /// Sum of every scene's duration, in seconds.
    pub fn total_duration_secs(&self) -> u32 {
        self.scenes.iter().map(|s| s.duration_secs).sum()
    }

    /// Structural validation independent of any facecam (duration-vs-facecam is checked
    /// by the orchestrator once the facecam has been probed, §4.G step 2).
    pub fn validate(&self) -> Result<(), CampaignValidationError> {
        let mut indices: Vec<u32> = self.scenes.iter().map(|s| s.order_index).collect();
        indices.sort_unstable();
        let dense = indices.iter().enumerate().all(|(i, &idx)| i as u32 == idx);
        if !dense {
            return Err(CampaignValidationError::NonDenseOrder);
        }

        for scene in &self.scenes {
            if !scene.is_duration_valid() {
                return Err(CampaignValidationError::SceneDurationOutOfRange {
                    index: scene.order_index,
                    secs: scene.duration_secs,
                });
            }
        }

        let total = self.total_duration_secs();
        if total > MAX_TOTAL_DURATION_SECS {
            return Err(CampaignValidationError::TotalDurationExceeded {
                total,
                max: MAX_TOTAL_DURATION_SECS,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene(idx: u32, secs: u32) -> SceneDescriptor {
        SceneDescriptor {
            order_index: idx,
            source: SceneSource::Manual {
                url: "https://example.com".to_string(),
            },
            duration_secs: secs,
            actions: None,
        }
    }

    #[test]
    fn rejects_non_dense_order() {
        let c = Campaign {
            id: CampaignId::new(),
            user_id: "u1".into(),
            name: "c".into(),
            scenes: vec![scene(0, 30), scene(2, 30)],
            output_settings: OutputSettings::default(),
            created_at: Utc::now(),
        };
        assert_eq!(c.validate(), Err(CampaignValidationError::NonDenseOrder));
    }

    #[test]
    fn accepts_exactly_300_seconds() {
        let c = Campaign {
            id: CampaignId::new(),
            user_id: "u1".into(),
            name: "c".into(),
            scenes: vec![scene(0, 150), scene(1, 150)],
            output_settings: OutputSettings::default(),
            created_at: Utc::now(),
        };
        assert!(c.validate().is_ok());
    }

    #[test]
    fn rejects_301_seconds() {
        let c = Campaign {
            id: CampaignId::new(),
            user_id: "u1".into(),
            name: "c".into(),
            scenes: vec![scene(0, 151), scene(1, 150)],
            output_settings: OutputSettings::default(),
            created_at: Utc::now(),
        };
        assert!(matches!(
            c.validate(),
            Err(CampaignValidationError::TotalDurationExceeded { total: 301, .. })
        ));
    }
}
