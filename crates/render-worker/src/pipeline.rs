//! Pipeline Orchestrator (§4.G): the state machine that turns one claimed
//! render job into an uploaded video, sequentially, with no concurrency inside
//! a single render beyond the facecam/CSV download overlap.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use render_browser::{BrowserDriverConfig, CampaignSession};
use render_db::{ClaimedJob, RenderQueue, TerminalState};
use render_models::campaign::OutputSettings;
use render_models::{ProgressSink, ProgressUpdate, Render, RenderStatus, SceneDescriptor, SceneSource};
use render_storage::{Artifact, BlobStore, LeadCsv, CSV_MAX_BYTES, FACECAM_MAX_BYTES};
use tracing::{info, warn};

use crate::cleanup::CleanupTracker;
use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::recorder;
use crate::scene_cache::SceneCache;

pub struct PipelineOrchestrator {
    queue: Arc<RenderQueue>,
    blobs: Arc<BlobStore>,
    config: Arc<WorkerConfig>,
    cleanup: Arc<CleanupTracker>,
    progress: Arc<dyn ProgressSink>,
}

impl PipelineOrchestrator {
    pub fn new(
        queue: Arc<RenderQueue>,
        blobs: Arc<BlobStore>,
        config: Arc<WorkerConfig>,
        cleanup: Arc<CleanupTracker>,
        progress: Arc<dyn ProgressSink>,
    ) -> Self {
        Self { queue, blobs, config, cleanup, progress }
    }

    /// Run a claimed job to completion, failure, or cancellation, never
    /// propagating a pipeline error past this call (§4.A `finalizeJob` is
    /// always invoked: the caller only needs to know the job slot is free).
    pub async fn run(&self, claimed: ClaimedJob) {
        let render_id = claimed.render.id;
        let job_id = claimed.job.id;
        let logger = crate::logging::RenderLogger::new(render_id, job_id);
        let _span = logger.create_span().entered();

        match self.run_inner(&claimed).await {
            Ok(()) => {
                logger.log_completion();
                if let Err(e) = self.queue.finalize_job(job_id, TerminalState::Completed, None).await {
                    warn!(render_id = %render_id, error = %e, "failed to finalize completed job");
                }
            }
            Err(WorkerError::Cancelled) => {
                info!(render_id = %render_id, "render cancelled");
                let _ = self.queue.progress(render_id, RenderStatus::Cancelled, 0, None).await;
                if let Err(e) = self.queue.finalize_job(job_id, TerminalState::Cancelled, None).await {
                    warn!(render_id = %render_id, error = %e, "failed to finalize cancelled job");
                }
            }
            Err(e) => {
                logger.log_error(&e.to_string());
                let message = e.to_string();
                let _ = self
                    .queue
                    .progress(render_id, RenderStatus::Failed, 0, Some(&message))
                    .await;
                if let Err(e) = self
                    .queue
                    .finalize_job(job_id, TerminalState::Failed, Some(&message))
                    .await
                {
                    warn!(render_id = %render_id, error = %e, "failed to finalize failed job");
                }
            }
        }
    }

    async fn run_inner(&self, claimed: &ClaimedJob) -> WorkerResult<()> {
        let render = &claimed.render;
        let campaign = &claimed.campaign;
        let settings = campaign.output_settings;

        let work_dir = self.working_dir(campaign.id.to_string().as_str(), &render.id.to_string());
        tokio::fs::create_dir_all(&work_dir).await?;

        // Step 1: resolve inputs.
        self.check_not_cancelled(render.id).await?;
        let facecam_path = self.download_facecam(render, &work_dir).await?;
        let (csv, lead_identifier) = self.download_csv_and_identify(render, campaign, &work_dir).await?;
        self.queue.set_lead_identifier(render.id, &lead_identifier).await?;

        // Step 2: global duration constraints.
        let total_secs = campaign.total_duration_secs();
        if total_secs > render_models::campaign::MAX_TOTAL_DURATION_SECS {
            return Err(WorkerError::DurationTooLong {
                total: total_secs,
                max: render_models::campaign::MAX_TOTAL_DURATION_SECS,
            });
        }
        if let Some(facecam_path) = &facecam_path {
            let info = render_media::probe_video(facecam_path.to_string_lossy().as_ref()).await?;
            let facecam_secs = info.duration_sec.round() as u32;
            if facecam_secs != total_secs {
                return Err(WorkerError::DurationMismatch { total: total_secs, facecam: facecam_secs });
            }
        }

        self.report_progress(render.id, RenderStatus::Recording).await;

        // Steps 3-4: record + normalize each scene (cache short-circuited), then concat.
        self.check_not_cancelled(render.id).await?;
        let scene_cache = SceneCache::new(self.scene_cache_dir());
        let driver_config = BrowserDriverConfig::from_env();
        let session = Arc::new(
            CampaignSession::acquire(settings.width, settings.height, work_dir.join("browser"), &driver_config)
                .await?,
        );

        let normalized_paths = self
            .record_and_normalize_scenes(
                &session,
                &driver_config,
                campaign.ordered_scenes(),
                csv.as_ref(),
                &render.id.to_string(),
                &work_dir,
                &scene_cache,
                settings,
            )
            .await;
        if let Ok(session) = Arc::try_unwrap(session) {
            session.release().await.ok();
        }
        let normalized_paths = normalized_paths?;

        self.report_progress(render.id, RenderStatus::Normalizing).await;

        let background_path = work_dir.join("background.mp4");
        let background_path_str = background_path.to_string_lossy().to_string();
        render_media::concat_scenes(&normalized_paths, &background_path_str).await?;

        self.check_not_cancelled(render.id).await?;
        self.report_progress(render.id, RenderStatus::Concatenating).await;

        // Step 5: overlay facecam, or promote background to final.
        self.report_progress(render.id, RenderStatus::Overlaying).await;
        let final_path = work_dir.join("final.mp4");
        let final_path_str = final_path.to_string_lossy().to_string();
        match &facecam_path {
            Some(facecam_path) => {
                render_media::overlay_facecam(
                    &background_path_str,
                    facecam_path.to_string_lossy().as_ref(),
                    &final_path_str,
                    &settings.pip,
                )
                .await?;
            }
            None => {
                render_media::promote_background(&background_path_str, &final_path_str).await?;
            }
        }

        // Step 6: thumbnail.
        self.check_not_cancelled(render.id).await?;
        let thumbnail_path = work_dir.join("thumbnail.jpg");
        let thumbnail_path_str = thumbnail_path.to_string_lossy().to_string();
        render_media::generate_thumbnail(&final_path_str, &thumbnail_path_str).await?;

        // Step 7: upload both artifacts.
        self.report_progress(render.id, RenderStatus::Uploading).await;
        let video_url = self
            .blobs
            .upload_artifact(&final_path, &render.video_key(), Artifact::Video)
            .await?;
        let thumbnail_url = self
            .blobs
            .upload_artifact(&thumbnail_path, &render.thumbnail_key(), Artifact::Thumbnail)
            .await?;

        // Step 8: mark complete.
        self.queue.mark_complete(render.id, &video_url, &thumbnail_url).await?;

        let retention = chrono::Duration::hours(self.config.success_render_retention_hours);
        self.cleanup.schedule(work_dir, retention);

        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    async fn record_and_normalize_scenes(
        &self,
        session: &Arc<CampaignSession>,
        driver_config: &BrowserDriverConfig,
        scenes: Vec<&SceneDescriptor>,
        csv: Option<&LeadCsv>,
        render_id: &str,
        work_dir: &Path,
        scene_cache: &SceneCache,
        settings: OutputSettings,
    ) -> WorkerResult<Vec<String>> {
        let mut normalized = Vec::with_capacity(scenes.len());
        let leader_offset_sec = (driver_config.widget_warmup_delay_ms as f64 / 1000.0) + 3.0;

        for scene in scenes {
            let csv_value = match &scene.source {
                SceneSource::Csv { column } => csv
                    .ok_or_else(|| WorkerError::validation("scene references a CSV column but no CSV was provided"))?
                    .column_value(0, column)
                    .map_err(|e| WorkerError::validation(e.to_string()))
                    .map(Some)?,
                SceneSource::Manual { .. } => None,
            };
            let url = recorder::resolve_scene_url(&scene.source, csv_value.as_deref())?;

            if let Some(cached) = scene_cache
                .lookup(&url, settings.width, settings.height, settings.fps as f64)
                .await
            {
                normalized.push(cached.to_string_lossy().to_string());
                continue;
            }

            let id = recorder::scene_id(render_id, scene);
            let recorded_path = recorder::record_scene(
                session,
                driver_config,
                &id,
                &url,
                scene.duration_secs,
                scene.actions.as_deref(),
            )
            .await
            .map_err(|e| WorkerError::SceneRecordingFailed(e.to_string()))?;

            let normalized_path = work_dir.join(format!("{id}.normalized.mp4"));
            let normalized_path_str = normalized_path.to_string_lossy().to_string();
            render_media::normalize_scene(
                recorded_path.to_string_lossy().as_ref(),
                &normalized_path_str,
                render_media::NormalizeParams {
                    width: settings.width,
                    height: settings.height,
                    fps: settings.fps as f64,
                    duration_sec: scene.duration_secs,
                    leader_offset_sec,
                },
            )
            .await?;

            scene_cache
                .store(&url, settings.width, settings.height, settings.fps as f64, &normalized_path)
                .await?;

            normalized.push(normalized_path_str);
        }

        Ok(normalized)
    }

    async fn download_facecam(&self, render: &Render, work_dir: &Path) -> WorkerResult<Option<PathBuf>> {
        let Some(url) = &render.facecam_url else { return Ok(None) };
        let dest = work_dir.join("facecam.mp4");
        self.blobs.fetch_to_file(url, FACECAM_MAX_BYTES, &dest).await?;
        Ok(Some(dest))
    }

    async fn download_csv_and_identify(
        &self,
        render: &Render,
        campaign: &render_models::Campaign,
        work_dir: &Path,
    ) -> WorkerResult<(Option<LeadCsv>, String)> {
        let Some(url) = &render.lead_csv_url else {
            let row_index = render.lead_row_index.unwrap_or(0);
            return Ok((None, Render::default_lead_identifier(row_index)));
        };
        let dest = work_dir.join("leads.csv");
        self.blobs.fetch_to_file(url, CSV_MAX_BYTES, &dest).await?;
        let bytes = tokio::fs::read(&dest).await?;
        let csv = LeadCsv::parse(&bytes).await.map_err(|e| WorkerError::validation(e.to_string()))?;

        let row_index = render.lead_row_index.unwrap_or(0);
        if row_index < 0 || row_index >= csv.row_count() {
            return Err(WorkerError::validation(format!(
                "lead row index {row_index} out of range (0..{})",
                csv.row_count()
            )));
        }

        // Derive `leadIdentifier` from the first CSV-backed scene column, trimmed (§4.G step 1).
        let first_csv_column = campaign
            .ordered_scenes()
            .iter()
            .find_map(|s| match &s.source {
                SceneSource::Csv { column } => Some(column.clone()),
                SceneSource::Manual { .. } => None,
            });

        let identifier = match first_csv_column {
            Some(column) => {
                let value = csv.column_value(row_index, &column).map_err(|e| WorkerError::validation(e.to_string()))?;
                if value.is_empty() {
                    Render::default_lead_identifier(row_index)
                } else {
                    value
                }
            }
            None => Render::default_lead_identifier(row_index),
        };

        Ok((Some(csv), identifier))
    }

    fn working_dir(&self, campaign_id: &str, render_id: &str) -> PathBuf {
        let slug = slugify(campaign_id);
        PathBuf::from(&self.config.work_dir).join(format!("{slug}-{render_id}"))
    }

    fn scene_cache_dir(&self) -> PathBuf {
        PathBuf::from(&self.config.work_dir).join("scene-cache")
    }

    async fn report_progress(&self, render_id: render_models::RenderId, stage: RenderStatus) {
        self.progress
            .report(ProgressUpdate { render_id, stage, percent: stage.entry_progress_pct() })
            .await;
    }

    /// Cancellation is checked only between pipeline steps; an in-flight
    /// recording or encode always finishes (§4.G, §5).
    async fn check_not_cancelled(&self, render_id: render_models::RenderId) -> WorkerResult<()> {
        match self.queue.render_status(render_id).await {
            Ok(RenderStatus::Cancelled) => Err(WorkerError::Cancelled),
            Ok(_) => Ok(()),
            Err(e) => {
                warn!(render_id = %render_id, error = %e, "failed to read render status for cancellation check");
                Ok(())
            }
        }
    }
}

/// Filesystem-safe slug for a working directory name.
fn slugify(input: &str) -> String {
    input
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_lowercases_and_replaces_punctuation() {
        assert_eq!(slugify("Acme Corp #1"), "acme-corp--1");
    }
}
