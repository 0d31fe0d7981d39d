//! Postgres-backed render job queue and claim protocol (§4.A).

use chrono::{DateTime, Utc};
use render_models::{Campaign, Render, RenderId, RenderJob, RenderJobId, RenderStatus};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::QueueConfig;
use crate::error::{QueueError, QueueResult};
use crate::rows::{job_state_str, status_str, CampaignRow, RenderJobRow, RenderRow};

/// A ready job bundled with the data the pipeline needs to run it (§4.A claim algorithm).
#[derive(Debug, Clone)]
pub struct ClaimedJob {
    pub job: RenderJob,
    pub render: Render,
    pub campaign: Campaign,
}

/// The outcome `finalizeJob` records for a job (§4.A contract).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalState {
    Completed,
    Failed,
    Cancelled,
}

impl TerminalState {
    fn as_job_state(self) -> render_models::JobState {
        match self {
            TerminalState::Completed => render_models::JobState::Completed,
            TerminalState::Failed => render_models::JobState::Failed,
            TerminalState::Cancelled => render_models::JobState::Cancelled,
        }
    }
}

/// Job queue client over Postgres (§4.A claim protocol, rescue sweep).
pub struct RenderQueue {
    pool: PgPool,
}

impl RenderQueue {
    pub async fn connect(config: QueueConfig) -> QueueResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.database_url)
            .await
            .map_err(|e| QueueError::connection_failed(e.to_string()))?;

        Ok(Self { pool })
    }

    pub async fn from_env() -> QueueResult<Self> {
        Self::connect(QueueConfig::from_env()).await
    }

    /// Run embedded migrations. Idempotent; safe to call on every startup.
    pub async fn run_migrations(&self) -> QueueResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Insert a campaign (owned by the external campaign-CRUD API in production; exposed
    /// here so integration tests and local tooling can seed one, §1 Out of scope).
    pub async fn insert_campaign(&self, campaign: &Campaign) -> QueueResult<()> {
        sqlx::query(
            r#"
            INSERT INTO campaigns (id, user_id, name, scenes, output_settings, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(campaign.id.as_uuid())
        .bind(&campaign.user_id)
        .bind(&campaign.name)
        .bind(serde_json::to_value(&campaign.scenes)?)
        .bind(serde_json::to_value(campaign.output_settings)?)
        .bind(campaign.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Insert a new render and its single queue job in one transaction (§6: one job per render).
    pub async fn enqueue(&self, render: &Render) -> QueueResult<RenderJob> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO renders (
                id, campaign_id, lead_csv_url, lead_row_index, lead_identifier, facecam_url,
                video_url, thumbnail_url, status, progress, error_message, public_id,
                duration_sec, created_at, updated_at, completed_at, cancelled_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            "#,
        )
        .bind(render.id.as_uuid())
        .bind(render.campaign_id.as_uuid())
        .bind(&render.lead_csv_url)
        .bind(render.lead_row_index)
        .bind(&render.lead_identifier)
        .bind(&render.facecam_url)
        .bind(&render.video_url)
        .bind(&render.thumbnail_url)
        .bind(status_str(render.status))
        .bind(render.progress as i16)
        .bind(&render.error_message)
        .bind(render.public_id.as_str())
        .bind(render.duration_sec as i32)
        .bind(render.created_at)
        .bind(render.updated_at)
        .bind(render.completed_at)
        .bind(render.cancelled_at)
        .execute(&mut *tx)
        .await?;

        let job = RenderJob::new(render.id);

        sqlx::query(
            r#"
            INSERT INTO render_jobs (
                id, render_id, state, error_message, created_at, updated_at, started_at, completed_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(job.id.as_uuid())
        .bind(job.render_id.as_uuid())
        .bind(job_state_str(job.state))
        .bind(&job.error_message)
        .bind(job.created_at)
        .bind(job.updated_at)
        .bind(job.started_at)
        .bind(job.completed_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(render_id = %render.id, job_id = %job.id, "enqueued render job");
        Ok(job)
    }

    /// Claim at most one ready job, or `None` if the concurrency gate is saturated or the
    /// queue is empty (§4.A claim algorithm). Retries once on a serialization failure.
    pub async fn claim(&self, max_concurrent: i64) -> QueueResult<Option<ClaimedJob>> {
        match self.claim_once(max_concurrent).await {
            Ok(claimed) => Ok(claimed),
            Err(e) if e.is_serialization_failure() => {
                warn!("claim transaction hit a serialization conflict, retrying once");
                self.claim_once(max_concurrent).await
            }
            Err(e) => Err(e),
        }
    }

    async fn claim_once(&self, max_concurrent: i64) -> QueueResult<Option<ClaimedJob>> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await?;

        let processing_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM render_jobs WHERE state = 'processing'")
                .fetch_one(&mut *tx)
                .await?;

        if processing_count >= max_concurrent {
            tx.commit().await?;
            return Ok(None);
        }

        let job_row: Option<RenderJobRow> = sqlx::query_as(
            r#"
            WITH next_job AS (
                SELECT id
                FROM render_jobs
                WHERE state = 'queued'
                ORDER BY created_at
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
            UPDATE render_jobs
            SET state = 'processing', started_at = NOW(), updated_at = NOW()
            WHERE id IN (SELECT id FROM next_job)
            RETURNING id, render_id, state, error_message, created_at, updated_at, started_at, completed_at
            "#,
        )
        .fetch_optional(&mut *tx)
        .await?;

        let Some(job_row) = job_row else {
            tx.commit().await?;
            return Ok(None);
        };

        let job = RenderJob::try_from(job_row)?;

        let render_row: RenderRow = sqlx::query_as("SELECT * FROM renders WHERE id = $1")
            .bind(job.render_id.as_uuid())
            .fetch_one(&mut *tx)
            .await?;
        let render = Render::try_from(render_row)?;

        let campaign_row: CampaignRow = sqlx::query_as("SELECT * FROM campaigns WHERE id = $1")
            .bind(render.campaign_id.as_uuid())
            .fetch_one(&mut *tx)
            .await?;
        let campaign = Campaign::try_from(campaign_row)?;

        tx.commit().await?;

        debug!(job_id = %job.id, render_id = %render.id, "claimed render job");
        Ok(Some(ClaimedJob { job, render, campaign }))
    }

    /// Transition a job to a terminal state (§4.A: `finalizeJob`).
    pub async fn finalize_job(
        &self,
        id: RenderJobId,
        terminal_state: TerminalState,
        error: Option<&str>,
    ) -> QueueResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE render_jobs
            SET state = $2, error_message = $3, completed_at = NOW(), updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(job_state_str(terminal_state.as_job_state()))
        .bind(error)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(QueueError::job_not_found(id.to_string()));
        }
        Ok(())
    }

    /// Idempotent upsert of a render's latest status/progress (§4.A: `progress`).
    pub async fn progress(
        &self,
        render_id: RenderId,
        status: RenderStatus,
        progress: u8,
        error: Option<&str>,
    ) -> QueueResult<()> {
        sqlx::query(
            r#"
            UPDATE renders
            SET status = $2, progress = $3, error_message = COALESCE($4, error_message),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(render_id.as_uuid())
        .bind(status_str(status))
        .bind(progress as i16)
        .bind(error)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Mark a render permanently completed (§4.A: `markComplete`).
    pub async fn mark_complete(
        &self,
        render_id: RenderId,
        video_url: &str,
        thumbnail_url: &str,
    ) -> QueueResult<()> {
        sqlx::query(
            r#"
            UPDATE renders
            SET status = 'completed', progress = 100, video_url = $2, thumbnail_url = $3,
                completed_at = NOW(), updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(render_id.as_uuid())
        .bind(video_url)
        .bind(thumbnail_url)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Persist the lead identifier the orchestrator derived while resolving inputs (§4.G step 1).
    pub async fn set_lead_identifier(&self, render_id: RenderId, identifier: &str) -> QueueResult<()> {
        sqlx::query("UPDATE renders SET lead_identifier = $2, updated_at = NOW() WHERE id = $1")
            .bind(render_id.as_uuid())
            .bind(identifier)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Current status of a render, for the orchestrator's between-step cancellation check.
    pub async fn render_status(&self, render_id: RenderId) -> QueueResult<RenderStatus> {
        let status: String = sqlx::query_scalar("SELECT status FROM renders WHERE id = $1")
            .bind(render_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| QueueError::job_not_found(render_id.to_string()))?;
        crate::rows::parse_status(&status)
    }

    pub async fn get_render(&self, id: RenderId) -> QueueResult<Render> {
        let row: RenderRow = sqlx::query_as("SELECT * FROM renders WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| QueueError::job_not_found(id.to_string()))?;
        Render::try_from(row)
    }

    /// Reclaim crashed-worker renders: non-terminal status whose `updated_at` predates
    /// `stuck_after` is declared failed with `"heartbeat timeout"` (§4.A rescue sweep).
    /// Any worker may run this; it requires no lease bookkeeping because it keys off the
    /// same `updated_at` column every progress call already bumps.
    pub async fn rescue_sweep(&self, stuck_after: chrono::Duration) -> QueueResult<u64> {
        let cutoff: DateTime<Utc> = Utc::now() - stuck_after;

        let mut tx = self.pool.begin().await?;

        let stuck_ids: Vec<Uuid> = sqlx::query_scalar(
            r#"
            UPDATE renders
            SET status = 'failed', error_message = 'heartbeat timeout', updated_at = NOW()
            WHERE status NOT IN ('completed', 'failed', 'cancelled') AND updated_at < $1
            RETURNING id
            "#,
        )
        .bind(cutoff)
        .fetch_all(&mut *tx)
        .await?;

        if !stuck_ids.is_empty() {
            sqlx::query(
                r#"
                UPDATE render_jobs
                SET state = 'failed', error_message = 'heartbeat timeout', updated_at = NOW(), completed_at = NOW()
                WHERE render_id = ANY($1) AND state NOT IN ('completed', 'failed', 'cancelled')
                "#,
            )
            .bind(&stuck_ids)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        let rescued = stuck_ids.len() as u64;
        if rescued > 0 {
            warn!(rescued, "rescue sweep marked stuck renders as failed");
        }
        Ok(rescued)
    }

    /// Read a single JSON-valued row from `system_settings`, if present (§4.I config loader).
    pub async fn get_setting(&self, key: &str) -> QueueResult<Option<serde_json::Value>> {
        let value: Option<serde_json::Value> =
            sqlx::query_scalar("SELECT value FROM system_settings WHERE key = $1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;
        Ok(value)
    }
}
