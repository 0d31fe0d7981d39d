//! Render worker binary: main poll loop, heartbeat, config refresh, rescue
//! sweep, and the health/metrics HTTP surface (§4.H).

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use render_db::{PostgresProgressSink, RenderQueue};
use render_models::ProgressSink;
use render_storage::BlobStore;
use render_worker::health::HealthState;
use render_worker::state::WorkerState;
use render_worker::{server, PipelineOrchestrator, WorkerConfig};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        let message = format!("{e:#}");
        error!(error = %message, "render-worker failed to start");
        std::process::exit(1);
    }
}

/// Fallible process setup lives behind `anyhow` at this one edge, since a failure
/// here (bad env, unreachable database, no CDN creds) has no recovery path short
/// of a restart; everything past startup uses each crate's own error enum.
async fn run() -> anyhow::Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("failed to install rustls crypto provider"))?;

    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(EnvFilter::from_default_env().add_directive("render_worker=info".parse().unwrap()))
        .init();

    info!("starting render-worker");

    let config = Arc::new(WorkerConfig::from_env());
    info!(?config, "worker config loaded");

    let queue = Arc::new(
        RenderQueue::from_env()
            .await
            .context("failed to connect to render queue")?,
    );

    queue.run_migrations().await.context("failed to run database migrations")?;

    let blobs = Arc::new(
        BlobStore::from_env()
            .await
            .context("failed to initialize blob store")?,
    );

    let cleanup = Arc::new(render_worker::cleanup::CleanupTracker::new(
        config.work_dir.clone(),
        config.cleanup_max_age_days,
    ));

    let progress: Arc<dyn ProgressSink> = Arc::new(PostgresProgressSink::new(Arc::clone(&queue)));

    let pipeline = Arc::new(PipelineOrchestrator::new(
        Arc::clone(&queue),
        Arc::clone(&blobs),
        Arc::clone(&config),
        Arc::clone(&cleanup),
        progress,
    ));

    let prometheus = render_worker::metrics::init_metrics();

    let worker_state = WorkerState::new(config.max_concurrent_jobs);
    let health_state = HealthState {
        worker: Arc::clone(&worker_state),
        heartbeat_timeout_ms: config.heartbeat_timeout_ms,
        prometheus,
    };

    server::serve(config.health_port, health_state)
        .await
        .context("failed to start health server")?;

    let shutdown_signal = Arc::new(tokio::sync::Notify::new());
    spawn_signal_handler(Arc::clone(&shutdown_signal), Arc::clone(&worker_state));

    run_main_loop(config, queue, pipeline, cleanup, worker_state, shutdown_signal).await;

    info!("render-worker shutdown complete");
    Ok(())
}

fn spawn_signal_handler(
    shutdown_signal: Arc<tokio::sync::Notify>,
    worker_state: render_worker::state::SharedWorkerState,
) {
    tokio::spawn(async move {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler");

        tokio::select! {
            _ = tokio::signal::ctrl_c() => info!("received SIGINT"),
            _ = sigterm.recv() => info!("received SIGTERM"),
        }

        worker_state.set_shutting_down();
        shutdown_signal.notify_waiters();
    });
}

/// §4.H main loop: heartbeat every tick, config refresh every
/// `config_refresh_ms`, rescue sweep every `render_stuck_sweep_interval_ms`,
/// then claim-and-run or sleep.
async fn run_main_loop(
    config: Arc<WorkerConfig>,
    queue: Arc<RenderQueue>,
    pipeline: Arc<PipelineOrchestrator>,
    cleanup: Arc<render_worker::cleanup::CleanupTracker>,
    worker_state: render_worker::state::SharedWorkerState,
    shutdown_signal: Arc<tokio::sync::Notify>,
) {
    let mut last_config_refresh = tokio::time::Instant::now();
    let mut last_rescue_sweep = tokio::time::Instant::now();
    let mut in_flight: Vec<tokio::task::JoinHandle<()>> = Vec::new();

    loop {
        if worker_state.is_shutting_down() {
            break;
        }

        worker_state.bump_heartbeat();

        if last_config_refresh.elapsed() >= config.config_refresh_interval() {
            refresh_max_concurrent_jobs(&queue, &config, &worker_state).await;
            last_config_refresh = tokio::time::Instant::now();
        }

        if config.rescue_stuck_renders && last_rescue_sweep.elapsed() >= config.render_stuck_sweep_interval() {
            match queue.rescue_sweep(config.render_stuck_timeout()).await {
                Ok(count) if count > 0 => info!(count, "rescue sweep reclaimed stuck renders"),
                Ok(_) => {}
                Err(e) => warn!(error = %e, "rescue sweep failed"),
            }
            last_rescue_sweep = tokio::time::Instant::now();
        }

        if config.cleanup_enabled {
            cleanup.tick().await;
        }

        in_flight.retain(|handle| !handle.is_finished());

        if (in_flight.len() as i64) < worker_state.concurrency_limit() {
            match queue.claim(worker_state.concurrency_limit()).await {
                Ok(Some(claimed)) => {
                    let render_id = claimed.render.id.to_string();
                    worker_state.job_started(render_id);
                    let pipeline = Arc::clone(&pipeline);
                    let worker_state_done = Arc::clone(&worker_state);
                    in_flight.push(tokio::spawn(async move {
                        pipeline.run(claimed).await;
                        worker_state_done.job_finished();
                    }));
                }
                Ok(None) => {
                    sleep_or_shutdown(config.poll_interval(), &shutdown_signal).await;
                }
                Err(e) => {
                    warn!(error = %e, "failed to claim next render job");
                    sleep_or_shutdown(config.poll_interval(), &shutdown_signal).await;
                }
            }
        } else {
            sleep_or_shutdown(config.poll_interval(), &shutdown_signal).await;
        }
    }

    info!(count = in_flight.len(), "waiting up to 30s for in-flight renders to finish");
    let deadline = tokio::time::sleep(Duration::from_secs(30));
    tokio::pin!(deadline);
    for handle in in_flight {
        tokio::select! {
            res = handle => {
                if let Err(e) = res {
                    warn!(error = %e, "in-flight render task panicked during shutdown");
                }
            }
            _ = &mut deadline => {
                warn!("graceful shutdown timed out waiting for in-flight renders");
                break;
            }
        }
    }
}

async fn refresh_max_concurrent_jobs(
    queue: &RenderQueue,
    config: &WorkerConfig,
    worker_state: &render_worker::state::SharedWorkerState,
) {
    let from_settings = queue
        .get_setting("worker_system_settings")
        .await
        .ok()
        .flatten()
        .and_then(|v| serde_json::from_value::<render_models::WorkerSystemSettings>(v).ok())
        .map(|s| s.max_concurrent_jobs as i64);

    let limit = from_settings.unwrap_or(config.max_concurrent_jobs);
    worker_state.set_concurrency_limit(limit);
}

async fn sleep_or_shutdown(duration: Duration, shutdown_signal: &tokio::sync::Notify) {
    tokio::select! {
        _ = tokio::time::sleep(duration) => {}
        _ = shutdown_signal.notified() => {}
    }
}
