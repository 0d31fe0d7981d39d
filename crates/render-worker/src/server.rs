//! Health HTTP server bring-up, with port fallback (§6: "falls back to the next
//! free port if taken (up to 5 attempts)").

use axum::routing::get;
use axum::Router;
use tracing::{info, warn};

use crate::health::{health, metrics_endpoint, not_found, HealthState};

const MAX_PORT_ATTEMPTS: u16 = 5;

pub async fn serve(base_port: u16, state: HealthState) -> std::io::Result<tokio::task::JoinHandle<()>> {
    let app = Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics_endpoint))
        .fallback(not_found)
        .with_state(state);

    let mut last_err = None;
    for attempt in 0..MAX_PORT_ATTEMPTS {
        let port = base_port + attempt;
        match tokio::net::TcpListener::bind(("0.0.0.0", port)).await {
            Ok(listener) => {
                info!(port, "health server listening");
                let app = app.clone();
                return Ok(tokio::spawn(async move {
                    if let Err(e) = axum::serve(listener, app).await {
                        warn!(error = %e, "health server exited");
                    }
                }));
            }
            Err(e) => {
                warn!(port, error = %e, "port unavailable, trying next");
                last_err = Some(e);
            }
        }
    }

    Err(last_err.unwrap_or_else(|| std::io::Error::new(std::io::ErrorKind::AddrInUse, "no free port")))
}
