//! Queue configuration.

/// Database connection configuration (§6 env vars).
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Postgres connection string (`DATABASE_URL`).
    pub database_url: String,
    /// Maximum pooled connections.
    pub max_connections: u32,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            database_url: "postgres://localhost/render_worker".to_string(),
            max_connections: 10,
        }
    }
}

impl QueueConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost/render_worker".to_string()),
            max_connections: std::env::var("DATABASE_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
        }
    }
}
