//! Driver mode selection (§4.D: "local" launches a headless browser, "remote"
//! connects to a managed one over CDP).

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowserMode {
    Local,
    Remote { ws_url: String },
}

#[derive(Debug, Clone)]
pub struct BrowserDriverConfig {
    pub mode: BrowserMode,
    /// Hard cap on page-ready detection (§4.D: "hard cap 7s").
    pub page_ready_timeout_ms: u64,
    /// Widget-init delay after navigation settles (§4.D: "~1.5s").
    pub widget_warmup_delay_ms: u64,
    /// Viewport-stability poll cap (§4.D: "10s cap").
    pub viewport_stability_timeout_ms: u64,
}

impl Default for BrowserDriverConfig {
    fn default() -> Self {
        Self {
            mode: BrowserMode::Local,
            page_ready_timeout_ms: 7_000,
            widget_warmup_delay_ms: 1_500,
            viewport_stability_timeout_ms: 10_000,
        }
    }
}

impl BrowserDriverConfig {
    pub fn from_env() -> Self {
        let mode = match std::env::var("BROWSER_MODE").as_deref() {
            Ok("remote") => match std::env::var("REMOTE_BROWSER_WS_URL") {
                Ok(ws_url) => BrowserMode::Remote { ws_url },
                Err(_) => {
                    tracing::warn!(
                        "BROWSER_MODE=remote but REMOTE_BROWSER_WS_URL is unset, falling back to local"
                    );
                    BrowserMode::Local
                }
            },
            _ => BrowserMode::Local,
        };

        Self {
            mode,
            ..Default::default()
        }
    }
}
