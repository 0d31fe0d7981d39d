//! Campaign sessions: one browser context shared across every scene in a
//! campaign (§4.D `acquireCampaignSession`).

use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use chromiumoxide::browser::{Browser, BrowserConfig};
use futures::StreamExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::config::{BrowserDriverConfig, BrowserMode};
use crate::error::{BrowserError, BrowserResult};
use crate::page::ScenePage;

/// Consecutive page-creation failures before a session is declared dead (§4.D:
/// "treated as a dead-browser signal that drains remaining work").
const MAX_PAGE_CREATE_FAILURES: u32 = 3;

/// A single browser context shared by every scene of one campaign.
pub struct CampaignSession {
    browser: Browser,
    _handler: tokio::task::JoinHandle<()>,
    width: u32,
    height: u32,
    base_dir: PathBuf,
    /// Page acquisition is strictly serial within a session (§4.D).
    page_lock: Mutex<()>,
    consecutive_failures: AtomicU32,
}

impl CampaignSession {
    /// Launch (local mode) or connect to (remote mode) a browser and create the
    /// one context this campaign's scenes will all record into.
    pub async fn acquire(
        width: u32,
        height: u32,
        base_dir: impl Into<PathBuf>,
        driver_config: &BrowserDriverConfig,
    ) -> BrowserResult<Self> {
        let base_dir = base_dir.into();
        tokio::fs::create_dir_all(&base_dir).await?;

        let (browser, mut handler) = match &driver_config.mode {
            BrowserMode::Local => {
                let config = BrowserConfig::builder()
                    .window_size(width, height)
                    .build()
                    .map_err(BrowserError::LaunchFailed)?;
                Browser::launch(config)
                    .await
                    .map_err(|e| BrowserError::LaunchFailed(e.to_string()))?
            }
            BrowserMode::Remote { ws_url } => Browser::connect(ws_url)
                .await
                .map_err(|e| BrowserError::RemoteConnectFailed(e.to_string()))?,
        };

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    warn!(error = %e, "browser handler event error");
                }
            }
        });

        debug!(width, height, base_dir = %base_dir.display(), "campaign session acquired");

        Ok(Self {
            browser,
            _handler: handler_task,
            width,
            height,
            base_dir,
            page_lock: Mutex::new(()),
            consecutive_failures: AtomicU32::new(0),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn base_dir(&self) -> &std::path::Path {
        &self.base_dir
    }

    pub fn is_dead(&self) -> bool {
        self.consecutive_failures.load(Ordering::Relaxed) >= MAX_PAGE_CREATE_FAILURES
    }

    /// Open a page for one scene, serialized against other concurrent callers.
    pub async fn new_page(self: &Arc<Self>, scene_id: &str) -> BrowserResult<ScenePage> {
        let _guard = self.page_lock.lock().await;

        if self.is_dead() {
            return Err(BrowserError::SessionDead);
        }

        match ScenePage::open(&self.browser, self.width, self.height, &self.base_dir, scene_id).await {
            Ok(page) => {
                self.consecutive_failures.store(0, Ordering::Relaxed);
                Ok(page)
            }
            Err(e) => {
                let failures = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
                warn!(failures, error = %e, "failed to open scene page");
                Err(e)
            }
        }
    }

    pub async fn release(self) -> BrowserResult<()> {
        let mut browser = self.browser;
        browser
            .close()
            .await
            .map_err(|e| BrowserError::Cdp(e.to_string()))?;
        debug!("campaign session released");
        Ok(())
    }
}
