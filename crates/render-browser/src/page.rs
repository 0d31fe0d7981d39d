//! Per-scene page lifecycle: navigation-masked, recorded, URL-navigated, then
//! closed back into a finished video file (§4.D `newPage`/`navigate`/`closePage`).

use std::path::{Path, PathBuf};
use std::time::Duration;

use chromiumoxide::browser::Browser;
use chromiumoxide::page::Page;
use tracing::debug;

use crate::error::{BrowserError, BrowserResult};
use crate::recording::VideoRecorder;
use crate::{mask, ready, warmup};

pub struct ScenePage {
    page: Page,
    recorder: Option<VideoRecorder>,
    video_path: PathBuf,
}

impl ScenePage {
    pub(crate) async fn open(
        browser: &Browser,
        width: u32,
        height: u32,
        base_dir: &Path,
        scene_id: &str,
    ) -> BrowserResult<Self> {
        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::Cdp(e.to_string()))?;

        mask::install(&page).await?;

        let video_path = base_dir.join(format!("{scene_id}.webm"));
        let recorder = VideoRecorder::start(&page, &video_path).await?;

        debug!(scene_id, width, height, "scene page opened");

        Ok(Self {
            page,
            recorder: Some(recorder),
            video_path,
        })
    }

    /// Normalize the URL, navigate with the mask still covering, wait for
    /// DOM-ready, warm up widgets, then uncover (§4.D).
    pub async fn navigate(&self, url: &str, max_wait_ms: u64, widget_warmup_delay_ms: u64) -> BrowserResult<()> {
        let normalized = normalize_url(url);

        self.page
            .goto(&normalized)
            .await
            .map_err(|e| BrowserError::NavigationFailed(e.to_string()))?;

        tokio::time::timeout(Duration::from_millis(max_wait_ms), self.page.wait_for_navigation())
            .await
            .map_err(|_| BrowserError::NavigationFailed("DOM-ready wait timed out".into()))?
            .map_err(|e| BrowserError::NavigationFailed(e.to_string()))?;

        warmup::widget_warmup(&self.page, widget_warmup_delay_ms).await?;
        warmup::wait_for_viewport_stability(&self.page, 0, 0, 10_000).await.ok();

        mask::remove(&self.page).await?;
        Ok(())
    }

    /// Page-ready detection used when a scene has no explicit action list (§4.D).
    pub async fn wait_until_ready(&self, hard_cap_ms: u64) -> BrowserResult<()> {
        ready::wait_for_page_ready(&self.page, hard_cap_ms).await
    }

    pub fn inner(&self) -> &Page {
        &self.page
    }

    /// Close the page, flush the recording, and hand back its on-disk path
    /// (§4.D `closePage`).
    pub async fn close(mut self) -> BrowserResult<PathBuf> {
        let recorder = self.recorder.take();
        let video_path = if let Some(recorder) = recorder {
            recorder.stop(&self.page).await?
        } else {
            self.video_path.clone()
        };

        self.page
            .close()
            .await
            .map_err(|e| BrowserError::Cdp(e.to_string()))?;

        Ok(video_path)
    }
}

/// Prefix `https://` if the scheme is missing (§4.D `navigate`).
fn normalize_url(url: &str) -> String {
    if url.contains("://") {
        url.to_string()
    } else {
        format!("https://{url}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_domain_gets_https_prefix() {
        assert_eq!(normalize_url("example.com"), "https://example.com");
    }

    #[test]
    fn explicit_scheme_is_preserved() {
        assert_eq!(normalize_url("http://example.com"), "http://example.com");
    }
}
