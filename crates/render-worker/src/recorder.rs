//! Scene Recorder (§4.F): turns one [`SceneDescriptor`] into a finished webm
//! clip by driving a page through [`render_browser`], either along an
//! authored action list or through the human motion engine.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use render_browser::{BrowserDriverConfig, CampaignSession, ScenePage};
use render_models::{SceneAction, SceneDescriptor, SceneSource};
use tracing::{debug, warn};

use crate::error::{WorkerError, WorkerResult};
use crate::retry::{is_transient_scene_error, retry_async, RetryConfig};

/// Time budgeted for third-party embeds to settle after navigation, on top of
/// DOM-ready (§4.F: "sleep ~3s embed wait").
const EMBED_SETTLE_MS: u64 = 3_000;

/// Cap on the network-idle wait after navigation (§4.F).
const NETWORK_IDLE_TIMEOUT_MS: u64 = 5_000;

/// Trailing padding appended after a full HME choreography run, covering
/// any end-of-scene transition effects (§4.F: "pad 15s buffer").
const HME_END_PAD_MS: u64 = 15_000;

/// Resolve the URL a scene should record, substituting the CSV column value
/// when the scene's source is a CSV lookup (§4.G step 1).
pub fn resolve_scene_url(source: &SceneSource, csv_value: Option<&str>) -> WorkerResult<String> {
    match source {
        SceneSource::Manual { url } => Ok(url.clone()),
        SceneSource::Csv { column } => csv_value
            .map(|v| v.to_string())
            .ok_or_else(|| WorkerError::validation(format!("no CSV value available for column {column}"))),
    }
}

/// Record one scene into `<base_dir>/<scene_id>.webm`, retrying transient
/// failures up to 3 times with exponential backoff (§4.F Retries).
pub async fn record_scene(
    session: &Arc<CampaignSession>,
    driver_config: &BrowserDriverConfig,
    scene_id: &str,
    url: &str,
    duration_secs: u32,
    actions: Option<&[SceneAction]>,
) -> WorkerResult<PathBuf> {
    let retry_config = RetryConfig::new(format!("record_scene:{scene_id}"));

    let result = retry_async(
        &retry_config,
        |e: &WorkerError| is_transient_scene_error(&e.to_string()),
        || record_scene_once(session, driver_config, scene_id, url, duration_secs, actions),
    )
    .await;

    result.into_result()
}

async fn record_scene_once(
    session: &Arc<CampaignSession>,
    driver_config: &BrowserDriverConfig,
    scene_id: &str,
    url: &str,
    duration_secs: u32,
    actions: Option<&[SceneAction]>,
) -> WorkerResult<PathBuf> {
    let page = session.new_page(scene_id).await?;

    page.navigate(url, 15_000, driver_config.widget_warmup_delay_ms).await?;
    wait_for_network_idle(&page).await;
    tokio::time::sleep(Duration::from_millis(EMBED_SETTLE_MS)).await;

    match actions {
        Some(actions) if !actions.is_empty() => {
            run_actions(&page, actions, duration_secs).await?;
        }
        _ => {
            page.wait_until_ready(driver_config.page_ready_timeout_ms).await.ok();
            let duration_ms = (duration_secs as u64) * 1_000;
            render_hme::run_choreography(page.inner(), url, duration_ms).await;
            tokio::time::sleep(Duration::from_millis(HME_END_PAD_MS)).await;
        }
    }

    let video_path = page.close().await?;

    let metadata = tokio::fs::metadata(&video_path).await?;
    if metadata.len() == 0 {
        return Err(WorkerError::SceneRecordingFailed(format!(
            "empty recording for scene {scene_id}"
        )));
    }

    debug!(scene_id, path = %video_path.display(), "scene recorded");
    Ok(video_path)
}

/// Best-effort network-idle detection: polls `performance.getEntriesByType('resource')`
/// and declares idle once the entry count stops growing, capped at 5s (§4.F).
async fn wait_for_network_idle(page: &ScenePage) {
    let deadline = tokio::time::Instant::now() + Duration::from_millis(NETWORK_IDLE_TIMEOUT_MS);
    let mut last_count = resource_entry_count(page).await;

    loop {
        tokio::time::sleep(Duration::from_millis(250)).await;
        if tokio::time::Instant::now() >= deadline {
            return;
        }
        let count = resource_entry_count(page).await;
        if count == last_count {
            return;
        }
        last_count = count;
    }
}

async fn resource_entry_count(page: &ScenePage) -> usize {
    page.inner()
        .evaluate("performance.getEntriesByType('resource').length")
        .await
        .ok()
        .and_then(|r| r.into_value::<usize>().ok())
        .unwrap_or(0)
}

/// Execute an authored action list, consuming the scene's remaining time
/// budget (§4.F: "execute each... consuming the remaining budget").
async fn run_actions(page: &ScenePage, actions: &[SceneAction], duration_secs: u32) -> WorkerResult<()> {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(duration_secs as u64);

    for action in actions {
        if tokio::time::Instant::now() >= deadline {
            break;
        }
        if let Err(e) = run_action(page, action).await {
            warn!(error = %e, "scene action failed, continuing");
        }
    }

    let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
    if !remaining.is_zero() {
        tokio::time::sleep(remaining).await;
    }
    Ok(())
}

async fn run_action(page: &ScenePage, action: &SceneAction) -> WorkerResult<()> {
    match action {
        SceneAction::GoTo { url } => {
            page.navigate(url, 15_000, 500).await?;
        }
        SceneAction::Wait { ms } => {
            tokio::time::sleep(Duration::from_millis(*ms)).await;
        }
        SceneAction::ClickText { text } => {
            let script = format!(
                r#"(() => {{
                    const needle = {text:?}.toLowerCase();
                    const els = Array.from(document.querySelectorAll('a,button,[role=button]'));
                    const el = els.find(e => (e.innerText || '').toLowerCase().includes(needle));
                    if (el) {{ el.scrollIntoView({{block: 'center'}}); el.click(); }}
                    return !!el;
                }})();"#
            );
            page.inner().evaluate(script).await.ok();
        }
        SceneAction::Highlight { text } => {
            let script = format!(
                r#"(() => {{
                    const needle = {text:?};
                    const walker = document.createTreeWalker(document.body, NodeFilter.SHOW_TEXT);
                    let node;
                    while ((node = walker.nextNode())) {{
                        const idx = node.textContent.indexOf(needle);
                        if (idx >= 0) {{
                            const range = document.createRange();
                            range.setStart(node, idx);
                            range.setEnd(node, idx + needle.length);
                            const sel = window.getSelection();
                            sel.removeAllRanges();
                            sel.addRange(range);
                            node.parentElement?.scrollIntoView({{block: 'center'}});
                            return true;
                        }}
                    }}
                    return false;
                }})();"#
            );
            page.inner().evaluate(script).await.ok();
        }
        SceneAction::Scroll { delta_px } => {
            let script = format!("window.scrollBy(0, {delta_px});");
            page.inner().evaluate(script).await.ok();
        }
    }
    Ok(())
}

/// The id used for a scene's page/recording files, stable within one render.
pub fn scene_id(render_id: &str, scene: &SceneDescriptor) -> String {
    format!("{render_id}-scene-{}", scene.order_index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_source_resolves_to_its_literal_url() {
        let source = SceneSource::Manual { url: "https://example.com".into() };
        assert_eq!(resolve_scene_url(&source, None).unwrap(), "https://example.com");
    }

    #[test]
    fn csv_source_requires_a_value() {
        let source = SceneSource::Csv { column: "landing_url".into() };
        assert!(resolve_scene_url(&source, None).is_err());
        assert_eq!(
            resolve_scene_url(&source, Some("https://lead.example")).unwrap(),
            "https://lead.example"
        );
    }

    #[test]
    fn scene_ids_are_stable_and_ordered() {
        let scene = SceneDescriptor {
            order_index: 3,
            source: SceneSource::Manual { url: "https://example.com".into() },
            duration_secs: 10,
            actions: None,
        };
        assert_eq!(scene_id("r1", &scene), "r1-scene-3");
    }
}
