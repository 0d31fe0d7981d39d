//! Widget warmup and viewport-stability polling (§4.D `navigate`).

use std::time::{Duration, Instant};

use chromiumoxide::page::Page;
use tracing::debug;

use crate::error::BrowserResult;

const DISPATCH_SYNTHETIC_EVENTS: &str = r#"
(() => {
  window.dispatchEvent(new Event('resize'));
  window.dispatchEvent(new Event('scroll'));
  window.dispatchEvent(new Event('focus'));
})();
"#;

/// Sets the page lifecycle to `active`, dispatches synthetic resize/scroll/focus
/// events, waits for fonts and two animation frames, then sleeps the widget-init
/// delay so lazy widgets (booking embeds etc.) have time to settle.
pub async fn widget_warmup(page: &Page, widget_warmup_delay_ms: u64) -> BrowserResult<()> {
    let _ = page
        .execute(
            chromiumoxide::cdp::browser_protocol::page::SetWebLifecycleStateParams::builder()
                .state(chromiumoxide::cdp::browser_protocol::page::SetWebLifecycleStateState::Active)
                .build()
                .unwrap(),
        )
        .await;

    let _ = page.evaluate(DISPATCH_SYNTHETIC_EVENTS).await;

    let _ = page
        .evaluate("document.fonts ? document.fonts.ready : Promise.resolve()")
        .await;

    for _ in 0..2 {
        let _ = page
            .evaluate("new Promise(r => requestAnimationFrame(() => requestAnimationFrame(r)))")
            .await;
    }

    tokio::time::sleep(Duration::from_millis(widget_warmup_delay_ms)).await;
    Ok(())
}

/// Poll the page's reported viewport until it matches `(width, height)` for a full
/// second of consecutive stability, or `timeout_ms` elapses (§4.D).
pub async fn wait_for_viewport_stability(
    page: &Page,
    width: u32,
    height: u32,
    timeout_ms: u64,
) -> BrowserResult<()> {
    let deadline = Instant::now() + Duration::from_millis(timeout_ms);
    let mut stable_since: Option<Instant> = None;

    while Instant::now() < deadline {
        let matches = matches_viewport(page, width, height).await;
        if matches {
            let since = stable_since.get_or_insert_with(Instant::now);
            if since.elapsed() >= Duration::from_secs(1) {
                return Ok(());
            }
        } else {
            stable_since = None;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    debug!(width, height, "viewport never reached full stability, continuing anyway");
    Ok(())
}

async fn matches_viewport(page: &Page, width: u32, height: u32) -> bool {
    let script = "JSON.stringify({w: window.innerWidth, h: window.innerHeight})";
    let Ok(result) = page.evaluate(script).await else {
        return false;
    };
    let Some(value) = result.into_value::<String>().ok() else {
        return false;
    };
    let Ok(parsed) = serde_json::from_str::<serde_json::Value>(&value) else {
        return false;
    };
    let w = parsed.get("w").and_then(|v| v.as_u64()).unwrap_or(0) as u32;
    let h = parsed.get("h").and_then(|v| v.as_u64()).unwrap_or(0) as u32;
    w == width && h == height
}
