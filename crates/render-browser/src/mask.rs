//! Navigation mask (§4.D `newPage`): an init script that paints over the page
//! before any navigation so surface-resize glitches never hit the recording.

use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::page::Page;

use crate::error::BrowserResult;

const MASK_ELEMENT_ID: &str = "__render_nav_mask__";

const INSTALL_SCRIPT: &str = r#"
(() => {
  if (document.getElementById("__render_nav_mask__")) return;
  const style = document.createElement("style");
  style.textContent = `
    #__render_nav_mask__ {
      position: fixed; inset: 0; background: #ffffff;
      z-index: 2147483647; visibility: hidden;
    }
  `;
  document.documentElement.appendChild(style);
  const mask = document.createElement("div");
  mask.id = "__render_nav_mask__";
  mask.style.visibility = "visible";
  document.documentElement.appendChild(mask);
})();
"#;

const REMOVE_SCRIPT: &str = r#"
(() => {
  const el = document.getElementById("__render_nav_mask__");
  if (el) el.remove();
})();
"#;

/// Install the mask via an init script so it exists before the page's own scripts run.
pub async fn install(page: &Page) -> BrowserResult<()> {
    page.evaluate_on_new_document(INSTALL_SCRIPT)
        .await
        .map_err(|e| crate::error::BrowserError::Cdp(e.to_string()))?;
    // Also apply immediately in case the page is already loaded (about:blank → first nav).
    let _ = page
        .execute(EvaluateParams::builder().expression(INSTALL_SCRIPT).build().unwrap())
        .await;
    Ok(())
}

/// Remove the mask once the page is stable (§4.D `newPage`).
pub async fn remove(page: &Page) -> BrowserResult<()> {
    page.evaluate(REMOVE_SCRIPT)
        .await
        .map_err(|e| crate::error::BrowserError::Cdp(e.to_string()))?;
    Ok(())
}

pub fn element_id() -> &'static str {
    MASK_ELEMENT_ID
}
