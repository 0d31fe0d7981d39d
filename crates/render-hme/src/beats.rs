//! The seven-beat vocabulary (§4.E "Beat vocabulary"). Each beat takes the page,
//! cursor state, RNG, and a time budget, and returns how many ms it actually used.

use std::time::{Duration, Instant};

use chromiumoxide::page::Page;
use serde::Deserialize;
use tracing::debug;

use crate::cursor::CursorState;
use crate::path::generate_path;
use crate::rng::Mulberry32;
use crate::safe_click::{score_cta, ClickCandidate};
use crate::scroll::{content_aware_plan, default_plan, scroll_ease, HeadingTarget};

const NAV_SCORE_TERMS: &[&str] = &["pricing", "features", "customers", "demo", "about", "contact"];

#[derive(Debug, Deserialize, Default)]
struct ElementRect {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
    text: String,
    #[serde(default)]
    href: Option<String>,
}

async fn query_elements(page: &Page, selector: &str) -> Vec<ElementRect> {
    let script = format!(
        r#"
        (() => {{
          const els = Array.from(document.querySelectorAll({selector:?}));
          return JSON.stringify(els.slice(0, 40).map(el => {{
            const r = el.getBoundingClientRect();
            return {{
              x: r.left + r.width / 2,
              y: r.top + r.height / 2,
              width: r.width,
              height: r.height,
              text: (el.innerText || el.textContent || '').trim().slice(0, 200),
              href: el.href || null,
            }};
          }}).filter(e => e.width > 0 && e.height > 0));
        }})();
        "#,
    );
    let Ok(result) = page.evaluate(script).await else {
        return Vec::new();
    };
    let Ok(json) = result.into_value::<String>() else {
        return Vec::new();
    };
    serde_json::from_str(&json).unwrap_or_default()
}

async fn viewport_center(page: &Page) -> (f64, f64) {
    let Ok(result) = page
        .evaluate("JSON.stringify({w: window.innerWidth, h: window.innerHeight})")
        .await
    else {
        return (640.0, 360.0);
    };
    let Ok(json) = result.into_value::<String>() else {
        return (640.0, 360.0);
    };
    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap_or_default();
    (
        parsed.get("w").and_then(|v| v.as_f64()).unwrap_or(1280.0) / 2.0,
        parsed.get("h").and_then(|v| v.as_f64()).unwrap_or(720.0) / 2.0,
    )
}

/// Move the cursor from offscreen to a jittered viewport centre, then hover with
/// tiny idle motion.
pub async fn intro_settle(page: &Page, cursor: &mut CursorState, rng: &mut Mulberry32, budget_ms: u64) -> u64 {
    let started = Instant::now();
    let (cx, cy) = viewport_center(page).await;
    let jitter_x = rng.range(-40.0, 40.0);
    let jitter_y = rng.range(-40.0, 40.0);

    let path = generate_path(rng, -50.0, cy, cx + jitter_x, cy + jitter_y, 60.0, 90.0);
    cursor.move_along(page, &path).await;

    let remaining = budget_ms.saturating_sub(started.elapsed().as_millis() as u64);
    let hover_moves = (remaining / 200).min(3) as u32;
    cursor.hover_jitter(page, rng, hover_moves).await;

    started.elapsed().as_millis() as u64
}

/// Score nav anchors, prefer matches for pricing/features/customers/demo/about/contact,
/// hover with 2-4 micro-movements.
pub async fn hover_nav(page: &Page, cursor: &mut CursorState, rng: &mut Mulberry32, budget_ms: u64) -> u64 {
    let started = Instant::now();
    let candidates = query_elements(page, "nav a, header a").await;

    let best = candidates.iter().max_by_key(|c| {
        let text = c.text.to_lowercase();
        NAV_SCORE_TERMS.iter().filter(|term| text.contains(**term)).count()
    });

    if let Some(target) = best {
        let path = generate_path(rng, cursor.x, cursor.y, target.x, target.y, target.width.max(20.0), 90.0);
        cursor.move_along(page, &path).await;
        let moves = rng.range_i(2, 4) as u32;
        cursor.hover_jitter(page, rng, moves).await;
    } else {
        debug!("hover_nav found no nav anchors, skipping");
    }

    (started.elapsed().as_millis() as u64).min(budget_ms)
}

/// Content-aware scroll plan within budget, falling back to the default plan.
pub async fn scroll_drift(page: &Page, rng: &mut Mulberry32, budget_ms: u64) -> u64 {
    let started = Instant::now();
    let segment_budget = (budget_ms as f64 * 0.95) as u64;

    let headings = query_elements(page, "h1, h2, h3").await;
    let targets: Vec<HeadingTarget> = headings
        .iter()
        .take(2)
        .map(|h| HeadingTarget {
            offset_from_current_px: h.y - 200.0,
        })
        .collect();

    let plan = if targets.is_empty() {
        default_plan(rng, segment_budget)
    } else {
        content_aware_plan(rng, segment_budget, &targets)
    };

    for segment in plan {
        execute_scroll_segment(page, &segment).await;
        tokio::time::sleep(Duration::from_millis(segment.pause_after_ms)).await;
    }

    started.elapsed().as_millis() as u64
}

async fn execute_scroll_segment(page: &Page, segment: &crate::scroll::ScrollSegment) {
    const STEPS: u32 = 12;
    for i in 1..=STEPS {
        let u = i as f64 / STEPS as f64;
        let eased = scroll_ease(u);
        let delta = segment.amplitude_px * eased / STEPS as f64;
        let _ = page
            .evaluate(format!("window.scrollBy(0, {delta})"))
            .await;
        tokio::time::sleep(Duration::from_millis(segment.duration_ms / STEPS as u64)).await;
    }
}

/// Select the heading nearest viewport centre, scroll into view, hover + micro-jitter.
pub async fn hover_heading_near_center(
    page: &Page,
    cursor: &mut CursorState,
    rng: &mut Mulberry32,
    budget_ms: u64,
) -> u64 {
    let started = Instant::now();
    let headings = query_elements(page, "h1, h2, h3").await;
    let (_, center_y) = viewport_center(page).await;

    if let Some(target) = headings
        .iter()
        .min_by(|a, b| (a.y - center_y).abs().total_cmp(&(b.y - center_y).abs()))
    {
        let _ = page
            .evaluate("window.scrollBy(0, 0)")
            .await; // scroll-into-view margin handled by caller's scroll plan
        let path = generate_path(rng, cursor.x, cursor.y, target.x, target.y, target.width.max(40.0), 90.0);
        cursor.move_along(page, &path).await;
        let jitter_moves = rng.range_i(1, 3) as u32;
        cursor.hover_jitter(page, rng, jitter_moves).await;
    }

    (started.elapsed().as_millis() as u64).min(budget_ms)
}

/// Find a visible paragraph of 8-30 words; drag across 40-70% of its width; hold; release.
pub async fn highlight_sentence(page: &Page, cursor: &mut CursorState, rng: &mut Mulberry32, budget_ms: u64) -> u64 {
    let started = Instant::now();
    let paragraphs = query_elements(page, "p").await;

    let target = paragraphs.iter().find(|p| {
        let words = p.text.split_whitespace().count();
        (8..=30).contains(&words)
    });

    if let Some(p) = target {
        let start_x = p.x - p.width * 0.3;
        let drag_fraction = rng.range(0.4, 0.7);
        let end_x = start_x + p.width * drag_fraction;

        let approach = generate_path(rng, cursor.x, cursor.y, start_x, p.y, 30.0, 90.0);
        cursor.move_along(page, &approach).await;

        let drag = generate_path(rng, start_x, p.y, end_x, p.y, 30.0, 90.0);
        cursor.move_along(page, &drag).await;

        tokio::time::sleep(Duration::from_millis(rng.range_i(500, 900) as u64)).await;
    }

    (started.elapsed().as_millis() as u64).min(budget_ms)
}

/// Locate the highest-scoring allow-listed CTA; approach with slight overshoot,
/// micro-correct, hover (never click — §4.E "Safe-click policy").
pub async fn move_to_cta_and_hover(
    page: &Page,
    cursor: &mut CursorState,
    rng: &mut Mulberry32,
    budget_ms: u64,
) -> u64 {
    let started = Instant::now();
    let origin = page.url().await.ok().flatten().unwrap_or_default();
    let candidates = query_elements(page, "a, button").await;

    let mut best: Option<(&ElementRect, u32)> = None;
    for candidate in &candidates {
        let same_origin = candidate
            .href
            .as_deref()
            .map(|h| h.starts_with(&origin) || !h.contains("://"))
            .unwrap_or(true);
        let click = ClickCandidate {
            text: candidate.text.clone(),
            aria_label: String::new(),
            title: String::new(),
            href: candidate.href.clone(),
            same_origin,
        };
        let score = score_cta(&click);
        if score > 0 && best.as_ref().map(|(_, s)| score > *s).unwrap_or(true) {
            best = Some((candidate, score));
        }
    }

    if let Some((target, _)) = best {
        let path = generate_path(rng, cursor.x, cursor.y, target.x, target.y, target.width.max(30.0), 90.0);
        cursor.move_along(page, &path).await;
        cursor.hover_jitter(page, rng, 2).await;
    }

    (started.elapsed().as_millis() as u64).min(budget_ms)
}

/// Elastic final filler: ambient pause for budgets >= 5s, otherwise one micro-move
/// plus a sleep to the exact budget.
pub async fn idle(page: &Page, cursor: &mut CursorState, rng: &mut Mulberry32, budget_ms: u64) -> u64 {
    if budget_ms >= 5_000 {
        ambient_pause(page, cursor, rng, budget_ms).await
    } else {
        let started = Instant::now();
        cursor.hover_jitter(page, rng, 1).await;
        let spent = started.elapsed().as_millis() as u64;
        if spent < budget_ms {
            tokio::time::sleep(Duration::from_millis(budget_ms - spent)).await;
        }
        budget_ms
    }
}

/// Fills `budget_ms` with quiet windows interleaved with micro-moves or small scroll
/// nudges (§4.E "Ambient pause").
pub async fn ambient_pause(page: &Page, cursor: &mut CursorState, rng: &mut Mulberry32, budget_ms: u64) -> u64 {
    let started = Instant::now();
    let deadline_ms = budget_ms;

    while (started.elapsed().as_millis() as u64) < deadline_ms {
        let remaining = deadline_ms - started.elapsed().as_millis() as u64;
        let quiet_ms = rng.range_i(700, 1400).min(remaining as i64).max(0) as u64;
        tokio::time::sleep(Duration::from_millis(quiet_ms)).await;

        if (started.elapsed().as_millis() as u64) >= deadline_ms {
            break;
        }

        if rng.chance(0.7) {
            let dx = rng.range(-20.0, 20.0);
            let dy = rng.range(-20.0, 20.0);
            let x = cursor.x + dx;
            let y = cursor.y + dy;
            let path = generate_path(rng, cursor.x, cursor.y, x, y, 15.0, 90.0);
            cursor.move_along(page, &path).await;
        } else if rng.chance(0.2) {
            let nudge = rng.range(20.0, 40.0) * rng.sign();
            let _ = page.evaluate(format!("window.scrollBy(0, {nudge})")).await;
            tokio::time::sleep(Duration::from_millis(rng.range_i(300, 500) as u64)).await;
        }
    }

    started.elapsed().as_millis() as u64
}

#[cfg(test)]
mod tests {
    #[test]
    fn nav_score_terms_are_lowercase() {
        for term in super::NAV_SCORE_TERMS {
            assert_eq!(*term, term.to_lowercase());
        }
    }
}
