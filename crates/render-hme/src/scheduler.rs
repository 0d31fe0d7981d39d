//! Picks and runs a beat script for a scene's duration (§4.E "Scheduler" and
//! "Budget enforcement").

use std::time::Instant;

use chromiumoxide::page::Page;
use tracing::{debug, warn};

use crate::beats;
use crate::cursor::CursorState;
use crate::rng::Mulberry32;

/// Minimum ms reserved per remaining beat when allocating the current beat's
/// share of the budget (§4.E).
const MIN_BEAT_MS: u64 = 400;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BeatKind {
    IntroSettle,
    HoverNav,
    ScrollDrift,
    HoverHeadingNearCenter,
    HighlightSentence,
    MoveToCtaAndHover,
    Idle,
}

struct ScheduledBeat {
    kind: BeatKind,
    share_ms: u64,
}

/// Run the Human Motion Engine for exactly `duration_ms` against `page`, seeded
/// deterministically from `scene_url`.
pub async fn run_choreography(page: &Page, scene_url: &str, duration_ms: u64) {
    let mut rng = Mulberry32::from_url(scene_url);
    let mut cursor = CursorState::new(-50.0, 0.0);

    if is_authentication_page(page).await {
        debug!("authentication page detected, short-circuiting to intro_settle + idle");
        let intro_share = duration_ms.min(1_500);
        beats::intro_settle(page, &mut cursor, &mut rng, intro_share).await;
        let remaining = duration_ms.saturating_sub(intro_share);
        beats::idle(page, &mut cursor, &mut rng, remaining).await;
        return;
    }

    let script = if duration_ms < 10_000 {
        simplified_script(duration_ms, &mut rng)
    } else {
        full_script(duration_ms, &mut rng)
    };

    let started = Instant::now();
    let mut remaining_beats = script.len();

    for beat in script {
        remaining_beats -= 1;
        let reserve = MIN_BEAT_MS * remaining_beats as u64;
        let elapsed = started.elapsed().as_millis() as u64;
        let total_remaining = duration_ms.saturating_sub(elapsed);
        let max_budget = total_remaining.saturating_sub(reserve).max(MIN_BEAT_MS).min(beat.share_ms.max(MIN_BEAT_MS));

        let result = run_beat(beat.kind, page, &mut cursor, &mut rng, max_budget).await;
        if let Err(e) = result {
            warn!(beat = ?beat.kind, error = %e, "beat errored, skipping");
        }
    }

    let total_elapsed = started.elapsed().as_millis() as u64;
    if total_elapsed < duration_ms {
        let deficit = duration_ms - total_elapsed;
        beats::ambient_pause(page, &mut cursor, &mut rng, deficit).await;
    }
}

async fn run_beat(
    kind: BeatKind,
    page: &Page,
    cursor: &mut CursorState,
    rng: &mut Mulberry32,
    budget_ms: u64,
) -> Result<u64, &'static str> {
    let elapsed = match kind {
        BeatKind::IntroSettle => beats::intro_settle(page, cursor, rng, budget_ms).await,
        BeatKind::HoverNav => beats::hover_nav(page, cursor, rng, budget_ms).await,
        BeatKind::ScrollDrift => beats::scroll_drift(page, rng, budget_ms).await,
        BeatKind::HoverHeadingNearCenter => {
            beats::hover_heading_near_center(page, cursor, rng, budget_ms).await
        }
        BeatKind::HighlightSentence => beats::highlight_sentence(page, cursor, rng, budget_ms).await,
        BeatKind::MoveToCtaAndHover => beats::move_to_cta_and_hover(page, cursor, rng, budget_ms).await,
        BeatKind::Idle => beats::idle(page, cursor, rng, budget_ms).await,
    };
    Ok(elapsed)
}

fn simplified_script(duration_ms: u64, rng: &mut Mulberry32) -> Vec<ScheduledBeat> {
    let scroll_share = (duration_ms as f64 * rng.range(0.40, 0.50)) as u64;
    let intro_share = duration_ms.min(1_000);
    let idle_share = duration_ms.saturating_sub(scroll_share + intro_share);

    vec![
        ScheduledBeat { kind: BeatKind::IntroSettle, share_ms: intro_share },
        ScheduledBeat { kind: BeatKind::ScrollDrift, share_ms: scroll_share },
        ScheduledBeat { kind: BeatKind::Idle, share_ms: idle_share },
    ]
}

fn full_script(duration_ms: u64, rng: &mut Mulberry32) -> Vec<ScheduledBeat> {
    let intro = rng.range_i(800, 1200) as u64;
    let nav = rng.range_i(2_500, 4_000) as u64;
    let scroll = ((duration_ms as f64 * rng.range(0.40, 0.50)) as u64).min(12_000);
    let heading = rng.range_i(2_500, 4_000) as u64;
    let highlight = rng.range_i(1_800, 3_000) as u64;
    let cta = rng.range_i(1_500, 2_500) as u64;

    let fixed_total = intro + nav + scroll + heading + highlight + cta;
    let idle = duration_ms.saturating_sub(fixed_total).max(1_000);

    vec![
        ScheduledBeat { kind: BeatKind::IntroSettle, share_ms: intro },
        ScheduledBeat { kind: BeatKind::HoverNav, share_ms: nav },
        ScheduledBeat { kind: BeatKind::ScrollDrift, share_ms: scroll },
        ScheduledBeat { kind: BeatKind::HoverHeadingNearCenter, share_ms: heading },
        ScheduledBeat { kind: BeatKind::HighlightSentence, share_ms: highlight },
        ScheduledBeat { kind: BeatKind::MoveToCtaAndHover, share_ms: cta },
        ScheduledBeat { kind: BeatKind::Idle, share_ms: idle },
    ]
}

async fn is_authentication_page(page: &Page) -> bool {
    let script = r#"
        (() => {
          if (document.querySelector('input[type=password]')) return true;
          const heading = document.querySelector('h1, h2');
          if (!heading) return false;
          const text = (heading.innerText || '').toLowerCase();
          return text.includes('log in') || text.includes('login') || text.includes('sign in');
        })();
    "#;
    page.evaluate(script)
        .await
        .ok()
        .and_then(|r| r.into_value::<bool>().ok())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simplified_script_has_three_beats() {
        let mut rng = Mulberry32::new(1);
        let script = simplified_script(8_000, &mut rng);
        assert_eq!(script.len(), 3);
    }

    #[test]
    fn full_script_has_seven_beats() {
        let mut rng = Mulberry32::new(1);
        let script = full_script(30_000, &mut rng);
        assert_eq!(script.len(), 7);
    }

    #[test]
    fn full_script_shares_stay_within_duration_order_of_magnitude() {
        let mut rng = Mulberry32::new(1);
        let script = full_script(20_000, &mut rng);
        let total: u64 = script.iter().map(|b| b.share_ms).sum();
        assert!(total <= 20_000 + 12_000);
    }
}
