//! Scroll segment planning (§4.E "Scroll segments"): bursts toward either
//! nothing in particular (default plan) or DOM headings (content-aware plan).

use crate::rng::Mulberry32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Envelope {
    Sin,
    Exp,
}

#[derive(Debug, Clone, Copy)]
pub struct ScrollSegment {
    pub duration_ms: u64,
    pub amplitude_px: f64,
    pub envelope: Envelope,
    pub pause_after_ms: u64,
}

/// Default scroll plan: small bursts with reading pauses, filling `budget_ms`,
/// with an occasional reverse "peek-back" (§4.E).
pub fn default_plan(rng: &mut Mulberry32, budget_ms: u64) -> Vec<ScrollSegment> {
    let mut segments = Vec::new();
    let mut used_ms = 0u64;

    while used_ms < budget_ms {
        let duration_ms = rng.range_i(900, 1600) as u64;
        let pause_after_ms = rng.range_i(900, 1800) as u64;
        let mut amplitude_px = rng.range(60.0, 140.0);
        if rng.chance(0.15) {
            amplitude_px = -rng.range(60.0, 120.0);
        }
        let envelope = if rng.chance(0.5) { Envelope::Sin } else { Envelope::Exp };

        let segment_cost = duration_ms + pause_after_ms;
        if used_ms + segment_cost > budget_ms && !segments.is_empty() {
            break;
        }

        segments.push(ScrollSegment {
            duration_ms,
            amplitude_px,
            envelope,
            pause_after_ms,
        });
        used_ms += segment_cost;
    }

    segments
}

/// A heading found in the DOM, close enough to plan a scroll burst toward.
#[derive(Debug, Clone)]
pub struct HeadingTarget {
    pub offset_from_current_px: f64,
}

/// Content-aware plan: bursts toward 1-2 heading targets within the time budget,
/// each followed by a long reading pause (§4.E).
pub fn content_aware_plan(
    rng: &mut Mulberry32,
    budget_ms: u64,
    headings: &[HeadingTarget],
) -> Vec<ScrollSegment> {
    if headings.is_empty() {
        return default_plan(rng, budget_ms);
    }

    let target_count = headings.len().min(2);
    let mut segments = Vec::new();
    let mut used_ms = 0u64;

    for heading in headings.iter().take(target_count) {
        if used_ms >= budget_ms {
            break;
        }
        let duration_ms = rng.range_i(900, 1600) as u64;
        let pause_after_ms = rng.range_i(1200, 2200) as u64;
        let envelope = if rng.chance(0.5) { Envelope::Sin } else { Envelope::Exp };

        segments.push(ScrollSegment {
            duration_ms,
            amplitude_px: heading.offset_from_current_px,
            envelope,
            pause_after_ms,
        });
        used_ms += duration_ms + pause_after_ms;
    }

    segments
}

/// Displacement-based minimum-jerk easing of a scroll amplitude at progress `u`.
pub fn scroll_ease(u: f64) -> f64 {
    crate::path::min_jerk(u)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_plan_never_exceeds_budget_by_much() {
        let mut rng = Mulberry32::new(3);
        let plan = default_plan(&mut rng, 5_000);
        let total: u64 = plan.iter().map(|s| s.duration_ms + s.pause_after_ms).sum();
        assert!(total <= 6_600);
    }

    #[test]
    fn content_aware_plan_targets_at_most_two_headings() {
        let mut rng = Mulberry32::new(3);
        let headings = vec![
            HeadingTarget { offset_from_current_px: 400.0 },
            HeadingTarget { offset_from_current_px: 900.0 },
            HeadingTarget { offset_from_current_px: 1400.0 },
        ];
        let plan = content_aware_plan(&mut rng, 10_000, &headings);
        assert!(plan.len() <= 2);
    }

    #[test]
    fn empty_headings_falls_back_to_default_plan() {
        let mut rng = Mulberry32::new(3);
        let plan = content_aware_plan(&mut rng, 5_000, &[]);
        assert!(!plan.is_empty());
    }
}
