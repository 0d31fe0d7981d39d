//! Cursor path generation: Fitts' Law timing, cubic Bézier sampling, minimum-jerk
//! easing, micro-jitter, and optional overshoot (§4.E "Path generation").

use crate::rng::Mulberry32;

/// Fitts' Law constants (empirical, tuned for mouse-style pointing).
const FITTS_A_MS: f64 = 120.0;
const FITTS_B_MS: f64 = 180.0;
const MIN_DURATION_MS: f64 = 120.0;
const MAX_DURATION_MS: f64 = 1200.0;

#[derive(Debug, Clone, Copy)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// One sampled point along a generated cursor path, with its offset from the
/// path's start.
#[derive(Debug, Clone, Copy)]
pub struct PathSample {
    pub x: f64,
    pub y: f64,
    pub elapsed_ms: f64,
}

/// Duration for a point-to-point move via Fitts' Law:
/// `T = a + b * log2(1 + distance / width)`, clamped to `[120, 1200]` ms.
pub fn fitts_duration_ms(distance: f64, target_width: f64) -> f64 {
    let width = target_width.max(1.0);
    let duration = FITTS_A_MS + FITTS_B_MS * (1.0 + distance / width).log2();
    duration.clamp(MIN_DURATION_MS, MAX_DURATION_MS)
}

/// Minimum-jerk time-parameterization scalar: `s(u) = 10u^3 - 15u^4 + 6u^5`.
pub fn min_jerk(u: f64) -> f64 {
    let u = u.clamp(0.0, 1.0);
    10.0 * u.powi(3) - 15.0 * u.powi(4) + 6.0 * u.powi(5)
}

fn cubic_bezier(p0: Point, p1: Point, p2: Point, p3: Point, s: f64) -> Point {
    let inv = 1.0 - s;
    let x = inv.powi(3) * p0.x
        + 3.0 * inv.powi(2) * s * p1.x
        + 3.0 * inv * s.powi(2) * p2.x
        + s.powi(3) * p3.x;
    let y = inv.powi(3) * p0.y
        + 3.0 * inv.powi(2) * s * p1.y
        + 3.0 * inv * s.powi(2) * p2.y
        + s.powi(3) * p3.y;
    Point { x, y }
}

/// Generate a human-ish cursor path from `(x0, y0)` to `(x1, y1)`, sampled at
/// `sample_rate_hz` (§4.E: "60-120 Hz"), with low-pass micro-jitter that decays to
/// zero at the endpoint and an optional overshoot-then-correct tail.
pub fn generate_path(
    rng: &mut Mulberry32,
    x0: f64,
    y0: f64,
    x1: f64,
    y1: f64,
    target_width: f64,
    sample_rate_hz: f64,
) -> Vec<PathSample> {
    let dx = x1 - x0;
    let dy = y1 - y0;
    let distance = (dx * dx + dy * dy).sqrt();
    let duration_ms = fitts_duration_ms(distance, target_width);

    // Perpendicular unit vector for control-point offsets.
    let (perp_x, perp_y) = if distance > f64::EPSILON {
        (-dy / distance, dx / distance)
    } else {
        (0.0, 1.0)
    };
    let offset_mag = distance * rng.range(0.02, 0.08) * rng.sign();

    let overshoot = rng.chance(0.35);
    let (end_x, end_y) = if overshoot {
        let overshoot_px = rng.range(2.0, 6.0);
        let norm = if distance > f64::EPSILON {
            (dx / distance, dy / distance)
        } else {
            (0.0, 0.0)
        };
        (x1 + norm.0 * overshoot_px, y1 + norm.1 * overshoot_px)
    } else {
        (x1, y1)
    };

    let p0 = Point { x: x0, y: y0 };
    let p3 = Point { x: end_x, y: end_y };
    let p1 = Point {
        x: x0 + dx * 0.33 + perp_x * offset_mag,
        y: y0 + dy * 0.33 + perp_y * offset_mag,
    };
    let p2 = Point {
        x: x0 + dx * 0.66 + perp_x * offset_mag,
        y: y0 + dy * 0.66 + perp_y * offset_mag,
    };

    let total_samples = ((duration_ms / 1000.0) * sample_rate_hz).round().max(2.0) as usize;
    let mut samples = Vec::with_capacity(total_samples + 8);

    for i in 0..=total_samples {
        let u = i as f64 / total_samples as f64;
        let s = min_jerk(u);
        let mut point = cubic_bezier(p0, p1, p2, p3, s);

        // Micro-jitter amplitude decays to zero at the endpoint.
        let jitter_envelope = (1.0 - u).max(0.0);
        let jitter_amp = rng.range(0.4, 1.2) * jitter_envelope;
        point.x += rng.range(-1.0, 1.0) * jitter_amp;
        point.y += rng.range(-1.0, 1.0) * jitter_amp;

        samples.push(PathSample {
            x: point.x,
            y: point.y,
            elapsed_ms: u * duration_ms,
        });
    }

    if overshoot {
        let correction_ms = rng.range(80.0, 120.0);
        let correction_samples = ((correction_ms / 1000.0) * sample_rate_hz).round().max(1.0) as usize;
        let start = samples.last().copied().unwrap_or(PathSample {
            x: end_x,
            y: end_y,
            elapsed_ms: duration_ms,
        });
        for i in 1..=correction_samples {
            let u = i as f64 / correction_samples as f64;
            let s = min_jerk(u);
            samples.push(PathSample {
                x: start.x + (x1 - start.x) * s,
                y: start.y + (y1 - start.y) * s,
                elapsed_ms: duration_ms + u * correction_ms,
            });
        }
    }

    samples
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fitts_duration_is_clamped() {
        assert!(fitts_duration_ms(0.0, 100.0) >= MIN_DURATION_MS);
        assert!(fitts_duration_ms(100_000.0, 1.0) <= MAX_DURATION_MS);
    }

    #[test]
    fn min_jerk_boundaries_are_exact() {
        assert_eq!(min_jerk(0.0), 0.0);
        assert!((min_jerk(1.0) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn same_seed_generates_identical_path() {
        let mut a = Mulberry32::new(99);
        let mut b = Mulberry32::new(99);
        let path_a = generate_path(&mut a, 0.0, 0.0, 400.0, 200.0, 40.0, 60.0);
        let path_b = generate_path(&mut b, 0.0, 0.0, 400.0, 200.0, 40.0, 60.0);
        assert_eq!(path_a.len(), path_b.len());
        for (sa, sb) in path_a.iter().zip(path_b.iter()) {
            assert!((sa.x - sb.x).abs() < 1e-9);
            assert!((sa.y - sb.y).abs() < 1e-9);
        }
    }

    #[test]
    fn path_ends_near_the_target() {
        let mut rng = Mulberry32::new(5);
        let path = generate_path(&mut rng, 0.0, 0.0, 300.0, 0.0, 50.0, 60.0);
        let last = path.last().unwrap();
        assert!((last.x - 300.0).abs() < 10.0);
    }
}
