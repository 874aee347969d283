//! Organic closed outlines and their quadratic smoothing.

use crate::variation::CloudShape;
use glam::Vec2;
use rand::Rng;
use std::f32::consts::TAU;

/// Sample points per ring outline.
pub const OUTLINE_POINTS: usize = 32;

/// Weight of the neighbour difference when placing a curve control point.
const CONTROL_WEIGHT: f32 = 0.2;

/// Generate one closed organic outline around `center`.
///
/// The radius of each sample is `radius * (shape + layer_detail + noise)`,
/// where `layer_detail` is a harmonic of the ring index and `noise` comes
/// from `rng`. The ring's organic factor is drawn first, then one noise value
/// per sample, so the same generator state always yields the same outline.
pub fn organic_ring<R: Rng + ?Sized>(
    center: Vec2,
    radius: f32,
    shape: CloudShape,
    ring: u32,
    organic_variation: f32,
    rng: &mut R,
) -> Vec<Vec2> {
    let organic = organic_variation * (rng.gen::<f32>() * 0.5 + 0.5);

    (0..OUTLINE_POINTS)
        .map(|i| {
            let angle = i as f32 / OUTLINE_POINTS as f32 * TAU;
            let layer_detail = 0.1 * (angle * ring as f32).sin() * organic;
            let noise = (rng.gen::<f32>() - 0.5) * organic * 0.3;
            let r = radius * (shape.multiplier(angle) + layer_detail + noise);
            center + Vec2::new(angle.cos(), angle.sin()) * r
        })
        .collect()
}

/// Flatten a closed outline into a polyline of quadratic curve segments.
///
/// Each point `p[i]` is joined to `p[i + 1]` by a quadratic Bezier whose
/// control point is `p[i] + (p[i + 1] - p[i - 1]) * 0.2`. Every segment is
/// sampled `steps` times. Outlines with fewer than three points produce an
/// empty path.
pub fn smooth_closed_path(points: &[Vec2], steps: usize) -> Vec<Vec2> {
    let n = points.len();
    if n < 3 {
        return Vec::new();
    }
    let steps = steps.max(1);

    let mut path = Vec::with_capacity(n * steps + 1);
    path.push(points[0]);
    for i in 0..n {
        let current = points[i];
        let next = points[(i + 1) % n];
        let prev = points[(i + n - 1) % n];
        let control = current + (next - prev) * CONTROL_WEIGHT;

        for s in 1..=steps {
            let t = s as f32 / steps as f32;
            let u = 1.0 - t;
            path.push(current * (u * u) + control * (2.0 * u * t) + next * (t * t));
        }
    }
    path
}
