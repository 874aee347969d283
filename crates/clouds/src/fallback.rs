//! Gradient backdrop shown when the rendering engine cannot be brought up.
//!
//! Five soft green spots drifting on a one-minute loop. The same backdrop
//! renders as a stylesheet for the host and as a raster on the CPU.

use glam::Vec2;
use procgen::{Rgb, TextureData};
use std::fmt::Write;

/// CSS class the host applies to the backdrop element.
pub const FALLBACK_CLASS: &str = "neo-clouds-fallback";

const SPOT_COLOR: Rgb = Rgb::new(0x84, 0xFE, 0x8E);

/// One radial gradient spot, in percent of the viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientSpot {
    pub x_pct: f32,
    pub y_pct: f32,
    pub alpha: f32,
    /// Fade-out radius in percent of the gradient ray.
    pub radius_pct: f32,
}

const DEFAULT_SPOTS: [GradientSpot; 5] = [
    GradientSpot { x_pct: 15.0, y_pct: 30.0, alpha: 0.3, radius_pct: 20.0 },
    GradientSpot { x_pct: 85.0, y_pct: 60.0, alpha: 0.2, radius_pct: 25.0 },
    GradientSpot { x_pct: 65.0, y_pct: 15.0, alpha: 0.15, radius_pct: 15.0 },
    GradientSpot { x_pct: 25.0, y_pct: 70.0, alpha: 0.25, radius_pct: 20.0 },
    GradientSpot { x_pct: 75.0, y_pct: 45.0, alpha: 0.2, radius_pct: 18.0 },
];

/// Drift keyframes: (fraction of the cycle, offset in px).
const DRIFT_KEYFRAMES: [(f32, Vec2); 5] = [
    (0.0, Vec2::new(0.0, 0.0)),
    (0.25, Vec2::new(20.0, -15.0)),
    (0.5, Vec2::new(-15.0, 25.0)),
    (0.75, Vec2::new(10.0, 5.0)),
    (1.0, Vec2::new(0.0, 0.0)),
];

#[derive(Debug, Clone)]
pub struct GradientBackdrop {
    spots: Vec<GradientSpot>,
    cycle_seconds: f32,
}

impl Default for GradientBackdrop {
    fn default() -> Self {
        Self {
            spots: DEFAULT_SPOTS.to_vec(),
            cycle_seconds: 60.0,
        }
    }
}

impl GradientBackdrop {
    pub fn spots(&self) -> &[GradientSpot] {
        &self.spots
    }

    /// Backdrop translation at `t` seconds.
    pub fn drift_offset(&self, t: f32) -> Vec2 {
        let phase = (t / self.cycle_seconds).rem_euclid(1.0);
        for pair in DRIFT_KEYFRAMES.windows(2) {
            let (start, from) = pair[0];
            let (end, to) = pair[1];
            if phase <= end {
                let local = (phase - start) / (end - start);
                return from.lerp(to, ease_in_out(local));
            }
        }
        Vec2::ZERO
    }

    /// Stylesheet for the fallback element, keyframes included.
    pub fn css(&self) -> String {
        let gradients: Vec<String> = self
            .spots
            .iter()
            .map(|s| {
                format!(
                    "radial-gradient(circle at {}% {}%, rgba({}, {}, {}, {}) 0%, transparent {}%)",
                    s.x_pct, s.y_pct, SPOT_COLOR.r, SPOT_COLOR.g, SPOT_COLOR.b, s.alpha, s.radius_pct
                )
            })
            .collect();

        let mut css = String::new();
        let _ = writeln!(css, ".{FALLBACK_CLASS} {{");
        let _ = writeln!(css, "  position: fixed;");
        let _ = writeln!(css, "  inset: 0;");
        let _ = writeln!(css, "  z-index: {};", crate::scene::BACKGROUND_Z_INDEX);
        let _ = writeln!(css, "  pointer-events: none;");
        let _ = writeln!(css, "  background: {};", gradients.join(",\n    "));
        let _ = writeln!(css, "  animation: {FALLBACK_CLASS}-drift {}s ease-in-out infinite;", self.cycle_seconds);
        let _ = writeln!(css, "}}");
        let _ = writeln!(css, "@keyframes {FALLBACK_CLASS}-drift {{");
        for (at, offset) in DRIFT_KEYFRAMES {
            let _ = writeln!(
                css,
                "  {}% {{ transform: translate({}px, {}px); }}",
                (at * 100.0).round(),
                offset.x,
                offset.y
            );
        }
        let _ = writeln!(css, "}}");
        css
    }

    /// Rasterize the backdrop at `t` seconds onto a transparent canvas.
    pub fn render(&self, width: u32, height: u32, t: f32) -> TextureData {
        let mut texture = TextureData::new(width, height);
        if texture.is_empty() {
            return texture;
        }
        let offset = self.drift_offset(t);
        let size = Vec2::new(width as f32, height as f32);

        for spot in &self.spots {
            let center = Vec2::new(spot.x_pct, spot.y_pct) / 100.0 * size + offset;
            // Circle gradients default to the farthest corner as their ray length
            let ray = [Vec2::ZERO, Vec2::new(size.x, 0.0), Vec2::new(0.0, size.y), size]
                .iter()
                .map(|c| c.distance(center))
                .fold(0.0f32, f32::max);
            let radius = ray * spot.radius_pct / 100.0;
            if radius <= 0.0 {
                continue;
            }
            for y in 0..height {
                for x in 0..width {
                    let d = Vec2::new(x as f32 + 0.5, y as f32 + 0.5).distance(center);
                    if d < radius {
                        texture.blend_over(x, y, SPOT_COLOR, spot.alpha * (1.0 - d / radius));
                    }
                }
            }
        }
        texture
    }
}

/// CSS `ease-in-out`: cubic-bezier(0.42, 0, 0.58, 1).
pub fn ease_in_out(x: f32) -> f32 {
    let x = x.clamp(0.0, 1.0);
    let bezier = |s: f32, p1: f32, p2: f32| {
        let inv = 1.0 - s;
        3.0 * inv * inv * s * p1 + 3.0 * inv * s * s * p2 + s * s * s
    };
    // x(s) is monotonic, so bisect for the curve parameter
    let (mut lo, mut hi) = (0.0f32, 1.0f32);
    for _ in 0..32 {
        let mid = (lo + hi) * 0.5;
        if bezier(mid, 0.42, 0.58) < x {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    bezier((lo + hi) * 0.5, 0.0, 1.0)
}
