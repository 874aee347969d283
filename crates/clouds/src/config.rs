//! Effect configuration. Every field has a default so partial RON files load.

use crate::zone::ZoneSet;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Frame-rate driven quality settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    /// Fixed per-layer cap. `None` derives it from viewport width and core count.
    pub max_clouds: Option<usize>,
    /// Windows with fewer frames than this trigger a degradation step.
    pub fps_threshold: u32,
    /// The cap never drops below this.
    pub cap_floor: usize,
    /// Degradation never removes objects from a layer at or below this count.
    pub layer_floor: usize,
    /// Length of one frame-counting window.
    pub window_ms: f64,
    /// Viewports narrower than this count as mobile.
    pub mobile_width: u32,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            max_clouds: None,
            fps_threshold: 30,
            cap_floor: 3,
            layer_floor: 2,
            window_ms: 1000.0,
            mobile_width: 768,
        }
    }
}

impl PerformanceConfig {
    /// Starting per-layer cap for a host.
    pub fn initial_cap(&self, viewport_width: u32, cores: usize) -> usize {
        if let Some(cap) = self.max_clouds {
            return cap;
        }
        if viewport_width < self.mobile_width {
            3
        } else if cores < 4 {
            5
        } else {
            8
        }
    }
}

/// Oscillator constants of the animation driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    /// Horizontal float frequency factor (multiplies time and float speed).
    pub float_x_rate: f32,
    /// Vertical float frequency factor.
    pub float_y_rate: f32,
    /// Vertical amplitude relative to the horizontal one.
    pub float_y_ratio: f32,
    pub breathe_amplitude: f32,
    /// Breathing angular rate, rad/s.
    pub breathe_rate: f32,
    pub overlay_opacity_pulse: f32,
    pub overlay_opacity_rate: f32,
    pub overlay_depth_amplitude: f32,
    pub overlay_depth_rate: f32,
    pub parallax_overlay: f32,
    pub parallax_background: f32,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            float_x_rate: 0.3,
            float_y_rate: 0.5,
            float_y_ratio: 0.7,
            breathe_amplitude: 0.05,
            breathe_rate: 0.8,
            overlay_opacity_pulse: 0.3,
            overlay_opacity_rate: 1.2,
            overlay_depth_amplitude: 20.0,
            overlay_depth_rate: 0.3,
            parallax_overlay: 15.0,
            parallax_background: 8.0,
        }
    }
}

/// Layer composition and object opacities.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualConfig {
    pub background_layer_opacity: f32,
    /// Background layer opacity on mobile-width viewports.
    pub mobile_background_layer_opacity: f32,
    pub overlay_layer_opacity: f32,
    pub background_object_opacity: f32,
    pub overlay_object_opacity: f32,
    /// Side of a medium cloud quad; height is 0.6 of the width.
    pub base_quad_size: f32,
    /// Hide the overlay layer on mobile-width viewports.
    pub hide_overlay_on_mobile: bool,
}

impl Default for VisualConfig {
    fn default() -> Self {
        Self {
            background_layer_opacity: 0.8,
            mobile_background_layer_opacity: 0.4,
            overlay_layer_opacity: 0.15,
            background_object_opacity: 0.7,
            overlay_object_opacity: 0.25,
            base_quad_size: 200.0,
            hide_overlay_on_mobile: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticleConfig {
    pub enabled: bool,
    pub max_particles: usize,
    /// Particles per second. Zero stops emission.
    pub emission_rate: f32,
    /// Base lifetime in seconds; each particle lives 50-100% of it.
    pub lifetime: f32,
    pub speed_min: f32,
    pub speed_max: f32,
    pub size_min: f32,
    pub size_max: f32,
    pub opacity_start: f32,
    pub opacity_end: f32,
    pub gravity: f32,
    pub drag: f32,
    /// Age added per update, in seconds.
    pub time_step: f32,
    /// Spawn jitter extent per axis (full width).
    pub jitter: [f32; 3],
    /// Material opacity of the particle batches drawn on the overlay layer.
    pub overlay_opacity: f32,
}

impl Default for ParticleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_particles: 50,
            emission_rate: 2.0,
            lifetime: 10.0,
            speed_min: 0.5,
            speed_max: 2.0,
            size_min: 5.0,
            size_max: 20.0,
            opacity_start: 0.8,
            opacity_end: 0.0,
            gravity: 0.01,
            drag: 0.99,
            time_step: 0.016,
            jitter: [100.0, 100.0, 50.0],
            overlay_opacity: 0.3,
        }
    }
}

/// Complete effect configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectConfig {
    #[serde(default)]
    pub performance: PerformanceConfig,
    #[serde(default)]
    pub animation: AnimationConfig,
    #[serde(default)]
    pub visual: VisualConfig,
    #[serde(default)]
    pub particles: ParticleConfig,
    #[serde(default)]
    pub zones: ZoneSet,
    /// Seed of the first catalogue texture; the others follow consecutively.
    #[serde(default)]
    pub texture_seed_base: u64,
    /// Seed of the placement and particle generators.
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Optional artist-provided cloud image.
    #[serde(default)]
    pub artwork: Option<PathBuf>,
}

fn default_seed() -> u64 {
    0x0C10_D5
}

impl Default for EffectConfig {
    fn default() -> Self {
        Self {
            performance: PerformanceConfig::default(),
            animation: AnimationConfig::default(),
            visual: VisualConfig::default(),
            particles: ParticleConfig::default(),
            zones: ZoneSet::default(),
            texture_seed_base: 0,
            seed: default_seed(),
            artwork: None,
        }
    }
}

impl EffectConfig {
    /// Parse from RON text, then [`validate`](Self::validate).
    pub fn from_ron(text: &str) -> Result<Self, ron::error::SpannedError> {
        let mut config: Self = ron::from_str(text)?;
        config.validate();
        Ok(config)
    }

    /// Repair values serde cannot range-check: zone coordinates outside [0, 1].
    pub fn validate(&mut self) {
        self.zones.sanitize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_cap_follows_host() {
        let perf = PerformanceConfig::default();
        assert_eq!(perf.initial_cap(500, 16), 3);
        assert_eq!(perf.initial_cap(1920, 2), 5);
        assert_eq!(perf.initial_cap(1920, 8), 8);

        let fixed = PerformanceConfig {
            max_clouds: Some(6),
            ..Default::default()
        };
        assert_eq!(fixed.initial_cap(500, 1), 6);
    }

    #[test]
    fn partial_ron_keeps_defaults() {
        let config = EffectConfig::from_ron("(particles: (max_particles: 10), seed: 3)").unwrap();
        assert_eq!(config.particles.max_particles, 10);
        assert_eq!(config.particles.emission_rate, 2.0);
        assert_eq!(config.seed, 3);
        assert_eq!(config.zones.len(), 8);
        assert_eq!(config.performance.fps_threshold, 30);
    }

    #[test]
    fn out_of_range_zones_are_clamped_on_load() {
        let config = EffectConfig::from_ron(
            r#"(zones: [(name: "edge", zone: (x: 2.0, y: -1.0, depth: behind, size: small))])"#,
        )
        .unwrap();
        assert_eq!(config.zones.len(), 1);
        assert_eq!(config.zones.get("edge").map(|z| (z.x, z.y)), Some((1.0, 0.0)));
    }

    #[test]
    fn empty_ron_is_default() {
        let config = EffectConfig::from_ron("()").unwrap();
        assert_eq!(config.seed, default_seed());
        assert!(config.artwork.is_none());
    }
}
