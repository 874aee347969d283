//! Placement planning: zones in, positioned cloud objects out.

use crate::config::VisualConfig;
use crate::zone::{DepthClass, Zone, ZoneSet};
use engine_core::Transform;
use glam::{Vec2, Vec3};
use procgen::TextureId;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use renderer::{BlendMode, LayerKind, QuadDraw};

/// Per-object oscillator parameters, fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionParams {
    pub float_speed: f32,
    pub float_amplitude: f32,
    /// Radians added to the z rotation every frame.
    pub rotation_speed: f32,
    pub pulse_phase: f32,
}

impl MotionParams {
    /// Draw a parameter set from `rng`.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            float_speed: 0.5 + rng.gen::<f32>(),
            float_amplitude: 30.0 + rng.gen::<f32>() * 50.0,
            rotation_speed: (rng.gen::<f32>() - 0.5) * 0.001,
            pulse_phase: rng.gen::<f32>() * std::f32::consts::TAU,
        }
    }
}

/// A cloud quad anchored to a zone.
///
/// `transform` and `opacity` are animation outputs, rewritten every frame
/// from `original`, `motion` and the clock.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedObject {
    pub zone_name: String,
    pub zone: Zone,
    pub texture: TextureId,
    pub width: f32,
    pub height: f32,
    pub blend: BlendMode,
    pub base_opacity: f32,
    pub original: Vec2,
    pub motion: MotionParams,
    pub transform: Transform,
    pub opacity: f32,
}

impl PlacedObject {
    pub fn depth(&self) -> DepthClass {
        self.zone.depth
    }

    pub fn layer(&self) -> LayerKind {
        self.zone.depth.layer()
    }

    /// Recompute the anchor for a new viewport. The live position is left to the next frame.
    pub fn relayout(&mut self, width: u32, height: u32) {
        self.original = self.zone.anchor(width, height);
    }

    pub fn to_draw(&self) -> QuadDraw {
        QuadDraw {
            texture: self.texture,
            transform: self.transform,
            width: self.width,
            height: self.height,
            opacity: self.opacity,
            blend: self.blend,
        }
    }
}

/// Strategy that turns zones into objects. Injected into the scene at construction.
pub trait PlacementStrategy {
    /// One object per zone, in zone order, textures assigned by cycling `textures`.
    fn place(&mut self, zones: &ZoneSet, textures: &[TextureId], viewport: (u32, u32)) -> Vec<PlacedObject>;

    /// Re-derive anchors after a viewport change.
    fn relayout(&self, objects: &mut [PlacedObject], viewport: (u32, u32)) {
        for object in objects {
            object.relayout(viewport.0, viewport.1);
        }
    }
}

/// Zone-driven placement with seeded motion parameters.
pub struct StrategicPlacer {
    rng: StdRng,
    visual: VisualConfig,
}

impl StrategicPlacer {
    pub fn new(seed: u64, visual: VisualConfig) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            visual,
        }
    }

    fn place_zone(&mut self, name: &str, zone: &Zone, texture: TextureId, viewport: (u32, u32)) -> PlacedObject {
        let width = self.visual.base_quad_size * zone.size.size_multiplier();
        let (blend, base_opacity) = match zone.depth {
            DepthClass::Overlay => (BlendMode::Additive, self.visual.overlay_object_opacity),
            DepthClass::Behind => (BlendMode::Alpha, self.visual.background_object_opacity),
        };
        let original = zone.anchor(viewport.0, viewport.1);

        PlacedObject {
            zone_name: name.to_string(),
            zone: *zone,
            texture,
            width,
            height: width * 0.6,
            blend,
            base_opacity,
            original,
            motion: MotionParams::random(&mut self.rng),
            transform: Transform::from_position(Vec3::new(original.x, original.y, zone.depth.base_z())),
            opacity: base_opacity,
        }
    }
}

impl PlacementStrategy for StrategicPlacer {
    fn place(&mut self, zones: &ZoneSet, textures: &[TextureId], viewport: (u32, u32)) -> Vec<PlacedObject> {
        if textures.is_empty() {
            log::warn!("No cloud textures available; nothing placed");
            return Vec::new();
        }
        zones
            .iter()
            .enumerate()
            .map(|(i, named)| self.place_zone(&named.name, &named.zone, textures[i % textures.len()], viewport))
            .collect()
    }
}
