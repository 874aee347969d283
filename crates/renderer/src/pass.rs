//! Backend-neutral description of one frame: a pass per layer.

use crate::camera::LayerCamera;
use engine_core::Transform;
use procgen::TextureId;

/// The two render layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LayerKind {
    /// Drawn behind page content.
    Background,
    /// Drawn in front of page content.
    Overlay,
}

impl LayerKind {
    pub const ALL: [LayerKind; 2] = [LayerKind::Background, LayerKind::Overlay];

    pub fn name(self) -> &'static str {
        match self {
            LayerKind::Background => "background",
            LayerKind::Overlay => "overlay",
        }
    }
}

/// How a quad blends into its layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendMode {
    Alpha,
    Additive,
}

/// How a whole layer composes over what lies beneath it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerBlend {
    Normal,
    Screen,
}

/// Stacking and composition settings of a layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Composition {
    pub z_index: i32,
    pub opacity: f32,
    pub blend: LayerBlend,
}

/// One textured, camera-facing quad.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadDraw {
    pub texture: TextureId,
    pub transform: Transform,
    /// Unscaled quad width in world units.
    pub width: f32,
    /// Unscaled quad height in world units.
    pub height: f32,
    pub opacity: f32,
    pub blend: BlendMode,
}

/// Batched point sprites sharing one texture: a single draw call.
///
/// Buffers hold `capacity` slots; slots past `draw_count` are zero.
#[derive(Debug, Clone, PartialEq)]
pub struct PointBatch {
    pub texture: TextureId,
    /// xyz triples, `3 * capacity` floats.
    pub positions: Vec<f32>,
    pub opacities: Vec<f32>,
    pub sizes: Vec<f32>,
    pub draw_count: usize,
    /// Material opacity multiplied into every point.
    pub opacity: f32,
    pub blend: BlendMode,
}

impl PointBatch {
    pub fn with_capacity(texture: TextureId, capacity: usize) -> Self {
        Self {
            texture,
            positions: vec![0.0; capacity * 3],
            opacities: vec![0.0; capacity],
            sizes: vec![0.0; capacity],
            draw_count: 0,
            opacity: 1.0,
            blend: BlendMode::Additive,
        }
    }

    pub fn capacity(&self) -> usize {
        self.sizes.len()
    }

    /// Iterate the active points as (position, opacity, size).
    pub fn active(&self) -> impl Iterator<Item = ([f32; 3], f32, f32)> + '_ {
        (0..self.draw_count.min(self.capacity())).map(move |i| {
            let p = [self.positions[i * 3], self.positions[i * 3 + 1], self.positions[i * 3 + 2]];
            (p, self.opacities[i], self.sizes[i])
        })
    }
}

/// Everything one layer draws this frame.
#[derive(Debug, Clone)]
pub struct LayerPass {
    pub kind: LayerKind,
    pub camera: LayerCamera,
    pub composition: Composition,
    pub quads: Vec<QuadDraw>,
    pub points: Vec<PointBatch>,
}
