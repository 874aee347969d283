//! Cloud variation parameters: size, complexity, and outline shape.

use serde::{Deserialize, Serialize};

/// Size class shared by texture variations and placement zones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeClass {
    Small,
    Medium,
    Large,
}

impl SizeClass {
    /// Raster size (width, height) of a cloud texture of this class.
    pub fn canvas_size(self) -> (u32, u32) {
        match self {
            SizeClass::Small => (300, 180),
            SizeClass::Medium => (500, 300),
            SizeClass::Large => (700, 420),
        }
    }

    /// Multiplier applied to the base quad size when placing a cloud.
    pub fn size_multiplier(self) -> f32 {
        match self {
            SizeClass::Small => 0.6,
            SizeClass::Medium => 1.0,
            SizeClass::Large => 1.4,
        }
    }
}

/// How much concentric detail a cloud carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Simple,
    Detailed,
    Complex,
}

impl Complexity {
    /// Number of concentric rings drawn.
    pub fn ring_count(self) -> u32 {
        match self {
            Complexity::Simple => 10,
            Complexity::Detailed => 15,
            Complexity::Complex => 20,
        }
    }
}

/// Base outline profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CloudShape {
    Round,
    Oval,
    Irregular,
    Wispy,
}

impl CloudShape {
    /// Radius multiplier at `angle` (radians) for this profile.
    pub fn multiplier(self, angle: f32) -> f32 {
        match self {
            CloudShape::Round => 1.0 + 0.1 * (angle * 4.0).sin(),
            CloudShape::Oval => 1.0 + 0.3 * (angle * 2.0).cos(),
            CloudShape::Irregular => 1.0 + 0.4 * (angle * 3.0).sin() + 0.2 * (angle * 5.0).cos(),
            CloudShape::Wispy => 1.0 + 0.5 * (angle * 1.5).sin() * (angle * 2.5).cos(),
        }
    }
}

/// Immutable description of one procedural cloud texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CloudVariation {
    pub size: SizeClass,
    pub complexity: Complexity,
    pub shape: CloudShape,
}

impl CloudVariation {
    pub const fn new(size: SizeClass, complexity: Complexity, shape: CloudShape) -> Self {
        Self { size, complexity, shape }
    }

    /// The eight stock variations, in catalogue order.
    pub fn catalogue() -> [CloudVariation; 8] {
        use CloudShape::*;
        use Complexity::*;
        use SizeClass::*;
        [
            CloudVariation::new(Small, Simple, Round),
            CloudVariation::new(Medium, Detailed, Oval),
            CloudVariation::new(Large, Complex, Irregular),
            CloudVariation::new(Small, Detailed, Wispy),
            CloudVariation::new(Medium, Simple, Round),
            CloudVariation::new(Large, Detailed, Oval),
            CloudVariation::new(Small, Complex, Irregular),
            CloudVariation::new(Medium, Detailed, Wispy),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_profiles_are_distinct() {
        let angle = 0.7;
        let values: Vec<f32> = [CloudShape::Round, CloudShape::Oval, CloudShape::Irregular, CloudShape::Wispy]
            .iter()
            .map(|s| s.multiplier(angle))
            .collect();
        for i in 0..values.len() {
            for j in (i + 1)..values.len() {
                assert!((values[i] - values[j]).abs() > 1e-3);
            }
        }
    }

    #[test]
    fn catalogue_covers_every_shape() {
        let cat = CloudVariation::catalogue();
        for shape in [CloudShape::Round, CloudShape::Oval, CloudShape::Irregular, CloudShape::Wispy] {
            assert!(cat.iter().any(|v| v.shape == shape));
        }
    }
}
