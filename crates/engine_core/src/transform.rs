//! Transform component for camera-facing quads.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Quat, Vec3};

/// Placement of a quad: position, rotation about the view axis, uniform scale.
///
/// Clouds and particles always face the camera, so rotation is a single
/// angle around +Z rather than a full quaternion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    /// Rotation around the Z axis in radians.
    pub rotation_z: f32,
    pub scale: f32,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation_z: 0.0,
            scale: 1.0,
        }
    }
}

impl Transform {
    /// Create a new transform at the given position.
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Model matrix for a quad of the given width and height.
    pub fn to_matrix(&self, width: f32, height: f32) -> Mat4 {
        Mat4::from_scale_rotation_translation(
            Vec3::new(width * self.scale, height * self.scale, 1.0),
            Quat::from_rotation_z(self.rotation_z),
            self.position,
        )
    }

    /// Rotate around Z by `angle` radians.
    pub fn rotate_z(&mut self, angle: f32) {
        self.rotation_z += angle;
    }
}

/// Raw transform data for GPU upload (instance data).
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct TransformRaw {
    pub model: [[f32; 4]; 4],
}

impl TransformRaw {
    pub fn new(transform: &Transform, width: f32, height: f32) -> Self {
        Self {
            model: transform.to_matrix(width, height).to_cols_array_2d(),
        }
    }
}
