//! Instance layout for textured quads.
//!
//! Quad corners are generated in the vertex shader from `vertex_index`, so
//! the only vertex buffer is the per-instance one.

use bytemuck::{Pod, Zeroable};
use engine_core::TransformRaw;
use glam::{Mat4, Vec3};

/// Vertices per quad (two triangles, no index buffer).
pub const QUAD_VERTICES: u32 = 6;

/// Model matrix of a square point sprite.
pub fn sprite_matrix(position: Vec3, size: f32) -> Mat4 {
    Mat4::from_translation(position) * Mat4::from_scale(Vec3::new(size, size, 1.0))
}

/// Per-instance data for one quad.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct QuadInstance {
    /// Model matrix mapping the unit quad to world space.
    pub model: [[f32; 4]; 4],
    /// Final opacity (material times layer).
    pub opacity: f32,
    pub _pad: [f32; 3],
}

impl QuadInstance {
    pub fn new(transform: TransformRaw, opacity: f32) -> Self {
        Self {
            model: transform.model,
            opacity,
            _pad: [0.0; 3],
        }
    }

    /// Camera-facing square sprite of side `size` centred at `position`.
    pub fn sprite(position: Vec3, size: f32, opacity: f32) -> Self {
        Self {
            model: sprite_matrix(position, size).to_cols_array_2d(),
            opacity,
            _pad: [0.0; 3],
        }
    }

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<QuadInstance>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &[
                // Model matrix columns
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 4]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 8]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 12]>() as wgpu::BufferAddress,
                    shader_location: 3,
                    format: wgpu::VertexFormat::Float32x4,
                },
                // Opacity
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 16]>() as wgpu::BufferAddress,
                    shader_location: 4,
                    format: wgpu::VertexFormat::Float32,
                },
            ],
        }
    }
}

impl Default for QuadInstance {
    fn default() -> Self {
        Self {
            model: Mat4::IDENTITY.to_cols_array_2d(),
            opacity: 1.0,
            _pad: [0.0; 3],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instance_stride_is_aligned() {
        assert_eq!(std::mem::size_of::<QuadInstance>(), 80);
        assert_eq!(std::mem::size_of::<QuadInstance>() % 16, 0);
    }

    #[test]
    fn sprite_scales_unit_quad() {
        let inst = QuadInstance::sprite(Vec3::new(10.0, 0.0, 5.0), 8.0, 0.5);
        let m = Mat4::from_cols_array_2d(&inst.model);
        let corner = m.transform_point3(Vec3::new(0.5, 0.5, 0.0));
        assert_eq!(corner, Vec3::new(14.0, 4.0, 5.0));
    }
}
