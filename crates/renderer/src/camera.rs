//! Per-layer perspective camera.

use bytemuck::{Pod, Zeroable};
use engine_core::Transform;
use glam::{Mat4, Vec2, Vec3};

/// Fixed camera looking down -Z at the layer plane.
#[derive(Debug, Clone)]
pub struct LayerCamera {
    /// Camera transform (only the position is used).
    pub transform: Transform,
    /// Vertical field of view in degrees.
    pub fov_degrees: f32,
    /// Near clipping plane.
    pub near: f32,
    /// Far clipping plane.
    pub far: f32,
    /// Aspect ratio (width / height).
    pub aspect: f32,
}

impl Default for LayerCamera {
    fn default() -> Self {
        Self {
            transform: Transform::from_position(Vec3::new(0.0, 0.0, 500.0)),
            fov_degrees: 75.0,
            near: 0.1,
            far: 2000.0,
            aspect: 16.0 / 9.0,
        }
    }
}

impl LayerCamera {
    /// Camera sized for a viewport.
    pub fn for_viewport(width: u32, height: u32) -> Self {
        let mut camera = Self::default();
        camera.set_aspect(width, height);
        camera
    }

    /// Update aspect ratio (call on viewport resize).
    pub fn set_aspect(&mut self, width: u32, height: u32) {
        self.aspect = width.max(1) as f32 / height.max(1) as f32;
    }

    /// Get the view matrix.
    pub fn view_matrix(&self) -> Mat4 {
        let eye = self.transform.position;
        Mat4::look_at_rh(eye, eye - Vec3::Z, Vec3::Y)
    }

    /// Get the projection matrix.
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_degrees.to_radians(), self.aspect, self.near, self.far)
    }

    /// Get the combined view-projection matrix.
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Project a world point to pixel coordinates (origin top-left, y down).
    ///
    /// Returns `None` for points behind the camera.
    pub fn project_to_pixels(&self, point: Vec3, width: u32, height: u32) -> Option<Vec2> {
        let clip = self.view_projection_matrix() * point.extend(1.0);
        if clip.w <= 1e-6 {
            return None;
        }
        let ndc = clip.truncate() / clip.w;
        Some(Vec2::new(
            (ndc.x * 0.5 + 0.5) * width as f32,
            (0.5 - ndc.y * 0.5) * height as f32,
        ))
    }

    /// Get camera position.
    pub fn position(&self) -> Vec3 {
        self.transform.position
    }
}

/// Camera uniform data for GPU.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
}

impl CameraUniform {
    pub fn new() -> Self {
        Self {
            view_proj: Mat4::IDENTITY.to_cols_array_2d(),
        }
    }

    pub fn update(&mut self, camera: &LayerCamera) {
        self.view_proj = camera.view_projection_matrix().to_cols_array_2d();
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_projects_to_viewport_centre() {
        let camera = LayerCamera::for_viewport(1000, 800);
        let p = camera.project_to_pixels(Vec3::ZERO, 1000, 800).unwrap();
        assert!((p.x - 500.0).abs() < 1e-3);
        assert!((p.y - 400.0).abs() < 1e-3);
    }

    #[test]
    fn positive_world_y_is_screen_up() {
        let camera = LayerCamera::for_viewport(1000, 800);
        let up = camera.project_to_pixels(Vec3::new(0.0, 50.0, 0.0), 1000, 800).unwrap();
        assert!(up.y < 400.0);
    }

    #[test]
    fn nearer_objects_appear_larger() {
        let camera = LayerCamera::for_viewport(1000, 800);
        let far = camera.project_to_pixels(Vec3::new(100.0, 0.0, -100.0), 1000, 800).unwrap();
        let near = camera.project_to_pixels(Vec3::new(100.0, 0.0, 100.0), 1000, 800).unwrap();
        assert!(near.x - 500.0 > far.x - 500.0);
    }

    #[test]
    fn points_behind_camera_are_rejected() {
        let camera = LayerCamera::default();
        assert!(camera.project_to_pixels(Vec3::new(0.0, 0.0, 900.0), 100, 100).is_none());
    }
}
