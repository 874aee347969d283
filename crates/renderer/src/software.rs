//! CPU compositor implementing [`RenderSurface`].
//!
//! Used for headless snapshots and for exercising the full frame path in
//! tests without a GPU. Each layer is rasterized into its own premultiplied
//! buffer and then composed over the frame in ascending z order.

use crate::camera::LayerCamera;
use crate::pass::{BlendMode, LayerBlend, LayerPass};
use crate::surface::{RenderError, RenderSurface};
use crate::vertex::sprite_matrix;
use glam::{Mat4, Vec2, Vec3};
use procgen::{Pixel, TextureData, TextureId};
use std::collections::HashMap;

type Rgba = [f32; 4];

pub struct SoftwareSurface {
    width: u32,
    height: u32,
    textures: HashMap<TextureId, TextureData>,
    /// Premultiplied RGBA.
    frame: Vec<Rgba>,
    layer: Vec<Rgba>,
    clear_color: Rgba,
    frames_rendered: u64,
    disposed: bool,
}

impl SoftwareSurface {
    pub fn new(width: u32, height: u32) -> Self {
        let len = width as usize * height as usize;
        Self {
            width,
            height,
            textures: HashMap::new(),
            frame: vec![[0.0; 4]; len],
            layer: vec![[0.0; 4]; len],
            clear_color: [0.0; 4],
            frames_rendered: 0,
            disposed: false,
        }
    }

    /// Opaque colour the frame is cleared to before drawing.
    pub fn with_clear_color(mut self, r: f32, g: f32, b: f32) -> Self {
        self.clear_color = [r, g, b, 1.0];
        self
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    /// Straight-alpha pixel of the last frame.
    pub fn pixel(&self, x: u32, y: u32) -> Pixel {
        if x >= self.width || y >= self.height {
            return Pixel::TRANSPARENT;
        }
        unpremultiply(self.frame[(y * self.width + x) as usize])
    }

    /// Copy of the last frame as a straight-alpha raster.
    pub fn snapshot(&self) -> TextureData {
        let mut out = TextureData::new(self.width, self.height);
        for (dst, src) in out.pixels.iter_mut().zip(&self.frame) {
            *dst = unpremultiply(*src);
        }
        out
    }

    fn draw_pass(&mut self, pass: &LayerPass) {
        for px in self.layer.iter_mut() {
            *px = [0.0; 4];
        }

        for quad in &pass.quads {
            let Some(texture) = self.textures.get(&quad.texture) else {
                log::trace!("Skipping quad with unknown texture {:?}", quad.texture);
                continue;
            };
            let model = quad.transform.to_matrix(quad.width, quad.height);
            rasterize(
                &mut self.layer,
                (self.width, self.height),
                texture,
                &pass.camera,
                model,
                quad.opacity,
                quad.blend,
            );
        }

        for batch in &pass.points {
            let Some(texture) = self.textures.get(&batch.texture) else {
                continue;
            };
            for (position, opacity, size) in batch.active() {
                let model = sprite_matrix(Vec3::from(position), size);
                rasterize(
                    &mut self.layer,
                    (self.width, self.height),
                    texture,
                    &pass.camera,
                    model,
                    opacity * batch.opacity,
                    batch.blend,
                );
            }
        }

        let opacity = pass.composition.opacity.clamp(0.0, 1.0);
        for (dst, src) in self.frame.iter_mut().zip(&self.layer) {
            let l = src.map(|c| c * opacity);
            *dst = match pass.composition.blend {
                LayerBlend::Normal => over(l, *dst),
                LayerBlend::Screen => {
                    let mut out = [0.0; 4];
                    for i in 0..4 {
                        out[i] = l[i] + dst[i] - l[i] * dst[i];
                    }
                    out
                }
            };
        }
    }
}

impl RenderSurface for SoftwareSurface {
    fn upload_texture(&mut self, id: TextureId, data: &TextureData) -> Result<(), RenderError> {
        if self.disposed {
            return Err(RenderError::Disposed);
        }
        if data.is_empty() {
            return Err(RenderError::EmptyTexture(id));
        }
        self.textures.insert(id, data.clone());
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        if self.disposed || (width == self.width && height == self.height) {
            return;
        }
        let len = width as usize * height as usize;
        self.width = width;
        self.height = height;
        self.frame = vec![[0.0; 4]; len];
        self.layer = vec![[0.0; 4]; len];
    }

    fn render(&mut self, passes: &[LayerPass]) -> Result<(), RenderError> {
        if self.disposed {
            return Err(RenderError::Disposed);
        }
        let clear = self.clear_color;
        for px in self.frame.iter_mut() {
            *px = clear;
        }

        let mut ordered: Vec<&LayerPass> = passes.iter().collect();
        ordered.sort_by_key(|p| p.composition.z_index);
        for pass in ordered {
            self.draw_pass(pass);
        }
        self.frames_rendered += 1;
        Ok(())
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.textures.clear();
        self.frame = Vec::new();
        self.layer = Vec::new();
        self.disposed = true;
        log::debug!("Software surface disposed after {} frames", self.frames_rendered);
    }

    fn is_disposed(&self) -> bool {
        self.disposed
    }

    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn read_pixels(&self) -> Option<TextureData> {
        (!self.disposed).then(|| self.snapshot())
    }
}

fn over(src: Rgba, dst: Rgba) -> Rgba {
    let k = 1.0 - src[3];
    [
        src[0] + dst[0] * k,
        src[1] + dst[1] * k,
        src[2] + dst[2] * k,
        src[3] + dst[3] * k,
    ]
}

fn unpremultiply(c: Rgba) -> Pixel {
    let a = c[3].clamp(0.0, 1.0);
    if a <= 0.0 {
        return Pixel::TRANSPARENT;
    }
    Pixel::from_rgba(c[0] / a, c[1] / a, c[2] / a, a)
}

/// Draw the unit quad under `model` as an affine parallelogram in screen space.
fn rasterize(
    target: &mut [Rgba],
    (width, height): (u32, u32),
    texture: &TextureData,
    camera: &LayerCamera,
    model: Mat4,
    opacity: f32,
    blend: BlendMode,
) {
    if opacity <= 0.0 || width == 0 || height == 0 {
        return;
    }
    let project = |p: Vec3| camera.project_to_pixels(model.transform_point3(p), width, height);
    let (Some(c), Some(px), Some(py)) = (
        project(Vec3::ZERO),
        project(Vec3::new(0.5, 0.0, 0.0)),
        project(Vec3::new(0.0, 0.5, 0.0)),
    ) else {
        return;
    };
    let a = px - c;
    let b = py - c;
    let det = a.x * b.y - a.y * b.x;
    if det.abs() < 1e-6 {
        return;
    }

    let ext = a.abs() + b.abs();
    let x0 = (c.x - ext.x).floor().max(0.0) as u32;
    let y0 = (c.y - ext.y).floor().max(0.0) as u32;
    let x1 = ((c.x + ext.x).ceil().max(0.0) as u32).min(width);
    let y1 = ((c.y + ext.y).ceil().max(0.0) as u32).min(height);

    for y in y0..y1 {
        for x in x0..x1 {
            let d = Vec2::new(x as f32 + 0.5, y as f32 + 0.5) - c;
            let s = (d.x * b.y - d.y * b.x) / det;
            let t = (a.x * d.y - a.y * d.x) / det;
            if s.abs() > 1.0 || t.abs() > 1.0 {
                continue;
            }
            let [r, g, bl, ta] = texture.sample(s * 0.5 + 0.5, 0.5 - t * 0.5).to_f32();
            let alpha = ta * opacity;
            if alpha <= 0.0 {
                continue;
            }
            let src = [r * alpha, g * alpha, bl * alpha, alpha];
            let dst = &mut target[(y * width + x) as usize];
            *dst = match blend {
                BlendMode::Alpha => over(src, *dst),
                BlendMode::Additive => {
                    let mut out = [0.0; 4];
                    for i in 0..4 {
                        out[i] = (dst[i] + src[i]).min(1.0);
                    }
                    out
                }
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pass::{Composition, LayerKind, PointBatch, QuadDraw};
    use engine_core::Transform;

    fn solid(r: u8, g: u8, b: u8) -> TextureData {
        let mut t = TextureData::new(4, 4);
        for p in t.pixels.iter_mut() {
            *p = Pixel::new(r, g, b, 255);
        }
        t
    }

    fn pass(kind: LayerKind, z_index: i32, opacity: f32, blend: LayerBlend, quads: Vec<QuadDraw>) -> LayerPass {
        LayerPass {
            kind,
            camera: LayerCamera::for_viewport(100, 100),
            composition: Composition { z_index, opacity, blend },
            quads,
            points: Vec::new(),
        }
    }

    fn quad(texture: TextureId, opacity: f32) -> QuadDraw {
        QuadDraw {
            texture,
            transform: Transform::default(),
            width: 200.0,
            height: 200.0,
            opacity,
            blend: BlendMode::Alpha,
        }
    }

    #[test]
    fn quad_covers_viewport_centre_only() {
        let mut surface = SoftwareSurface::new(100, 100);
        surface.upload_texture(TextureId(0), &solid(255, 0, 0)).unwrap();
        surface
            .render(&[pass(LayerKind::Background, 1, 1.0, LayerBlend::Normal, vec![quad(TextureId(0), 1.0)])])
            .unwrap();

        assert_eq!(surface.pixel(50, 50), Pixel::new(255, 0, 0, 255));
        assert_eq!(surface.pixel(0, 0).a, 0);
        assert_eq!(surface.frames_rendered(), 1);
    }

    #[test]
    fn higher_z_layer_draws_on_top() {
        let mut surface = SoftwareSurface::new(100, 100);
        surface.upload_texture(TextureId(0), &solid(255, 0, 0)).unwrap();
        surface.upload_texture(TextureId(1), &solid(0, 255, 0)).unwrap();
        // Passes given out of order; z decides
        surface
            .render(&[
                pass(LayerKind::Overlay, 1000, 1.0, LayerBlend::Normal, vec![quad(TextureId(1), 1.0)]),
                pass(LayerKind::Background, 1, 1.0, LayerBlend::Normal, vec![quad(TextureId(0), 1.0)]),
            ])
            .unwrap();
        assert_eq!(surface.pixel(50, 50), Pixel::new(0, 255, 0, 255));
    }

    #[test]
    fn layer_opacity_scales_coverage() {
        let mut surface = SoftwareSurface::new(100, 100);
        surface.upload_texture(TextureId(0), &solid(255, 255, 255)).unwrap();
        surface
            .render(&[pass(LayerKind::Background, 1, 0.5, LayerBlend::Normal, vec![quad(TextureId(0), 1.0)])])
            .unwrap();
        let a = surface.pixel(50, 50).a;
        assert!((126..=129).contains(&a), "alpha {a}");
    }

    #[test]
    fn screen_blend_never_darkens() {
        let mut surface = SoftwareSurface::new(100, 100).with_clear_color(0.4, 0.4, 0.4);
        surface.upload_texture(TextureId(0), &solid(20, 20, 20)).unwrap();
        surface
            .render(&[pass(LayerKind::Overlay, 1000, 0.15, LayerBlend::Screen, vec![quad(TextureId(0), 1.0)])])
            .unwrap();
        let p = surface.pixel(50, 50);
        assert!(p.r >= 102);
    }

    #[test]
    fn point_batch_draws_only_active_points() {
        let mut surface = SoftwareSurface::new(100, 100);
        surface.upload_texture(TextureId(3), &solid(0, 0, 255)).unwrap();
        let mut batch = PointBatch::with_capacity(TextureId(3), 4);
        batch.blend = BlendMode::Alpha;
        batch.sizes = vec![100.0, 100.0, 0.0, 0.0];
        batch.opacities = vec![1.0, 1.0, 0.0, 0.0];
        // Second point is parked far left but inactive
        batch.positions[3] = -300.0;
        batch.draw_count = 1;

        let mut p = pass(LayerKind::Background, 1, 1.0, LayerBlend::Normal, Vec::new());
        p.points.push(batch);
        surface.render(&[p]).unwrap();

        assert_eq!(surface.pixel(50, 50).b, 255);
        assert_eq!(surface.pixel(10, 50).a, 0);
    }

    #[test]
    fn disposed_surface_refuses_work() {
        let mut surface = SoftwareSurface::new(10, 10);
        surface.dispose();
        surface.dispose();
        assert!(surface.is_disposed());
        assert!(matches!(surface.render(&[]), Err(RenderError::Disposed)));
        assert!(matches!(
            surface.upload_texture(TextureId(0), &solid(0, 0, 0)),
            Err(RenderError::Disposed)
        ));
    }

    #[test]
    fn empty_textures_are_rejected() {
        let mut surface = SoftwareSurface::new(10, 10);
        let err = surface.upload_texture(TextureId(7), &TextureData::new(0, 0)).unwrap_err();
        assert!(matches!(err, RenderError::EmptyTexture(TextureId(7))));
        assert_eq!(surface.texture_count(), 0);
    }
}
