//! Render surface abstraction and its scoped ownership.

use crate::pass::LayerPass;
use procgen::{TextureData, TextureId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("no suitable GPU adapter found")]
    NoAdapter,
    #[error("failed to create render surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),
    #[error("failed to request GPU device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
    #[error("failed to acquire frame: {0}")]
    Frame(#[from] wgpu::SurfaceError),
    #[error("texture {0:?} has zero size")]
    EmptyTexture(TextureId),
    #[error("surface has been disposed")]
    Disposed,
}

/// A target that can draw layer passes.
///
/// Textures are uploaded once, by id, before any pass references them.
pub trait RenderSurface {
    fn upload_texture(&mut self, id: TextureId, data: &TextureData) -> Result<(), RenderError>;
    fn resize(&mut self, width: u32, height: u32);
    /// Draw the passes in ascending z order and present the result.
    fn render(&mut self, passes: &[LayerPass]) -> Result<(), RenderError>;
    /// Release all graphics resources. Idempotent.
    fn dispose(&mut self);
    fn is_disposed(&self) -> bool;
    fn size(&self) -> (u32, u32);
    /// Copy of the last presented frame, for surfaces that can read it back.
    fn read_pixels(&self) -> Option<TextureData> {
        None
    }
}

/// Owns a surface and releases it when dropped, even if setup that
/// followed its acquisition failed.
pub struct SurfaceGuard {
    surface: Option<Box<dyn RenderSurface>>,
}

impl SurfaceGuard {
    pub fn new(surface: Box<dyn RenderSurface>) -> Self {
        log::info!("Render surface acquired ({}x{})", surface.size().0, surface.size().1);
        Self { surface: Some(surface) }
    }

    pub fn get_mut(&mut self) -> Option<&mut (dyn RenderSurface + 'static)> {
        self.surface.as_deref_mut()
    }

    pub fn is_held(&self) -> bool {
        self.surface.is_some()
    }

    /// Dispose and drop the surface now. Later calls do nothing.
    pub fn release(&mut self) {
        if let Some(mut surface) = self.surface.take() {
            if !surface.is_disposed() {
                surface.dispose();
            }
            log::info!("Render surface released");
        }
    }
}

impl Drop for SurfaceGuard {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    struct CountingSurface {
        disposals: Rc<Cell<u32>>,
        disposed: bool,
    }

    impl RenderSurface for CountingSurface {
        fn upload_texture(&mut self, _: TextureId, _: &TextureData) -> Result<(), RenderError> {
            Ok(())
        }
        fn resize(&mut self, _: u32, _: u32) {}
        fn render(&mut self, _: &[LayerPass]) -> Result<(), RenderError> {
            Ok(())
        }
        fn dispose(&mut self) {
            self.disposals.set(self.disposals.get() + 1);
            self.disposed = true;
        }
        fn is_disposed(&self) -> bool {
            self.disposed
        }
        fn size(&self) -> (u32, u32) {
            (1, 1)
        }
    }

    #[test]
    fn guard_disposes_once_on_drop() {
        let disposals = Rc::new(Cell::new(0));
        {
            let _guard = SurfaceGuard::new(Box::new(CountingSurface { disposals: disposals.clone(), disposed: false }));
        }
        assert_eq!(disposals.get(), 1);
    }

    #[test]
    fn explicit_release_is_idempotent() {
        let disposals = Rc::new(Cell::new(0));
        let mut guard = SurfaceGuard::new(Box::new(CountingSurface { disposals: disposals.clone(), disposed: false }));
        guard.release();
        guard.release();
        drop(guard);
        assert_eq!(disposals.get(), 1);
    }
}
