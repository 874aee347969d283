//! Layered sprite rendering: a wgpu window surface and a CPU compositor
//! behind one `RenderSurface` trait.

pub mod camera;
pub mod gpu;
pub mod pass;
pub mod software;
pub mod surface;
pub mod vertex;

pub use camera::*;
pub use gpu::*;
pub use pass::*;
pub use software::*;
pub use surface::*;
pub use vertex::*;
