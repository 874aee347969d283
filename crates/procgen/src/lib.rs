//! Procedural texture synthesis for cloud sprites and particle sprites.

pub mod artwork;
pub mod cache;
pub mod outline;
pub mod synth;
pub mod textures;
pub mod variation;

pub use artwork::*;
pub use cache::*;
pub use outline::*;
pub use synth::*;
pub use textures::*;
pub use variation::*;
