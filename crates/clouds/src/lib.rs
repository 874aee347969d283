//! Ambient procedural clouds for a page: zone placement, two render layers,
//! time-driven animation, particles, and a gradient fallback.

pub mod animation;
pub mod config;
pub mod error;
pub mod fallback;
pub mod host;
pub mod particles;
pub mod placement;
pub mod scene;
pub mod system;
pub mod zone;

pub use config::*;
pub use error::EffectError;
pub use fallback::GradientBackdrop;
pub use host::{EffectHost, HostInfo, RecordingHost};
pub use particles::{Particle, ParticleEmitter, ParticleKind};
pub use placement::{PlacedObject, PlacementStrategy, StrategicPlacer};
pub use scene::SceneManager;
pub use system::{CloudEffect, EffectParts, EffectState};
pub use zone::{DepthClass, Zone, ZoneSet};
