//! Core engine types and utilities for Neo Clouds.
//!
//! This crate provides the foundational types used across all effect systems:
//! - Transform for placed quads (position, z-rotation, uniform scale)
//! - Frame clock and rolling frame-rate windows

pub mod time;
pub mod transform;

pub use time::*;
pub use transform::*;

// Re-export commonly used types
pub use glam::{Mat4, Quat, Vec2, Vec3, Vec4};
