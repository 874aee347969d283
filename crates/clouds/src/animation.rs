//! Animation driver.
//!
//! Position, scale, opacity and overlay depth are pure functions of the
//! clock and each object's fixed motion parameters, so nothing drifts and
//! gaps in the frame stream need no catch-up. Only the z rotation is
//! advanced per frame.

use crate::config::AnimationConfig;
use crate::placement::{MotionParams, PlacedObject};
use crate::zone::DepthClass;
use glam::Vec2;

/// Inputs shared by every object in one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameContext {
    /// Seconds since the effect started.
    pub time: f32,
    /// Pointer in [-1, 1] from the viewport centre, y down.
    pub pointer: Vec2,
    /// Layer opacity factor set through `update_opacity`.
    pub opacity_factor: f32,
}

/// Organic float displacement from the anchor.
pub fn float_offset(motion: &MotionParams, t: f32, cfg: &AnimationConfig) -> Vec2 {
    let x = (t * motion.float_speed * cfg.float_x_rate + motion.pulse_phase).sin() * motion.float_amplitude;
    let y = (t * motion.float_speed * cfg.float_y_rate + motion.pulse_phase).cos()
        * motion.float_amplitude
        * cfg.float_y_ratio;
    Vec2::new(x, y)
}

/// Breathing scale, always within `1 ± breathe_amplitude`.
pub fn breathe_scale(phase: f32, t: f32, cfg: &AnimationConfig) -> f32 {
    1.0 + cfg.breathe_amplitude * (t * cfg.breathe_rate + phase).sin()
}

/// Pointer parallax. Screen y grows downwards while world y grows upwards.
pub fn parallax_offset(pointer: Vec2, depth: DepthClass, cfg: &AnimationConfig) -> Vec2 {
    let strength = match depth {
        DepthClass::Overlay => cfg.parallax_overlay,
        DepthClass::Behind => cfg.parallax_background,
    };
    Vec2::new(pointer.x * strength, -pointer.y * strength)
}

pub fn overlay_opacity(base: f32, phase: f32, t: f32, cfg: &AnimationConfig) -> f32 {
    base * (1.0 + cfg.overlay_opacity_pulse * (t * cfg.overlay_opacity_rate + phase).sin())
}

pub fn overlay_depth(t: f32, cfg: &AnimationConfig) -> f32 {
    DepthClass::Overlay.base_z() + cfg.overlay_depth_amplitude * (t * cfg.overlay_depth_rate).sin()
}

/// Rewrite one object's transform and opacity for this frame.
pub fn animate(object: &mut PlacedObject, frame: &FrameContext, cfg: &AnimationConfig) {
    let t = frame.time;
    let motion = object.motion;
    let depth = object.depth();

    let position = object.original + float_offset(&motion, t, cfg) + parallax_offset(frame.pointer, depth, cfg);
    object.transform.position.x = position.x;
    object.transform.position.y = position.y;
    object.transform.rotate_z(motion.rotation_speed);
    object.transform.scale = breathe_scale(motion.pulse_phase, t, cfg);

    let base = object.base_opacity * frame.opacity_factor;
    match depth {
        DepthClass::Overlay => {
            object.opacity = overlay_opacity(base, motion.pulse_phase, t, cfg);
            object.transform.position.z = overlay_depth(t, cfg);
        }
        DepthClass::Behind => {
            object.opacity = base;
            object.transform.position.z = depth.base_z();
        }
    }
}
