//! Boundary to the page that hosts the effect.
//!
//! The effect never reaches into the host directly; it attaches its
//! elements, injects a stylesheet that fixes the stacking order, and
//! removes its elements again on teardown.

use crate::config::VisualConfig;
use crate::scene::{BACKGROUND_Z_INDEX, CONTENT_Z_INDEX, OVERLAY_Z_INDEX};
use std::cell::RefCell;
use std::fmt::Write;
use std::rc::Rc;

/// Class of the element holding the background layer.
pub const BACKGROUND_CLASS: &str = "neo-clouds-background";
/// Class of the element holding the overlay layer.
pub const OVERLAY_CLASS: &str = "neo-clouds-overlay";
/// Selector of page content lifted between the two layers.
pub const CONTENT_SELECTOR: &str = "main > section";

/// The page-side collaborator.
pub trait EffectHost {
    /// Insert a full-viewport element ahead of all page content.
    /// Returns false when the host has no place for it.
    fn attach_surface(&mut self, class: &str) -> bool;
    fn inject_styles(&mut self, css: &str);
    fn detach_surface(&mut self, class: &str);
}

/// What the effect knows about its host at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostInfo {
    pub width: u32,
    pub height: u32,
    /// Logical CPU count, used to size the initial cloud cap.
    pub cores: usize,
}

impl HostInfo {
    /// Viewport size plus the core count reported by the OS.
    pub fn detect(width: u32, height: u32) -> Self {
        let cores = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4);
        Self { width, height, cores }
    }
}

/// Stacking stylesheet: background at the bottom, content above it, overlay on top.
pub fn layer_stylesheet(visual: &VisualConfig, mobile_width: u32) -> String {
    let mut css = String::new();
    let _ = writeln!(
        css,
        ".{BACKGROUND_CLASS} {{ position: fixed; inset: 0; z-index: {}; opacity: {}; pointer-events: none; }}",
        BACKGROUND_Z_INDEX, visual.background_layer_opacity
    );
    let _ = writeln!(
        css,
        ".{OVERLAY_CLASS} {{ position: fixed; inset: 0; z-index: {}; opacity: {}; mix-blend-mode: screen; pointer-events: none; }}",
        OVERLAY_Z_INDEX, visual.overlay_layer_opacity
    );
    let _ = writeln!(css, "{CONTENT_SELECTOR} {{ position: relative; z-index: {}; }}", CONTENT_Z_INDEX);

    let mut mobile = format!(".{BACKGROUND_CLASS} {{ opacity: {}; }}", visual.mobile_background_layer_opacity);
    if visual.hide_overlay_on_mobile {
        mobile.push_str(&format!(" .{OVERLAY_CLASS} {{ display: none; }}"));
    }
    let _ = writeln!(css, "@media (max-width: {}px) {{ {} }}", mobile_width.saturating_sub(1), mobile);
    css
}

/// A host call, as seen by [`RecordingHost`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    Attached(String),
    Styles(String),
    Detached(String),
}

/// Host that only records what the effect asked of it.
///
/// Clones share one event log, so a test can keep a handle after boxing
/// the host into the effect.
#[derive(Debug, Clone, Default)]
pub struct RecordingHost {
    events: Rc<RefCell<Vec<HostEvent>>>,
    refused: Vec<String>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Host whose page has no slot for `class`; attaching it fails.
    pub fn without(mut self, class: &str) -> Self {
        self.refused.push(class.to_string());
        self
    }

    pub fn events(&self) -> Vec<HostEvent> {
        self.events.borrow().clone()
    }

    /// Elements currently attached.
    pub fn attached(&self) -> Vec<String> {
        let mut live = Vec::new();
        for event in self.events.borrow().iter() {
            match event {
                HostEvent::Attached(class) => live.push(class.clone()),
                HostEvent::Detached(class) => live.retain(|c| c != class),
                HostEvent::Styles(_) => {}
            }
        }
        live
    }

    pub fn styles(&self) -> Vec<String> {
        self.events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                HostEvent::Styles(css) => Some(css.clone()),
                _ => None,
            })
            .collect()
    }
}

impl EffectHost for RecordingHost {
    fn attach_surface(&mut self, class: &str) -> bool {
        if self.refused.iter().any(|c| c == class) {
            return false;
        }
        self.events.borrow_mut().push(HostEvent::Attached(class.to_string()));
        true
    }

    fn inject_styles(&mut self, css: &str) {
        self.events.borrow_mut().push(HostEvent::Styles(css.to_string()));
    }

    fn detach_surface(&mut self, class: &str) {
        self.events.borrow_mut().push(HostEvent::Detached(class.to_string()));
    }
}
