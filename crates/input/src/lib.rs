//! Pointer, viewport and keyboard state fed by window events.
//!
//! Events arrive between frames and are plain last-write-wins stores; the
//! frame loop reads them at the start of the next frame.

use glam::Vec2;
use std::collections::HashSet;

/// Input state for the current frame.
#[derive(Debug, Default)]
pub struct InputState {
    /// Keys currently held down.
    keys_held: HashSet<KeyCode>,
    /// Keys pressed this frame.
    keys_pressed: HashSet<KeyCode>,

    /// Last known pointer position in window pixels, `None` until the
    /// pointer first enters the window.
    cursor: Option<Vec2>,

    viewport: (u32, u32),
    /// Viewport size written since the last `take_resize`.
    pending_resize: Option<(u32, u32)>,
}

impl InputState {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            viewport: (width, height),
            ..Default::default()
        }
    }

    /// Clear per-frame state. Call at the start of each frame.
    pub fn begin_frame(&mut self) {
        self.keys_pressed.clear();
    }

    /// Process a keyboard event.
    pub fn process_keyboard(&mut self, key: KeyCode, state: ElementState) {
        match state {
            ElementState::Pressed => {
                if !self.keys_held.contains(&key) {
                    self.keys_pressed.insert(key);
                }
                self.keys_held.insert(key);
            }
            ElementState::Released => {
                self.keys_held.remove(&key);
            }
        }
    }

    /// Process cursor position update.
    pub fn process_cursor_position(&mut self, position: (f64, f64)) {
        self.cursor = Some(Vec2::new(position.0 as f32, position.1 as f32));
    }

    /// Pointer left the window: parallax settles back to centre.
    pub fn process_cursor_left(&mut self) {
        self.cursor = None;
    }

    /// Process a viewport resize. Repeated resizes before the next frame collapse into the last one.
    pub fn process_resize(&mut self, width: u32, height: u32) {
        self.viewport = (width, height);
        self.pending_resize = Some((width, height));
    }

    /// Check if a key is currently held.
    pub fn is_key_held(&self, key: KeyCode) -> bool {
        self.keys_held.contains(&key)
    }

    /// Check if a key was pressed this frame.
    pub fn is_key_pressed(&self, key: KeyCode) -> bool {
        self.keys_pressed.contains(&key)
    }

    pub fn cursor_position(&self) -> Option<Vec2> {
        self.cursor
    }

    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    /// Pointer position mapped to [-1, 1] on both axes from the viewport
    /// centre (y grows downwards). Zero when the pointer is outside.
    pub fn normalized_cursor(&self) -> Vec2 {
        let (w, h) = self.viewport;
        match self.cursor {
            Some(p) if w > 0 && h > 0 => Vec2::new(
                (p.x / w as f32 - 0.5) * 2.0,
                (p.y / h as f32 - 0.5) * 2.0,
            ),
            _ => Vec2::ZERO,
        }
    }

    /// The resize written since the last call, if any.
    pub fn take_resize(&mut self) -> Option<(u32, u32)> {
        self.pending_resize.take()
    }

    /// Check if pause was toggled (Space).
    pub fn is_pause_toggled(&self) -> bool {
        self.is_key_pressed(KeyCode::Space)
    }

    /// Check if exit was requested (Escape).
    pub fn is_exit_requested(&self) -> bool {
        self.is_key_pressed(KeyCode::Escape)
    }

    /// Check if a particle burst was requested (B).
    pub fn is_burst_pressed(&self) -> bool {
        self.is_key_pressed(KeyCode::KeyB)
    }
}

// Re-export for convenience
pub use winit::event::ElementState;
pub use winit::keyboard::KeyCode;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_press_lasts_one_frame() {
        let mut input = InputState::new(800, 600);
        input.process_keyboard(KeyCode::Space, ElementState::Pressed);
        assert!(input.is_pause_toggled());
        input.begin_frame();
        assert!(!input.is_pause_toggled());
        assert!(input.is_key_held(KeyCode::Space));

        // Auto-repeat while held is not a new press
        input.process_keyboard(KeyCode::Space, ElementState::Pressed);
        assert!(!input.is_pause_toggled());
    }

    #[test]
    fn last_cursor_write_wins() {
        let mut input = InputState::new(1000, 800);
        input.process_cursor_position((0.0, 0.0));
        input.process_cursor_position((750.0, 200.0));
        let n = input.normalized_cursor();
        assert!((n.x - 0.5).abs() < 1e-6);
        assert!((n.y + 0.5).abs() < 1e-6);
    }

    #[test]
    fn cursor_outside_window_is_centred() {
        let mut input = InputState::new(1000, 800);
        assert_eq!(input.normalized_cursor(), Vec2::ZERO);
        input.process_cursor_position((1000.0, 800.0));
        input.process_cursor_left();
        assert_eq!(input.normalized_cursor(), Vec2::ZERO);
    }

    #[test]
    fn resizes_collapse_to_latest() {
        let mut input = InputState::new(100, 100);
        input.process_resize(640, 480);
        input.process_resize(1280, 720);
        assert_eq!(input.take_resize(), Some((1280, 720)));
        assert_eq!(input.take_resize(), None);
        assert_eq!(input.viewport(), (1280, 720));
    }
}
