//! Time management for the animation loop.

use std::time::{Duration, Instant};

/// Frame clock for hosts that do not supply their own frame timestamps.
///
/// Produces millisecond timestamps measured from creation, the same shape a
/// display compositor hands to a per-frame callback.
#[derive(Debug)]
pub struct Time {
    /// Time when the clock started.
    start_time: Instant,
    /// Time of the last frame.
    last_frame: Instant,
    /// Duration of the last frame.
    delta: Duration,
    /// Total elapsed time since start.
    elapsed: Duration,
    /// Frame count since start.
    frame_count: u64,
}

impl Default for Time {
    fn default() -> Self {
        Self::new()
    }
}

impl Time {
    /// Create a new frame clock.
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            start_time: now,
            last_frame: now,
            delta: Duration::ZERO,
            elapsed: Duration::ZERO,
            frame_count: 0,
        }
    }

    /// Update timing at the start of a new frame.
    pub fn update(&mut self) {
        let now = Instant::now();
        self.delta = now - self.last_frame;
        self.last_frame = now;
        self.elapsed = now - self.start_time;
        self.frame_count += 1;
    }

    /// Get the delta time in seconds.
    pub fn delta_seconds(&self) -> f32 {
        self.delta.as_secs_f32()
    }

    /// Timestamp of the current frame in milliseconds since start.
    pub fn timestamp_ms(&self) -> f64 {
        self.elapsed.as_secs_f64() * 1000.0
    }

    /// Get the current frame count.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

/// Counts frames over consecutive 1-second windows.
///
/// Fed with frame timestamps in milliseconds. A window closes on the first
/// frame whose timestamp is at least `window_ms` past the window start; the
/// frame count of the closed window is reported as its frame rate.
#[derive(Debug, Clone)]
pub struct FpsMonitor {
    window_ms: f64,
    window_start: Option<f64>,
    frames: u32,
    last_fps: Option<u32>,
}

impl Default for FpsMonitor {
    fn default() -> Self {
        Self::new(1000.0)
    }
}

impl FpsMonitor {
    pub fn new(window_ms: f64) -> Self {
        Self {
            window_ms: window_ms.max(1.0),
            window_start: None,
            frames: 0,
            last_fps: None,
        }
    }

    /// Record one frame. Returns the frame count of a window that just closed.
    pub fn record_frame(&mut self, timestamp_ms: f64) -> Option<u32> {
        let start = *self.window_start.get_or_insert(timestamp_ms);

        if timestamp_ms - start >= self.window_ms {
            // The closing frame opens the next window
            let fps = self.frames;
            self.frames = 1;
            self.window_start = Some(timestamp_ms);
            self.last_fps = Some(fps);
            Some(fps)
        } else {
            self.frames += 1;
            None
        }
    }

    /// Frame rate of the most recently closed window.
    pub fn last_fps(&self) -> Option<u32> {
        self.last_fps
    }

    /// Discard the open window (e.g. after a pause, so the gap is not measured).
    pub fn reset(&mut self) {
        self.window_start = None;
        self.frames = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fps_monitor_reports_frames_per_window() {
        let mut monitor = FpsMonitor::default();
        let mut reports = Vec::new();
        // 20 fps for a little over three seconds
        for i in 0..=62 {
            if let Some(fps) = monitor.record_frame(i as f64 * 50.0) {
                reports.push(fps);
            }
        }
        assert_eq!(reports, vec![20, 20, 20]);
        assert_eq!(monitor.last_fps(), Some(20));
    }

    #[test]
    fn fps_monitor_reset_skips_gap() {
        let mut monitor = FpsMonitor::default();
        monitor.record_frame(0.0);
        monitor.record_frame(16.0);
        monitor.reset();
        // A long pause must not close a window with two frames in it
        assert_eq!(monitor.record_frame(10_000.0), None);
    }
}
