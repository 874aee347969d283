//! Viewer configuration (window, headless snapshots, effect). Loaded from clouds.ron at startup.

use clouds::EffectConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Offline rendering through the CPU compositor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadlessConfig {
    /// Render snapshots instead of opening a window. `--headless` forces this on.
    pub enabled: bool,
    pub width: u32,
    pub height: u32,
    /// Number of frames to render.
    pub frames: u32,
    /// Simulated time between frames.
    pub interval_ms: f64,
    /// Save every n-th frame as a PNG.
    pub save_every: u32,
    pub output_dir: PathBuf,
}

impl Default for HeadlessConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            width: 1280,
            height: 720,
            frames: 120,
            interval_ms: 1000.0 / 60.0,
            save_every: 30,
            output_dir: PathBuf::from("snapshots"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewerConfig {
    /// Window width in logical pixels.
    #[serde(default = "default_window_width")]
    pub window_width: u32,
    /// Window height in logical pixels.
    #[serde(default = "default_window_height")]
    pub window_height: u32,
    #[serde(default = "default_true")]
    pub vsync: bool,
    /// Page colour behind the background layer.
    #[serde(default = "default_clear_color")]
    pub clear_color: [f32; 3],
    /// Energy particles per burst (B key).
    #[serde(default = "default_burst")]
    pub burst_size: usize,
    #[serde(default)]
    pub headless: HeadlessConfig,
    #[serde(default)]
    pub effect: EffectConfig,
}

fn default_window_width() -> u32 {
    1280
}
fn default_window_height() -> u32 {
    720
}
fn default_true() -> bool {
    true
}
fn default_clear_color() -> [f32; 3] {
    [0.02, 0.03, 0.05]
}
fn default_burst() -> usize {
    24
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            window_width: default_window_width(),
            window_height: default_window_height(),
            vsync: default_true(),
            clear_color: default_clear_color(),
            burst_size: default_burst(),
            headless: HeadlessConfig::default(),
            effect: EffectConfig::default(),
        }
    }
}

impl ViewerConfig {
    /// Load config from `clouds.ron`. If the file is missing or invalid, returns default config.
    pub fn load() -> Self {
        let path = config_path();
        if let Ok(data) = std::fs::read_to_string(&path) {
            match Self::parse(&data) {
                Ok(c) => return c,
                Err(e) => log::warn!("Invalid config at {:?}: {}, using defaults", path, e),
            }
        }
        Self::default()
    }

    pub fn parse(data: &str) -> Result<Self, ron::error::SpannedError> {
        let mut config: Self = ron::from_str(data)?;
        config.effect.validate();
        Ok(config)
    }
}

fn config_path() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")).join("clouds.ron")
}
