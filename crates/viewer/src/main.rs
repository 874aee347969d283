//! Neo Clouds viewer.
//!
//! Hosts the cloud effect in a desktop window on the GPU surface, or renders
//! PNG snapshots through the CPU compositor with `--headless`.

mod config;
mod host;

use anyhow::{Context, Result};
use clouds::{CloudEffect, EffectError, EffectState, HostInfo};
use engine_core::Time;
use input::InputState;
use procgen::TextureData;
use renderer::{GpuSurface, RenderSurface, SoftwareSurface};
use std::path::Path;
use std::sync::Arc;
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowId},
};

use config::{HeadlessConfig, ViewerConfig};
use host::DesktopHost;

/// Live window session: the effect plus the state fed by window events.
struct ViewerState {
    window: Arc<Window>,
    effect: CloudEffect,
    input: InputState,
    time: Time,
    burst_size: usize,
    running: bool,
}

impl ViewerState {
    fn new(window: Arc<Window>, config: &ViewerConfig) -> Self {
        let size = window.inner_size();
        let info = HostInfo::detect(size.width.max(1), size.height.max(1));
        let vsync = config.vsync;
        let [r, g, b] = config.clear_color;
        let surface_window = window.clone();

        let effect = CloudEffect::init(config.effect.clone(), info, Box::new(DesktopHost::new(None)), move || {
            let mut surface = pollster::block_on(GpuSurface::new(surface_window, vsync))?;
            surface.set_clear_color(r as f64, g as f64, b as f64);
            Ok(Box::new(surface) as Box<dyn RenderSurface>)
        });
        if effect.state() == EffectState::Fallback {
            log::warn!("GPU unavailable; the window stays on the page colour");
        }

        Self {
            window,
            effect,
            input: InputState::new(info.width, info.height),
            time: Time::new(),
            burst_size: config.burst_size,
            running: true,
        }
    }

    /// Returns true when the app should exit.
    fn handle_window_event(&mut self, event: WindowEvent) -> bool {
        match event {
            WindowEvent::CloseRequested => {
                self.effect.destroy();
                self.running = false;
                true
            }
            WindowEvent::Resized(size) => {
                self.input.process_resize(size.width, size.height);
                false
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.input.process_cursor_position((position.x, position.y));
                false
            }
            WindowEvent::CursorLeft { .. } => {
                self.input.process_cursor_left();
                false
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if let winit::keyboard::PhysicalKey::Code(key) = event.physical_key {
                    self.input.process_keyboard(key, event.state);
                }
                false
            }
            WindowEvent::RedrawRequested => {
                self.frame();
                !self.running
            }
            _ => false,
        }
    }

    fn frame(&mut self) {
        self.time.update();

        // Event-channel writes are applied once, at the start of the frame
        if let Some((w, h)) = self.input.take_resize() {
            self.effect.handle_resize(w, h);
        }
        match self.input.cursor_position() {
            Some(p) => self.effect.pointer_moved(p.x, p.y),
            None => self.effect.pointer_left(),
        }

        if self.input.is_exit_requested() {
            self.effect.destroy();
            self.running = false;
            return;
        }
        if self.input.is_pause_toggled() {
            match self.effect.state() {
                EffectState::Running => self.effect.pause(),
                EffectState::Paused => self.effect.resume(),
                _ => {}
            }
        }
        if self.input.is_burst_pressed() {
            self.effect.burst(self.burst_size);
        }

        match self.effect.frame(self.time.timestamp_ms()) {
            Ok(()) => {}
            Err(EffectError::Destroyed) => self.running = false,
            Err(e) => log::warn!("{}", e),
        }
        self.input.begin_frame();

        if self.time.frame_count() % 600 == 0 {
            if let Some(fps) = self.effect.scene().and_then(|s| s.last_fps()) {
                log::debug!(
                    "{} fps ({:.1} ms last frame), {} clouds",
                    fps,
                    self.time.delta_seconds() * 1000.0,
                    self.effect.scene().map_or(0, |s| s.object_count())
                );
            }
        }
    }
}

/// Application handler for winit.
struct App {
    config: ViewerConfig,
    state: Option<ViewerState>,
}

impl App {
    fn new(config: ViewerConfig) -> Self {
        Self { config, state: None }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_none() {
            let window_attrs = Window::default_attributes()
                .with_title("Neo Clouds")
                .with_inner_size(winit::dpi::LogicalSize::new(self.config.window_width, self.config.window_height));

            let window = match event_loop.create_window(window_attrs) {
                Ok(w) => Arc::new(w),
                Err(e) => {
                    log::error!("Failed to create window: {}", e);
                    event_loop.exit();
                    return;
                }
            };

            let state = ViewerState::new(window.clone(), &self.config);
            self.state = Some(state);
            window.request_redraw();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        if let Some(state) = &mut self.state {
            if state.handle_window_event(event) || !state.running {
                event_loop.exit();
            }
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(state) = &self.state {
            state.window.request_redraw();
        }
    }
}

/// Render `headless.frames` frames on the CPU and save every `save_every`-th as PNG.
fn run_headless(config: &ViewerConfig) -> Result<()> {
    let headless: &HeadlessConfig = &config.headless;
    std::fs::create_dir_all(&headless.output_dir)
        .with_context(|| format!("creating {:?}", headless.output_dir))?;

    let info = HostInfo::detect(headless.width.max(1), headless.height.max(1));
    let [r, g, b] = config.clear_color;
    let host = DesktopHost::new(Some(headless.output_dir.join("effect.css")));
    let mut effect = CloudEffect::init(config.effect.clone(), info, Box::new(host), || {
        Ok(Box::new(SoftwareSurface::new(info.width, info.height).with_clear_color(r, g, b)) as Box<dyn RenderSurface>)
    });

    let every = headless.save_every.max(1);
    let mut saved = 0;
    for i in 0..headless.frames {
        effect.frame(i as f64 * headless.interval_ms)?;
        if i % every == 0 || i + 1 == headless.frames {
            if let Some(frame) = effect.snapshot() {
                let path = headless.output_dir.join(format!("frame_{:04}.png", i));
                save_png(&path, &frame)?;
                saved += 1;
            }
        }
    }
    effect.destroy();
    log::info!("Saved {} snapshots to {:?}", saved, headless.output_dir);
    Ok(())
}

fn save_png(path: &Path, frame: &TextureData) -> Result<()> {
    let image = image::RgbaImage::from_raw(frame.width, frame.height, frame.to_bytes())
        .context("snapshot size does not match its pixel data")?;
    image.save(path).with_context(|| format!("writing {:?}", path))?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut config = ViewerConfig::load();
    if std::env::args().skip(1).any(|a| a == "--headless") {
        config.headless.enabled = true;
    }

    if config.headless.enabled {
        log::info!("Starting Neo Clouds (headless)");
        return run_headless(&config);
    }

    println!("Neo Clouds: Space pause/resume, B particle burst, Escape quit");
    log::info!("Starting Neo Clouds");

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;

    Ok(())
}
