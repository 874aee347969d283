//! The cloud effect as the host sees it: startup with fallbacks, the frame
//! callback, and the public control surface.

use crate::config::EffectConfig;
use crate::error::EffectError;
use crate::fallback::{GradientBackdrop, FALLBACK_CLASS};
use crate::host::{layer_stylesheet, EffectHost, HostInfo, BACKGROUND_CLASS, OVERLAY_CLASS};
use crate::particles::{ParticleEmitter, ParticleKind};
use crate::placement::{PlacementStrategy, StrategicPlacer};
use crate::scene::SceneManager;
use glam::{Vec2, Vec3};
use procgen::{load_artwork, CloudSynthesizer, TextureCache, TextureData, TextureProvider};
use renderer::{LayerKind, RenderError, RenderSurface, SurfaceGuard};

/// Lifecycle of the effect. `Destroyed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectState {
    Running,
    Paused,
    /// The engine failed to start; the host shows the gradient backdrop.
    Fallback,
    Destroyed,
}

/// Collaborators the effect is assembled from.
pub struct EffectParts {
    pub textures: Box<dyn TextureProvider>,
    pub placer: Box<dyn PlacementStrategy>,
}

impl EffectParts {
    /// Procedural catalogue and zone placement, both seeded from `config`.
    pub fn standard(config: &EffectConfig) -> Self {
        Self {
            textures: Box::new(TextureCache::with_catalogue(
                CloudSynthesizer::default(),
                config.texture_seed_base,
            )),
            placer: Box::new(StrategicPlacer::new(config.seed, config.visual.clone())),
        }
    }
}

/// Everything that exists only while the engine is up.
struct Engine {
    surface: SurfaceGuard,
    scene: SceneManager,
    emitter: Option<ParticleEmitter>,
    textures: Box<dyn TextureProvider>,
}

pub struct CloudEffect {
    state: EffectState,
    config: EffectConfig,
    info: HostInfo,
    host: Box<dyn EffectHost>,
    engine: Option<Engine>,
    backdrop: Option<GradientBackdrop>,
    attached: Vec<&'static str>,
    /// Normalized pointer, written by the event channel and read by the next frame.
    pointer: Vec2,
    start_ms: Option<f64>,
    elapsed: f32,
    diagnostics: Vec<EffectError>,
}

impl CloudEffect {
    /// Bring the effect up with the standard texture catalogue and placer.
    pub fn init<F>(config: EffectConfig, info: HostInfo, host: Box<dyn EffectHost>, create_surface: F) -> Self
    where
        F: FnOnce() -> Result<Box<dyn RenderSurface>, RenderError>,
    {
        let parts = EffectParts::standard(&config);
        Self::with_parts(config, info, host, parts, create_surface)
    }

    /// Bring the effect up from injected parts. Never fails: an engine failure yields `Fallback`.
    ///
    /// `create_surface` is called once; whatever it returns is released on
    /// `destroy` or drop, including when later setup steps fail.
    pub fn with_parts<F>(
        config: EffectConfig,
        info: HostInfo,
        host: Box<dyn EffectHost>,
        parts: EffectParts,
        create_surface: F,
    ) -> Self
    where
        F: FnOnce() -> Result<Box<dyn RenderSurface>, RenderError>,
    {
        log::info!("Initializing cloud effect ({}x{}, {} cores)", info.width, info.height, info.cores);

        let mut effect = Self {
            state: EffectState::Running,
            config,
            info,
            host,
            engine: None,
            backdrop: None,
            attached: Vec::new(),
            pointer: Vec2::ZERO,
            start_ms: None,
            elapsed: 0.0,
            diagnostics: Vec::new(),
        };

        match create_surface().and_then(|surface| effect.start_engine(surface, parts)) {
            Ok(engine) => effect.engine = Some(engine),
            Err(err) => effect.enter_fallback(EffectError::EngineLoad(err)),
        }
        effect
    }

    /// Textures, upload, layers, scene and particles. The guard releases the surface if any step fails.
    fn start_engine(&mut self, surface: Box<dyn RenderSurface>, parts: EffectParts) -> Result<Engine, RenderError> {
        let mut guard = SurfaceGuard::new(surface);
        let mut textures = parts.textures;

        if let Some(path) = self.config.artwork.clone() {
            match load_artwork(&path) {
                Ok(data) if !data.is_empty() => {
                    textures.insert_artwork(data);
                }
                Ok(_) => log::warn!("Cloud artwork {:?} is empty; using procedural clouds only", path),
                Err(err) => {
                    let err = EffectError::from(err);
                    log::warn!("{}; using procedural clouds only", err);
                    self.diagnostics.push(err);
                }
            }
        }
        let sprites = ParticleKind::ALL.map(|kind| textures.sprite(kind.sprite_name(), kind.color()));

        if let Some(surface) = guard.get_mut() {
            surface.resize(self.info.width, self.info.height);
            for id in textures.ids() {
                if let Some(data) = textures.texture(id) {
                    surface.upload_texture(id, data)?;
                }
            }
        }
        log::info!("Uploaded {} textures", textures.len());

        let mut scene = SceneManager::new(
            &self.config,
            parts.placer,
            (self.info.width, self.info.height),
            self.info.cores,
        );
        self.attach_layers(&mut scene);
        self.diagnostics.extend(scene.populate(&textures.cloud_textures()));

        let emitter = self
            .config
            .particles
            .enabled
            .then(|| ParticleEmitter::new(self.config.particles.clone(), sprites, self.config.seed.wrapping_add(1)));

        log::info!(
            "Cloud effect initialized: {} background, {} overlay clouds (cap {}), particles {}",
            scene.layer(LayerKind::Background).len(),
            scene.layer(LayerKind::Overlay).len(),
            scene.cap(),
            if emitter.is_some() { "on" } else { "off" }
        );

        Ok(Engine {
            surface: guard,
            scene,
            emitter,
            textures,
        })
    }

    /// Mount one element per layer. A layer the host refuses is marked missing in `scene`.
    fn attach_layers(&mut self, scene: &mut SceneManager) {
        for (kind, class) in [(LayerKind::Background, BACKGROUND_CLASS), (LayerKind::Overlay, OVERLAY_CLASS)] {
            if self.host.attach_surface(class) {
                self.attached.push(class);
            } else {
                log::error!("Host has no element for .{}; {} layer disabled", class, kind.name());
                scene.set_layer_present(kind, false);
            }
        }
        let css = layer_stylesheet(&self.config.visual, self.config.performance.mobile_width);
        self.host.inject_styles(&css);
    }

    fn enter_fallback(&mut self, err: EffectError) {
        log::warn!("{}; showing gradient fallback", err);
        let backdrop = GradientBackdrop::default();
        if self.host.attach_surface(FALLBACK_CLASS) {
            self.attached.push(FALLBACK_CLASS);
        } else {
            log::error!("Host has no element for .{}", FALLBACK_CLASS);
        }
        self.host.inject_styles(&backdrop.css());
        self.backdrop = Some(backdrop);
        self.diagnostics.push(err);
        self.state = EffectState::Fallback;
    }

    pub fn state(&self) -> EffectState {
        self.state
    }

    /// Non-fatal problems met so far (artwork, skipped zones, engine failure).
    pub fn diagnostics(&self) -> &[EffectError] {
        &self.diagnostics
    }

    pub fn scene(&self) -> Option<&SceneManager> {
        self.engine.as_ref().map(|e| &e.scene)
    }

    pub fn particles(&self) -> Option<&ParticleEmitter> {
        self.engine.as_ref().and_then(|e| e.emitter.as_ref())
    }

    pub fn particles_mut(&mut self) -> Option<&mut ParticleEmitter> {
        self.engine.as_mut().and_then(|e| e.emitter.as_mut())
    }

    pub fn textures(&self) -> Option<&dyn TextureProvider> {
        self.engine.as_ref().map(|e| e.textures.as_ref())
    }

    /// Seconds since the first frame.
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// One animation-frame callback.
    pub fn frame(&mut self, timestamp_ms: f64) -> Result<(), EffectError> {
        if self.state == EffectState::Destroyed {
            return Err(EffectError::Destroyed);
        }
        let start = *self.start_ms.get_or_insert(timestamp_ms);
        self.elapsed = ((timestamp_ms - start) / 1000.0) as f32;
        if self.state != EffectState::Running {
            return Ok(());
        }
        let Some(engine) = self.engine.as_mut() else {
            return Ok(());
        };

        engine.scene.animate(self.elapsed, self.pointer);
        engine.scene.record_frame(timestamp_ms);

        let batches = match engine.emitter.as_mut() {
            Some(emitter) => {
                emitter.update(timestamp_ms, &engine.scene.background_positions());
                emitter.batches()
            }
            None => Vec::new(),
        };
        let passes = engine.scene.passes(&batches, self.config.particles.overlay_opacity);

        if let Some(surface) = engine.surface.get_mut() {
            if let Err(err) = surface.render(&passes) {
                log::warn!("{}", EffectError::Render(err));
            }
        }
        Ok(())
    }

    /// Stop animating. Idempotent.
    pub fn pause(&mut self) {
        if self.state == EffectState::Running {
            self.state = EffectState::Paused;
            log::info!("Cloud effect paused");
        }
    }

    /// Continue from the current time. The paused gap is not measured as low frame rate.
    pub fn resume(&mut self) {
        if self.state == EffectState::Paused {
            if let Some(engine) = self.engine.as_mut() {
                engine.scene.reset_fps();
            }
            self.state = EffectState::Running;
            log::info!("Cloud effect resumed");
        }
    }

    /// Release the surface and remove every attached element. Idempotent and terminal.
    pub fn destroy(&mut self) {
        if self.state == EffectState::Destroyed {
            return;
        }
        if let Some(mut engine) = self.engine.take() {
            engine.scene.clear();
            if let Some(emitter) = engine.emitter.as_mut() {
                emitter.clear();
            }
            engine.surface.release();
        }
        for class in self.attached.drain(..) {
            self.host.detach_surface(class);
        }
        self.backdrop = None;
        self.state = EffectState::Destroyed;
        log::info!("Cloud effect destroyed");
    }

    pub fn update_opacity(&mut self, background: f32, overlay: f32) {
        if let Some(engine) = self.engine.as_mut() {
            engine.scene.update_opacity(background, overlay);
        }
    }

    pub fn handle_resize(&mut self, width: u32, height: u32) {
        if self.state == EffectState::Destroyed || width == 0 || height == 0 {
            return;
        }
        self.info.width = width;
        self.info.height = height;
        if let Some(engine) = self.engine.as_mut() {
            if let Some(surface) = engine.surface.get_mut() {
                surface.resize(width, height);
            }
            engine.scene.handle_resize(width, height);
        }
    }

    /// Pointer position in viewport pixels.
    pub fn pointer_moved(&mut self, x: f32, y: f32) {
        let w = self.info.width.max(1) as f32;
        let h = self.info.height.max(1) as f32;
        self.pointer = Vec2::new((x / w - 0.5) * 2.0, (y / h - 0.5) * 2.0);
    }

    pub fn pointer_left(&mut self) {
        self.pointer = Vec2::ZERO;
    }

    pub fn pointer(&self) -> Vec2 {
        self.pointer
    }

    /// Burst of energy particles at the world point under the pointer.
    pub fn burst(&mut self, count: usize) {
        if self.state != EffectState::Running {
            return;
        }
        let origin = Vec3::new(
            self.pointer.x * self.info.width as f32 * 0.5,
            -self.pointer.y * self.info.height as f32 * 0.5,
            0.0,
        );
        if let Some(emitter) = self.particles_mut() {
            emitter.emit_burst(origin, count);
        }
    }

    /// The last presented frame, or the backdrop raster while in fallback.
    pub fn snapshot(&mut self) -> Option<TextureData> {
        match self.state {
            EffectState::Fallback => self
                .backdrop
                .as_ref()
                .map(|b| b.render(self.info.width, self.info.height, self.elapsed)),
            EffectState::Destroyed => None,
            _ => self.engine.as_mut()?.surface.get_mut()?.read_pixels(),
        }
    }
}

impl Drop for CloudEffect {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{HostEvent, RecordingHost};
    use crate::placement::PlacedObject;
    use crate::zone::ZoneSet;
    use procgen::{Rgb, TextureId};
    use renderer::{LayerPass, SoftwareSurface};
    use std::cell::Cell;
    use std::rc::Rc;
    use std::sync::Arc;

    /// Software surface that counts disposals and uploads.
    struct TrackedSurface {
        inner: SoftwareSurface,
        disposals: Rc<Cell<u32>>,
        uploads: Rc<Cell<u32>>,
        fail_uploads: bool,
    }

    impl RenderSurface for TrackedSurface {
        fn upload_texture(&mut self, id: TextureId, data: &TextureData) -> Result<(), RenderError> {
            if self.fail_uploads {
                return Err(RenderError::EmptyTexture(id));
            }
            self.uploads.set(self.uploads.get() + 1);
            self.inner.upload_texture(id, data)
        }
        fn resize(&mut self, width: u32, height: u32) {
            self.inner.resize(width, height)
        }
        fn render(&mut self, passes: &[LayerPass]) -> Result<(), RenderError> {
            self.inner.render(passes)
        }
        fn dispose(&mut self) {
            self.disposals.set(self.disposals.get() + 1);
            self.inner.dispose()
        }
        fn is_disposed(&self) -> bool {
            self.inner.is_disposed()
        }
        fn size(&self) -> (u32, u32) {
            self.inner.size()
        }
        fn read_pixels(&self) -> Option<TextureData> {
            self.inner.read_pixels()
        }
    }

    fn info(width: u32, height: u32) -> HostInfo {
        HostInfo { width, height, cores: 8 }
    }

    /// Counters shared with a [`TrackedSurface`].
    #[derive(Default)]
    struct Counters {
        disposals: Rc<Cell<u32>>,
        uploads: Rc<Cell<u32>>,
    }

    fn start_with(
        config: EffectConfig,
        info: HostInfo,
        host: RecordingHost,
        parts: EffectParts,
        fail_uploads: bool,
    ) -> (CloudEffect, Counters) {
        let counters = Counters::default();
        let disposals = counters.disposals.clone();
        let uploads = counters.uploads.clone();
        let effect = CloudEffect::with_parts(config, info, Box::new(host), parts, move || {
            Ok(Box::new(TrackedSurface {
                inner: SoftwareSurface::new(info.width, info.height),
                disposals,
                uploads,
                fail_uploads,
            }) as Box<dyn RenderSurface>)
        });
        (effect, counters)
    }

    fn start(config: EffectConfig, info: HostInfo, fail_uploads: bool) -> (CloudEffect, RecordingHost, Rc<Cell<u32>>) {
        let host = RecordingHost::new();
        let parts = EffectParts::standard(&config);
        let (effect, counters) = start_with(config, info, host.clone(), parts, fail_uploads);
        (effect, host, counters.disposals)
    }

    /// Provider with one flat cloud texture and tiny sprites.
    #[derive(Default)]
    struct FlatTextures {
        entries: Vec<Arc<TextureData>>,
        clouds: Vec<TextureId>,
    }

    impl FlatTextures {
        fn with_one_cloud() -> Self {
            let mut textures = Self::default();
            let id = textures.push(TextureData::new(8, 4));
            textures.clouds.push(id);
            textures
        }

        fn push(&mut self, data: TextureData) -> TextureId {
            self.entries.push(Arc::new(data));
            TextureId(self.entries.len() as u32 - 1)
        }
    }

    impl TextureProvider for FlatTextures {
        fn ids(&self) -> Vec<TextureId> {
            (0..self.entries.len() as u32).map(TextureId).collect()
        }
        fn cloud_textures(&self) -> Vec<TextureId> {
            self.clouds.clone()
        }
        fn texture(&self, id: TextureId) -> Option<&Arc<TextureData>> {
            self.entries.get(id.0 as usize)
        }
        fn sprite(&mut self, _: &str, _: Rgb) -> TextureId {
            self.push(TextureData::new(2, 2))
        }
        fn insert_artwork(&mut self, data: TextureData) -> TextureId {
            let id = self.push(data);
            self.clouds.push(id);
            id
        }
    }

    /// Places only the first `keep` zones and counts calls.
    struct FirstZones {
        inner: StrategicPlacer,
        keep: usize,
        calls: Rc<Cell<u32>>,
    }

    impl PlacementStrategy for FirstZones {
        fn place(&mut self, zones: &ZoneSet, textures: &[TextureId], viewport: (u32, u32)) -> Vec<PlacedObject> {
            self.calls.set(self.calls.get() + 1);
            let mut placed = self.inner.place(zones, textures, viewport);
            placed.truncate(self.keep);
            placed
        }
    }

    #[test]
    fn starts_running_with_both_layers() {
        let (mut effect, host, _) = start(EffectConfig::default(), info(1024, 200), false);
        assert_eq!(effect.state(), EffectState::Running);
        assert!(effect.diagnostics().is_empty());

        let scene = effect.scene().unwrap();
        assert_eq!(scene.layer(LayerKind::Background).len(), 4);
        assert_eq!(scene.layer(LayerKind::Overlay).len(), 4);
        assert_eq!(host.attached(), vec![BACKGROUND_CLASS.to_string(), OVERLAY_CLASS.to_string()]);
        assert!(host.styles()[0].contains("z-index: 500"));
        // Catalogue plus one sprite per particle kind
        assert_eq!(effect.textures().map(|t| t.len()), Some(8 + 3));

        effect.frame(0.0).unwrap();
        effect.frame(16.0).unwrap();
        let frame = effect.snapshot().unwrap();
        assert_eq!((frame.width, frame.height), (1024, 200));
    }

    #[test]
    fn pause_resume_and_destroy_are_idempotent() {
        let (mut effect, host, disposals) = start(EffectConfig::default(), info(1024, 600), false);
        effect.pause();
        effect.pause();
        assert_eq!(effect.state(), EffectState::Paused);
        effect.resume();
        effect.resume();
        assert_eq!(effect.state(), EffectState::Running);

        effect.destroy();
        effect.destroy();
        assert_eq!(effect.state(), EffectState::Destroyed);
        assert_eq!(disposals.get(), 1);
        assert!(host.attached().is_empty());
        let detached = host.events().iter().filter(|e| matches!(e, HostEvent::Detached(_))).count();
        assert_eq!(detached, 2);

        assert!(matches!(effect.frame(100.0), Err(EffectError::Destroyed)));
        effect.resume();
        assert_eq!(effect.state(), EffectState::Destroyed);
        drop(effect);
        assert_eq!(disposals.get(), 1);
    }

    #[test]
    fn engine_failure_falls_back_to_gradient() {
        let host = RecordingHost::new();
        let mut effect = CloudEffect::init(EffectConfig::default(), info(400, 300), Box::new(host.clone()), || {
            Err(RenderError::NoAdapter)
        });
        assert_eq!(effect.state(), EffectState::Fallback);
        assert!(matches!(effect.diagnostics(), [EffectError::EngineLoad(RenderError::NoAdapter)]));
        assert_eq!(host.attached(), vec![FALLBACK_CLASS.to_string()]);
        assert!(host.styles()[0].contains("radial-gradient"));

        // Controls stay usable
        effect.frame(0.0).unwrap();
        effect.pause();
        assert_eq!(effect.state(), EffectState::Fallback);
        let backdrop = effect.snapshot().unwrap();
        assert_eq!((backdrop.width, backdrop.height), (400, 300));
    }

    #[test]
    fn failed_upload_releases_surface_and_falls_back() {
        let (effect, _, disposals) = start(EffectConfig::default(), info(400, 300), true);
        assert_eq!(effect.state(), EffectState::Fallback);
        assert_eq!(disposals.get(), 1);
        assert!(effect.scene().is_none());
    }

    #[test]
    fn missing_artwork_keeps_running() {
        let config = EffectConfig {
            artwork: Some("does/not/exist.png".into()),
            ..Default::default()
        };
        let (effect, _, _) = start(config, info(1024, 600), false);
        assert_eq!(effect.state(), EffectState::Running);
        assert!(matches!(effect.diagnostics(), [EffectError::AssetLoad(_)]));
        assert_eq!(effect.textures().map(|t| t.len()), Some(8 + 3));
    }

    #[test]
    fn injected_parts_are_used() {
        let config = EffectConfig::default();
        let calls = Rc::new(Cell::new(0));
        let parts = EffectParts {
            textures: Box::new(FlatTextures::with_one_cloud()),
            placer: Box::new(FirstZones {
                inner: StrategicPlacer::new(1, config.visual.clone()),
                keep: 2,
                calls: calls.clone(),
            }),
        };
        let (mut effect, counters) = start_with(config, info(1024, 600), RecordingHost::new(), parts, false);

        assert_eq!(effect.state(), EffectState::Running);
        assert_eq!(calls.get(), 1);
        // One cloud plus one sprite per particle kind, all uploaded through the provider
        assert_eq!(effect.textures().map(|t| t.len()), Some(1 + 3));
        assert_eq!(counters.uploads.get(), 4);

        let scene = effect.scene().unwrap();
        assert_eq!(scene.object_count(), 2);
        for kind in [LayerKind::Background, LayerKind::Overlay] {
            assert!(scene.layer(kind).objects().all(|o| o.texture == TextureId(0)));
        }
        effect.frame(0.0).unwrap();
        assert!(effect.snapshot().is_some());
    }

    #[test]
    fn zones_without_layer_are_skipped() {
        let mut config = EffectConfig::default();
        config.performance.max_clouds = Some(8);
        let host = RecordingHost::new().without(OVERLAY_CLASS);
        let parts = EffectParts::standard(&config);
        let (effect, _) = start_with(config, info(1024, 600), host.clone(), parts, false);

        assert_eq!(effect.state(), EffectState::Running);
        assert_eq!(host.attached(), vec![BACKGROUND_CLASS.to_string()]);
        let missing = effect
            .diagnostics()
            .iter()
            .filter(|e| matches!(e, EffectError::MissingLayer { layer: "overlay", .. }))
            .count();
        assert_eq!(missing, 4);
        let scene = effect.scene().unwrap();
        assert_eq!(scene.layer(LayerKind::Background).len(), 4);
        assert!(scene.layer(LayerKind::Overlay).is_empty());
    }

    #[test]
    fn narrow_start_shows_overlay_once_widened() {
        let mut config = EffectConfig::default();
        config.performance.max_clouds = Some(8);
        let (mut effect, _, _) = start(config, info(600, 900), false);

        assert!(effect.diagnostics().is_empty());
        assert_eq!(effect.scene().map(|s| s.passes(&[], 0.3).len()), Some(1));

        effect.handle_resize(1280, 720);
        let scene = effect.scene().unwrap();
        assert_eq!(scene.layer(LayerKind::Overlay).len(), 4);
        assert_eq!(scene.passes(&[], 0.3).len(), 2);
    }

    #[test]
    fn resume_does_not_count_paused_gap_as_slow() {
        let mut config = EffectConfig::default();
        config.performance.max_clouds = Some(8);
        let (mut effect, _, _) = start(config, info(800, 200), false);

        for i in 0..=60 {
            effect.frame(i as f64 * 1000.0 / 60.0).unwrap();
        }
        effect.pause();
        effect.resume();
        // Would close a one-frame window if the pause were measured
        effect.frame(30_000.0).unwrap();
        assert_eq!(effect.scene().map(|s| s.cap()), Some(8));
        assert_eq!(effect.scene().and_then(|s| s.last_fps()), Some(60));
    }

    #[test]
    fn pointer_is_normalized_from_centre() {
        let (mut effect, _, _) = start(EffectConfig::default(), info(1000, 800), false);
        effect.pointer_moved(1000.0, 0.0);
        assert!(effect.pointer().abs_diff_eq(Vec2::new(1.0, -1.0), 1e-6));
        effect.pointer_left();
        assert_eq!(effect.pointer(), Vec2::ZERO);
    }

    #[test]
    fn resize_reaches_surface_and_scene() {
        let (mut effect, _, _) = start(EffectConfig::default(), info(1000, 800), false);
        effect.handle_resize(640, 480);
        effect.frame(0.0).unwrap();
        assert_eq!(effect.scene().map(|s| s.viewport()), Some((640, 480)));
        let frame = effect.snapshot().unwrap();
        assert_eq!((frame.width, frame.height), (640, 480));
    }
}
