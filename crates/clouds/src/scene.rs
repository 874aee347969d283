//! Scene manager: two layers of placed clouds, their cameras, and the
//! frame-rate driven degradation policy.

use crate::animation::{self, FrameContext};
use crate::config::{AnimationConfig, EffectConfig, PerformanceConfig, VisualConfig};
use crate::error::EffectError;
use crate::placement::{PlacedObject, PlacementStrategy};
use crate::zone::ZoneSet;
use engine_core::FpsMonitor;
use glam::{Vec2, Vec3};
use procgen::TextureId;
use renderer::{Composition, LayerBlend, LayerCamera, LayerKind, LayerPass, PointBatch};
use std::collections::VecDeque;

/// z-index of the background layer.
pub const BACKGROUND_Z_INDEX: i32 = 1;
/// z-index page content is lifted to.
pub const CONTENT_Z_INDEX: i32 = 500;
/// z-index of the overlay layer.
pub const OVERLAY_Z_INDEX: i32 = 1000;

/// One render group with its own camera and composition.
///
/// Objects are kept in insertion order; the front is the least recently added.
#[derive(Debug, Clone)]
pub struct Layer {
    kind: LayerKind,
    camera: LayerCamera,
    composition: Composition,
    objects: VecDeque<PlacedObject>,
    /// The host holds an element for this layer.
    present: bool,
    /// Shown at the current viewport width.
    visible: bool,
    opacity_factor: f32,
}

impl Layer {
    fn new(kind: LayerKind, viewport: (u32, u32), composition: Composition) -> Self {
        Self {
            kind,
            camera: LayerCamera::for_viewport(viewport.0, viewport.1),
            composition,
            objects: VecDeque::new(),
            present: true,
            visible: true,
            opacity_factor: 1.0,
        }
    }

    pub fn kind(&self) -> LayerKind {
        self.kind
    }

    pub fn camera(&self) -> &LayerCamera {
        &self.camera
    }

    pub fn composition(&self) -> Composition {
        self.composition
    }

    pub fn objects(&self) -> impl Iterator<Item = &PlacedObject> {
        self.objects.iter()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn is_present(&self) -> bool {
        self.present
    }

    /// Whether the layer is drawn at the current viewport width.
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn opacity_factor(&self) -> f32 {
        self.opacity_factor
    }

    fn to_pass(&self, points: Vec<PointBatch>) -> LayerPass {
        LayerPass {
            kind: self.kind,
            camera: self.camera.clone(),
            composition: self.composition,
            quads: self.objects.iter().map(PlacedObject::to_draw).collect(),
            points,
        }
    }
}

/// Owns both layers and decides what each frame draws.
pub struct SceneManager {
    background: Layer,
    overlay: Layer,
    placer: Box<dyn PlacementStrategy>,
    zones: ZoneSet,
    viewport: (u32, u32),
    cap: usize,
    fps: FpsMonitor,
    performance: PerformanceConfig,
    animation: AnimationConfig,
    visual: VisualConfig,
}

impl SceneManager {
    /// Build an empty scene. `cores` feeds the initial per-layer cap.
    pub fn new(config: &EffectConfig, placer: Box<dyn PlacementStrategy>, viewport: (u32, u32), cores: usize) -> Self {
        let visual = config.visual.clone();
        let background = Layer::new(
            LayerKind::Background,
            viewport,
            Composition {
                z_index: BACKGROUND_Z_INDEX,
                opacity: visual.background_layer_opacity,
                blend: LayerBlend::Normal,
            },
        );
        let overlay = Layer::new(
            LayerKind::Overlay,
            viewport,
            Composition {
                z_index: OVERLAY_Z_INDEX,
                opacity: visual.overlay_layer_opacity,
                blend: LayerBlend::Screen,
            },
        );

        let mut scene = Self {
            background,
            overlay,
            placer,
            zones: config.zones.clone(),
            viewport,
            cap: config.performance.initial_cap(viewport.0, cores),
            fps: FpsMonitor::new(config.performance.window_ms),
            performance: config.performance.clone(),
            animation: config.animation.clone(),
            visual,
        };
        scene.apply_viewport_rules();
        scene
    }

    pub fn layer(&self, kind: LayerKind) -> &Layer {
        match kind {
            LayerKind::Background => &self.background,
            LayerKind::Overlay => &self.overlay,
        }
    }

    fn layer_mut(&mut self, kind: LayerKind) -> &mut Layer {
        match kind {
            LayerKind::Background => &mut self.background,
            LayerKind::Overlay => &mut self.overlay,
        }
    }

    /// Current per-layer object cap.
    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    pub fn object_count(&self) -> usize {
        self.background.len() + self.overlay.len()
    }

    fn is_mobile(&self) -> bool {
        self.viewport.0 < self.performance.mobile_width
    }

    /// Mark whether the host mounted the layer's element. Only affects later `populate` calls.
    pub fn set_layer_present(&mut self, kind: LayerKind, present: bool) {
        self.layer_mut(kind).present = present;
    }

    /// Mobile-width viewports hide the overlay and thin the background.
    /// Hidden layers keep their objects so widening the viewport shows them again.
    fn apply_viewport_rules(&mut self) {
        let mobile = self.is_mobile();
        self.overlay.visible = !(mobile && self.visual.hide_overlay_on_mobile);
        self.background.composition.opacity = if mobile {
            self.visual.mobile_background_layer_opacity
        } else {
            self.visual.background_layer_opacity
        };
    }

    /// Place one object per zone. Zones whose layer the host lacks are skipped and reported.
    pub fn populate(&mut self, textures: &[TextureId]) -> Vec<EffectError> {
        let placed = self.placer.place(&self.zones, textures, self.viewport);
        let mut skipped = Vec::new();

        for object in placed {
            let kind = object.layer();
            if !self.layer(kind).present {
                log::error!("Layer '{}' missing for zone '{}'; zone skipped", kind.name(), object.zone_name);
                skipped.push(EffectError::MissingLayer {
                    zone: object.zone_name,
                    layer: kind.name(),
                });
                continue;
            }
            self.add_object(object);
        }
        skipped
    }

    /// Insert an object into its layer. Refused once the layer holds `cap` objects.
    pub fn add_object(&mut self, object: PlacedObject) -> bool {
        let cap = self.cap;
        let layer = self.layer_mut(object.layer());
        if layer.objects.len() >= cap {
            log::debug!(
                "Cloud cap {} reached on {} layer; '{}' not added",
                cap,
                layer.kind.name(),
                object.zone_name
            );
            return false;
        }
        layer.objects.push_back(object);
        true
    }

    /// New viewport: camera aspect, zone anchors and mobile rules.
    pub fn handle_resize(&mut self, width: u32, height: u32) {
        let viewport = (width.max(1), height.max(1));
        self.viewport = viewport;
        for layer in [&mut self.background, &mut self.overlay] {
            layer.camera.set_aspect(viewport.0, viewport.1);
            self.placer.relayout(layer.objects.make_contiguous(), viewport);
        }
        self.apply_viewport_rules();
    }

    /// Run the animation driver over every object. `time` is in seconds.
    pub fn animate(&mut self, time: f32, pointer: Vec2) {
        for layer in [&mut self.background, &mut self.overlay] {
            let frame = FrameContext {
                time,
                pointer,
                opacity_factor: layer.opacity_factor,
            };
            for object in layer.objects.iter_mut() {
                animation::animate(object, &frame, &self.animation);
            }
        }
    }

    /// Count a frame. Returns true when a closed window triggered a degradation step.
    pub fn record_frame(&mut self, timestamp_ms: f64) -> bool {
        let Some(fps) = self.fps.record_frame(timestamp_ms) else {
            return false;
        };
        if fps >= self.performance.fps_threshold || self.cap <= self.performance.cap_floor {
            return false;
        }
        self.degrade(fps);
        true
    }

    fn degrade(&mut self, fps: u32) {
        let floor = self.performance.layer_floor;
        for layer in [&mut self.background, &mut self.overlay] {
            if layer.objects.len() > floor {
                if let Some(removed) = layer.objects.pop_front() {
                    log::debug!("Removed '{}' from {} layer", removed.zone_name, layer.kind.name());
                }
            }
        }
        self.cap -= 1;
        log::warn!(
            "Low frame rate ({} fps): cloud cap lowered to {} (background {}, overlay {})",
            fps,
            self.cap,
            self.background.len(),
            self.overlay.len()
        );
    }

    /// Forget the open frame window, e.g. after a pause.
    pub fn reset_fps(&mut self) {
        self.fps.reset();
    }

    pub fn last_fps(&self) -> Option<u32> {
        self.fps.last_fps()
    }

    /// Scale object opacity per layer. Takes effect immediately and on every later frame.
    pub fn update_opacity(&mut self, background: f32, overlay: f32) {
        for (layer, factor) in [(&mut self.background, background), (&mut self.overlay, overlay)] {
            layer.opacity_factor = factor.max(0.0);
            for object in layer.objects.iter_mut() {
                object.opacity = object.base_opacity * layer.opacity_factor;
            }
        }
    }

    /// Live positions of the background clouds, used as particle sources.
    pub fn background_positions(&self) -> Vec<Vec3> {
        self.background.objects.iter().map(|o| o.transform.position).collect()
    }

    /// One pass per present, visible layer. The overlay redraws the particle batches at `overlay_particle_opacity`.
    pub fn passes(&self, particles: &[PointBatch], overlay_particle_opacity: f32) -> Vec<LayerPass> {
        let mut passes = Vec::with_capacity(2);
        if self.background.present && self.background.visible {
            passes.push(self.background.to_pass(particles.to_vec()));
        }
        if self.overlay.present && self.overlay.visible {
            let faded = particles
                .iter()
                .cloned()
                .map(|mut batch| {
                    batch.opacity = overlay_particle_opacity;
                    batch
                })
                .collect();
            passes.push(self.overlay.to_pass(faded));
        }
        passes
    }

    /// Drop every object from both layers.
    pub fn clear(&mut self) {
        self.background.objects.clear();
        self.overlay.objects.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VisualConfig;
    use crate::placement::StrategicPlacer;

    fn config(max_clouds: Option<usize>) -> EffectConfig {
        let mut config = EffectConfig::default();
        config.performance.max_clouds = max_clouds;
        config
    }

    fn scene(config: &EffectConfig, viewport: (u32, u32)) -> SceneManager {
        let placer = Box::new(StrategicPlacer::new(config.seed, VisualConfig::default()));
        SceneManager::new(config, placer, viewport, 8)
    }

    fn feed_window(scene: &mut SceneManager, start_ms: f64, fps: u32) -> bool {
        let step = 1000.0 / fps as f64;
        let mut degraded = false;
        for i in 0..fps {
            degraded |= scene.record_frame(start_ms + i as f64 * step);
        }
        degraded
    }

    #[test]
    fn populates_both_layers() {
        let config = config(None);
        let mut scene = scene(&config, (1280, 720));
        let errors = scene.populate(&[TextureId(0), TextureId(1)]);
        assert!(errors.is_empty());
        assert_eq!(scene.cap(), 8);
        assert_eq!(scene.layer(LayerKind::Background).len(), 4);
        assert_eq!(scene.layer(LayerKind::Overlay).len(), 4);
        assert_eq!(scene.object_count(), 8);
    }

    #[test]
    fn low_fps_degrades_to_floor_and_never_recovers() {
        let config = config(Some(8));
        let mut scene = scene(&config, (1280, 720));
        scene.populate(&[TextureId(0)]);

        let first_bg = scene.layer(LayerKind::Background).objects().next().map(|o| o.zone_name.clone());
        assert_eq!(first_bg.as_deref(), Some("heroLeft"));

        // Three windows at 20 fps; each closes on the first frame of the next
        let mut counts = Vec::new();
        for window in 0..4 {
            feed_window(&mut scene, window as f64 * 1000.0, 20);
            counts.push((
                scene.layer(LayerKind::Background).len(),
                scene.layer(LayerKind::Overlay).len(),
                scene.cap(),
            ));
        }
        assert_eq!(counts[0], (4, 4, 8));
        assert_eq!(counts[1], (3, 3, 7));
        assert_eq!(counts[2], (2, 2, 6));
        assert_eq!(counts[3], (2, 2, 5));

        // Oldest goes first
        let first_bg = scene.layer(LayerKind::Background).objects().next().map(|o| o.zone_name.clone());
        assert_eq!(first_bg.as_deref(), Some("bottomLeft"));

        // Good frame rate afterwards restores nothing
        for window in 4..8 {
            feed_window(&mut scene, window as f64 * 1000.0, 60);
        }
        assert_eq!(scene.layer(LayerKind::Background).len(), 2);
        assert_eq!(scene.layer(LayerKind::Overlay).len(), 2);
        assert!(scene.cap() <= 5);
    }

    #[test]
    fn cap_stops_at_floor() {
        let config = config(Some(8));
        let mut scene = scene(&config, (1280, 720));
        scene.populate(&[TextureId(0)]);
        for window in 0..12 {
            feed_window(&mut scene, window as f64 * 1000.0, 10);
        }
        assert_eq!(scene.cap(), config.performance.cap_floor);
        assert!(!feed_window(&mut scene, 12_000.0, 10));
    }

    #[test]
    fn insertion_beyond_cap_is_refused() {
        let config = config(Some(2));
        let mut scene = scene(&config, (1280, 720));
        scene.populate(&[TextureId(0)]);
        assert_eq!(scene.layer(LayerKind::Background).len(), 2);
        assert_eq!(scene.layer(LayerKind::Overlay).len(), 2);
    }

    #[test]
    fn resize_recomputes_anchors_and_aspect() {
        let config = config(None);
        let mut scene = scene(&config, (1280, 720));
        scene.populate(&[TextureId(0)]);
        scene.animate(4.0, Vec2::new(0.3, 0.3));
        scene.handle_resize(1000, 800);

        let hero = scene.layer(LayerKind::Background).objects().next().map(|o| o.original);
        assert!(hero.is_some_and(|a| a.abs_diff_eq(Vec2::new(-350.0, 160.0), 1e-3)));
        assert!((scene.layer(LayerKind::Overlay).camera().aspect - 1.25).abs() < 1e-6);
    }

    #[test]
    fn mobile_viewport_hides_overlay_without_dropping_it() {
        let config = config(Some(8));
        let mut scene = scene(&config, (500, 900));
        let errors = scene.populate(&[TextureId(0)]);

        assert!(errors.is_empty());
        assert_eq!(scene.layer(LayerKind::Background).len(), 4);
        assert_eq!(scene.layer(LayerKind::Overlay).len(), 4);
        assert!(!scene.layer(LayerKind::Overlay).is_visible());
        assert!((scene.layer(LayerKind::Background).composition().opacity - 0.4).abs() < 1e-6);
        assert_eq!(scene.passes(&[], 0.3).len(), 1);
    }

    #[test]
    fn widening_from_mobile_brings_overlay_back() {
        let config = config(Some(8));
        let mut scene = scene(&config, (500, 900));
        scene.populate(&[TextureId(0)]);
        scene.handle_resize(1280, 720);

        assert!(scene.layer(LayerKind::Overlay).is_visible());
        assert_eq!(scene.layer(LayerKind::Overlay).len(), 4);
        assert!((scene.layer(LayerKind::Background).composition().opacity - 0.8).abs() < 1e-6);
        let passes = scene.passes(&[], 0.3);
        assert_eq!(passes.len(), 2);
        assert_eq!(passes[1].quads.len(), 4);

        // And back down again hides without removing
        scene.handle_resize(600, 900);
        assert_eq!(scene.layer(LayerKind::Overlay).len(), 4);
        assert_eq!(scene.passes(&[], 0.3).len(), 1);
    }

    #[test]
    fn zones_of_missing_layer_are_skipped() {
        let config = config(Some(8));
        let mut scene = scene(&config, (1280, 720));
        scene.set_layer_present(LayerKind::Overlay, false);
        let errors = scene.populate(&[TextureId(0)]);

        assert_eq!(errors.len(), 4);
        assert!(errors.iter().all(|e| matches!(e, EffectError::MissingLayer { layer: "overlay", .. })));
        assert_eq!(scene.layer(LayerKind::Background).len(), 4);
        assert!(scene.layer(LayerKind::Overlay).is_empty());
        assert_eq!(scene.passes(&[], 0.3).len(), 1);
    }

    #[test]
    fn passes_carry_layer_composition() {
        let config = config(None);
        let mut scene = scene(&config, (1280, 720));
        scene.populate(&[TextureId(0)]);
        let batch = PointBatch::with_capacity(TextureId(9), 4);
        let passes = scene.passes(&[batch], 0.3);

        assert_eq!(passes.len(), 2);
        assert_eq!(passes[0].composition.z_index, BACKGROUND_Z_INDEX);
        assert_eq!(passes[0].composition.blend, LayerBlend::Normal);
        assert!((passes[0].composition.opacity - 0.8).abs() < 1e-6);
        assert_eq!(passes[0].points[0].opacity, 1.0);

        assert_eq!(passes[1].composition.z_index, OVERLAY_Z_INDEX);
        assert_eq!(passes[1].composition.blend, LayerBlend::Screen);
        assert_eq!(passes[1].quads.len(), 4);
        assert!((passes[1].points[0].opacity - 0.3).abs() < 1e-6);
    }

    #[test]
    fn opacity_factor_applies_per_layer() {
        let config = config(None);
        let mut scene = scene(&config, (1280, 720));
        scene.populate(&[TextureId(0)]);
        scene.update_opacity(0.5, 0.0);

        for object in scene.layer(LayerKind::Background).objects() {
            assert!((object.opacity - 0.35).abs() < 1e-6);
        }
        scene.animate(1.0, Vec2::ZERO);
        for object in scene.layer(LayerKind::Overlay).objects() {
            assert_eq!(object.opacity, 0.0);
        }
    }
}
