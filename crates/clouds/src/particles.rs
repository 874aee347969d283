//! Particle emitter: low-rate glowing motes drifting off the background clouds.
//!
//! Integration uses a fixed step per update regardless of the real frame
//! delta. The live list is a ring buffer; overflow evicts the oldest.

use crate::config::ParticleConfig;
use glam::Vec3;
use procgen::{Rgb, TextureId};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use renderer::{BlendMode, PointBatch};
use std::collections::VecDeque;

/// Sprite flavour of a particle. Each kind renders as one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParticleKind {
    /// Ambient glow.
    Glow,
    /// Trail spark.
    Spark,
    /// Burst energy.
    Energy,
}

impl ParticleKind {
    pub const ALL: [ParticleKind; 3] = [ParticleKind::Glow, ParticleKind::Spark, ParticleKind::Energy];

    pub fn color(self) -> Rgb {
        match self {
            ParticleKind::Glow => Rgb::new(0x84, 0xFE, 0x8E),
            ParticleKind::Spark => Rgb::new(0x3B, 0x82, 0xF6),
            ParticleKind::Energy => Rgb::new(0x8B, 0x5C, 0xF6),
        }
    }

    /// Texture cache key of the kind's sprite.
    pub fn sprite_name(self) -> &'static str {
        match self {
            ParticleKind::Glow => "glow",
            ParticleKind::Spark => "spark",
            ParticleKind::Energy => "energy",
        }
    }

    fn index(self) -> usize {
        match self {
            ParticleKind::Glow => 0,
            ParticleKind::Spark => 1,
            ParticleKind::Energy => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pub position: Vec3,
    pub velocity: Vec3,
    /// Seconds lived so far.
    pub age: f32,
    pub max_lifetime: f32,
    pub size: f32,
    pub opacity: f32,
    pub kind: ParticleKind,
}

impl Particle {
    pub fn is_expired(&self) -> bool {
        self.age >= self.max_lifetime
    }
}

pub struct ParticleEmitter {
    config: ParticleConfig,
    sprites: [TextureId; 3],
    particles: VecDeque<Particle>,
    rng: StdRng,
    last_emission_ms: f64,
}

impl ParticleEmitter {
    /// `sprites` holds the texture of each kind in `ParticleKind::ALL` order.
    pub fn new(config: ParticleConfig, sprites: [TextureId; 3], seed: u64) -> Self {
        Self {
            particles: VecDeque::with_capacity(config.max_particles),
            config,
            sprites,
            rng: StdRng::seed_from_u64(seed),
            last_emission_ms: 0.0,
        }
    }

    pub fn config(&self) -> &ParticleConfig {
        &self.config
    }

    pub fn live_count(&self) -> usize {
        self.particles.len()
    }

    pub fn particles(&self) -> impl Iterator<Item = &Particle> {
        self.particles.iter()
    }

    /// Emit at most one particle from a random source if the emission
    /// interval has passed, then advance every live particle one step.
    pub fn update(&mut self, timestamp_ms: f64, sources: &[Vec3]) {
        let rate = self.config.emission_rate;
        if rate > 0.0 && timestamp_ms - self.last_emission_ms > 1000.0 / rate as f64 {
            if !sources.is_empty() {
                let origin = sources[self.rng.gen_range(0..sources.len())];
                let kind = ParticleKind::ALL[self.rng.gen_range(0..ParticleKind::ALL.len())];
                let particle = self.spawn(origin, kind);
                self.push(particle);
            }
            self.last_emission_ms = timestamp_ms;
        }
        self.integrate();
    }

    /// Emit `count` burst particles around `origin` at once, outside the rate limit.
    pub fn emit_burst(&mut self, origin: Vec3, count: usize) {
        for _ in 0..count {
            let particle = self.spawn(origin, ParticleKind::Energy);
            self.push(particle);
        }
        log::debug!("Particle burst of {} at {:?}", count, origin);
    }

    fn spawn(&mut self, origin: Vec3, kind: ParticleKind) -> Particle {
        let cfg = &self.config;
        let jitter = Vec3::new(
            (self.rng.gen::<f32>() - 0.5) * cfg.jitter[0],
            (self.rng.gen::<f32>() - 0.5) * cfg.jitter[1],
            (self.rng.gen::<f32>() - 0.5) * cfg.jitter[2],
        );

        // Uniform direction on the sphere
        let z = self.rng.gen_range(-1.0f32..=1.0);
        let theta = self.rng.gen::<f32>() * std::f32::consts::TAU;
        let r = (1.0 - z * z).max(0.0).sqrt();
        let direction = Vec3::new(r * theta.cos(), r * theta.sin(), z);
        let speed = lerp(cfg.speed_min, cfg.speed_max, self.rng.gen());

        Particle {
            position: origin + jitter,
            velocity: direction * speed,
            age: 0.0,
            max_lifetime: cfg.lifetime * (0.5 + self.rng.gen::<f32>() * 0.5),
            size: lerp(cfg.size_min, cfg.size_max, self.rng.gen()),
            opacity: cfg.opacity_start,
            kind,
        }
    }

    fn push(&mut self, particle: Particle) {
        if self.config.max_particles == 0 {
            return;
        }
        while self.particles.len() >= self.config.max_particles {
            self.particles.pop_front();
        }
        self.particles.push_back(particle);
    }

    fn integrate(&mut self) {
        let cfg = &self.config;
        for p in self.particles.iter_mut() {
            p.age += cfg.time_step;
            p.position += p.velocity;
            p.velocity.y -= cfg.gravity;
            p.velocity *= cfg.drag;
            let t = if p.max_lifetime > 0.0 {
                (p.age / p.max_lifetime).min(1.0)
            } else {
                1.0
            };
            p.opacity = lerp(cfg.opacity_start, cfg.opacity_end, t);
        }
        self.particles.retain(|p| !p.is_expired());
    }

    /// One batch per kind, sized for `max_particles`; unused slots stay zero.
    pub fn batches(&self) -> Vec<PointBatch> {
        let cap = self.config.max_particles;
        let mut batches: Vec<PointBatch> = ParticleKind::ALL
            .iter()
            .map(|kind| {
                let mut batch = PointBatch::with_capacity(self.sprites[kind.index()], cap);
                batch.blend = BlendMode::Additive;
                batch
            })
            .collect();

        for p in &self.particles {
            let batch = &mut batches[p.kind.index()];
            let i = batch.draw_count;
            if i >= cap {
                continue;
            }
            batch.positions[i * 3..i * 3 + 3].copy_from_slice(&p.position.to_array());
            batch.opacities[i] = p.opacity;
            batch.sizes[i] = p.size;
            batch.draw_count += 1;
        }
        batches
    }

    /// Particles per second; zero stops emission.
    pub fn set_emission_rate(&mut self, rate: f32) {
        self.config.emission_rate = rate.max(0.0);
    }

    /// Base lifetime in seconds for particles emitted from now on.
    pub fn set_particle_lifetime(&mut self, seconds: f32) {
        self.config.lifetime = seconds.max(0.0);
    }

    pub fn set_particle_size(&mut self, min: f32, max: f32) {
        self.config.size_min = min.min(max);
        self.config.size_max = max.max(min);
    }

    pub fn pause_emission(&mut self) {
        self.set_emission_rate(0.0);
    }

    pub fn resume_emission(&mut self, rate: f32) {
        self.set_emission_rate(rate);
    }

    pub fn clear(&mut self) {
        self.particles.clear();
    }
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}
