//! Texture cache: every raster is generated once and shared read-only.

use crate::synth::CloudSynthesizer;
use crate::textures::{radial_sprite, Rgb, TextureData};
use crate::variation::CloudVariation;
use std::collections::HashMap;
use std::sync::Arc;

/// Side length of particle sprites.
pub const SPRITE_SIZE: u32 = 32;

/// Non-owning handle to a cached texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u32);

/// What a cached texture was made from.
#[derive(Debug, Clone, PartialEq)]
pub enum TextureSource {
    Cloud { variation: CloudVariation, seed: u64 },
    Sprite { name: String },
    Artwork,
}

#[derive(Debug, Clone)]
pub struct CachedTexture {
    pub id: TextureId,
    pub source: TextureSource,
    pub data: Arc<TextureData>,
}

/// Supplies textures to the placement and rendering stages.
pub trait TextureProvider {
    /// Every texture id, in upload order.
    fn ids(&self) -> Vec<TextureId>;
    /// Cloud textures in catalogue order (artwork, if any, last).
    fn cloud_textures(&self) -> Vec<TextureId>;
    /// Look up raster data.
    fn texture(&self, id: TextureId) -> Option<&Arc<TextureData>>;
    /// Sprite registered under `name`, created with `color` on first request.
    fn sprite(&mut self, name: &str, color: Rgb) -> TextureId;
    /// Add an extra cloud texture from outside the synthesizer.
    fn insert_artwork(&mut self, data: TextureData) -> TextureId;

    fn len(&self) -> usize {
        self.ids().len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Owns every generated raster.
#[derive(Debug, Default)]
pub struct TextureCache {
    synthesizer: CloudSynthesizer,
    entries: Vec<CachedTexture>,
    clouds: Vec<TextureId>,
    by_key: HashMap<(CloudVariation, u64), TextureId>,
    sprites: HashMap<String, TextureId>,
}

impl TextureCache {
    pub fn new(synthesizer: CloudSynthesizer) -> Self {
        Self {
            synthesizer,
            ..Default::default()
        }
    }

    /// Generate the stock catalogue with seeds `seed_base + index`.
    pub fn with_catalogue(synthesizer: CloudSynthesizer, seed_base: u64) -> Self {
        let mut cache = Self::new(synthesizer);
        for (i, variation) in CloudVariation::catalogue().into_iter().enumerate() {
            cache.get_or_generate(variation, seed_base + i as u64);
        }
        log::info!("Procedural clouds generated: {}", cache.clouds.len());
        cache
    }

    /// Return the cached texture for (variation, seed), synthesizing it on first use.
    pub fn get_or_generate(&mut self, variation: CloudVariation, seed: u64) -> TextureId {
        if let Some(&id) = self.by_key.get(&(variation, seed)) {
            return id;
        }
        let cloud = self.synthesizer.generate(variation, seed);
        let id = self.push(TextureSource::Cloud { variation, seed }, cloud.texture);
        self.by_key.insert((variation, seed), id);
        self.clouds.push(id);
        id
    }

    /// Cloud texture for `index`, cycling through the catalogue.
    pub fn cloud_texture(&self, index: usize) -> Option<TextureId> {
        if self.clouds.is_empty() {
            None
        } else {
            Some(self.clouds[index % self.clouds.len()])
        }
    }

    pub fn entries(&self) -> &[CachedTexture] {
        &self.entries
    }

    fn push(&mut self, source: TextureSource, data: TextureData) -> TextureId {
        let id = TextureId(self.entries.len() as u32);
        self.entries.push(CachedTexture { id, source, data: Arc::new(data) });
        id
    }
}

impl TextureProvider for TextureCache {
    fn ids(&self) -> Vec<TextureId> {
        self.entries.iter().map(|e| e.id).collect()
    }

    fn cloud_textures(&self) -> Vec<TextureId> {
        self.clouds.clone()
    }

    fn texture(&self, id: TextureId) -> Option<&Arc<TextureData>> {
        self.entries.get(id.0 as usize).map(|e| &e.data)
    }

    /// Radial sprite of `color`; later requests for `name` ignore the colour.
    fn sprite(&mut self, name: &str, color: Rgb) -> TextureId {
        if let Some(&id) = self.sprites.get(name) {
            return id;
        }
        let id = self.push(
            TextureSource::Sprite { name: name.to_string() },
            radial_sprite(SPRITE_SIZE, color),
        );
        self.sprites.insert(name.to_string(), id);
        id
    }

    fn insert_artwork(&mut self, data: TextureData) -> TextureId {
        let id = self.push(TextureSource::Artwork, data);
        self.clouds.push(id);
        id
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
