//! RGBA rasters and the drawing primitives used by texture synthesis.

use glam::Vec2;

/// RGBA pixel (straight alpha)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pixel {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Pixel {
    pub const TRANSPARENT: Pixel = Pixel::new(0, 0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn from_rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self {
            r: (r.clamp(0.0, 1.0) * 255.0).round() as u8,
            g: (g.clamp(0.0, 1.0) * 255.0).round() as u8,
            b: (b.clamp(0.0, 1.0) * 255.0).round() as u8,
            a: (a.clamp(0.0, 1.0) * 255.0).round() as u8,
        }
    }

    /// Channels as normalized floats.
    pub fn to_f32(self) -> [f32; 4] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
            self.a as f32 / 255.0,
        ]
    }

    pub fn to_bytes(&self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// An sRGB colour without alpha, parsed from `#RRGGBB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#RRGGBB` (leading `#` optional).
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }

    pub fn to_f32(self) -> [f32; 3] {
        [self.r as f32 / 255.0, self.g as f32 / 255.0, self.b as f32 / 255.0]
    }
}

/// Generated texture data
#[derive(Debug, Clone, PartialEq)]
pub struct TextureData {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<Pixel>,
}

impl TextureData {
    /// A fully transparent raster. Zero-sized rasters hold no pixels.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Pixel::TRANSPARENT; width as usize * height as usize],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, pixel: Pixel) {
        if x < self.width && y < self.height {
            self.pixels[(y * self.width + x) as usize] = pixel;
        }
    }

    pub fn get_pixel(&self, x: u32, y: u32) -> Pixel {
        if x < self.width && y < self.height {
            self.pixels[(y * self.width + x) as usize]
        } else {
            Pixel::TRANSPARENT
        }
    }

    /// Sample with edge clamping (no wrap, no mipmaps).
    pub fn sample(&self, u: f32, v: f32) -> Pixel {
        if self.is_empty() {
            return Pixel::TRANSPARENT;
        }
        let x = (u.clamp(0.0, 1.0) * self.width as f32) as u32;
        let y = (v.clamp(0.0, 1.0) * self.height as f32) as u32;
        self.get_pixel(x.min(self.width - 1), y.min(self.height - 1))
    }

    /// Composite `color` with `alpha` over the pixel at (x, y).
    pub fn blend_over(&mut self, x: u32, y: u32, color: Rgb, alpha: f32) {
        if x >= self.width || y >= self.height || alpha <= 0.0 {
            return;
        }
        let idx = (y * self.width + x) as usize;
        let [dr, dg, db, da] = self.pixels[idx].to_f32();
        let [sr, sg, sb] = color.to_f32();
        let sa = alpha.min(1.0);

        let out_a = sa + da * (1.0 - sa);
        if out_a <= 0.0 {
            return;
        }
        let mix = |s: f32, d: f32| (s * sa + d * da * (1.0 - sa)) / out_a;
        self.pixels[idx] = Pixel::from_rgba(mix(sr, dr), mix(sg, dg), mix(sb, db), out_a);
    }

    /// Fill a soft disc with an optional glow halo.
    pub fn fill_disc(&mut self, center: Vec2, radius: f32, glow: f32, color: Rgb, alpha: f32) {
        if self.is_empty() || radius <= 0.0 {
            return;
        }
        let reach = radius + glow * 1.5 + 1.0;
        let Some((x0, y0, x1, y1)) = self.clip_box(center - Vec2::splat(reach), center + Vec2::splat(reach)) else {
            return;
        };
        for y in y0..=y1 {
            for x in x0..=x1 {
                let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
                let d = (p - center).length();
                let coverage = edge_coverage(d, radius).max(glow_coverage(d - radius, glow));
                self.blend_over(x, y, color, coverage * alpha);
            }
        }
    }

    /// Clip a float rectangle to pixel bounds. `None` when fully outside.
    fn clip_box(&self, min: Vec2, max: Vec2) -> Option<(u32, u32, u32, u32)> {
        if max.x < 0.0 || max.y < 0.0 || min.x >= self.width as f32 || min.y >= self.height as f32 {
            return None;
        }
        let x0 = min.x.max(0.0) as u32;
        let y0 = min.y.max(0.0) as u32;
        let x1 = (max.x as u32).min(self.width - 1);
        let y1 = (max.y as u32).min(self.height - 1);
        Some((x0, y0, x1, y1))
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.pixels.len() * 4);
        for pixel in &self.pixels {
            bytes.extend_from_slice(&pixel.to_bytes());
        }
        bytes
    }

    /// Build from tightly packed RGBA8 bytes.
    pub fn from_rgba_bytes(width: u32, height: u32, bytes: &[u8]) -> Option<Self> {
        if bytes.len() != width as usize * height as usize * 4 {
            return None;
        }
        let pixels = bytes
            .chunks_exact(4)
            .map(|c| Pixel::new(c[0], c[1], c[2], c[3]))
            .collect();
        Some(Self { width, height, pixels })
    }
}

/// Per-pixel coverage accumulated with `max`, so overlapping strokes of one
/// path do not darken at their joints.
#[derive(Debug, Clone)]
pub struct CoverageMask {
    width: u32,
    height: u32,
    values: Vec<f32>,
}

impl CoverageMask {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            values: vec![0.0; width as usize * height as usize],
        }
    }

    pub fn clear(&mut self) {
        self.values.fill(0.0);
    }

    pub fn get(&self, x: u32, y: u32) -> f32 {
        if x < self.width && y < self.height {
            self.values[(y * self.width + x) as usize]
        } else {
            0.0
        }
    }

    /// Stroke a polyline of the given width with a glow halo of radius `glow`.
    pub fn stroke_polyline(&mut self, path: &[Vec2], width: f32, glow: f32) {
        for seg in path.windows(2) {
            self.stroke_segment(seg[0], seg[1], width * 0.5, glow);
        }
    }

    fn stroke_segment(&mut self, a: Vec2, b: Vec2, half_width: f32, glow: f32) {
        if self.values.is_empty() {
            return;
        }
        let reach = half_width + glow * 1.5 + 1.0;
        let min = a.min(b) - Vec2::splat(reach);
        let max = a.max(b) + Vec2::splat(reach);
        if max.x < 0.0 || max.y < 0.0 || min.x >= self.width as f32 || min.y >= self.height as f32 {
            return;
        }
        let x0 = min.x.max(0.0) as u32;
        let y0 = min.y.max(0.0) as u32;
        let x1 = (max.x as u32).min(self.width - 1);
        let y1 = (max.y as u32).min(self.height - 1);

        let ab = b - a;
        let len_sq = ab.length_squared();
        for y in y0..=y1 {
            for x in x0..=x1 {
                let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
                let t = if len_sq > 0.0 { ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0) } else { 0.0 };
                let d = (p - (a + ab * t)).length();
                let coverage = edge_coverage(d, half_width).max(glow_coverage(d - half_width, glow));
                if coverage > 0.0 {
                    let idx = (y * self.width + x) as usize;
                    self.values[idx] = self.values[idx].max(coverage);
                }
            }
        }
    }

    /// Composite the mask onto `target` in a single colour.
    pub fn composite_onto(&self, target: &mut TextureData, color: Rgb, alpha: f32) {
        let w = self.width.min(target.width);
        let h = self.height.min(target.height);
        for y in 0..h {
            for x in 0..w {
                let c = self.values[(y * self.width + x) as usize];
                if c > 0.0 {
                    target.blend_over(x, y, color, c * alpha);
                }
            }
        }
    }
}

/// Anti-aliased coverage of a shape edge at distance `d` from its centre line.
fn edge_coverage(d: f32, half_width: f32) -> f32 {
    (half_width + 0.5 - d).clamp(0.0, 1.0)
}

/// Soft halo outside a shape, approximating a canvas shadow blur.
fn glow_coverage(outside: f32, glow: f32) -> f32 {
    if glow <= 0.0 || outside <= 0.0 {
        return 0.0;
    }
    let sigma = glow * 0.5;
    0.5 * (-(outside * outside) / (2.0 * sigma * sigma)).exp()
}

/// Square sprite with a radial gradient: full colour at the centre, half
/// alpha at mid-radius, transparent at the edge.
pub fn radial_sprite(size: u32, color: Rgb) -> TextureData {
    let mut texture = TextureData::new(size, size);
    let half = size as f32 / 2.0;
    if half <= 0.0 {
        return texture;
    }
    for y in 0..size {
        for x in 0..size {
            let d = Vec2::new(x as f32 + 0.5 - half, y as f32 + 0.5 - half).length() / half;
            let alpha = if d <= 0.5 {
                1.0 - d
            } else {
                (1.0 - d).max(0.0)
            };
            let [r, g, b] = color.to_f32();
            texture.set_pixel(x, y, Pixel::from_rgba(r, g, b, alpha));
        }
    }
    texture
}
