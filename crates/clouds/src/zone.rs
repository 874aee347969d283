//! Named screen zones that each anchor one decorative cloud.

use glam::Vec2;
use procgen::SizeClass;
use renderer::LayerKind;
use serde::{Deserialize, Serialize};

/// Which side of the page content a zone's cloud sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DepthClass {
    Behind,
    Overlay,
}

impl DepthClass {
    /// Layer that renders objects of this class.
    pub fn layer(self) -> LayerKind {
        match self {
            DepthClass::Behind => LayerKind::Background,
            DepthClass::Overlay => LayerKind::Overlay,
        }
    }

    /// Resting z of objects of this class.
    pub fn base_z(self) -> f32 {
        match self {
            DepthClass::Behind => -100.0,
            DepthClass::Overlay => 100.0,
        }
    }
}

/// Normalized placement: x and y in [0, 1] from the top-left of the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub x: f32,
    pub y: f32,
    pub depth: DepthClass,
    pub size: SizeClass,
}

impl Zone {
    pub const fn new(x: f32, y: f32, depth: DepthClass, size: SizeClass) -> Self {
        Self { x, y, depth, size }
    }

    /// The zone with x and y pulled into [0, 1]. None if either is not finite.
    pub fn clamped(self) -> Option<Self> {
        if !self.x.is_finite() || !self.y.is_finite() {
            return None;
        }
        Some(Self {
            x: self.x.clamp(0.0, 1.0),
            y: self.y.clamp(0.0, 1.0),
            ..self
        })
    }

    /// World-space anchor for a viewport, origin at the centre and y up.
    pub fn anchor(&self, width: u32, height: u32) -> Vec2 {
        Vec2::new(
            (self.x - 0.5) * width as f32,
            (0.5 - self.y) * height as f32,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedZone {
    pub name: String,
    pub zone: Zone,
}

/// Ordered zone table. Order decides texture assignment and insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZoneSet(pub Vec<NamedZone>);

impl ZoneSet {
    pub fn iter(&self) -> impl Iterator<Item = &NamedZone> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Zone> {
        self.0.iter().find(|z| z.name == name).map(|z| &z.zone)
    }

    /// Clamp out-of-range coordinates into [0, 1] and drop zones whose coordinates are not finite.
    pub fn sanitize(&mut self) {
        self.0.retain_mut(|named| match named.zone.clamped() {
            Some(zone) => {
                if zone != named.zone {
                    log::warn!(
                        "Zone '{}' at ({}, {}) lies outside the viewport; clamped to ({}, {})",
                        named.name,
                        named.zone.x,
                        named.zone.y,
                        zone.x,
                        zone.y
                    );
                    named.zone = zone;
                }
                true
            }
            None => {
                log::warn!("Zone '{}' has non-finite coordinates; dropped", named.name);
                false
            }
        });
    }
}

impl Default for ZoneSet {
    fn default() -> Self {
        use DepthClass::*;
        use SizeClass::*;
        let zone = |name: &str, x, y, depth, size| NamedZone {
            name: name.to_string(),
            zone: Zone::new(x, y, depth, size),
        };
        Self(vec![
            zone("heroLeft", 0.15, 0.3, Behind, Medium),
            zone("heroRight", 0.85, 0.6, Overlay, Large),
            zone("headerFloat", 0.65, 0.15, Overlay, Small),
            zone("cardFloat1", 0.25, 0.7, Behind, Medium),
            zone("cardFloat2", 0.75, 0.45, Overlay, Small),
            zone("bottomLeft", 0.1, 0.85, Behind, Large),
            zone("topRight", 0.9, 0.1, Behind, Medium),
            zone("centerFloat", 0.5, 0.5, Overlay, Small),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hero_left_anchor_on_1000_by_800() {
        let zone = Zone::new(0.15, 0.3, DepthClass::Behind, SizeClass::Medium);
        let anchor = zone.anchor(1000, 800);
        assert!((anchor.x - -350.0).abs() < 1e-3);
        assert!((anchor.y - 160.0).abs() < 1e-3);
    }

    #[test]
    fn default_zones_split_evenly_between_layers() {
        let zones = ZoneSet::default();
        assert_eq!(zones.len(), 8);
        let behind = zones.iter().filter(|z| z.zone.depth == DepthClass::Behind).count();
        assert_eq!(behind, 4);
        assert_eq!(zones.get("centerFloat").map(|z| z.size), Some(SizeClass::Small));
    }

    #[test]
    fn zones_read_from_ron() {
        let zones: ZoneSet =
            ron::from_str(r#"[(name: "solo", zone: (x: 0.5, y: 0.25, depth: overlay, size: large))]"#).unwrap();
        assert_eq!(zones.len(), 1);
        assert_eq!(zones.get("solo").map(|z| z.depth), Some(DepthClass::Overlay));
    }

    #[test]
    fn sanitize_clamps_and_drops() {
        let mut zones = ZoneSet(vec![
            NamedZone {
                name: "wide".to_string(),
                zone: Zone::new(1.4, -0.2, DepthClass::Behind, SizeClass::Small),
            },
            NamedZone {
                name: "lost".to_string(),
                zone: Zone::new(f32::NAN, 0.5, DepthClass::Overlay, SizeClass::Small),
            },
            NamedZone {
                name: "fine".to_string(),
                zone: Zone::new(0.5, 0.5, DepthClass::Overlay, SizeClass::Large),
            },
        ]);
        zones.sanitize();

        assert_eq!(zones.len(), 2);
        assert_eq!(zones.get("wide").map(|z| (z.x, z.y)), Some((1.0, 0.0)));
        assert!(zones.get("lost").is_none());
        assert_eq!(zones.get("fine").map(|z| (z.x, z.y)), Some((0.5, 0.5)));
    }
}
