//! Render surfaces and pixel-to-ndc mapping.

use crate::keyed::Key;
use fnv::FnvHashMap;
use glam::Vec2;

/// Size of one render surface in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SurfaceMetrics {
    pub width: u32,
    pub height: u32,
}

impl SurfaceMetrics {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }

    /// Map a pixel position (origin top-left, y down) to ndc (origin centre,
    /// y up). Positions outside the surface are clamped to its edge; a
    /// zero-sized surface has no mapping.
    pub fn to_ndc(&self, px: Vec2) -> Option<Vec2> {
        if self.width == 0 || self.height == 0 {
            return None;
        }
        let (w, h) = (self.width as f32, self.height as f32);
        let x = px.x.clamp(0.0, w);
        let y = px.y.clamp(0.0, h);
        Some(Vec2::new(2.0 * x / w - 1.0, 1.0 - 2.0 * y / h))
    }
}

/// Named render surfaces known to the session. Each name gets a stable key
/// the first time it is seen.
#[derive(Clone, Debug, Default)]
pub struct Surfaces {
    by_name: FnvHashMap<&'static str, (Key, SurfaceMetrics)>,
}

impl Surfaces {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new size. Returns true when the size actually changed.
    pub fn resize(&mut self, name: &'static str, metrics: SurfaceMetrics) -> bool {
        if let Some((_, current)) = self.by_name.get_mut(name) {
            let changed = *current != metrics;
            *current = metrics;
            return changed;
        }
        let key = match self.by_name.values().map(|(k, _)| *k).max() {
            None => 1,
            Some(k) => match k.checked_add(1) {
                Some(next) => next,
                None => {
                    log::warn!("[surface] no key left for {}", name);
                    return false;
                }
            },
        };
        self.by_name.insert(name, (key, metrics));
        true
    }

    pub fn get(&self, name: &str) -> Option<SurfaceMetrics> {
        self.by_name.get(name).map(|(_, m)| *m)
    }

    pub fn key(&self, name: &str) -> Option<Key> {
        self.by_name.get(name).map(|(k, _)| *k)
    }

    /// Every surface as `(key, name, metrics)`, ordered by key.
    pub fn entries(&self) -> Vec<(Key, &'static str, SurfaceMetrics)> {
        let mut out: Vec<_> = self.by_name.iter().map(|(name, (k, m))| (*k, *name, *m)).collect();
        out.sort_unstable_by_key(|(k, _, _)| *k);
        out
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}
