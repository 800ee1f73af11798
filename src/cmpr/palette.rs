//! Most-recently-used palette cache shared by the encoder and decoder.

use super::Color;
use crate::utils::clamp;

/// Fixed-capacity color cache, most recently used entry first.
///
/// Encoder and decoder must seed the cache with [`PaletteCache::new`] and apply
/// the same sequence of lookups/pushes so that indices agree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaletteCache {
    colors: Vec<Color>,
}

impl PaletteCache {
    /// Create a cache seeded with evenly spaced gray levels.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let step = (256 / capacity) as i32;
        let mut level = 0i32;
        let mut colors = Vec::with_capacity(capacity);

        for _ in 0..capacity {
            colors.push(Color::gray(level as u8));
            level = clamp(level + step, 0, 255);
        }

        Self { colors }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.colors.len()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<Color> {
        self.colors.get(index).copied()
    }

    /// Entries in most-recently-used order.
    #[inline]
    pub fn colors(&self) -> &[Color] {
        &self.colors
    }

    /// Index of `color` without touching the ordering.
    #[inline]
    pub fn position(&self, color: Color) -> Option<usize> {
        self.colors.iter().position(|&c| c == color)
    }

    /// Look a color up. A hit is promoted to the front and its index before
    /// promotion is returned; a miss pushes the color and returns `None`.
    pub fn lookup(&mut self, color: Color) -> Option<usize> {
        match self.position(color) {
            Some(index) => {
                self.lru_update(index);
                Some(index)
            }
            None => {
                self.push(color);
                None
            }
        }
    }

    /// Move the entry at `index` to the front, keeping the others in order.
    #[inline]
    pub fn lru_update(&mut self, index: usize) {
        if index > 0 && index < self.colors.len() {
            self.colors[..=index].rotate_right(1);
        }
    }

    /// Insert at the front, evicting the least recently used entry.
    #[inline]
    pub fn push(&mut self, color: Color) {
        self.colors.rotate_right(1);
        self.colors[0] = color;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn red(level: u8) -> Color {
        Color::new(level, 0, 0, 0xFF)
    }

    #[test]
    fn test_gray_seed() {
        let cache = PaletteCache::new(4);
        let levels: Vec<u8> = cache.colors().iter().map(|c| c.r).collect();
        assert_eq!(levels, vec![0, 64, 128, 192]);
        assert_eq!(cache.get(1), Some(Color::gray(64)));
    }

    #[test]
    fn test_gray_seed_full_range_is_distinct() {
        let cache = PaletteCache::new(256);
        assert_eq!(cache.get(255), Some(Color::gray(255)));
        assert_eq!(cache.position(Color::gray(200)), Some(200));
    }

    #[test]
    fn test_lookup_hit_promotes() {
        let mut cache = PaletteCache::new(4);
        assert_eq!(cache.lookup(Color::gray(128)), Some(2));
        let levels: Vec<u8> = cache.colors().iter().map(|c| c.r).collect();
        assert_eq!(levels, vec![128, 0, 64, 192]);
        assert_eq!(cache.lookup(Color::gray(128)), Some(0));
    }

    #[test]
    fn test_lookup_miss_pushes() {
        let mut cache = PaletteCache::new(2);
        assert_eq!(cache.lookup(red(1)), None);
        assert_eq!(cache.colors(), &[red(1), Color::gray(0)]);
    }

    #[test]
    fn test_lru_eviction() {
        let capacity = 4;
        let mut cache = PaletteCache::new(capacity);
        let pushed: Vec<Color> = (1..=10).map(red).collect();
        for &color in &pushed {
            cache.push(color);
        }

        let (oldest, recent) = pushed.split_at(pushed.len() - capacity);
        for &color in oldest {
            assert_eq!(cache.position(color), None);
        }
        for &color in recent {
            assert!(cache.lookup(color).is_some());
        }
    }
}
