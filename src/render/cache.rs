//! LRU cache of rendered slots

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;

use super::renderer::{HalfSelector, RenderedImage, TargetSize};
use super::request::SlotSpec;

/// Cache key for rendered slots
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub page: usize,
    /// Region edges stored as millionths for stable hashing
    pub region_millionths: [u32; 4],
    pub half: Option<HalfSelector>,
    pub target: TargetSize,
}

impl CacheKey {
    #[must_use]
    pub fn new(spec: &SlotSpec, target: TargetSize) -> Self {
        let r = spec.region;
        let q = |v: f32| (v * 1_000_000.0).round() as u32;
        Self {
            page: spec.page,
            region_millionths: [q(r.x), q(r.y), q(r.width), q(r.height)],
            half: spec.half,
            target,
        }
    }
}

/// LRU cache for rendered slots
pub struct RenderCache {
    cache: LruCache<CacheKey, Arc<RenderedImage>>,
}

impl RenderCache {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: LruCache::new(NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN)),
        }
    }

    /// Get a cached slot, promoting it in the LRU order
    #[must_use]
    pub fn get(&mut self, key: &CacheKey) -> Option<Arc<RenderedImage>> {
        self.cache.get(key).cloned()
    }

    /// Check if a key is in the cache without promoting it
    #[must_use]
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.cache.contains(key)
    }

    pub fn insert(&mut self, key: CacheKey, image: RenderedImage) -> Arc<RenderedImage> {
        let arc = Arc::new(image);
        self.cache.put(key, arc.clone());
        arc
    }

    pub fn invalidate_all(&mut self) {
        self.cache.clear();
    }

    /// Drop every cached rendering of a page, whatever its region
    pub fn invalidate_page(&mut self, page: usize) {
        let keys_to_remove: Vec<_> = self
            .cache
            .iter()
            .filter(|(k, _)| k.page == page)
            .map(|(k, _)| k.clone())
            .collect();

        for key in keys_to_remove {
            self.cache.pop(&key);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.cache.cap().get()
    }
}

#[cfg(test)]
mod tests {
    use image::RgbaImage;

    use super::*;
    use crate::region::NormalizedRegion;
    use crate::render::renderer::NativeRect;

    const TARGET: TargetSize = TargetSize::new(100, 50);

    fn spec(page: usize) -> SlotSpec {
        SlotSpec::full(page, NormalizedRegion::FULL)
    }

    fn rendered(page: usize) -> RenderedImage {
        RenderedImage {
            image: RgbaImage::new(4, 4),
            page,
            half: None,
            source_rect: NativeRect {
                x: 0.0,
                y: 0.0,
                width: 1.0,
                height: 1.0,
            },
        }
    }

    #[test]
    fn cache_insert_and_get() {
        let mut cache = RenderCache::new(10);
        let key = CacheKey::new(&spec(0), TARGET);
        cache.insert(key.clone(), rendered(0));

        assert!(cache.contains(&key));
        assert!(cache.get(&key).is_some());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn cache_lru_eviction() {
        let mut cache = RenderCache::new(2);
        for i in 0..3 {
            cache.insert(CacheKey::new(&spec(i), TARGET), rendered(i));
        }

        assert_eq!(cache.len(), 2);
        assert!(!cache.contains(&CacheKey::new(&spec(0), TARGET)));
        assert!(cache.contains(&CacheKey::new(&spec(2), TARGET)));
    }

    #[test]
    fn zero_capacity_holds_one() {
        assert_eq!(RenderCache::new(0).capacity(), 1);
    }

    #[test]
    fn region_and_half_are_part_of_the_key() {
        let cropped = SlotSpec::full(0, NormalizedRegion::new(0.1, 0.1, 0.8, 0.8));
        let top = SlotSpec::half(0, NormalizedRegion::FULL, HalfSelector::Top);
        assert_ne!(CacheKey::new(&spec(0), TARGET), CacheKey::new(&cropped, TARGET));
        assert_ne!(CacheKey::new(&spec(0), TARGET), CacheKey::new(&top, TARGET));
        assert_ne!(
            CacheKey::new(&spec(0), TARGET),
            CacheKey::new(&spec(0), TargetSize::new(100, 51))
        );
    }

    #[test]
    fn cache_invalidate_page() {
        let mut cache = RenderCache::new(10);
        let cropped = SlotSpec::full(0, NormalizedRegion::new(0.1, 0.1, 0.8, 0.8));
        cache.insert(CacheKey::new(&spec(0), TARGET), rendered(0));
        cache.insert(CacheKey::new(&cropped, TARGET), rendered(0));
        let other = CacheKey::new(&spec(1), TARGET);
        cache.insert(other.clone(), rendered(1));

        cache.invalidate_page(0);
        assert_eq!(cache.len(), 1);
        assert!(cache.contains(&other));

        cache.invalidate_all();
        assert!(cache.is_empty());
    }
}
