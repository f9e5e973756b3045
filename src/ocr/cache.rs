//! In-memory LRU cache of recognition results with TTL.
//! Key: blake3 hash of (engine label | image bytes | pixel region).
//! Repeated extraction of an unchanged image skips the engine entirely.

use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;

use crate::region::PixelRect;

const DEFAULT_CAPACITY: usize = 64;
const DEFAULT_TTL: Duration = Duration::from_secs(600);

struct CacheEntry {
    text: String,
    inserted_at: Instant,
}

pub struct OcrCache {
    inner: Mutex<LruCache<[u8; 32], CacheEntry>>,
    ttl: Duration,
}

impl OcrCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity).expect("cache capacity must be > 0"),
            )),
            ttl,
        }
    }

    /// Compute the cache key for one recognition call. `region` is `None`
    /// for full-image extraction.
    pub fn compute_key(
        engine_label: &str,
        image_bytes: &[u8],
        region: Option<&PixelRect>,
    ) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();
        hasher.update(engine_label.as_bytes());
        hasher.update(b"|");
        hasher.update(image_bytes);
        hasher.update(b"|");
        match region {
            Some(rect) => {
                hasher.update(&rect.x.to_le_bytes());
                hasher.update(&rect.y.to_le_bytes());
                hasher.update(&rect.width.to_le_bytes());
                hasher.update(&rect.height.to_le_bytes());
            }
            None => {
                hasher.update(b"full");
            }
        }
        *hasher.finalize().as_bytes()
    }

    /// Look up a cached result. Returns None if absent or expired.
    pub fn get(&self, key: &[u8; 32]) -> Option<String> {
        let mut cache = self.inner.lock();
        if let Some(entry) = cache.get(key) {
            if entry.inserted_at.elapsed() < self.ttl {
                return Some(entry.text.clone());
            }
            cache.pop(key);
        }
        None
    }

    pub fn insert(&self, key: [u8; 32], text: String) {
        let mut cache = self.inner.lock();
        cache.put(
            key,
            CacheEntry {
                text,
                inserted_at: Instant::now(),
            },
        );
    }
}

impl Default for OcrCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_hit() {
        let cache = OcrCache::default();
        let key = OcrCache::compute_key("tesseract-local", b"imagebytes", None);
        assert!(cache.get(&key).is_none());

        cache.insert(key, "recognized".into());
        assert_eq!(cache.get(&key).as_deref(), Some("recognized"));
    }

    #[test]
    fn region_and_engine_distinguish_keys() {
        let rect = PixelRect {
            x: 1,
            y: 2,
            width: 3,
            height: 4,
        };
        let full = OcrCache::compute_key("tesseract-local", b"img", None);
        let cropped = OcrCache::compute_key("tesseract-local", b"img", Some(&rect));
        let other_engine = OcrCache::compute_key("ocr-http", b"img", None);
        assert_ne!(full, cropped);
        assert_ne!(full, other_engine);
    }

    #[test]
    fn expired_entries_miss() {
        let cache = OcrCache::new(8, Duration::from_millis(0));
        let key = OcrCache::compute_key("tesseract-local", b"img", None);
        cache.insert(key, "stale".into());
        std::thread::sleep(Duration::from_millis(2));
        assert!(cache.get(&key).is_none());
    }

    #[test]
    fn capacity_evicts_least_recently_used() {
        let cache = OcrCache::new(2, Duration::from_secs(60));
        let k1 = OcrCache::compute_key("e", b"1", None);
        let k2 = OcrCache::compute_key("e", b"2", None);
        let k3 = OcrCache::compute_key("e", b"3", None);

        cache.insert(k1, "one".into());
        cache.insert(k2, "two".into());
        cache.get(&k1);
        cache.insert(k3, "three".into());

        assert!(cache.get(&k1).is_some());
        assert!(cache.get(&k2).is_none());
        assert!(cache.get(&k3).is_some());
    }
}
