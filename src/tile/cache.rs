//! In-memory cache of encoded tile images.
//!
//! Rendered tiles are kept here as PNG bytes so the display surface can serve
//! them without a round trip to the persistent store. Tiles loaded from the
//! store are kept too. Entries are evicted least-recently-used once the total
//! byte size exceeds capacity.

use bytes::Bytes;
use lru::LruCache;
use tokio::sync::Mutex;

use super::name::TileName;

/// Default cache capacity: 100MB
pub const DEFAULT_IMAGE_CACHE_CAPACITY: usize = 100 * 1024 * 1024;

/// Upper bound on entry count, independent of byte size.
const DEFAULT_MAX_ENTRIES: usize = 10_000;

struct Inner {
    entries: LruCache<TileName, Bytes>,
    size: usize,
}

/// LRU cache of PNG-encoded tiles with a byte-size capacity.
///
/// Safe to share across tasks; all operations take a short async lock.
pub struct ImageCache {
    inner: Mutex<Inner>,
    max_size: usize,
}

impl ImageCache {
    /// Create a cache with the default capacity (100MB).
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_IMAGE_CACHE_CAPACITY)
    }

    /// Create a cache holding at most `max_size` bytes.
    pub fn with_capacity(max_size: usize) -> Self {
        Self::with_capacity_and_entries(max_size, DEFAULT_MAX_ENTRIES)
    }

    /// Create a cache bounded by both bytes and entry count.
    ///
    /// A zero `max_entries` is treated as one.
    pub fn with_capacity_and_entries(max_size: usize, max_entries: usize) -> Self {
        let max_entries =
            std::num::NonZeroUsize::new(max_entries).unwrap_or(std::num::NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(Inner {
                entries: LruCache::new(max_entries),
                size: 0,
            }),
            max_size,
        }
    }

    /// Get a tile image, marking it recently used.
    pub async fn get(&self, name: &TileName) -> Option<Bytes> {
        let mut inner = self.inner.lock().await;
        inner.entries.get(name).cloned()
    }

    /// Store a tile image, evicting old entries if over capacity.
    pub async fn put(&self, name: TileName, data: Bytes) {
        let data_size = data.len();
        let mut inner = self.inner.lock().await;

        if let Some(old) = inner.entries.peek(&name) {
            inner.size = inner.size.saturating_sub(old.len());
        }

        // Entry-count eviction happens inside `push`; account for it.
        if let Some((evicted_name, evicted)) = inner.entries.push(name.clone(), data) {
            if evicted_name != name {
                inner.size = inner.size.saturating_sub(evicted.len());
            }
        }
        inner.size += data_size;

        while inner.size > self.max_size {
            match inner.entries.pop_lru() {
                Some((_, evicted)) => inner.size = inner.size.saturating_sub(evicted.len()),
                None => break,
            }
        }
    }

    pub async fn clear(&self) {
        let mut inner = self.inner.lock().await;
        inner.entries.clear();
        inner.size = 0;
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.entries.is_empty()
    }

    /// Current total size in bytes.
    pub async fn size(&self) -> usize {
        self.inner.lock().await.size
    }
}

impl Default for ImageCache {
    fn default() -> Self {
        Self::new()
    }
}
