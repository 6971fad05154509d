use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use lru::LruCache;

use crate::core::constants::DEFAULT_CACHE_CAPACITY;

/// Cache identity of a tile. The source id keeps tiles from different
/// providers apart, so a source swap never has to purge the cache: old
/// entries simply age out unvisited.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TileKey {
    pub source: Arc<str>,
    pub zoom: u8,
    pub x: u32,
    pub y: u32,
}

impl TileKey {
    pub fn new(source: impl Into<Arc<str>>, zoom: u8, x: u32, y: u32) -> Self {
        Self { source: source.into(), zoom, x, y }
    }
}

/// A cached tile slot. Shared by fetch tasks and the paint path through
/// `Arc`; the atomic flags make state transitions visible without ever
/// exposing a half-written image.
#[derive(Debug)]
pub struct Tile {
    key: TileKey,
    image: Mutex<Option<Arc<Vec<u8>>>>,
    loaded: AtomicBool,
    failed: AtomicBool,
    pub(crate) loading: AtomicBool,
}

impl Tile {
    pub fn new(key: TileKey) -> Self {
        Self {
            key,
            image: Mutex::new(None),
            loaded: AtomicBool::new(false),
            failed: AtomicBool::new(false),
            loading: AtomicBool::new(false),
        }
    }

    pub fn key(&self) -> &TileKey {
        &self.key
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::Acquire)
    }

    pub fn is_failed(&self) -> bool {
        self.failed.load(Ordering::Acquire)
    }

    /// Undecoded image bytes, once loaded.
    pub fn image(&self) -> Option<Arc<Vec<u8>>> {
        self.image.lock().ok()?.clone()
    }

    /// Store the fetched bytes and flip to loaded. The image is written
    /// before the flag so readers observing `loaded` always see it.
    pub fn set_image(&self, bytes: Vec<u8>) {
        if let Ok(mut image) = self.image.lock() {
            *image = Some(Arc::new(bytes));
        }
        self.failed.store(false, Ordering::Release);
        self.loaded.store(true, Ordering::Release);
    }

    pub fn mark_failed(&self) {
        self.failed.store(true, Ordering::Release);
    }
}

/// Capacity-bounded in-memory tile store with LRU eviction.
///
/// O(1) amortized get/put; safe for concurrent access from fetch tasks
/// and the paint path. Cloning shares the underlying store.
#[derive(Debug, Clone)]
pub struct TileCache {
    cache: Arc<Mutex<LruCache<TileKey, Arc<Tile>>>>,
}

impl TileCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity)
            .unwrap_or_else(|| NonZeroUsize::new(DEFAULT_CACHE_CAPACITY).unwrap());
        Self {
            cache: Arc::new(Mutex::new(LruCache::new(capacity))),
        }
    }

    pub fn get(&self, key: &TileKey) -> Option<Arc<Tile>> {
        self.cache.lock().ok()?.get(key).cloned()
    }

    /// Fetch the tile for `key`, inserting a fresh pending tile when the
    /// key is absent.
    pub fn get_or_insert(&self, key: TileKey) -> Arc<Tile> {
        match self.cache.lock() {
            Ok(mut cache) => cache
                .get_or_insert(key.clone(), || Arc::new(Tile::new(key)))
                .clone(),
            // a poisoned cache lock only ever means a panicking test
            // thread; hand out an uncached tile rather than propagate
            Err(_) => Arc::new(Tile::new(key)),
        }
    }

    pub fn len(&self) -> usize {
        self.cache.lock().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.cache.lock().map(|c| c.cap().get()).unwrap_or(0)
    }

    pub fn clear(&self) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.clear();
        }
    }
}

impl Default for TileCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}
