//! Tile load scheduling with generation-based cancellation.
//!
//! The paint path asks for tiles synchronously; misses are scheduled on
//! the Tokio runtime and a redraw event fires when one resolves. A pan
//! or zoom bumps the generation counter, which abandons every job still
//! waiting to hit the network. Jobs that already fetched their bytes
//! finish and populate the cache anyway, which is harmless.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::core::projection;
use crate::events::{EventBus, MapEvent};
use crate::tiles::cache::{Tile, TileCache, TileKey};
use crate::tiles::source::TileSource;
use crate::tiles::Fetcher;
use crate::MapError;

pub struct TileController {
    source: Arc<dyn TileSource>,
    cache: TileCache,
    fetcher: Arc<dyn Fetcher>,
    generation: Arc<AtomicU64>,
    events: EventBus,
}

impl TileController {
    pub fn new(
        source: Arc<dyn TileSource>,
        cache: TileCache,
        fetcher: Arc<dyn Fetcher>,
        events: EventBus,
    ) -> Self {
        Self {
            source,
            cache,
            fetcher,
            generation: Arc::new(AtomicU64::new(0)),
            events,
        }
    }

    pub fn source(&self) -> &Arc<dyn TileSource> {
        &self.source
    }

    pub fn cache(&self) -> &TileCache {
        &self.cache
    }

    /// Swap the active source. Outstanding loads for the old source are
    /// abandoned; its tiles stay cached under their own keys.
    pub fn set_source(&mut self, source: Arc<dyn TileSource>) {
        self.cancel_outstanding();
        self.source = source;
    }

    /// Abandon every scheduled load that has not reached the network yet.
    pub fn cancel_outstanding(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Look up a tile for the paint path, scheduling a load on a miss.
    ///
    /// Returns `None` for addresses outside the zoom's tile grid or
    /// outside the source's zoom range. The returned tile may still be
    /// pending; callers draw it once `is_loaded` reports true.
    pub fn get_tile(&self, x: u32, y: u32, zoom: u8) -> Option<Arc<Tile>> {
        if zoom < self.source.min_zoom() || zoom > self.source.max_zoom() {
            return None;
        }
        let grid = 1u32.checked_shl(zoom as u32)?;
        if x >= grid || y >= grid {
            return None;
        }

        let key = TileKey::new(self.source.id(), zoom, x, y);
        let tile = self.cache.get_or_insert(key);
        if !tile.is_loaded() && !tile.is_failed() {
            self.schedule_load(&tile);
        }
        Some(tile)
    }

    /// World size in pixels at the given zoom for the active source.
    pub fn world_size(&self, zoom: u8) -> i64 {
        projection::world_size(self.source.tile_size(), zoom)
    }

    fn schedule_load(&self, tile: &Arc<Tile>) {
        // only one job per tile; losers of the swap walk away
        if tile.loading.swap(true, Ordering::AcqRel) {
            return;
        }

        let key = tile.key().clone();
        let url = match self.source.tile_url(key.zoom, key.x, key.y) {
            Ok(url) => url,
            Err(MapError::MetadataNotReady) => {
                // provider metadata still loading; the redraw after it
                // arrives will reschedule this tile
                tile.loading.store(false, Ordering::Release);
                return;
            }
            Err(e) => {
                log::warn!("no url for tile {:?}: {}", key, e);
                tile.mark_failed();
                tile.loading.store(false, Ordering::Release);
                return;
            }
        };

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            // no runtime; leave the tile pending so a later paint under
            // a runtime can schedule it
            tile.loading.store(false, Ordering::Release);
            return;
        };

        let tile = Arc::clone(tile);
        let fetcher = Arc::clone(&self.fetcher);
        let generation = Arc::clone(&self.generation);
        let scheduled_at = generation.load(Ordering::SeqCst);
        let events = self.events.clone();

        handle.spawn(async move {
            if generation.load(Ordering::SeqCst) != scheduled_at {
                // pan or zoom made this tile irrelevant before we fetched
                tile.loading.store(false, Ordering::Release);
                return;
            }
            match fetcher.fetch(&url).await {
                Ok(bytes) => {
                    log::trace!("tile {:?} loaded ({} bytes)", key, bytes.len());
                    tile.set_image(bytes);
                }
                Err(e) => {
                    log::warn!("tile {:?} failed to load: {}", key, e);
                    tile.mark_failed();
                }
            }
            tile.loading.store(false, Ordering::Release);
            events.publish(MapEvent::RedrawRequested);
        });
    }
}
