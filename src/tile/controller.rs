//! Tile cache and progressive display controller.
//!
//! The controller keeps one [`TileRecord`] per tile the map has asked for.
//! A new tile immediately shows a crop of its nearest existing ancestor,
//! then a background task looks for the tile in the store and renders it if
//! it is missing:
//!
//! ```text
//!   ensure_tile(013)
//!        │ view = 01.png cropped      status "displaying 01.png"
//!        ▼
//!   check_and_render (spawned)
//!        │ wait check_delay, store.exists(013)?
//!        ├── yes ─▶ "available" ─▶ own image, "loaded"
//!        └── no ──▶ "queued" ─▶ RenderQueue ─▶ own image, "rendered"
//!                                    │
//!                                    ▼ (spawned)
//!                         wait save_delay, store.put ─▶ "saved: ok"
//! ```
//!
//! The bottom half of the map is the mirror image of the top half, so tiles
//! there are [`TileKind::MirrorOf`] a top-half tile and follow its view.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::dispatch::{QueueStatus, RenderQueue};
use crate::error::{StoreError, TileError};
use crate::geometry::{PixelRect, Rect};
use crate::store::{BlobMetadata, TileStore};

use super::cache::{ImageCache, DEFAULT_IMAGE_CACHE_CAPACITY};
use super::encoder::PngTileEncoder;
use super::index::{TileIndex, DEFAULT_ROOT_RECT, DEFAULT_TILE_SIZE};
use super::name::{TileCoord, TileName};
use super::record::{TileRecord, TileStatus, TileView};

/// Default number of ancestor tags written with each stored tile.
pub const DEFAULT_LIST_DEPTH: usize = 4;

/// Default pause before checking the store for a new tile.
pub const DEFAULT_CHECK_DELAY: Duration = Duration::from_millis(10);

/// Default pause before saving a rendered tile.
pub const DEFAULT_SAVE_DELAY: Duration = Duration::from_millis(10);

// =============================================================================
// Configuration
// =============================================================================

/// Settings for a [`TileController`].
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Plane rectangle covered by the root tile
    pub root: Rect,
    pub tile_width: u32,
    pub tile_height: u32,
    /// How many ancestor tags to store with a tile
    pub list_depth: usize,
    pub check_delay: Duration,
    pub save_delay: Duration,
    /// Byte capacity of the in-memory PNG cache
    pub image_cache_bytes: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            root: DEFAULT_ROOT_RECT,
            tile_width: DEFAULT_TILE_SIZE,
            tile_height: DEFAULT_TILE_SIZE,
            list_depth: DEFAULT_LIST_DEPTH,
            check_delay: DEFAULT_CHECK_DELAY,
            save_delay: DEFAULT_SAVE_DELAY,
            image_cache_bytes: DEFAULT_IMAGE_CACHE_CAPACITY,
        }
    }
}

// =============================================================================
// Observers and Stats
// =============================================================================

/// Receives every change to a tile record.
pub trait TileObserver: Send + Sync {
    fn tile_updated(&self, record: &TileRecord);
}

/// What the map shows at a coordinate.
#[derive(Debug, Clone)]
pub enum MapTile {
    /// Outside the map
    Empty,
    Tile(TileRecord),
}

/// Counters reported by [`TileController::stats`].
#[derive(Debug, Clone, Serialize)]
pub struct TileStatsSnapshot {
    /// View changes (ancestor previews and own images)
    pub loaded: usize,
    pub rendered: usize,
    /// Renders queued and not yet finished
    pub backlog: usize,
    pub tiles: usize,
    pub mirrors: usize,
    /// Encoded tiles held in memory
    pub cached_images: usize,
    pub cached_bytes: usize,
    pub queue: QueueStatus,
}

#[derive(Default)]
struct TileStats {
    loaded: AtomicUsize,
    rendered: AtomicUsize,
    backlog: AtomicUsize,
}

#[derive(Default)]
struct TileTable {
    tiles: HashMap<TileName, TileRecord>,
    /// Mirror records, keyed by the tile they reflect
    mirrors: HashMap<TileName, TileRecord>,
    /// Tiles known to be in the store
    known: HashSet<TileName>,
}

// =============================================================================
// Tile Controller
// =============================================================================

/// Owns the tile records and drives each tile from preview to stored image.
///
/// # Type Parameters
///
/// * `S` - The persistent store for rendered tiles
pub struct TileController<S: TileStore> {
    index: TileIndex,
    config: ControllerConfig,
    state: RwLock<TileTable>,
    store: Arc<S>,
    queue: RenderQueue,
    images: ImageCache,
    encoder: PngTileEncoder,
    stats: TileStats,
    observers: Vec<Arc<dyn TileObserver>>,
}

impl<S: TileStore> TileController<S> {
    pub fn new(store: Arc<S>, queue: RenderQueue, config: ControllerConfig) -> Self {
        Self {
            index: TileIndex::new(config.root, config.tile_width, config.tile_height),
            images: ImageCache::with_capacity(config.image_cache_bytes),
            config,
            state: RwLock::new(TileTable::default()),
            store,
            queue,
            encoder: PngTileEncoder::new(),
            stats: TileStats::default(),
            observers: Vec::new(),
        }
    }

    /// Register an observer. Call before sharing the controller.
    pub fn with_observer(mut self, observer: Arc<dyn TileObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn index(&self) -> &TileIndex {
        &self.index
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn queue(&self) -> &RenderQueue {
        &self.queue
    }

    // -------------------------------------------------------------------------
    // Map entry points
    // -------------------------------------------------------------------------

    /// Tile shown at `coord` on zoom level `zoom`.
    ///
    /// Tiles in the bottom half are mirrors of the tile at
    /// `(x, 2^zoom - 1 - y)`.
    pub async fn get_tile(self: &Arc<Self>, coord: TileCoord, zoom: u32) -> MapTile {
        let Some(name) = self.index.tile_name(coord, zoom) else {
            return MapTile::Empty;
        };
        if !name.is_southern() {
            return MapTile::Tile(self.ensure_tile(&name).await);
        }

        let size = 1i64 << zoom;
        let flipped = TileCoord::new(coord.x, size - 1 - coord.y);
        let Some(original) = self.index.tile_name(flipped, zoom) else {
            return MapTile::Empty;
        };
        self.ensure_tile(&original).await;

        let mut table = self.state.write().await;
        let TileTable { tiles, mirrors, .. } = &mut *table;
        let Some(source) = tiles.get(&original) else {
            return MapTile::Empty;
        };
        let mirror = mirrors
            .entry(original)
            .or_insert_with(|| TileRecord::mirror_of(source))
            .clone();
        MapTile::Tile(mirror)
    }

    /// Get the record for `name`, creating it if needed.
    ///
    /// A new record shows its nearest existing ancestor and starts a
    /// background lookup and render.
    pub async fn ensure_tile(self: &Arc<Self>, name: &TileName) -> TileRecord {
        if let Some(record) = self.record(name).await {
            return record;
        }

        let (record, created) = {
            let mut table = self.state.write().await;
            let exists = table.known.contains(name);
            let parent = self.index.find_parent(name, |n| table.known.contains(n));
            match table.tiles.entry(name.clone()) {
                Entry::Occupied(entry) => (entry.get().clone(), false),
                Entry::Vacant(entry) => {
                    let mut record = TileRecord::new(name.clone());
                    record.exists = exists;
                    if name.is_root() {
                        record.view = Some(self.own_view(name));
                        record.status = TileStatus::Loading;
                    } else {
                        record.view = Some(TileView {
                            placement: self.index.relative_rect(name, &parent),
                            source: parent.clone(),
                        });
                        record.status = TileStatus::Displaying(parent);
                    }
                    (entry.insert(record).clone(), true)
                }
            }
        };

        if created {
            debug!(tile = %name, status = %record.status, "Created tile");
            self.stats.loaded.fetch_add(1, Ordering::Relaxed);
            self.notify(&record);

            let this = Arc::clone(self);
            let name = name.clone();
            tokio::spawn(async move { this.check_and_render(name).await });
        }
        record
    }

    /// Show the tile's own image if it is known, otherwise look it up in the
    /// store and render it when missing.
    pub async fn check_and_render(self: Arc<Self>, name: TileName) {
        let Some(record) = self.record(&name).await else {
            return;
        };
        if record.exists {
            self.show_own_image(&name, TileStatus::Loaded).await;
            return;
        }

        tokio::time::sleep(self.config.check_delay).await;
        let found = match self.store.exists(&name).await {
            Ok(found) => found,
            Err(e) => {
                warn!(tile = %name, "Existence check failed, treating as absent: {}", e);
                false
            }
        };

        if found {
            self.mark_exists(&name).await;
            self.set_status(&name, TileStatus::Available).await;
            self.show_own_image(&name, TileStatus::Loaded).await;
            return;
        }

        self.set_status(&name, TileStatus::Queued).await;
        self.stats.backlog.fetch_add(1, Ordering::Relaxed);
        let result = self.render_tile(&name).await;
        self.stats.backlog.fetch_sub(1, Ordering::Relaxed);

        match result {
            Ok(png) => {
                self.images.put(name.clone(), png.clone()).await;
                self.mark_exists(&name).await;
                self.stats.rendered.fetch_add(1, Ordering::Relaxed);
                self.show_own_image(&name, TileStatus::Rendered).await;

                let this = Arc::clone(&self);
                tokio::spawn(async move { this.save(name, png).await });
            }
            Err(e) => {
                warn!(tile = %name, "Render failed: {}", e);
                self.set_status(&name, TileStatus::RenderFailed(e.to_string()))
                    .await;
            }
        }
    }

    /// Render `name` through the queue and encode it as PNG.
    pub async fn render_tile(&self, name: &TileName) -> Result<Bytes, TileError> {
        let rect = self.index.rect_from_tile_name(name);
        let output = self
            .queue
            .render(rect, self.config.tile_width, self.config.tile_height)
            .await?;
        debug!(tile = %name, job = output.id, "Rendered tile");
        self.encoder.encode(&output.image)
    }

    /// Persist a rendered tile after `save_delay`. Failures only change the
    /// status.
    async fn save(&self, name: TileName, png: Bytes) {
        tokio::time::sleep(self.config.save_delay).await;
        let metadata = BlobMetadata::for_tile(&name, self.config.list_depth);

        match self.store.put(&name, png, metadata).await {
            Ok(()) => {
                debug!(tile = %name, location = %self.store.location(&name), "Saved tile");
                self.set_status(&name, TileStatus::Saved).await;
            }
            Err(e) => {
                warn!(tile = %name, "Failed to save tile: {}", e);
                self.set_status(&name, TileStatus::SaveFailed(e.to_string()))
                    .await;
            }
        }
    }

    // -------------------------------------------------------------------------
    // Lookups
    // -------------------------------------------------------------------------

    /// Nearest ancestor of `name` known to exist, or the root.
    pub async fn find_parent(&self, name: &TileName) -> TileName {
        let table = self.state.read().await;
        self.index.find_parent(name, |n| table.known.contains(n))
    }

    /// Record that `name` is in the store.
    pub async fn mark_exists(&self, name: &TileName) {
        let mut table = self.state.write().await;
        table.known.insert(name.clone());
        if let Some(record) = table.tiles.get_mut(name) {
            record.exists = true;
        }
    }

    pub async fn record(&self, name: &TileName) -> Option<TileRecord> {
        self.state.read().await.tiles.get(name).cloned()
    }

    /// Mirror record reflecting `name`, if one was created.
    pub async fn mirror(&self, name: &TileName) -> Option<TileRecord> {
        self.state.read().await.mirrors.get(name).cloned()
    }

    /// PNG of a tile: image cache first, then the store.
    ///
    /// Returns `Ok(None)` when neither has it.
    pub async fn image(&self, name: &TileName) -> Result<Option<Bytes>, TileError> {
        if let Some(png) = self.images.get(name).await {
            return Ok(Some(png));
        }
        match self.store.get(name).await {
            Ok(png) => {
                self.images.put(name.clone(), png.clone()).await;
                Ok(Some(png))
            }
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// The PNG currently displayed for a record.
    ///
    /// This is the tile's own image, a preview cut from its view source
    /// (flipped for mirrors), or a transparent tile when nothing is
    /// available yet.
    pub async fn display_image(&self, record: &TileRecord) -> Result<Bytes, TileError> {
        let (width, height) = (self.config.tile_width, self.config.tile_height);
        let source = match &record.view {
            Some(view) => self.image(&view.source).await?.map(|png| (png, view.placement)),
            None => None,
        };

        match source {
            Some((png, placement)) => {
                self.encoder
                    .compose(&png, placement, record.is_mirror(), width, height)
            }
            None => self.encoder.encode(&self.encoder.blank(width, height)),
        }
    }

    pub async fn stats(&self) -> TileStatsSnapshot {
        let (tiles, mirrors) = {
            let table = self.state.read().await;
            (table.tiles.len(), table.mirrors.len())
        };
        TileStatsSnapshot {
            loaded: self.stats.loaded.load(Ordering::Relaxed),
            rendered: self.stats.rendered.load(Ordering::Relaxed),
            backlog: self.stats.backlog.load(Ordering::Relaxed),
            tiles,
            mirrors,
            cached_images: self.images.len().await,
            cached_bytes: self.images.size().await,
            queue: self.queue.status(),
        }
    }

    /// Number of (non-mirror) tile records.
    pub async fn tile_count(&self) -> usize {
        self.state.read().await.tiles.len()
    }

    /// Forget every record and cached image.
    ///
    /// Background work for forgotten tiles still finishes and is saved, but
    /// no longer updates any record.
    pub async fn clear(&self) {
        {
            let mut table = self.state.write().await;
            *table = TileTable::default();
        }
        self.images.clear().await;
    }

    // -------------------------------------------------------------------------
    // Record updates
    // -------------------------------------------------------------------------

    fn own_view(&self, name: &TileName) -> TileView {
        TileView {
            source: name.clone(),
            placement: PixelRect::full(self.config.tile_width, self.config.tile_height),
        }
    }

    async fn show_own_image(&self, name: &TileName, status: TileStatus) {
        let view = self.own_view(name);
        let updated = self
            .update(name, |record| {
                record.view = Some(view);
                record.status = status;
            })
            .await;
        if updated {
            self.stats.loaded.fetch_add(1, Ordering::Relaxed);
        }
    }

    async fn set_status(&self, name: &TileName, status: TileStatus) {
        self.update(name, |record| record.status = status).await;
    }

    /// Apply `change` to a record and its mirror, then notify observers.
    ///
    /// Returns `false` if there is no record for `name`.
    async fn update<F>(&self, name: &TileName, change: F) -> bool
    where
        F: FnOnce(&mut TileRecord),
    {
        let (record, mirror) = {
            let mut table = self.state.write().await;
            let TileTable { tiles, mirrors, .. } = &mut *table;
            let Some(record) = tiles.get_mut(name) else {
                return false;
            };
            change(record);

            let mirror = match (mirrors.get_mut(name), &record.view) {
                (Some(mirror), Some(view)) => {
                    mirror.view = Some(view.clone());
                    mirror.status = record.status.clone();
                    mirror.exists = record.exists;
                    Some(mirror.clone())
                }
                _ => None,
            };
            (record.clone(), mirror)
        };

        debug!(tile = %name, status = %record.status, "Tile updated");
        self.notify(&record);
        if let Some(mirror) = mirror {
            self.notify(&mirror);
        }
        true
    }

    fn notify(&self, record: &TileRecord) {
        for observer in &self.observers {
            observer.tile_updated(record);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
