//! Test utilities for integration tests.
//!
//! Stores with injectable failures, controller builders with small tiles and
//! no delays, and polling helpers for background tile progress.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use image::RgbaImage;

use mandel_tiles::error::StoreError;
use mandel_tiles::store::{BlobMetadata, MemoryTileStore, TileStore};
use mandel_tiles::{
    ControllerConfig, DispatchOrder, RenderQueue, Renderer, TileController, TileName, TileRecord,
};

/// Tile edge used throughout the integration tests.
pub const TEST_TILE_SIZE: u32 = 16;

// =============================================================================
// Failing Store
// =============================================================================

/// A store whose lookups and/or writes fail, backed by memory otherwise.
pub struct FailingStore {
    inner: MemoryTileStore,
    fail_exists: bool,
    fail_put: bool,
    put_attempts: AtomicUsize,
}

impl FailingStore {
    pub fn new(fail_exists: bool, fail_put: bool) -> Self {
        Self {
            inner: MemoryTileStore::new(),
            fail_exists,
            fail_put,
            put_attempts: AtomicUsize::new(0),
        }
    }

    pub fn put_attempts(&self) -> usize {
        self.put_attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TileStore for FailingStore {
    async fn exists(&self, name: &TileName) -> Result<bool, StoreError> {
        if self.fail_exists {
            return Err(StoreError::Connection("connection reset".to_string()));
        }
        self.inner.exists(name).await
    }

    async fn get(&self, name: &TileName) -> Result<Bytes, StoreError> {
        self.inner.get(name).await
    }

    async fn put(
        &self,
        name: &TileName,
        data: Bytes,
        metadata: BlobMetadata,
    ) -> Result<(), StoreError> {
        self.put_attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_put {
            return Err(StoreError::Backend("access denied".to_string()));
        }
        self.inner.put(name, data, metadata).await
    }

    fn location(&self, name: &TileName) -> String {
        format!("failing://{}", name)
    }
}

// =============================================================================
// Builders
// =============================================================================

/// Controller settings with small tiles and no delays.
pub fn test_config() -> ControllerConfig {
    ControllerConfig {
        tile_width: TEST_TILE_SIZE,
        tile_height: TEST_TILE_SIZE,
        check_delay: Duration::ZERO,
        save_delay: Duration::ZERO,
        ..ControllerConfig::default()
    }
}

/// Controller rendering inline over `store`.
pub fn inline_controller<S: TileStore>(store: Arc<S>) -> Arc<TileController<S>> {
    let queue = RenderQueue::inline(Arc::new(Renderer::default()));
    Arc::new(TileController::new(store, queue, test_config()))
}

/// Controller rendering on the background worker.
pub fn worker_controller<S: TileStore>(
    store: Arc<S>,
    order: DispatchOrder,
) -> Arc<TileController<S>> {
    let queue = RenderQueue::spawn(Arc::new(Renderer::default()), order);
    Arc::new(TileController::new(store, queue, test_config()))
}

// =============================================================================
// Polling
// =============================================================================

/// Poll a tile until `done` holds for its record, or panic after ~5s.
pub async fn wait_for_record<S, F>(
    controller: &TileController<S>,
    name: &TileName,
    done: F,
) -> TileRecord
where
    S: TileStore,
    F: Fn(&TileRecord) -> bool,
{
    for _ in 0..1000 {
        if let Some(record) = controller.record(name).await {
            if done(&record) {
                return record;
            }
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    let last = controller.record(name).await;
    panic!("Tile {} never reached the expected state (last: {:?})", name, last);
}

/// Poll a tile until its status string equals `status`.
pub async fn wait_for_status<S: TileStore>(
    controller: &TileController<S>,
    name: &TileName,
    status: &str,
) -> TileRecord {
    wait_for_record(controller, name, |record| record.status.to_string() == status).await
}

// =============================================================================
// Images
// =============================================================================

/// Check if data starts with the PNG signature.
pub fn is_valid_png(data: &[u8]) -> bool {
    data.len() >= 8 && data[..8] == [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]
}

pub fn decode_png(data: &[u8]) -> RgbaImage {
    image::load_from_memory_with_format(data, image::ImageFormat::Png)
        .expect("valid PNG")
        .to_rgba8()
}

pub fn tile(name: &str) -> TileName {
    TileName::parse(name).expect("valid tile name")
}
