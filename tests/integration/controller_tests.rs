//! Tile controller integration tests.
//!
//! Tests verify:
//! - Missing tiles are rendered, displayed and saved with ancestor tags
//! - Store failures surface as statuses instead of errors
//! - Concurrent requests create one record and one render
//! - Mirrors follow their original tile
//! - The worker-backed queue drives the same lifecycle

use std::sync::Arc;

use mandel_tiles::store::{MemoryTileStore, TileStore};
use mandel_tiles::{DispatchOrder, MapTile, TileCoord, TileKind, TileName, TileStatus};

use super::test_utils::{
    decode_png, inline_controller, is_valid_png, tile, wait_for_record, wait_for_status,
    worker_controller, FailingStore, TEST_TILE_SIZE,
};

// =============================================================================
// Lifecycle
// =============================================================================

#[tokio::test]
async fn test_root_is_rendered_and_saved() {
    let store = Arc::new(MemoryTileStore::new());
    let controller = inline_controller(store.clone());
    let root = TileName::root();

    controller.ensure_tile(&root).await;
    let record = wait_for_status(&controller, &root, "saved: ok").await;
    assert!(record.exists);
    assert!(record.shows_own_image());

    let png = store.get(&root).await.unwrap();
    assert!(is_valid_png(&png));
    let image = decode_png(&png);
    assert_eq!(image.dimensions(), (TEST_TILE_SIZE, TEST_TILE_SIZE));
    // The center samples (0.125, 0.125), inside the main cardioid
    assert_eq!(image.get_pixel(8, 8).0, [0, 0, 0, 255]);

    // The root has no ancestors to tag
    let meta = store.stored_metadata(&root).await.unwrap();
    assert!(meta.tags.is_empty());
    assert_eq!(meta.content_type, "image/png");
}

#[tokio::test]
async fn test_deep_tile_is_tagged_with_ancestors() {
    let store = Arc::new(MemoryTileStore::new());
    let controller = inline_controller(store.clone());
    let name = tile("012301");

    controller.ensure_tile(&name).await;
    wait_for_status(&controller, &name, "saved: ok").await;

    let meta = store.stored_metadata(&name).await.unwrap();
    assert_eq!(meta.tags, vec!["p1:01230", "p2:0123", "p3:012", "p4:01"]);
}

#[tokio::test]
async fn test_children_preview_rendered_parent() {
    let store = Arc::new(MemoryTileStore::new());
    let controller = inline_controller(store);

    let parent = tile("01");
    controller.ensure_tile(&parent).await;
    wait_for_status(&controller, &parent, "saved: ok").await;

    let child = controller.ensure_tile(&tile("013")).await;
    assert_eq!(child.status, TileStatus::Displaying(parent.clone()));
    let view = child.view.clone().unwrap();
    assert_eq!(view.source, parent);
    // The parent is twice as wide as the child
    assert_eq!(view.placement.width(), 2 * TEST_TILE_SIZE as i64);

    let png = controller.display_image(&child).await.unwrap();
    assert_eq!(decode_png(&png).dimensions(), (TEST_TILE_SIZE, TEST_TILE_SIZE));
}

#[tokio::test]
async fn test_stats_count_loads_and_renders() {
    let store = Arc::new(MemoryTileStore::new());
    let controller = inline_controller(store);

    for name in ["0", "00", "01"] {
        controller.ensure_tile(&tile(name)).await;
    }
    for name in ["0", "00", "01"] {
        wait_for_status(&controller, &tile(name), "saved: ok").await;
    }

    let stats = controller.stats().await;
    assert_eq!(stats.rendered, 3);
    assert_eq!(stats.backlog, 0);
    assert_eq!(stats.tiles, 3);
    assert_eq!(stats.mirrors, 0);
    // Each tile counts once when created and once when its own image shows
    assert_eq!(stats.loaded, 6);
}

#[tokio::test]
async fn test_deepest_zoom_previews_root() {
    let store = Arc::new(MemoryTileStore::new());
    let controller = inline_controller(store);
    let root = TileName::root();

    controller.ensure_tile(&root).await;
    wait_for_status(&controller, &root, "saved: ok").await;

    // The tile just right of and above the origin, as deep as the map goes
    let zoom = controller.index().max_zoom();
    let half = 1i64 << (zoom - 1);
    let MapTile::Tile(record) = controller.get_tile(TileCoord::new(half, half - 1), zoom).await
    else {
        panic!("expected a tile at zoom {}", zoom);
    };
    assert_eq!(record.name.depth(), zoom);

    let png = controller.display_image(&record).await.unwrap();
    let image = decode_png(&png);
    assert_eq!(image.dimensions(), (TEST_TILE_SIZE, TEST_TILE_SIZE));
    // Every pixel comes from the single root pixel at the origin
    let first = *image.get_pixel(0, 0);
    assert_eq!(first.0[3], 255);
    assert!(image.pixels().all(|p| *p == first));

    let record = wait_for_status(&controller, &record.name, "saved: ok").await;
    let png = controller.display_image(&record).await.unwrap();
    assert_eq!(decode_png(&png).dimensions(), (TEST_TILE_SIZE, TEST_TILE_SIZE));

    // One level deeper is off the map
    let deeper = controller.get_tile(TileCoord::new(0, 0), zoom + 1).await;
    assert!(matches!(deeper, MapTile::Empty));
}

// =============================================================================
// Store Failures
// =============================================================================

#[tokio::test]
async fn test_save_failure_is_reported_in_status() {
    let store = Arc::new(FailingStore::new(false, true));
    let controller = inline_controller(store.clone());
    let name = tile("02");

    controller.ensure_tile(&name).await;
    let record = wait_for_record(&controller, &name, |r| {
        matches!(r.status, TileStatus::SaveFailed(_))
    })
    .await;

    let status = record.status.to_string();
    assert!(status.starts_with("saved: failed ("), "status was {}", status);
    assert!(status.contains("access denied"));
    assert_eq!(store.put_attempts(), 1);

    // The rendered image is still served from memory
    assert!(record.exists);
    let png = controller.image(&name).await.unwrap().unwrap();
    assert!(is_valid_png(&png));
}

#[tokio::test]
async fn test_existence_check_failure_renders_anyway() {
    let store = Arc::new(FailingStore::new(true, false));
    let controller = inline_controller(store.clone());
    let name = tile("03");

    controller.ensure_tile(&name).await;
    wait_for_status(&controller, &name, "saved: ok").await;
    assert_eq!(store.put_attempts(), 1);
    assert_eq!(controller.stats().await.rendered, 1);
}

#[tokio::test]
async fn test_previously_stored_tile_is_not_rendered() {
    let store = Arc::new(MemoryTileStore::new());

    // Render with one controller, then start over with a fresh one
    let first = inline_controller(store.clone());
    first.ensure_tile(&tile("00")).await;
    wait_for_status(&first, &tile("00"), "saved: ok").await;

    let second = inline_controller(store.clone());
    second.ensure_tile(&tile("00")).await;
    let record = wait_for_status(&second, &tile("00"), "loaded").await;
    assert!(record.exists);
    assert_eq!(second.stats().await.rendered, 0);
    assert_eq!(store.put_calls(), 1);
}

// =============================================================================
// Concurrency
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_create_one_record() {
    let store = Arc::new(MemoryTileStore::new());
    let controller = inline_controller(store.clone());
    let name = tile("0312");

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let controller = Arc::clone(&controller);
            let name = name.clone();
            tokio::spawn(async move { controller.ensure_tile(&name).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap();
    }

    wait_for_status(&controller, &name, "saved: ok").await;
    assert_eq!(controller.tile_count().await, 1);
    assert_eq!(controller.stats().await.rendered, 1);
    assert_eq!(store.put_calls(), 1);
}

// =============================================================================
// Mirrors
// =============================================================================

#[tokio::test]
async fn test_mirror_follows_original() {
    let store = Arc::new(MemoryTileStore::new());
    let controller = inline_controller(store);

    // Row 3 at zoom 2 reflects row 0
    let MapTile::Tile(mirror) = controller.get_tile(TileCoord::new(2, 3), 2).await else {
        panic!("expected a tile");
    };
    let original = tile("010");
    assert_eq!(mirror.kind, TileKind::MirrorOf(original.clone()));
    assert_eq!(mirror.name, original);

    wait_for_status(&controller, &original, "saved: ok").await;
    let mirror = controller.mirror(&original).await.unwrap();
    assert_eq!(mirror.status, TileStatus::Saved);
    assert!(mirror.exists);
    assert!(mirror.shows_own_image());

    // The mirror image is the original flipped top to bottom
    let original_png = controller
        .display_image(&controller.record(&original).await.unwrap())
        .await
        .unwrap();
    let mirror_png = controller.display_image(&mirror).await.unwrap();
    let top = decode_png(&original_png);
    let bottom = decode_png(&mirror_png);
    let last = TEST_TILE_SIZE - 1;
    for x in 0..TEST_TILE_SIZE {
        for y in 0..TEST_TILE_SIZE {
            assert_eq!(top.get_pixel(x, y), bottom.get_pixel(x, last - y));
        }
    }
}

#[tokio::test]
async fn test_northern_tiles_are_not_mirrors() {
    let store = Arc::new(MemoryTileStore::new());
    let controller = inline_controller(store);

    let MapTile::Tile(record) = controller.get_tile(TileCoord::new(1, 1), 2).await else {
        panic!("expected a tile");
    };
    assert_eq!(record.kind, TileKind::Normal);
    assert_eq!(record.name, tile("003"));
    assert!(controller.mirror(&tile("003")).await.is_none());
}

// =============================================================================
// Worker Queue
// =============================================================================

#[tokio::test]
async fn test_worker_backed_controller_renders_tiles() {
    let store = Arc::new(MemoryTileStore::new());
    let controller = worker_controller(store.clone(), DispatchOrder::Lifo);

    let names: Vec<TileName> = ["00", "01", "000", "001", "0000"]
        .into_iter()
        .map(tile)
        .collect();
    for name in &names {
        controller.ensure_tile(name).await;
    }
    for name in &names {
        wait_for_status(&controller, name, "saved: ok").await;
    }

    assert_eq!(store.len().await, names.len());
    let stats = controller.stats().await;
    assert_eq!(stats.rendered, names.len());
    assert_eq!(stats.backlog, 0);
}
