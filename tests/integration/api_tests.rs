//! API integration tests for map tiles, stored tiles and the color key.
//!
//! Tests verify:
//! - Map tiles progress from preview to final image
//! - Mirror and out-of-map tiles
//! - Error cases (bad zoom, bad coordinates, bad names, bad sizes)
//! - HTTP response codes and headers

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use mandel_tiles::store::MemoryTileStore;
use mandel_tiles::{create_router, RouterConfig, TileController, TileName};

use super::test_utils::{
    decode_png, inline_controller, is_valid_png, tile, wait_for_status, TEST_TILE_SIZE,
};

fn test_router(controller: Arc<TileController<MemoryTileStore>>) -> Router {
    create_router(
        controller,
        RouterConfig::new().with_max_zoom(10).with_tracing(false),
    )
}

async fn get(router: &Router, uri: &str) -> axum::response::Response {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    router.clone().oneshot(request).await.unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn header<'a>(response: &'a axum::response::Response, name: &str) -> &'a str {
    response.headers().get(name).unwrap().to_str().unwrap()
}

// =============================================================================
// Map Tiles
// =============================================================================

#[tokio::test]
async fn test_root_tile_progresses_to_final_image() {
    let store = Arc::new(MemoryTileStore::new());
    let controller = inline_controller(store);
    let router = test_router(controller.clone());

    // First request: the root shows itself while loading, nothing to draw yet
    let response = get(&router, "/tiles/0/0/0.png").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, "content-type"), "image/png");
    assert_eq!(header(&response, "x-tile-name"), "0.png");
    assert_eq!(header(&response, "cache-control"), "no-store");

    wait_for_status(&controller, &TileName::root(), "saved: ok").await;

    let response = get(&router, "/tiles/0/0/0.png").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, "x-tile-status"), "saved: ok");
    assert_eq!(header(&response, "cache-control"), "public, max-age=3600");

    let body = body_bytes(response).await;
    assert!(is_valid_png(&body));
    let image = decode_png(&body);
    assert_eq!(image.dimensions(), (TEST_TILE_SIZE, TEST_TILE_SIZE));
    assert_eq!(image.get_pixel(8, 8).0, [0, 0, 0, 255]);
}

#[tokio::test]
async fn test_tile_without_extension() {
    let store = Arc::new(MemoryTileStore::new());
    let router = test_router(inline_controller(store));

    let response = get(&router, "/tiles/1/1/0").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, "x-tile-name"), "01.png");
}

#[tokio::test]
async fn test_new_tile_shows_ancestor_preview() {
    let store = Arc::new(MemoryTileStore::new());
    let controller = inline_controller(store);
    let router = test_router(controller.clone());

    // Render the root first so the preview has something to show
    get(&router, "/tiles/0/0/0.png").await;
    wait_for_status(&controller, &TileName::root(), "saved: ok").await;

    let response = get(&router, "/tiles/2/1/1.png").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, "x-tile-name"), "003.png");
    assert_eq!(header(&response, "x-tile-status"), "displaying 0.png");
    assert_eq!(header(&response, "cache-control"), "no-store");

    // Tile 003 ends at the origin; its bottom right corner is inside the set
    let image = decode_png(&body_bytes(response).await);
    assert_eq!(image.dimensions(), (TEST_TILE_SIZE, TEST_TILE_SIZE));
    let last = TEST_TILE_SIZE - 1;
    assert_eq!(image.get_pixel(last, last).0[3], 255);
}

#[tokio::test]
async fn test_mirror_tile_names_its_original() {
    let store = Arc::new(MemoryTileStore::new());
    let controller = inline_controller(store);
    let router = test_router(controller.clone());

    let response = get(&router, "/tiles/1/0/1.png").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, "x-tile-name"), "00.png");

    // Only the original is ever rendered
    assert!(controller.record(&tile("02")).await.is_none());
    wait_for_status(&controller, &tile("00"), "saved: ok").await;
    assert_eq!(controller.stats().await.mirrors, 1);
}

#[tokio::test]
async fn test_out_of_map_tile_is_empty() {
    let store = Arc::new(MemoryTileStore::new());
    let controller = inline_controller(store);
    let router = test_router(controller.clone());

    for uri in ["/tiles/1/2/0.png", "/tiles/1/-1/0.png", "/tiles/1/0/-1.png"] {
        let response = get(&router, uri).await;
        assert_eq!(response.status(), StatusCode::OK, "{}", uri);
        assert_eq!(header(&response, "x-tile-status"), "empty");
        assert!(response.headers().get("x-tile-name").is_none());

        let image = decode_png(&body_bytes(response).await);
        assert!(image.pixels().all(|p| p[3] == 0));
    }
    assert_eq!(controller.tile_count().await, 0);
}

// =============================================================================
// Error Cases
// =============================================================================

#[tokio::test]
async fn test_zoom_above_limit() {
    let store = Arc::new(MemoryTileStore::new());
    let router = test_router(inline_controller(store));

    let response = get(&router, "/tiles/11/0/0.png").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_bytes(response).await;
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"], "invalid_zoom");
    assert_eq!(json["status"], 400);
}

#[tokio::test]
async fn test_zoom_capped_by_tile_index() {
    let store = Arc::new(MemoryTileStore::new());
    let controller = inline_controller(store);
    let zoom = controller.index().max_zoom();
    // Ask for more than the index supports; the router serves only what it can
    let router = create_router(
        controller.clone(),
        RouterConfig::new().with_max_zoom(zoom + 10).with_tracing(false),
    );

    get(&router, "/tiles/0/0/0.png").await;
    wait_for_status(&controller, &TileName::root(), "saved: ok").await;

    let x = 1i64 << (zoom - 1);
    let response = get(&router, &format!("/tiles/{}/{}/{}.png", zoom, x, x - 1)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, "x-tile-status"), "displaying 0.png");
    let image = decode_png(&body_bytes(response).await);
    assert_eq!(image.dimensions(), (TEST_TILE_SIZE, TEST_TILE_SIZE));

    let response = get(&router, &format!("/tiles/{}/0/0.png", zoom + 1)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(json["error"], "invalid_zoom");
    assert!(json["message"].as_str().unwrap().contains(&format!("maximum is {}", zoom)));
}

#[tokio::test]
async fn test_invalid_row() {
    let store = Arc::new(MemoryTileStore::new());
    let router = test_router(inline_controller(store));

    let response = get(&router, "/tiles/1/0/abc.png").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_bytes(response).await;
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"], "invalid_coordinate");
}

#[tokio::test]
async fn test_invalid_column_is_rejected() {
    let store = Arc::new(MemoryTileStore::new());
    let router = test_router(inline_controller(store));

    let response = get(&router, "/tiles/1/abc/0.png").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// =============================================================================
// Stored Tiles
// =============================================================================

#[tokio::test]
async fn test_blob_available_after_save() {
    let store = Arc::new(MemoryTileStore::new());
    let controller = inline_controller(store);
    let router = test_router(controller.clone());

    let response = get(&router, "/blobs/01.png").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(json["error"], "not_found");

    get(&router, "/tiles/1/1/0.png").await;
    wait_for_status(&controller, &tile("01"), "saved: ok").await;

    let response = get(&router, "/blobs/01.png").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, "content-type"), "image/png");
    assert!(is_valid_png(&body_bytes(response).await));
}

#[tokio::test]
async fn test_blob_invalid_name() {
    let store = Arc::new(MemoryTileStore::new());
    let router = test_router(inline_controller(store));

    for uri in ["/blobs/14.png", "/blobs/05.png", "/blobs/0a"] {
        let response = get(&router, uri).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", uri);

        let json: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(json["error"], "invalid_tile_name");
    }
}

// =============================================================================
// Color Key, Stats, Health
// =============================================================================

#[tokio::test]
async fn test_color_key() {
    let store = Arc::new(MemoryTileStore::new());
    let router = test_router(inline_controller(store));

    let response = get(&router, "/key.png?width=100&height=4").await;
    assert_eq!(response.status(), StatusCode::OK);

    let image = decode_png(&body_bytes(response).await);
    assert_eq!(image.dimensions(), (100, 4));
    // Level 0 on the left is transparent, the set color on the right is black
    assert_eq!(image.get_pixel(0, 0).0[3], 0);
    assert_eq!(image.get_pixel(99, 3).0, [0, 0, 0, 255]);
}

#[tokio::test]
async fn test_color_key_default_size() {
    let store = Arc::new(MemoryTileStore::new());
    let router = test_router(inline_controller(store));

    let response = get(&router, "/key.png").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(decode_png(&body_bytes(response).await).dimensions(), (512, 16));
}

#[tokio::test]
async fn test_color_key_invalid_size() {
    let store = Arc::new(MemoryTileStore::new());
    let router = test_router(inline_controller(store));

    for uri in ["/key.png?width=0", "/key.png?height=100000"] {
        let response = get(&router, uri).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", uri);
    }
}

#[tokio::test]
async fn test_stats_endpoint() {
    let store = Arc::new(MemoryTileStore::new());
    let controller = inline_controller(store);
    let router = test_router(controller.clone());

    get(&router, "/tiles/0/0/0.png").await;
    wait_for_status(&controller, &TileName::root(), "saved: ok").await;

    let response = get(&router, "/stats").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(json["rendered"], 1);
    assert_eq!(json["backlog"], 0);
    assert_eq!(json["tiles"], 1);
    assert_eq!(json["cached_images"], 1);
    assert_eq!(json["queue"]["busy"], false);
}

#[tokio::test]
async fn test_health_check() {
    let store = Arc::new(MemoryTileStore::new());
    let router = test_router(inline_controller(store));

    let response = get(&router, "/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(json["status"], "healthy");
}
