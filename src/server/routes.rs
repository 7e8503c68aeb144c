//! Router configuration for the tile map server.
//!
//! # Route Structure
//!
//! ```text
//! /health                       - Health check
//! /tiles/{zoom}/{x}/{y}.png     - Map tile (preview or final image)
//! /blobs/{name}                 - Stored tile by quadtree name
//! /key.png                      - Color legend
//! /stats                        - Loaded / rendered / backlog counters
//! ```
//!
//! # Example
//!
//! ```ignore
//! use mandel_tiles::server::{create_router, RouterConfig};
//!
//! let router = create_router(controller, RouterConfig::new().with_max_zoom(20));
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Router};
use http::header::CONTENT_TYPE;
use http::Method;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{
    blob_handler, health_handler, key_handler, stats_handler, tile_handler, AppState,
    TILE_NAME_HEADER, TILE_STATUS_HEADER,
};
use crate::store::TileStore;
use crate::tile::{TileController, MAX_ZOOM};

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Clone)]
pub struct RouterConfig {
    /// Allowed CORS origins (None = allow any origin)
    pub cors_origins: Option<Vec<String>>,

    /// Cache-Control max-age in seconds for finished tiles
    pub cache_max_age: u32,

    /// Deepest zoom level served, capped by the controller's tile index
    pub max_zoom: u32,

    /// Whether to enable request tracing
    pub enable_tracing: bool,
}

impl RouterConfig {
    /// Create a router configuration.
    ///
    /// By default:
    /// - CORS allows any origin
    /// - Cache max-age is 1 hour (3600 seconds)
    /// - Every zoom level the controller's tile index supports is served
    /// - Tracing is enabled
    pub fn new() -> Self {
        Self {
            cors_origins: None,
            cache_max_age: 3600,
            max_zoom: MAX_ZOOM,
            enable_tracing: true,
        }
    }

    /// Set specific allowed CORS origins.
    ///
    /// Pass an empty vec to disallow all cross-origin requests.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    pub fn with_cache_max_age(mut self, seconds: u32) -> Self {
        self.cache_max_age = seconds;
        self
    }

    pub fn with_max_zoom(mut self, max_zoom: u32) -> Self {
        self.max_zoom = max_zoom;
        self
    }

    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the application router around a tile controller.
pub fn create_router<S: TileStore>(
    controller: Arc<TileController<S>>,
    config: RouterConfig,
) -> Router {
    let app_state = AppState::new(controller)
        .with_cache_max_age(config.cache_max_age)
        .with_max_zoom(config.max_zoom);

    let cors = build_cors_layer(&config);

    // {filename} captures both "{y}" and "{y}.png"
    let router = Router::new()
        .route("/health", get(health_handler))
        .route("/tiles/{zoom}/{x}/{filename}", get(tile_handler::<S>))
        .route("/blobs/{name}", get(blob_handler::<S>))
        .route("/key.png", get(key_handler::<S>))
        .route("/stats", get(stats_handler::<S>))
        .with_state(app_state)
        .layer(cors);

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Build the CORS layer based on configuration.
///
/// The tile headers are exposed so a browser map can show tile progress.
fn build_cors_layer(config: &RouterConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::HEAD, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .expose_headers([TILE_NAME_HEADER, TILE_STATUS_HEADER])
        .max_age(Duration::from_secs(86400));

    match &config.cors_origins {
        None => cors.allow_origin(Any),
        Some(origins) if origins.is_empty() => cors,
        Some(origins) => {
            let parsed_origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            cors.allow_origin(parsed_origins)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
