//! # Mandel Tiles
//!
//! A zoomable Mandelbrot map served as quadtree tiles.
//!
//! Every tile has a name in a quadtree rooted at `0.png`; each further digit
//! picks one quadrant of its parent. When the map asks for a tile that has
//! never been seen, it is shown immediately as a scaled-up crop of its
//! nearest rendered ancestor, then looked up in the tile store and rendered
//! on a background worker if missing. Finished tiles are saved back to the
//! store, tagged with their ancestors.
//!
//! ## Features
//!
//! - **Progressive display**: ancestor previews until the real tile arrives
//! - **Single render worker**: one job at a time, newest request first
//! - **Mirror tiles**: the bottom half of the map reflects the top half
//! - **Pluggable storage**: in-memory or S3-compatible tile stores
//! - **Level colors**: an invertible iteration-count to RGBA mapping
//!
//! ## Architecture
//!
//! - [`fractal`] - Iteration engine, color table, rectangle renderer
//! - [`tile`] - Tile names, quadtree geometry, records, controller, caches
//! - [`dispatch`] - Render queue and background worker
//! - [`store`] - Persistent tile storage (memory, S3)
//! - [`server`] - Axum-based HTTP server and routes
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use mandel_tiles::{
//!     create_router, ControllerConfig, MemoryTileStore, RenderQueue, Renderer, RouterConfig,
//!     TileController,
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let queue = RenderQueue::spawn(Arc::new(Renderer::default()), Default::default());
//!     let controller = Arc::new(TileController::new(
//!         Arc::new(MemoryTileStore::new()),
//!         queue,
//!         ControllerConfig::default(),
//!     ));
//!     let router = create_router(controller, RouterConfig::new());
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
//!     axum::serve(listener, router).await.unwrap();
//! }
//! ```

pub mod config;
pub mod dispatch;
pub mod error;
pub mod fractal;
pub mod geometry;
pub mod server;
pub mod store;
pub mod tile;

// Re-export commonly used types
pub use config::{Cli, Command, RenderConfig, ServeConfig, StoreKind};
pub use dispatch::{DispatchOrder, QueueStatus, RenderOutput, RenderQueue, RenderTicket};
pub use error::{PaletteError, RenderError, StoreError, TileError, TileNameError};
pub use fractal::{ControlPoint, LevelColors, Mandelbrot, Renderer};
pub use geometry::{PixelRect, Rect};
pub use server::{create_router, AppState, ErrorResponse, HealthResponse, RouterConfig};
pub use store::{create_s3_client, BlobMetadata, MemoryTileStore, S3TileStore, TileStore};
pub use tile::{
    ControllerConfig, ImageCache, MapTile, PngTileEncoder, TileController, TileCoord, TileIndex,
    TileKind, TileName, TileObserver, TileRecord, TileStatsSnapshot, TileStatus, TileView,
};
