//! HTTP server layer.
//!
//! The server is the map's display surface: a slippy-map client requests
//! tiles by zoom and coordinate and gets back whatever the tile currently
//! shows, improving as renders complete.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                      HTTP Layer                      │
//! │             GET /tiles/{zoom}/{x}/{y}.png            │
//! │                                                      │
//! │  ┌──────────────────────┐  ┌──────────────────────┐  │
//! │  │       handlers       │  │        routes        │  │
//! │  │ (tiles, blobs, key)  │  │ (router, CORS, trace)│  │
//! │  └──────────────────────┘  └──────────────────────┘  │
//! └──────────────────────────┬───────────────────────────┘
//!                            ▼
//!                      TileController
//! ```

pub mod handlers;
pub mod routes;

pub use handlers::{
    blob_handler, health_handler, key_handler, stats_handler, tile_handler, AppState,
    ErrorResponse, HealthResponse, KeyQueryParams, TilePathParams, MAX_KEY_SIZE,
    TILE_NAME_HEADER, TILE_STATUS_HEADER,
};
pub use routes::{create_router, RouterConfig};
