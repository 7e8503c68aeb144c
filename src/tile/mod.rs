//! Quadtree tiles and the progressive display controller.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              HTTP Handlers              │
//! └────────────────────┬────────────────────┘
//!                      │ get_tile / display_image
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │             TileController              │
//! │  ┌──────────────┐  ┌─────────────────┐  │
//! │  │  ImageCache  │  │ PngTileEncoder  │  │
//! │  │  (PNG bytes) │  │ (encode, crop,  │  │
//! │  │              │  │  flip previews) │  │
//! │  └──────────────┘  └─────────────────┘  │
//! │         TileIndex (names ⇄ rects)       │
//! └──────────┬─────────────────┬────────────┘
//!            │                 │
//!            ▼                 ▼
//! ┌──────────────────┐ ┌──────────────────┐
//! │    TileStore     │ │   RenderQueue    │
//! └──────────────────┘ └──────────────────┘
//! ```
//!
//! # Components
//!
//! - [`TileName`]: canonical quadtree name (`0.png`, `013.png`, ...)
//! - [`TileIndex`]: tile name ⇄ plane rectangle, relative pixel placement
//! - [`TileRecord`]: what a tile shows and how far it has progressed
//! - [`TileController`]: creates records, looks tiles up, renders and saves
//! - [`ImageCache`]: LRU cache for encoded PNG tiles with size-based eviction
//! - [`PngTileEncoder`]: PNG encoding and ancestor preview composition

mod cache;
mod controller;
mod encoder;
mod index;
mod name;
mod record;

pub use cache::{ImageCache, DEFAULT_IMAGE_CACHE_CAPACITY};
pub use controller::{
    ControllerConfig, MapTile, TileController, TileObserver, TileStatsSnapshot,
    DEFAULT_CHECK_DELAY, DEFAULT_LIST_DEPTH, DEFAULT_SAVE_DELAY,
};
pub use encoder::PngTileEncoder;
pub use index::{TileIndex, DEFAULT_ROOT_RECT, DEFAULT_TILE_SIZE};
pub use name::{Quadrant, TileCoord, TileName, MAX_ZOOM, ROOT_DIGIT, TILE_SUFFIX};
pub use record::{TileKind, TileRecord, TileStatus, TileView};
