//! Configuration management.
//!
//! Settings come from command-line arguments via clap, with environment
//! variable fallbacks using the `MANDEL_` prefix and defaults for
//! everything optional.
//!
//! # Commands
//!
//! - `serve` (default): run the tile server
//! - `render`: render one tile, or the color key, to a PNG file
//!
//! # Environment Variables
//!
//! - `MANDEL_HOST` - Server bind address (default: 0.0.0.0)
//! - `MANDEL_PORT` - Server port (default: 3000)
//! - `MANDEL_STORE` - Tile store backend, `memory` or `s3` (default: memory)
//! - `MANDEL_S3_BUCKET` - S3 bucket name (required with `--store s3`)
//! - `MANDEL_S3_PREFIX` - Key prefix for stored tiles (default: v7)
//! - `MANDEL_S3_ENDPOINT` - Custom S3 endpoint for S3-compatible services
//! - `MANDEL_S3_REGION` - AWS region (default: us-east-1)
//! - `MANDEL_TILE_SIZE` - Tile edge in pixels (default: 256)
//! - `MANDEL_DISPATCH_ORDER` - `lifo` or `fifo` (default: lifo)
//! - `MANDEL_NO_WORKER` - Render inline instead of on a worker thread
//! - `MANDEL_LIST_DEPTH` - Ancestor tags stored per tile (default: 4)
//! - `MANDEL_CACHE_IMAGES` - Image cache size in bytes (default: 100MB)
//! - `MANDEL_CHECK_DELAY_MS` - Pause before the store lookup (default: 10)
//! - `MANDEL_SAVE_DELAY_MS` - Pause before saving a render (default: 10)
//! - `MANDEL_MAX_ZOOM` - Deepest zoom served (default: 20)
//! - `MANDEL_CACHE_MAX_AGE` - HTTP cache max-age seconds (default: 3600)
//! - `MANDEL_CORS_ORIGINS` - Allowed CORS origins, comma-separated

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};

use crate::dispatch::DispatchOrder;
use crate::tile::{
    ControllerConfig, TileIndex, DEFAULT_IMAGE_CACHE_CAPACITY, DEFAULT_LIST_DEPTH,
    DEFAULT_ROOT_RECT, DEFAULT_TILE_SIZE,
};

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default AWS region.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Default key prefix for stored tiles.
pub const DEFAULT_S3_PREFIX: &str = "v7";

/// Default deepest zoom level served.
pub const DEFAULT_MAX_ZOOM: u32 = 20;

/// Default HTTP cache max-age in seconds (1 hour).
pub const DEFAULT_CACHE_MAX_AGE: u32 = 3600;

/// Default store lookup and save delays in milliseconds.
pub const DEFAULT_DELAY_MS: u64 = 10;

/// Largest accepted tile edge.
pub const MAX_TILE_SIZE: u32 = 2048;

// =============================================================================
// CLI Arguments
// =============================================================================

/// Mandel Tiles - a Mandelbrot tile server.
///
/// Serves a zoomable Mandelbrot map as quadtree tiles. Missing tiles are
/// rendered on a background worker and saved to a tile store.
#[derive(Parser, Debug, Clone)]
#[command(name = "mandel-tiles")]
#[command(author, version, about, long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Server settings when no subcommand is given.
    #[command(flatten)]
    pub serve: ServeConfig,
}

impl Cli {
    /// The command to run; `serve` when none was given.
    pub fn into_command(self) -> Command {
        self.command.unwrap_or(Command::Serve(self.serve))
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the tile server
    Serve(ServeConfig),

    /// Render one tile or the color key to a PNG file
    Render(RenderConfig),
}

/// Where rendered tiles are persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum StoreKind {
    /// Process memory; lost on restart
    #[default]
    Memory,
    /// S3 or an S3-compatible service
    S3,
}

// =============================================================================
// Serve Configuration
// =============================================================================

#[derive(clap::Args, Debug, Clone)]
pub struct ServeConfig {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "MANDEL_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "MANDEL_PORT")]
    pub port: u16,

    // =========================================================================
    // Store Configuration
    // =========================================================================
    /// Tile store backend.
    #[arg(long, value_enum, default_value_t = StoreKind::Memory, env = "MANDEL_STORE")]
    pub store: StoreKind,

    /// S3 bucket for rendered tiles.
    #[arg(long, env = "MANDEL_S3_BUCKET")]
    pub s3_bucket: Option<String>,

    /// Key prefix for rendered tiles.
    #[arg(long, default_value = DEFAULT_S3_PREFIX, env = "MANDEL_S3_PREFIX")]
    pub s3_prefix: String,

    /// Custom S3 endpoint URL for S3-compatible services (MinIO, etc.).
    #[arg(long, env = "MANDEL_S3_ENDPOINT")]
    pub s3_endpoint: Option<String>,

    /// AWS region for S3.
    #[arg(long, default_value = DEFAULT_REGION, env = "MANDEL_S3_REGION")]
    pub s3_region: String,

    // =========================================================================
    // Tile Configuration
    // =========================================================================
    /// Tile edge in pixels.
    #[arg(long, default_value_t = DEFAULT_TILE_SIZE, env = "MANDEL_TILE_SIZE")]
    pub tile_size: u32,

    /// Order in which queued renders run.
    #[arg(long, value_enum, default_value_t = DispatchOrder::Lifo, env = "MANDEL_DISPATCH_ORDER")]
    pub dispatch_order: DispatchOrder,

    /// Render in the request task instead of on a background worker.
    #[arg(long, default_value_t = false, env = "MANDEL_NO_WORKER")]
    pub no_worker: bool,

    /// Number of ancestor tags stored with each tile.
    #[arg(long, default_value_t = DEFAULT_LIST_DEPTH, env = "MANDEL_LIST_DEPTH")]
    pub list_depth: usize,

    /// Maximum bytes of encoded tiles kept in memory.
    #[arg(long, default_value_t = DEFAULT_IMAGE_CACHE_CAPACITY, env = "MANDEL_CACHE_IMAGES")]
    pub cache_images: usize,

    /// Milliseconds to wait before looking a new tile up in the store.
    #[arg(long, default_value_t = DEFAULT_DELAY_MS, env = "MANDEL_CHECK_DELAY_MS")]
    pub check_delay_ms: u64,

    /// Milliseconds to wait before saving a rendered tile.
    #[arg(long, default_value_t = DEFAULT_DELAY_MS, env = "MANDEL_SAVE_DELAY_MS")]
    pub save_delay_ms: u64,

    /// Deepest zoom level served.
    #[arg(long, default_value_t = DEFAULT_MAX_ZOOM, env = "MANDEL_MAX_ZOOM")]
    pub max_zoom: u32,

    // =========================================================================
    // HTTP Configuration
    // =========================================================================
    /// HTTP Cache-Control max-age in seconds for finished tiles.
    #[arg(long, default_value_t = DEFAULT_CACHE_MAX_AGE, env = "MANDEL_CACHE_MAX_AGE")]
    pub cache_max_age: u32,

    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "MANDEL_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl ServeConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.store == StoreKind::S3 && self.bucket().is_none() {
            return Err(
                "S3 store selected but no bucket given. Set --s3-bucket or MANDEL_S3_BUCKET"
                    .to_string(),
            );
        }

        if self.tile_size == 0 || self.tile_size > MAX_TILE_SIZE {
            return Err(format!("tile_size must be between 1 and {}", MAX_TILE_SIZE));
        }

        let zoom_limit = self.tile_index().max_zoom();
        if self.max_zoom > zoom_limit {
            return Err(format!(
                "max_zoom must be at most {} for {}px tiles",
                zoom_limit, self.tile_size
            ));
        }

        if self.list_depth == 0 {
            return Err("list_depth must be greater than 0".to_string());
        }

        if self.cache_images == 0 {
            return Err("cache_images must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Quadtree geometry of the served map.
    pub fn tile_index(&self) -> TileIndex {
        TileIndex::new(DEFAULT_ROOT_RECT, self.tile_size, self.tile_size)
    }

    /// The bucket name, if one was given and is not blank.
    pub fn bucket(&self) -> Option<&str> {
        self.s3_bucket
            .as_deref()
            .map(str::trim)
            .filter(|b| !b.is_empty())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Controller settings derived from this configuration.
    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            root: DEFAULT_ROOT_RECT,
            tile_width: self.tile_size,
            tile_height: self.tile_size,
            list_depth: self.list_depth,
            check_delay: Duration::from_millis(self.check_delay_ms),
            save_delay: Duration::from_millis(self.save_delay_ms),
            image_cache_bytes: self.cache_images,
        }
    }
}

// =============================================================================
// Render Configuration
// =============================================================================

#[derive(clap::Args, Debug, Clone)]
pub struct RenderConfig {
    /// Tile to render, e.g. `013.png`.
    #[arg(required_unless_present = "key")]
    pub tile: Option<String>,

    /// Render the color key instead of a tile.
    #[arg(long, conflicts_with = "tile")]
    pub key: bool,

    /// Output PNG path (defaults to the tile name, or `key.png`).
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output width in pixels.
    #[arg(long, default_value_t = DEFAULT_TILE_SIZE)]
    pub width: u32,

    /// Output height in pixels.
    #[arg(long, default_value_t = DEFAULT_TILE_SIZE)]
    pub height: u32,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl RenderConfig {
    pub fn validate(&self) -> Result<(), String> {
        let valid = 1..=MAX_TILE_SIZE;
        if !valid.contains(&self.width) || !valid.contains(&self.height) {
            return Err(format!(
                "width and height must be between 1 and {}",
                MAX_TILE_SIZE
            ));
        }
        Ok(())
    }

    /// Where to write the image.
    pub fn output_path(&self) -> PathBuf {
        match (&self.output, &self.tile) {
            (Some(path), _) => path.clone(),
            (None, Some(tile)) if !self.key => {
                let name = tile.strip_suffix(".png").unwrap_or(tile);
                PathBuf::from(format!("{}.png", name))
            }
            _ => PathBuf::from("key.png"),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
