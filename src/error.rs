use thiserror::Error;

/// Errors from the persistent tile store.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Error reported by S3 or an S3-compatible backend
    #[error("Storage backend error: {0}")]
    Backend(String),

    /// Network or connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Tile blob not found
    #[error("Tile not found: {0}")]
    NotFound(String),
}

/// Errors raised when parsing a quadtree tile name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TileNameError {
    /// Name is empty (or only the suffix)
    #[error("Tile name is empty")]
    Empty,

    /// Name does not start with the root digit '0'
    #[error("Tile name must start with '0', got {0:?}")]
    InvalidRoot(char),

    /// A quadrant digit outside 0-3
    #[error("Invalid quadrant digit {digit:?} at position {position}")]
    InvalidDigit { digit: char, position: usize },

    /// Name is deeper than the supported zoom range
    #[error("Tile name too deep: depth {depth} exceeds maximum {max}")]
    TooDeep { depth: u32, max: u32 },
}

/// Errors raised when building a level-to-color control table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaletteError {
    /// Fewer than two control points
    #[error("Color table needs at least 2 control points, got {0}")]
    TooFewPoints(usize),

    /// The first control point is not at level 0
    #[error("First control point must be at level 0, got {0}")]
    FirstLevelNotZero(u32),

    /// Levels are not strictly increasing
    #[error("Control levels must be strictly increasing: {previous} followed by {level}")]
    NotIncreasing { previous: u32, level: u32 },
}

/// Errors from the render dispatch queue.
#[derive(Debug, Clone, Error)]
pub enum RenderError {
    /// The worker (or dispatcher) went away before the job completed
    #[error("Render worker stopped before job {id} completed")]
    WorkerGone { id: u64 },

    /// Worker returned a pixel payload of the wrong size
    #[error("Render job {id} returned {actual} bytes, expected {expected}")]
    PayloadSize {
        id: u64,
        expected: usize,
        actual: usize,
    },

    /// Could not start the background worker thread
    #[error("Failed to spawn render worker: {0}")]
    WorkerSpawn(String),
}

/// Errors surfaced by the tile controller and the HTTP layer.
#[derive(Debug, Clone, Error)]
pub enum TileError {
    /// Tile name could not be parsed
    #[error("Invalid tile name: {0}")]
    InvalidName(#[from] TileNameError),

    /// Requested zoom is beyond the configured maximum
    #[error("Invalid zoom: {zoom} (maximum is {max_zoom})")]
    InvalidZoom { zoom: u32, max_zoom: u32 },

    /// A tile coordinate in a request path is not an integer
    #[error("Invalid tile coordinate: {value:?}")]
    InvalidCoordinate { value: String },

    /// Requested image size is out of range
    #[error("Invalid image size: {width}x{height} (each side must be 1-{max})")]
    InvalidSize { width: u32, height: u32, max: u32 },

    /// Persistent store failure
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Rendering failure
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    /// Failed to encode a tile image
    #[error("Failed to encode tile: {message}")]
    EncodeError { message: String },

    /// Failed to decode a stored tile image
    #[error("Failed to decode tile: {message}")]
    DecodeError { message: String },
}
