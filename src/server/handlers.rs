//! HTTP request handlers for the tile map API.
//!
//! # Endpoints
//!
//! - `GET /tiles/{zoom}/{x}/{y}.png` - Tile currently displayed on the map
//! - `GET /blobs/{name}` - Stored tile by quadtree name
//! - `GET /key.png` - Color legend
//! - `GET /stats` - Counters
//! - `GET /health` - Health check endpoint

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, HeaderName, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::error::{RenderError, StoreError, TileError};
use crate::store::TileStore;
use crate::tile::{
    MapTile, PngTileEncoder, TileController, TileCoord, TileName, TileStatsSnapshot,
};

/// Header carrying the quadtree name behind a map tile.
pub const TILE_NAME_HEADER: HeaderName = HeaderName::from_static("x-tile-name");

/// Header carrying the tile's progress status.
pub const TILE_STATUS_HEADER: HeaderName = HeaderName::from_static("x-tile-status");

/// Largest side accepted for the color key.
pub const MAX_KEY_SIZE: u32 = 4096;

// =============================================================================
// Application State
// =============================================================================

/// Shared application state containing the tile controller.
///
/// This is passed to all handlers via Axum's State extractor.
pub struct AppState<S: TileStore> {
    pub controller: Arc<TileController<S>>,

    /// Cache control max-age in seconds for finished tiles (defaults to 1 hour)
    pub cache_max_age: u32,

    /// Deepest zoom level served, never deeper than the controller's index allows
    pub max_zoom: u32,
}

impl<S: TileStore> AppState<S> {
    pub fn new(controller: Arc<TileController<S>>) -> Self {
        let max_zoom = controller.index().max_zoom();
        Self {
            controller,
            cache_max_age: 3600,
            max_zoom,
        }
    }

    pub fn with_cache_max_age(mut self, cache_max_age: u32) -> Self {
        self.cache_max_age = cache_max_age;
        self
    }

    pub fn with_max_zoom(mut self, max_zoom: u32) -> Self {
        self.max_zoom = max_zoom.min(self.controller.index().max_zoom());
        self
    }
}

impl<S: TileStore> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            controller: Arc::clone(&self.controller),
            cache_max_age: self.cache_max_age,
            max_zoom: self.max_zoom,
        }
    }
}

// =============================================================================
// Request Parameters
// =============================================================================

/// Path parameters for map tile requests.
///
/// Extracted from: `/tiles/{zoom}/{x}/{filename}`
/// where filename is `{y}` or `{y}.png`
#[derive(Debug, Deserialize)]
pub struct TilePathParams {
    pub zoom: u32,
    pub x: i64,
    /// Row with optional .png extension (e.g., "0" or "0.png")
    pub filename: String,
}

impl TilePathParams {
    /// Parse the row from the filename, stripping any .png extension.
    pub fn y(&self) -> Result<i64, TileError> {
        let y_str = self.filename.strip_suffix(".png").unwrap_or(&self.filename);
        y_str.parse().map_err(|_| TileError::InvalidCoordinate {
            value: self.filename.clone(),
        })
    }
}

/// Query parameters for the color key.
#[derive(Debug, Deserialize)]
pub struct KeyQueryParams {
    #[serde(default = "default_key_width")]
    pub width: u32,

    #[serde(default = "default_key_height")]
    pub height: u32,
}

fn default_key_width() -> u32 {
    512
}

fn default_key_height() -> u32 {
    16
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error response returned for all error conditions.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error type identifier (e.g., "not_found", "invalid_zoom")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// HTTP status code (included for convenience)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: None,
        }
    }

    pub fn with_status(
        error: impl Into<String>,
        message: impl Into<String>,
        status: StatusCode,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: Some(status.as_u16()),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

// =============================================================================
// Error Mapping
// =============================================================================

impl IntoResponse for TileError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            TileError::InvalidName(_) => (StatusCode::BAD_REQUEST, "invalid_tile_name"),
            TileError::InvalidZoom { .. } => (StatusCode::BAD_REQUEST, "invalid_zoom"),
            TileError::InvalidCoordinate { .. } => (StatusCode::BAD_REQUEST, "invalid_coordinate"),
            TileError::InvalidSize { .. } => (StatusCode::BAD_REQUEST, "invalid_size"),

            TileError::Store(store_err) => match store_err {
                StoreError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
                StoreError::Connection(_) => (StatusCode::BAD_GATEWAY, "connection_error"),
                StoreError::Backend(_) => (StatusCode::INTERNAL_SERVER_ERROR, "storage_error"),
            },

            TileError::Render(RenderError::WorkerGone { .. }) => {
                (StatusCode::SERVICE_UNAVAILABLE, "render_unavailable")
            }
            TileError::Render(_) => (StatusCode::INTERNAL_SERVER_ERROR, "render_error"),
            TileError::DecodeError { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "decode_error"),
            TileError::EncodeError { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "encode_error"),
        };
        let message = self.to_string();

        if status.is_server_error() {
            error!(
                error_type = error_type,
                status = status.as_u16(),
                "Server error: {}",
                message
            );
        } else if status == StatusCode::NOT_FOUND {
            debug!(
                error_type = error_type,
                status = status.as_u16(),
                "Resource not found: {}",
                message
            );
        } else {
            warn!(
                error_type = error_type,
                status = status.as_u16(),
                "Client error: {}",
                message
            );
        }

        let error_response = ErrorResponse::with_status(error_type, message, status);

        (status, Json(error_response)).into_response()
    }
}

fn png_response(png: Bytes, cache_control: String) -> Response {
    (
        [
            (header::CONTENT_TYPE, "image/png".to_string()),
            (header::CACHE_CONTROL, cache_control),
        ],
        Body::from(png),
    )
        .into_response()
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle map tile requests.
///
/// # Endpoint
///
/// `GET /tiles/{zoom}/{x}/{y}.png`
///
/// Returns the best image available right now: the tile's own PNG, a
/// preview cut from an ancestor, or a transparent tile. The first request
/// for a tile starts its lookup and render in the background; request it
/// again to pick up progress.
///
/// # Response Headers
///
/// - `X-Tile-Name`: quadtree name of the tile (for mirrors, the tile reflected)
/// - `X-Tile-Status`: progress, e.g. `displaying 0.png` or `saved: ok`
pub async fn tile_handler<S: TileStore>(
    State(state): State<AppState<S>>,
    Path(params): Path<TilePathParams>,
) -> Result<Response, TileError> {
    let y = params.y()?;
    if params.zoom > state.max_zoom {
        return Err(TileError::InvalidZoom {
            zoom: params.zoom,
            max_zoom: state.max_zoom,
        });
    }

    let controller = &state.controller;
    let record = match controller
        .get_tile(TileCoord::new(params.x, y), params.zoom)
        .await
    {
        MapTile::Tile(record) => record,
        MapTile::Empty => {
            let config = controller.config();
            let encoder = PngTileEncoder::new();
            let png = encoder.encode(&encoder.blank(config.tile_width, config.tile_height))?;
            let cache_control = format!("public, max-age={}", state.cache_max_age);
            let mut response = png_response(png, cache_control);
            response
                .headers_mut()
                .insert(TILE_STATUS_HEADER, http::HeaderValue::from_static("empty"));
            return Ok(response);
        }
    };

    let png = controller.display_image(&record).await?;
    // Previews change as renders finish; only the final image is cacheable
    let cache_control = if record.exists && record.shows_own_image() {
        format!("public, max-age={}", state.cache_max_age)
    } else {
        "no-store".to_string()
    };

    Ok((
        [
            (TILE_NAME_HEADER, record.name.to_string()),
            (TILE_STATUS_HEADER, record.status.to_string()),
        ],
        png_response(png, cache_control),
    )
        .into_response())
}

/// Handle stored tile requests.
///
/// # Endpoint
///
/// `GET /blobs/{name}` where name is e.g. `013.png`
///
/// Returns `404 Not Found` when the tile has not been rendered or stored.
pub async fn blob_handler<S: TileStore>(
    State(state): State<AppState<S>>,
    Path(name): Path<String>,
) -> Result<Response, TileError> {
    let name = TileName::parse(&name)?;
    let png = state
        .controller
        .image(&name)
        .await?
        .ok_or_else(|| StoreError::NotFound(state.controller.store().location(&name)))?;

    Ok(png_response(
        png,
        format!("public, max-age={}", state.cache_max_age),
    ))
}

/// Handle color key requests.
///
/// # Endpoint
///
/// `GET /key.png?width=512&height=16`
///
/// Level 0 is on the left, the maximum level on the right.
pub async fn key_handler<S: TileStore>(
    State(state): State<AppState<S>>,
    Query(query): Query<KeyQueryParams>,
) -> Result<Response, TileError> {
    let valid = 1..=MAX_KEY_SIZE;
    if !valid.contains(&query.width) || !valid.contains(&query.height) {
        return Err(TileError::InvalidSize {
            width: query.width,
            height: query.height,
            max: MAX_KEY_SIZE,
        });
    }

    let renderer = state.controller.queue().renderer();
    let key = renderer.render_key(query.width, query.height);
    let png = PngTileEncoder::new().encode(&key)?;

    Ok(png_response(
        png,
        format!("public, max-age={}", state.cache_max_age),
    ))
}

/// Handle stats requests.
///
/// # Endpoint
///
/// `GET /stats`
pub async fn stats_handler<S: TileStore>(
    State(state): State<AppState<S>>,
) -> Json<TileStatsSnapshot> {
    Json(state.controller.stats().await)
}

/// Handle health check requests.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response
///
/// `200 OK` with JSON body:
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0"
/// }
/// ```
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
