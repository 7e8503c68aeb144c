//! Persistent tile storage.
//!
//! Rendered tiles are written to a blob store keyed by tile name so that
//! later sessions (or other servers) can load them instead of rendering
//! again. Two backends are provided:
//!
//! - [`MemoryTileStore`]: process-local, for development and tests
//! - [`S3TileStore`]: S3 or any S3-compatible service (MinIO, etc.)

mod memory;
mod s3;

pub use memory::MemoryTileStore;
pub use s3::{create_s3_client, S3TileStore};

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;

use crate::error::StoreError;
use crate::tile::TileName;

/// Content type of every stored tile.
pub const PNG_CONTENT_TYPE: &str = "image/png";

/// Metadata written alongside a tile blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlobMetadata {
    pub content_type: String,
    /// Hierarchical `p<level>:<prefix>` tags, nearest ancestor first.
    pub tags: Vec<String>,
}

impl BlobMetadata {
    /// Metadata for a PNG tile tagged with up to `list_depth` ancestors.
    pub fn for_tile(name: &TileName, list_depth: usize) -> Self {
        Self {
            content_type: PNG_CONTENT_TYPE.to_string(),
            tags: name.ancestor_tags(list_depth),
        }
    }
}

/// Blob store holding rendered tiles by name.
///
/// Implementations must be thread-safe; the controller calls them from
/// many tasks at once.
#[async_trait]
pub trait TileStore: Send + Sync + 'static {
    /// Whether a blob for `name` exists.
    async fn exists(&self, name: &TileName) -> Result<bool, StoreError>;

    /// Fetch the blob for `name`.
    ///
    /// Returns `StoreError::NotFound` if there is none.
    async fn get(&self, name: &TileName) -> Result<Bytes, StoreError>;

    /// Write the blob for `name`, replacing any previous one.
    async fn put(
        &self,
        name: &TileName,
        data: Bytes,
        metadata: BlobMetadata,
    ) -> Result<(), StoreError>;

    /// Where a tile lives, for logging (e.g. `s3://bucket/v7/013.png`).
    fn location(&self, name: &TileName) -> String;
}
