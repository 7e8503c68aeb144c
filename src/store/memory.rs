use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;

use super::{BlobMetadata, TileStore};
use crate::error::StoreError;
use crate::tile::TileName;

/// Process-local tile store.
///
/// Nothing survives a restart. Counts lookups and writes so callers can
/// check how often the store was hit.
#[derive(Default)]
pub struct MemoryTileStore {
    blobs: RwLock<HashMap<TileName, (Bytes, BlobMetadata)>>,
    exists_calls: AtomicUsize,
    put_calls: AtomicUsize,
}

impl MemoryTileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `exists` calls so far.
    pub fn exists_calls(&self) -> usize {
        self.exists_calls.load(Ordering::Relaxed)
    }

    /// Number of `put` calls so far.
    pub fn put_calls(&self) -> usize {
        self.put_calls.load(Ordering::Relaxed)
    }

    /// Metadata written with a stored tile.
    pub async fn stored_metadata(&self, name: &TileName) -> Option<BlobMetadata> {
        let blobs = self.blobs.read().await;
        blobs.get(name).map(|(_, meta)| meta.clone())
    }

    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.blobs.read().await.is_empty()
    }
}

#[async_trait]
impl TileStore for MemoryTileStore {
    async fn exists(&self, name: &TileName) -> Result<bool, StoreError> {
        self.exists_calls.fetch_add(1, Ordering::Relaxed);
        Ok(self.blobs.read().await.contains_key(name))
    }

    async fn get(&self, name: &TileName) -> Result<Bytes, StoreError> {
        let blobs = self.blobs.read().await;
        blobs
            .get(name)
            .map(|(data, _)| data.clone())
            .ok_or_else(|| StoreError::NotFound(self.location(name)))
    }

    async fn put(
        &self,
        name: &TileName,
        data: Bytes,
        metadata: BlobMetadata,
    ) -> Result<(), StoreError> {
        self.put_calls.fetch_add(1, Ordering::Relaxed);
        let mut blobs = self.blobs.write().await;
        blobs.insert(name.clone(), (data, metadata));
        Ok(())
    }

    fn location(&self, name: &TileName) -> String {
        format!("memory://{}", name)
    }
}
