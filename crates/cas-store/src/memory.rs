use std::collections::HashMap;
use std::io::Cursor;
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::AsyncReadExt;

use crate::error::{StoreError, StoreResult};
use crate::traits::{BlobBody, BlobReader, BlobStore};

/// In-memory, HashMap-based blob store.
///
/// Intended for tests and embedding. Bodies are buffered in full before
/// they are published, so readers never see a partial write.
pub struct InMemoryBlobStore {
    blobs: RwLock<HashMap<String, Bytes>>,
}

impl InMemoryBlobStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            blobs: RwLock::new(HashMap::new()),
        }
    }

    /// Number of blobs currently stored.
    pub fn len(&self) -> usize {
        self.blobs.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.blobs.read().expect("lock poisoned").is_empty()
    }

    /// Total bytes across all stored blobs.
    pub fn total_bytes(&self) -> u64 {
        self.blobs
            .read()
            .expect("lock poisoned")
            .values()
            .map(|blob| blob.len() as u64)
            .sum()
    }

    /// Return a sorted list of all keys in the store.
    pub fn keys(&self) -> Vec<String> {
        let map = self.blobs.read().expect("lock poisoned");
        let mut keys: Vec<String> = map.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Fetch a stored blob without going through a stream.
    pub fn get(&self, key: &str) -> Option<Bytes> {
        self.blobs.read().expect("lock poisoned").get(key).cloned()
    }

    /// Store a blob directly.
    pub fn insert(&self, key: impl Into<String>, data: impl Into<Bytes>) {
        self.blobs
            .write()
            .expect("lock poisoned")
            .insert(key.into(), data.into());
    }
}

impl Default for InMemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn exists(&self, key: &str) -> StoreResult<bool> {
        let map = self.blobs.read().expect("lock poisoned");
        Ok(map.contains_key(key))
    }

    async fn read(&self, key: &str) -> StoreResult<BlobReader> {
        let data = self
            .get(key)
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;
        let length = data.len() as u64;
        Ok(BlobReader::new(Cursor::new(data), length))
    }

    async fn write(&self, key: &str, mut body: BlobBody, length: Option<u64>) -> StoreResult<()> {
        let mut buf = Vec::with_capacity(length.unwrap_or(0).min(1 << 20) as usize);
        body.read_to_end(&mut buf).await?;

        if let Some(declared) = length {
            if buf.len() as u64 != declared {
                return Err(StoreError::LengthMismatch {
                    key: key.to_string(),
                    declared,
                    actual: buf.len() as u64,
                });
            }
        }

        tracing::trace!(key, bytes = buf.len(), "stored blob in memory");
        self.insert(key, buf);
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryBlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.len();
        f.debug_struct("InMemoryBlobStore")
            .field("blob_count", &count)
            .finish()
    }
}
