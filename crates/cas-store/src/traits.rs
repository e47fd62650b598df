use std::fmt;
use std::pin::Pin;

use async_trait::async_trait;
use tokio::io::AsyncRead;

use crate::error::StoreResult;

/// A byte stream handed to [`BlobStore::write`].
pub type BlobBody = Pin<Box<dyn AsyncRead + Send>>;

/// An open blob: a byte stream plus the number of bytes it will yield.
pub struct BlobReader {
    pub reader: Pin<Box<dyn AsyncRead + Send>>,
    pub length: u64,
}

impl BlobReader {
    pub fn new(reader: impl AsyncRead + Send + 'static, length: u64) -> Self {
        Self {
            reader: Box::pin(reader),
            length,
        }
    }
}

impl fmt::Debug for BlobReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlobReader")
            .field("length", &self.length)
            .finish_non_exhaustive()
    }
}

/// Key-addressed blob storage.
///
/// Keys are caller-supplied strings; the store never derives them from
/// content. Implementations must satisfy these rules:
/// - `write` to an existing key replaces the blob. Whether readers can
///   observe a partially written blob is up to the backend.
/// - `read` returns a stream that yields exactly `length` bytes.
/// - All I/O errors are propagated, never silently ignored.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Check whether a blob exists under `key`.
    async fn exists(&self, key: &str) -> StoreResult<bool>;

    /// Open the blob stored under `key`.
    ///
    /// Returns [`StoreError::NotFound`](crate::StoreError::NotFound) if
    /// there is no such blob.
    async fn read(&self, key: &str) -> StoreResult<BlobReader>;

    /// Store the contents of `body` under `key`.
    ///
    /// `length` is the declared body length, or `None` when the caller
    /// does not know it up front. When it is `Some`, backends reject bodies
    /// that yield a different number of bytes.
    async fn write(&self, key: &str, body: BlobBody, length: Option<u64>) -> StoreResult<()>;
}
