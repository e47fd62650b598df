//! Blob storage for the CAS HTTP service.
//!
//! The HTTP layer talks to storage only through the [`BlobStore`] trait:
//! an existence check, a streaming read that reports its length up front,
//! and a streaming write with an optional declared length. Keys are
//! supplied by the caller; nothing here hashes or deduplicates content.
//!
//! # Storage Backends
//!
//! - [`InMemoryBlobStore`] -- `HashMap`-based store for tests and embedding
//! - [`FsBlobStore`] -- one file per key under a root directory, with
//!   write-to-temp-then-rename replacement
//!
//! # Design Rules
//!
//! 1. A write to an existing key replaces the blob.
//! 2. A read yields exactly the number of bytes it reports.
//! 3. A write with a declared length fails if the body disagrees.
//! 4. All I/O errors are propagated, never silently ignored.

pub mod error;
pub mod fs;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use fs::FsBlobStore;
pub use memory::InMemoryBlobStore;
pub use traits::{BlobBody, BlobReader, BlobStore};
