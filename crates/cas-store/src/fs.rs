use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::fs::{self, File};
use tokio::io::{self, AsyncWriteExt, BufWriter};

use crate::error::{StoreError, StoreResult};
use crate::traits::{BlobBody, BlobReader, BlobStore};

const OBJECTS_DIR: &str = "objects";
const TMP_DIR: &str = "tmp";

/// Directory-backed blob store.
///
/// Layout under the root:
///
/// ```text
/// <root>/objects/<key>   published blobs
/// <root>/tmp/<pid>.<n>   writes in flight
/// ```
///
/// Writes land in `tmp/` and are renamed into `objects/` only after the
/// declared length has been verified and the file synced, so a reader
/// sees either the previous blob or the new one. Temp names do not embed
/// the key, so any key that fits as a file name in `objects/` can be written.
#[derive(Debug)]
pub struct FsBlobStore {
    root: PathBuf,
    next_tmp: AtomicU64,
}

impl FsBlobStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub async fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        fs::create_dir_all(root.join(OBJECTS_DIR)).await?;
        fs::create_dir_all(root.join(TMP_DIR)).await?;
        tracing::debug!(root = %root.display(), "opened blob directory");
        Ok(Self {
            root,
            next_tmp: AtomicU64::new(0),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, key: &str) -> StoreResult<PathBuf> {
        validate_key(key)?;
        Ok(self.root.join(OBJECTS_DIR).join(key))
    }

    fn tmp_path(&self) -> PathBuf {
        let n = self.next_tmp.fetch_add(1, Ordering::Relaxed);
        self.root
            .join(TMP_DIR)
            .join(format!("{}.{n}", std::process::id()))
    }
}

/// Removes an unpublished temp file when dropped, including when the write
/// future is cancelled mid-copy.
struct TmpGuard {
    path: PathBuf,
    armed: bool,
}

impl TmpGuard {
    fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    /// The file has been renamed into place; leave it alone.
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for TmpGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to remove partial blob");
            }
        }
    }
}

/// Keys become file names, so anything that could escape `objects/` is refused.
fn validate_key(key: &str) -> StoreResult<()> {
    let reason = if key.is_empty() {
        "empty"
    } else if key == "." || key == ".." {
        "reserved name"
    } else if key.contains(['/', '\\']) {
        "contains a path separator"
    } else if key.contains('\0') {
        "contains NUL"
    } else {
        return Ok(());
    };
    Err(StoreError::InvalidKey {
        key: key.to_string(),
        reason,
    })
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn exists(&self, key: &str) -> StoreResult<bool> {
        let path = self.object_path(key)?;
        Ok(fs::try_exists(&path).await?)
    }

    async fn read(&self, key: &str) -> StoreResult<BlobReader> {
        let path = self.object_path(key)?;
        let file = match File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(key.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        let length = file.metadata().await?.len();
        Ok(BlobReader::new(file, length))
    }

    async fn write(&self, key: &str, mut body: BlobBody, length: Option<u64>) -> StoreResult<()> {
        let dest = self.object_path(key)?;
        let mut tmp = TmpGuard::new(self.tmp_path());

        let mut out = BufWriter::new(File::create(tmp.path()).await?);
        let written = io::copy(&mut body, &mut out).await?;
        if let Some(declared) = length {
            if written != declared {
                return Err(StoreError::LengthMismatch {
                    key: key.to_string(),
                    declared,
                    actual: written,
                });
            }
        }
        out.flush().await?;
        out.get_ref().sync_all().await?;
        drop(out);
        fs::rename(tmp.path(), &dest).await?;
        tmp.disarm();

        tracing::debug!(key, bytes = written, "stored blob");
        Ok(())
    }
}
