//! Ranged reads over local files and blob stores.
//!
//! The query path only ever asks for an inclusive byte range, so a store can
//! live in a local file or behind any service that serves byte ranges of a
//! named blob.

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use tracing::debug;

use crate::StoreError;

/// Reads inclusive byte ranges of a single store.
pub trait RangeRead: Send + Sync {
    /// Returns exactly the bytes in `[start, end]` or fails.
    fn read_range(&self, start: u64, end: u64) -> Result<Vec<u8>, StoreError>;
}

impl<T: RangeRead + ?Sized> RangeRead for Arc<T> {
    fn read_range(&self, start: u64, end: u64) -> Result<Vec<u8>, StoreError> {
        (**self).read_range(start, end)
    }
}

/// Serves byte ranges of named blobs, e.g. an object store bucket.
pub trait BlobStore: Send + Sync {
    /// Returns the bytes in `[start, end]` of blob `key`.
    fn fetch_range(&self, key: &str, start: u64, end: u64) -> Result<Vec<u8>, StoreError>;
}

impl<T: BlobStore + ?Sized> BlobStore for Arc<T> {
    fn fetch_range(&self, key: &str, start: u64, end: u64) -> Result<Vec<u8>, StoreError> {
        (**self).fetch_range(key, start, end)
    }
}

fn range_len(key: &str, start: u64, end: u64) -> Result<usize, StoreError> {
    if end < start {
        return Err(StoreError::Fetch {
            key: key.to_string(),
            start,
            end,
            detail: "end precedes start".to_string(),
        });
    }
    usize::try_from(end - start + 1).map_err(|_| StoreError::Fetch {
        key: key.to_string(),
        start,
        end,
        detail: "range does not fit in memory".to_string(),
    })
}

/// Rejects a range that ends past a blob of `size` bytes, before anything is
/// allocated for it.
fn check_within(key: &str, start: u64, end: u64, size: u64) -> Result<usize, StoreError> {
    let len = range_len(key, start, end)?;
    if end >= size {
        return Err(StoreError::Fetch {
            key: key.to_string(),
            start,
            end,
            detail: format!("range past end of {} byte blob", size),
        });
    }
    Ok(len)
}

/// Positional reads against a file handle opened once.
///
/// The handle stays pinned to the file it opened, so a store renamed over
/// the path later does not affect reads through this reader.
#[derive(Debug)]
pub struct FileRangeReader {
    file: File,
    path: PathBuf,
}

impl FileRangeReader {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)
            .map_err(|e| StoreError::io(format!("open store {}", path.display()), e))?;
        Ok(Self { file, path })
    }
}

impl RangeRead for FileRangeReader {
    fn read_range(&self, start: u64, end: u64) -> Result<Vec<u8>, StoreError> {
        let key = self.path.to_string_lossy();
        let size = self
            .file
            .metadata()
            .map_err(|e| StoreError::io(format!("stat {}", self.path.display()), e))?
            .len();
        let mut buf = vec![0u8; check_within(&key, start, end, size)?];
        read_exact_at(&self.file, &mut buf, start).map_err(|e| {
            StoreError::io(
                format!("read bytes {}-{} of {}", start, end, self.path.display()),
                e,
            )
        })?;
        Ok(buf)
    }
}

#[cfg(unix)]
fn read_exact_at(file: &File, buf: &mut [u8], offset: u64) -> std::io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.read_exact_at(buf, offset)
}

#[cfg(windows)]
fn read_exact_at(file: &File, buf: &mut [u8], offset: u64) -> std::io::Result<()> {
    use std::os::windows::fs::FileExt;
    let mut read = 0;
    while read < buf.len() {
        let n = file.seek_read(&mut buf[read..], offset + read as u64)?;
        if n == 0 {
            return Err(std::io::ErrorKind::UnexpectedEof.into());
        }
        read += n;
    }
    Ok(())
}

/// Adapts one blob of a [`BlobStore`] into a [`RangeRead`].
///
/// Each read is an independent request; the returned length is checked
/// against the requested range.
pub struct RemoteRangeReader<B: BlobStore> {
    blobs: B,
    key: String,
}

impl<B: BlobStore> RemoteRangeReader<B> {
    pub fn new(blobs: B, key: impl Into<String>) -> Self {
        Self {
            blobs,
            key: key.into(),
        }
    }
}

impl<B: BlobStore> RangeRead for RemoteRangeReader<B> {
    fn read_range(&self, start: u64, end: u64) -> Result<Vec<u8>, StoreError> {
        let want = range_len(&self.key, start, end)?;
        let data = self.blobs.fetch_range(&self.key, start, end)?;
        if data.len() != want {
            return Err(StoreError::Fetch {
                key: self.key.clone(),
                start,
                end,
                detail: format!("expected {} bytes, got {}", want, data.len()),
            });
        }
        debug!(key = %self.key, start, end, "fetched byte range");
        Ok(data)
    }
}

/// In-process blob store holding every blob in memory.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<String, Arc<Vec<u8>>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `data` under `key`, replacing any previous blob.
    pub fn put(&self, key: impl Into<String>, data: Vec<u8>) {
        let mut blobs = self.blobs.write().unwrap_or_else(|e| e.into_inner());
        blobs.insert(key.into(), Arc::new(data));
    }
}

impl BlobStore for MemoryBlobStore {
    fn fetch_range(&self, key: &str, start: u64, end: u64) -> Result<Vec<u8>, StoreError> {
        let len = range_len(key, start, end)?;
        let blob = {
            let blobs = self.blobs.read().unwrap_or_else(|e| e.into_inner());
            blobs.get(key).cloned()
        };
        let fail = |detail: &str| StoreError::Fetch {
            key: key.to_string(),
            start,
            end,
            detail: detail.to_string(),
        };
        let blob = blob.ok_or_else(|| fail("no such blob"))?;
        let start = usize::try_from(start).map_err(|_| fail("range past end of blob"))?;
        start
            .checked_add(len)
            .and_then(|end| blob.get(start..end))
            .map(<[u8]>::to_vec)
            .ok_or_else(|| fail("range past end of blob"))
    }
}

/// Blob store backed by a local directory, one file per key.
///
/// Every fetch opens the blob afresh, the way a remote request would.
#[derive(Debug, Clone)]
pub struct DirBlobStore {
    root: PathBuf,
}

impl DirBlobStore {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }
}

impl BlobStore for DirBlobStore {
    fn fetch_range(&self, key: &str, start: u64, end: u64) -> Result<Vec<u8>, StoreError> {
        let fail = |detail: String| StoreError::Fetch {
            key: key.to_string(),
            start,
            end,
            detail,
        };
        let file = File::open(self.root.join(key)).map_err(|e| fail(e.to_string()))?;
        let size = file.metadata().map_err(|e| fail(e.to_string()))?.len();
        let mut buf = vec![0u8; check_within(key, start, end, size)?];
        read_exact_at(&file, &mut buf, start).map_err(|e| fail(e.to_string()))?;
        Ok(buf)
    }
}
