//! File providers.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, SystemTime};

use super::FileStore;

/// Reads attachments from the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsStore;

#[async_trait]
impl FileStore for FsStore {
    async fn modified(&self, path: &Path) -> io::Result<SystemTime> {
        tokio::fs::metadata(path).await?.modified()
    }

    async fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        tokio::fs::read(path).await
    }
}

#[derive(Debug, Clone)]
enum MemoryEntry {
    File { bytes: Vec<u8>, modified: SystemTime },
    Broken(io::ErrorKind),
}

/// In-memory file provider.
///
/// Every write advances the file's modification time, and reads are counted
/// so callers can tell whether a file was actually re-read.
#[derive(Debug, Default)]
pub struct MemoryFiles {
    files: Mutex<HashMap<PathBuf, MemoryEntry>>,
    reads: AtomicUsize,
}

impl MemoryFiles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `bytes` at `path` with an explicit modification time.
    pub fn insert(&self, path: impl Into<PathBuf>, bytes: impl Into<Vec<u8>>, modified: SystemTime) {
        self.files.lock().insert(
            path.into(),
            MemoryEntry::File {
                bytes: bytes.into(),
                modified,
            },
        );
    }

    /// Store `bytes` at `path`, one second newer than the previous version.
    pub fn write(&self, path: impl Into<PathBuf>, bytes: impl Into<Vec<u8>>) {
        let path = path.into();
        let modified = match self.files.lock().get(&path) {
            Some(MemoryEntry::File { modified, .. }) => *modified + Duration::from_secs(1),
            _ => SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000),
        };
        self.insert(path, bytes, modified);
    }

    /// Make every access to `path` fail with `kind`.
    pub fn break_file(&self, path: impl Into<PathBuf>, kind: io::ErrorKind) {
        self.files.lock().insert(path.into(), MemoryEntry::Broken(kind));
    }

    pub fn remove(&self, path: &Path) {
        self.files.lock().remove(path);
    }

    /// Number of successful reads so far.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    fn entry(&self, path: &Path) -> io::Result<MemoryEntry> {
        match self.files.lock().get(path) {
            Some(MemoryEntry::Broken(kind)) => Err(io::Error::new(*kind, path.display().to_string())),
            Some(entry) => Ok(entry.clone()),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} does not exist", path.display()),
            )),
        }
    }
}

#[async_trait]
impl FileStore for MemoryFiles {
    async fn modified(&self, path: &Path) -> io::Result<SystemTime> {
        match self.entry(path)? {
            MemoryEntry::File { modified, .. } => Ok(modified),
            MemoryEntry::Broken(kind) => Err(kind.into()),
        }
    }

    async fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        match self.entry(path)? {
            MemoryEntry::File { bytes, .. } => {
                self.reads.fetch_add(1, Ordering::SeqCst);
                Ok(bytes)
            }
            MemoryEntry::Broken(kind) => Err(kind.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fs_store_reads_and_stats() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("asreview.csv");
        std::fs::write(&path, "doi\n").unwrap();

        let store = FsStore;
        assert!(store.modified(&path).await.is_ok());
        assert_eq!(store.read(&path).await.unwrap(), b"doi\n");
    }

    #[tokio::test]
    async fn test_fs_store_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.csv");

        let err = FsStore.modified(&path).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_memory_write_advances_mtime() {
        let files = MemoryFiles::new();
        let path = Path::new("/lib/asreview.csv");

        files.write(path, "a");
        let first = files.modified(path).await.unwrap();
        files.write(path, "b");
        let second = files.modified(path).await.unwrap();

        assert!(second > first);
        assert_eq!(files.read(path).await.unwrap(), b"b");
        assert_eq!(files.read_count(), 1);
    }

    #[tokio::test]
    async fn test_memory_broken_and_removed() {
        let files = MemoryFiles::new();
        let path = Path::new("/lib/asreview.csv");

        files.break_file(path, io::ErrorKind::PermissionDenied);
        assert_eq!(
            files.read(path).await.unwrap_err().kind(),
            io::ErrorKind::PermissionDenied
        );

        files.remove(path);
        assert_eq!(files.modified(path).await.unwrap_err().kind(), io::ErrorKind::NotFound);
        assert_eq!(files.read_count(), 0);
    }
}
