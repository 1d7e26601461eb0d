use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{Context, Poll};

use tokio::io::AsyncWrite;

use crate::storage::{ArchiveFs, OutputHandle};

#[derive(Debug, Default)]
struct MemoryState {
    dirs: BTreeSet<PathBuf>,
    files: BTreeMap<PathBuf, Vec<u8>>,
    read_only: BTreeSet<PathBuf>,
}

/// In-memory filesystem. Clones share the same state.
#[derive(Debug, Default, Clone)]
pub struct MemoryFs {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filesystem with `root` and all its ancestors already present
    pub fn with_root(root: impl AsRef<Path>) -> Self {
        let fs = Self::new();
        fs.lock().add_dir_all(root.as_ref());
        fs
    }

    /// Make `open_for_write` fail for anything at or below `path`
    pub fn deny_writes(&self, path: impl Into<PathBuf>) {
        self.lock().read_only.insert(path.into());
    }

    pub fn file(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        self.lock().files.get(path.as_ref()).cloned()
    }

    pub fn files(&self) -> BTreeMap<PathBuf, Vec<u8>> {
        self.lock().files.clone()
    }

    pub fn has_dir(&self, path: impl AsRef<Path>) -> bool {
        self.lock().dirs.contains(path.as_ref())
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        // A panicking writer cannot leave the maps half-updated
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl MemoryState {
    fn add_dir_all(&mut self, path: &Path) {
        for ancestor in path.ancestors() {
            if ancestor.as_os_str().is_empty() {
                continue;
            }
            self.dirs.insert(ancestor.to_path_buf());
        }
    }

    fn parent_exists(&self, path: &Path) -> bool {
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => self.dirs.contains(parent),
            _ => true,
        }
    }
}

#[async_trait::async_trait]
impl ArchiveFs for MemoryFs {
    async fn exists(&self, path: &Path) -> bool {
        let state = self.lock();
        state.dirs.contains(path) || state.files.contains_key(path)
    }

    async fn create_directories(&self, path: &Path) -> io::Result<()> {
        let mut state = self.lock();
        if state.read_only.iter().any(|p| path.starts_with(p)) {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only location"));
        }
        state.add_dir_all(path);
        Ok(())
    }

    async fn open_for_write(&self, path: &Path) -> io::Result<OutputHandle> {
        let mut state = self.lock();
        if state.read_only.iter().any(|p| path.starts_with(p)) {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only location"));
        }
        if !state.parent_exists(path) {
            return Err(io::Error::new(io::ErrorKind::NotFound, "parent directory missing"));
        }
        state.files.insert(path.to_path_buf(), Vec::new());

        Ok(Box::new(MemoryFile {
            state: Arc::clone(&self.state),
            path: path.to_path_buf(),
        }))
    }
}

struct MemoryFile {
    state: Arc<Mutex<MemoryState>>,
    path: PathBuf,
}

impl AsyncWrite for MemoryFile {
    fn poll_write(self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        state.files.entry(self.path.clone()).or_default().extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn writes_land_in_shared_state() {
        let fs = MemoryFs::with_root("/out");
        let view = fs.clone();

        let mut handle = fs.open_for_write(Path::new("/out/a.txt")).await.unwrap();
        handle.write_all(b"hello").await.unwrap();
        handle.shutdown().await.unwrap();

        assert_eq!(view.file("/out/a.txt").unwrap(), b"hello");
        assert!(view.exists(Path::new("/out/a.txt")).await);
        assert!(view.has_dir("/out"));
    }

    #[tokio::test]
    async fn open_requires_parent_and_honors_denials() {
        let fs = MemoryFs::with_root("/out");
        assert!(fs.open_for_write(Path::new("/out/sub/a.txt")).await.is_err());

        fs.create_directories(Path::new("/out/sub")).await.unwrap();
        assert!(fs.open_for_write(Path::new("/out/sub/a.txt")).await.is_ok());

        fs.deny_writes("/out/locked");
        assert!(fs.create_directories(Path::new("/out/locked/x")).await.is_err());
        assert!(fs.open_for_write(Path::new("/out/locked")).await.is_err());
    }
}
