use std::io;
use std::path::Path;

use async_trait::async_trait;
use tokio::io::AsyncWrite;

/// Writable destination for one decoded file
pub type OutputHandle = Box<dyn AsyncWrite + Send + Unpin>;

/// Filesystem operations the decoder needs from its host.
#[async_trait]
pub trait ArchiveFs: Send + Sync {
    async fn exists(&self, path: &Path) -> bool;

    async fn create_directories(&self, path: &Path) -> io::Result<()>;

    /// Create `path`, truncating any existing file
    async fn open_for_write(&self, path: &Path) -> io::Result<OutputHandle>;
}
