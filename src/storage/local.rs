use std::io;
use std::path::Path;

use tokio::fs;

use crate::storage::{ArchiveFs, OutputHandle};

/// Host filesystem backed by `tokio::fs`
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFs;

impl LocalFs {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl ArchiveFs for LocalFs {
    async fn exists(&self, path: &Path) -> bool {
        fs::try_exists(path).await.unwrap_or(false)
    }

    async fn create_directories(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path).await
    }

    async fn open_for_write(&self, path: &Path) -> io::Result<OutputHandle> {
        let file = fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .await?;
        Ok(Box::new(file))
    }
}
