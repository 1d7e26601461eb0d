use std::collections::VecDeque;
use std::path::{Component, Path, PathBuf};

use serde::Serialize;
use tokio::io::AsyncRead;
use tracing::{debug, info};

use crate::protocol::{Corruption, DecodeError, Result};
use crate::storage::ArchiveFs;
use crate::utils::io::ByteCursor;

/// Manifest record exactly as stored in the header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntry {
    pub byte_count: u32,
    pub path_bytes: Vec<u8>,
}

impl RawEntry {
    pub fn relative_path(&self) -> PathBuf {
        path_from_bytes(&self.path_bytes)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestEntry {
    pub byte_count: u32,
    pub relative_path: PathBuf,
    pub output_path: PathBuf,
}

/// Output files in payload order. Entries are dequeued as their quota is met.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    entries: VecDeque<ManifestEntry>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: ManifestEntry) {
        self.entries.push_back(entry);
    }

    pub fn front(&self) -> Option<&ManifestEntry> {
        self.entries.front()
    }

    pub fn pop_front(&mut self) -> Option<ManifestEntry> {
        self.entries.pop_front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_bytes(&self) -> u64 {
        self.entries.iter().map(|e| e.byte_count as u64).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ManifestEntry> {
        self.entries.iter()
    }
}

impl FromIterator<ManifestEntry> for Manifest {
    fn from_iter<I: IntoIterator<Item = ManifestEntry>>(iter: I) -> Self {
        Self { entries: iter.into_iter().collect() }
    }
}

/// Read the file count and every `(byte count, path)` record that follows the tree.
pub async fn parse_manifest<R: AsyncRead + Unpin>(
    cursor: &mut ByteCursor<R>,
    separator: u8,
) -> Result<Vec<RawEntry>> {
    let count = cursor.read_u16_le("file count").await?;
    debug!("manifest declares {} file(s)", count);

    let mut entries = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let byte_count = cursor.read_u32_le("byte count").await?;
        let path_bytes = cursor.read_terminated(separator, "file path").await?;
        entries.push(RawEntry { byte_count, path_bytes });
    }

    Ok(entries)
}

/// Join each entry onto `dest_root` and make sure its parent directory exists.
///
/// With `confine` set, paths that could land outside `dest_root` are rejected
/// before anything is created.
pub async fn resolve_manifest<F: ArchiveFs + ?Sized>(
    raw: Vec<RawEntry>,
    dest_root: &Path,
    fs: &F,
    confine: bool,
) -> Result<Manifest> {
    if !fs.exists(dest_root).await {
        return Err(DecodeError::input(dest_root, "destination folder does not exist"));
    }

    for (index, entry) in raw.iter().enumerate() {
        if entry.path_bytes.is_empty() {
            return Err(Corruption::EmptyPath { index }.into());
        }
        let relative = entry.relative_path();
        if confine && !is_confined(&relative) {
            return Err(Corruption::UnsafePath { path: relative }.into());
        }
    }

    let mut manifest = Manifest::new();
    for entry in raw {
        let relative_path = entry.relative_path();
        let output_path = dest_root.join(&relative_path);

        if let Some(parent) = output_path.parent() {
            if !fs.exists(parent).await {
                fs.create_directories(parent)
                    .await
                    .map_err(|e| DecodeError::output(parent, e))?;
                info!("created directory {:?}", parent);
            }
        }

        manifest.push(ManifestEntry {
            byte_count: entry.byte_count,
            relative_path,
            output_path,
        });
    }

    Ok(manifest)
}

fn is_confined(path: &Path) -> bool {
    path.components().all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

#[cfg(unix)]
fn path_from_bytes(bytes: &[u8]) -> PathBuf {
    use std::os::unix::ffi::OsStrExt;
    PathBuf::from(std::ffi::OsStr::from_bytes(bytes))
}

#[cfg(not(unix))]
fn path_from_bytes(bytes: &[u8]) -> PathBuf {
    PathBuf::from(String::from_utf8_lossy(bytes).into_owned())
}
