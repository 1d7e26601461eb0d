use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio::io::AsyncRead;
use tracing::{debug, info};

use crate::engine::config::DecodeOptions;
use crate::engine::decoder::{BitDecoder, FileReport};
use crate::engine::hash::HashingReader;
use crate::engine::header::read_header;
use crate::engine::progress::ProgressSink;
use crate::protocol::{DecodeError, Result};
use crate::storage::ArchiveFs;
use crate::utils::io::ByteCursor;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodeReport {
    pub archive: PathBuf,
    pub destination: PathBuf,
    pub files: Vec<FileReport>,
    pub symbols: u64,
    pub payload_bytes: u64,
    /// Bytes after the point where the last entry was satisfied
    pub trailing_bytes: u64,
    pub archive_sha256: String,
}

/// Decode a whole container from `reader` into `dest_root`.
///
/// `source` only labels errors and the report. `dest_root` must already exist.
pub async fn decompress<R, F, P>(
    reader: R,
    source: &Path,
    dest_root: &Path,
    fs: &F,
    options: &DecodeOptions,
    progress: P,
) -> Result<DecodeReport>
where
    R: AsyncRead + Unpin,
    F: ArchiveFs + ?Sized,
    P: ProgressSink,
{
    let mut cursor = ByteCursor::with_capacity(options.read_buffer_size, HashingReader::new(reader), source);

    let header = read_header(&mut cursor, dest_root, fs, options).await?;
    let summary = BitDecoder::new(&header.tree, header.manifest, fs, options, progress)
        .run(&mut cursor)
        .await?;

    let trailing_bytes = cursor.drain().await?;
    if trailing_bytes > 0 {
        debug!("ignored {} trailing bytes after the last entry", trailing_bytes);
    }
    let archive_sha256 = cursor.into_inner().finalize_hex();

    info!(
        "decoded {} file(s), {} symbols from {} payload bytes",
        summary.files.len(),
        summary.symbols,
        summary.payload_bytes
    );

    Ok(DecodeReport {
        archive: source.to_path_buf(),
        destination: dest_root.to_path_buf(),
        files: summary.files,
        symbols: summary.symbols,
        payload_bytes: summary.payload_bytes,
        trailing_bytes,
        archive_sha256,
    })
}

/// Open `archive` from the host filesystem and decode it into `dest_root`
pub async fn decompress_file<F, P>(
    archive: &Path,
    dest_root: &Path,
    fs: &F,
    options: &DecodeOptions,
    progress: P,
) -> Result<DecodeReport>
where
    F: ArchiveFs + ?Sized,
    P: ProgressSink,
{
    let file = tokio::fs::File::open(archive)
        .await
        .map_err(|e| DecodeError::input(archive, format!("couldn't be opened: {}", e)))?;
    decompress(file, archive, dest_root, fs, options, progress).await
}

/// Reject archives that do not carry `extension`
pub fn check_extension(archive: &Path, extension: &str) -> Result<()> {
    match archive.extension() {
        Some(ext) if ext == extension => Ok(()),
        _ => Err(DecodeError::input(
            archive,
            format!("expected a compressed (.{}) file", extension),
        )),
    }
}

/// `<dir>/<stem><suffix>` next to the archive
pub fn default_destination(archive: &Path, suffix: &str) -> PathBuf {
    let mut name = archive.file_stem().unwrap_or_default().to_os_string();
    name.push(suffix);
    match archive.parent() {
        Some(parent) => parent.join(name),
        None => PathBuf::from(name),
    }
}
