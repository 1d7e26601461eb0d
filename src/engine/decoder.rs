use std::path::PathBuf;

use serde::Serialize;
use tokio::io::{AsyncRead, AsyncWriteExt};
use tracing::{debug, error, info, warn};

use crate::engine::config::DecodeOptions;
use crate::engine::huffman::{CodeTree, NodeId, Step};
use crate::engine::manifest::{Manifest, ManifestEntry};
use crate::engine::progress::{DecodeEvent, ProgressSink};
use crate::protocol::{Corruption, DecodeError, Result};
use crate::storage::{ArchiveFs, OutputHandle};
use crate::utils::io::ByteCursor;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub bytes: u32,
    pub crc32: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DecodeSummary {
    pub files: Vec<FileReport>,
    pub symbols: u64,
    /// Payload bytes pulled from the input by the decoder
    pub payload_bytes: u64,
}

/// The single open output file
struct ActiveOutput {
    index: usize,
    entry: ManifestEntry,
    handle: OutputHandle,
    pending: Vec<u8>,
    crc: crc32fast::Hasher,
}

impl ActiveOutput {
    async fn flush_pending(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        self.handle
            .write_all(&self.pending)
            .await
            .map_err(|e| DecodeError::output(&self.entry.output_path, e))?;
        self.crc.update(&self.pending);
        self.pending.clear();
        Ok(())
    }

    async fn close(mut self) -> Result<(ManifestEntry, u32)> {
        self.flush_pending().await?;
        let path = &self.entry.output_path;
        self.handle.flush().await.map_err(|e| DecodeError::output(path, e))?;
        self.handle.shutdown().await.map_err(|e| DecodeError::output(path, e))?;
        Ok((self.entry, self.crc.finalize()))
    }

    /// Best-effort close after a failure; the file content is undefined
    async fn abandon(self) {
        let path = self.entry.output_path.clone();
        if let Err(e) = self.close().await {
            warn!("failed to close {:?} after error: {}", path, e);
        }
    }
}

/// Transient per-session decode state
pub struct DecodeCursor {
    node: NodeId,
    written: u32,
    next_index: usize,
    active: Option<ActiveOutput>,
}

impl DecodeCursor {
    fn new() -> Self {
        Self {
            node: CodeTree::ROOT,
            written: 0,
            next_index: 0,
            active: None,
        }
    }

    /// Queue one decoded symbol; true once the active entry's quota is met
    fn emit(&mut self, symbol: u8) -> bool {
        self.node = CodeTree::ROOT;
        match self.active.as_mut() {
            Some(active) => {
                active.pending.push(symbol);
                self.written += 1;
                self.written == active.entry.byte_count
            }
            None => false,
        }
    }

    fn active_path(&self) -> Option<PathBuf> {
        self.active.as_ref().map(|a| a.entry.output_path.clone())
    }
}

/// Streams the payload bits through the tree and splits the symbols across
/// the manifest's files.
///
/// Bits are taken most significant first. Every time a leaf is reached its
/// symbol goes to the active file; when that file has received its declared
/// byte count it is closed and the next entry is opened. Once the last entry
/// is satisfied decoding stops, whatever input remains. Running out of input
/// before that is corruption.
pub struct BitDecoder<'a, F: ?Sized, P> {
    tree: &'a CodeTree,
    manifest: Manifest,
    fs: &'a F,
    options: &'a DecodeOptions,
    progress: P,
    summary: DecodeSummary,
}

impl<'a, F, P> BitDecoder<'a, F, P>
where
    F: ArchiveFs + ?Sized,
    P: ProgressSink,
{
    pub fn new(
        tree: &'a CodeTree,
        manifest: Manifest,
        fs: &'a F,
        options: &'a DecodeOptions,
        progress: P,
    ) -> Self {
        Self {
            tree,
            manifest,
            fs,
            options,
            progress,
            summary: DecodeSummary::default(),
        }
    }

    pub async fn run<R: AsyncRead + Unpin>(mut self, input: &mut ByteCursor<R>) -> Result<DecodeSummary> {
        let mut cursor = DecodeCursor::new();
        match self.decode(input, &mut cursor).await {
            Ok(()) => Ok(self.summary),
            Err(e) => {
                if let Some(active) = cursor.active.take() {
                    active.abandon().await;
                }
                Err(e)
            }
        }
    }

    async fn decode<R: AsyncRead + Unpin>(
        &mut self,
        input: &mut ByteCursor<R>,
        cursor: &mut DecodeCursor,
    ) -> Result<()> {
        self.open_next(cursor).await?;
        if cursor.active.is_none() {
            return Ok(());
        }

        let mut buf = vec![0u8; self.options.read_buffer_size.max(1)];
        loop {
            let n = input.read_chunk(&mut buf).await?;
            if n == 0 {
                break;
            }
            self.summary.payload_bytes += n as u64;

            for &byte in &buf[..n] {
                if self.options.cancel.is_cancelled() {
                    info!("decode cancelled after {} symbols", self.summary.symbols);
                    return Err(DecodeError::Cancelled { path: cursor.active_path() });
                }

                for shift in (0..8).rev() {
                    match self.tree.step(cursor.node, (byte >> shift) & 1) {
                        Step::Descend(next) => cursor.node = next,
                        Step::Emit(symbol) => {
                            self.summary.symbols += 1;
                            if cursor.emit(symbol) {
                                self.finish_active(cursor).await?;
                                self.open_next(cursor).await?;
                                if cursor.active.is_none() {
                                    debug!("all {} entries delivered", cursor.next_index);
                                    return Ok(());
                                }
                            }
                        }
                    }
                }
            }

            if let Some(active) = cursor.active.as_mut() {
                active.flush_pending().await?;
            }
        }

        let (index, path, expected) = match cursor.active.as_ref() {
            Some(active) => (active.index, active.entry.output_path.clone(), active.entry.byte_count),
            None => return Ok(()),
        };
        let corruption = Corruption::TruncatedPayload {
            index,
            path,
            written: cursor.written,
            expected,
            remaining: self.manifest.len(),
        };
        error!("{}", corruption);
        Err(corruption.into())
    }

    /// Open the next entry, completing zero-length entries on the spot
    async fn open_next(&mut self, cursor: &mut DecodeCursor) -> Result<()> {
        while let Some(entry) = self.manifest.pop_front() {
            let index = cursor.next_index;
            cursor.next_index += 1;

            let handle = self
                .fs
                .open_for_write(&entry.output_path)
                .await
                .map_err(|e| DecodeError::output(&entry.output_path, e))?;
            info!("writing into {:?} ({} bytes)", entry.output_path, entry.byte_count);
            self.progress.notify(DecodeEvent::FileOpened {
                index,
                path: entry.output_path.clone(),
                byte_count: entry.byte_count,
            });

            cursor.node = CodeTree::ROOT;
            cursor.written = 0;
            cursor.active = Some(ActiveOutput {
                index,
                entry,
                handle,
                pending: Vec::new(),
                crc: crc32fast::Hasher::new(),
            });

            let empty = cursor.active.as_ref().map_or(false, |a| a.entry.byte_count == 0);
            if !empty {
                return Ok(());
            }
            self.finish_active(cursor).await?;
        }

        cursor.active = None;
        Ok(())
    }

    async fn finish_active(&mut self, cursor: &mut DecodeCursor) -> Result<()> {
        let Some(active) = cursor.active.take() else {
            return Ok(());
        };
        let index = active.index;
        let (entry, crc32) = active.close().await?;
        debug!("completed {:?}: {} bytes, crc32 {:08x}", entry.output_path, cursor.written, crc32);

        self.progress.notify(DecodeEvent::FileCompleted {
            index,
            path: entry.output_path.clone(),
            bytes: cursor.written,
            crc32,
        });
        self.summary.files.push(FileReport {
            path: entry.output_path,
            bytes: cursor.written,
            crc32,
        });
        cursor.written = 0;
        Ok(())
    }
}
