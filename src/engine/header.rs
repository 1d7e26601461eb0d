use std::path::Path;

use tokio::io::AsyncRead;
use tracing::info;

use crate::engine::config::DecodeOptions;
use crate::engine::huffman::CodeTree;
use crate::engine::manifest::{parse_manifest, resolve_manifest, Manifest, RawEntry};
use crate::protocol::Result;
use crate::storage::ArchiveFs;
use crate::utils::io::ByteCursor;

/// Everything in front of the payload
#[derive(Debug, Clone)]
pub struct ContainerHeader {
    pub tree: CodeTree,
    pub manifest: Manifest,
}

/// Parse tree and manifest, resolving output paths under `dest_root` and
/// creating any missing parent directories.
pub async fn read_header<R, F>(
    cursor: &mut ByteCursor<R>,
    dest_root: &Path,
    fs: &F,
    options: &DecodeOptions,
) -> Result<ContainerHeader>
where
    R: AsyncRead + Unpin,
    F: ArchiveFs + ?Sized,
{
    let tree = CodeTree::read(cursor).await?;
    let raw = parse_manifest(cursor, options.path_separator).await?;
    let manifest = resolve_manifest(raw, dest_root, fs, options.confine_paths).await?;

    info!(
        "header read: {} tree nodes, {} file(s), {} bytes to decode, payload at offset {}",
        tree.len(),
        manifest.len(),
        manifest.total_bytes(),
        cursor.offset()
    );

    Ok(ContainerHeader { tree, manifest })
}

/// Parse tree and manifest without touching any filesystem
pub async fn peek_header<R: AsyncRead + Unpin>(
    cursor: &mut ByteCursor<R>,
    separator: u8,
) -> Result<(CodeTree, Vec<RawEntry>)> {
    let tree = CodeTree::read(cursor).await?;
    let raw = parse_manifest(cursor, separator).await?;
    Ok((tree, raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Corruption, DecodeError, PATH_SEPARATOR};
    use crate::storage::MemoryFs;

    fn container(tree: &[u8], entries: &[(u32, &[u8])], payload: &[u8]) -> Vec<u8> {
        let mut out = tree.to_vec();
        out.extend_from_slice(&(entries.len() as u16).to_le_bytes());
        for (count, path) in entries {
            out.extend_from_slice(&count.to_le_bytes());
            out.extend_from_slice(path);
            out.push(PATH_SEPARATOR);
        }
        out.extend_from_slice(payload);
        out
    }

    #[tokio::test]
    async fn header_leaves_cursor_at_payload() {
        let bytes = container(b"01a01b1c", &[(2, b"f1.txt"), (1, b"sub/f2.txt")], &[0x20]);
        let fs = MemoryFs::with_root("/out");
        let mut cursor = ByteCursor::new(&bytes[..], "x.huf");

        let header = read_header(&mut cursor, Path::new("/out"), &fs, &DecodeOptions::default())
            .await
            .unwrap();

        assert_eq!(header.tree.leaf_count(), 3);
        assert_eq!(header.manifest.len(), 2);
        assert!(fs.has_dir("/out/sub"));
        assert_eq!(cursor.offset(), bytes.len() as u64 - 1);
    }

    #[tokio::test]
    async fn bad_tree_creates_nothing() {
        let bytes = container(b"01a0xb1c", &[(1, b"dir/f.txt")], &[0x00]);
        let fs = MemoryFs::with_root("/out");
        let mut cursor = ByteCursor::new(&bytes[..], "x.huf");

        let err = read_header(&mut cursor, Path::new("/out"), &fs, &DecodeOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, DecodeError::Corrupt(Corruption::InvalidNodeTag { offset: 4, tag: b'x' })));
        assert!(!fs.has_dir("/out/dir"));
    }

    #[tokio::test]
    async fn peek_does_not_need_destination() {
        let bytes = container(b"1q", &[(9, b"only.bin")], &[]);
        let mut cursor = ByteCursor::new(&bytes[..], "x.huf");
        let (tree, raw) = peek_header(&mut cursor, PATH_SEPARATOR).await.unwrap();
        assert_eq!(tree.root_symbol(), Some(b'q'));
        assert_eq!(raw, vec![RawEntry { byte_count: 9, path_bytes: b"only.bin".to_vec() }]);
    }
}
