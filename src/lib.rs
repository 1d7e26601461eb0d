//! Decoder for `.huf` multi-file Huffman containers.
//!
//! A container holds a pre-order serialized decode tree, a manifest of
//! `(byte count, relative path)` entries, and an MSB-first packed bitstream.
//! [`decompress`] rebuilds every listed file under a destination folder.

pub mod config;
pub mod engine;
pub mod protocol;
pub mod storage;
pub mod utils;

pub use engine::{
    check_extension, decompress, decompress_file, default_destination, CancelToken, CodeTree,
    DecodeEvent, DecodeOptions, DecodeReport, Manifest, ManifestEntry, NoProgress, ProgressSink,
};
pub use protocol::{Corruption, DecodeError, Result};
pub use storage::{ArchiveFs, LocalFs, MemoryFs};
