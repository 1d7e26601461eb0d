pub mod config;
pub mod decoder;
pub mod decompressor;
pub mod hash;
pub mod header;
pub mod huffman;
pub mod manifest;
pub mod progress;

pub use config::{CancelToken, DecodeOptions};
pub use decoder::{BitDecoder, DecodeSummary, FileReport};
pub use decompressor::*;
pub use header::{peek_header, read_header, ContainerHeader};
pub use huffman::{CodeTree, Node, Step};
pub use manifest::{Manifest, ManifestEntry, RawEntry};
pub use progress::{DecodeEvent, NoProgress, ProgressSink};
