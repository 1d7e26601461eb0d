//! Container format constants for `.huf` archives

/// Tree node tag: internal node, followed by left then right subtree
pub const NODE_INTERNAL: u8 = b'0';

/// Tree node tag: leaf, followed by one symbol byte
pub const NODE_LEAF: u8 = b'1';

/// Terminates every manifest path. Never legal inside a path segment on Windows.
pub const PATH_SEPARATOR: u8 = b'|';

/// A full binary tree over 256 symbols has 256 leaves and 255 internal nodes
pub const MAX_TREE_NODES: usize = 2 * 256 - 1;

/// Archive file extension, without the dot
pub const ARCHIVE_EXTENSION: &str = "huf";

/// Appended to the archive stem to name the default destination folder
pub const OUTPUT_SUFFIX: &str = " (decompressed)";

/// Payload read chunk
pub const READ_CHUNK_SIZE: usize = 64 * 1024;
