use tokio::io::AsyncRead;
use tracing::{debug, trace};

use crate::protocol::{Corruption, Result, MAX_TREE_NODES, NODE_INTERNAL, NODE_LEAF};
use crate::utils::io::ByteCursor;

pub type NodeId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Node {
    Leaf(u8),
    /// Left child is taken on bit 0, right child on bit 1
    Internal { left: NodeId, right: NodeId },
}

/// Outcome of feeding one bit to the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Descend(NodeId),
    Emit(u8),
}

#[derive(Debug, Clone, Copy)]
enum Side {
    Left,
    Right,
}

/// Prefix-code decode tree stored as an arena; the root is always node 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeTree {
    nodes: Vec<Node>,
}

impl CodeTree {
    pub const ROOT: NodeId = 0;

    /// Deserialize a pre-order encoded tree.
    ///
    /// Each node starts with a tag byte: `'1'` is a leaf followed by its symbol,
    /// `'0'` is an internal node followed by its left then right subtree. The
    /// walk uses an explicit stack of unfilled child slots, so a skewed tree
    /// costs heap, not call depth. On any error the partial arena is dropped
    /// and the cursor is left just past the offending byte.
    pub async fn read<R: AsyncRead + Unpin>(cursor: &mut ByteCursor<R>) -> Result<Self> {
        let start = cursor.offset();
        let mut nodes: Vec<Node> = Vec::new();
        let mut pending: Vec<(NodeId, Side)> = Vec::new();
        let mut slot: Option<(NodeId, Side)> = None;

        loop {
            if nodes.len() >= MAX_TREE_NODES {
                return Err(Corruption::TreeTooLarge { nodes: MAX_TREE_NODES }.into());
            }

            let offset = cursor.offset();
            let tag = cursor.read_u8("tree node tag").await?;
            let id = nodes.len();

            match tag {
                NODE_LEAF => {
                    let symbol = cursor.read_u8("leaf symbol").await?;
                    trace!("leaf {} = 0x{:02x}", id, symbol);
                    nodes.push(Node::Leaf(symbol));
                }
                NODE_INTERNAL => {
                    // Children are patched in once their subtrees are read
                    nodes.push(Node::Internal { left: id, right: id });
                    pending.push((id, Side::Right));
                    pending.push((id, Side::Left));
                }
                tag => return Err(Corruption::InvalidNodeTag { offset, tag }.into()),
            }

            if let Some((parent, side)) = slot {
                if let Node::Internal { left, right } = &mut nodes[parent] {
                    match side {
                        Side::Left => *left = id,
                        Side::Right => *right = id,
                    }
                }
            }

            match pending.pop() {
                Some(next) => slot = Some(next),
                None => break,
            }
        }

        let tree = Self { nodes };
        debug!(
            "decode tree read: {} nodes, {} leaves, {} header bytes",
            tree.len(),
            tree.leaf_count(),
            cursor.offset() - start
        );
        Ok(tree)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> Node {
        self.nodes[id]
    }

    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|n| matches!(n, Node::Leaf(_))).count()
    }

    /// Symbol of a single-leaf tree, where every code has length zero
    pub fn root_symbol(&self) -> Option<u8> {
        match self.nodes.first() {
            Some(Node::Leaf(symbol)) => Some(*symbol),
            _ => None,
        }
    }

    /// Longest code length in bits
    pub fn height(&self) -> usize {
        let mut max = 0;
        let mut stack = vec![(Self::ROOT, 0usize)];
        while let Some((id, depth)) = stack.pop() {
            match self.nodes[id] {
                Node::Leaf(_) => max = max.max(depth),
                Node::Internal { left, right } => {
                    stack.push((left, depth + 1));
                    stack.push((right, depth + 1));
                }
            }
        }
        max
    }

    /// Advance from `at` by one bit.
    ///
    /// A single-leaf tree emits its symbol for every bit, so each symbol still
    /// costs exactly one payload bit.
    pub fn step(&self, at: NodeId, bit: u8) -> Step {
        let child = match self.nodes[at] {
            Node::Leaf(symbol) => return Step::Emit(symbol),
            Node::Internal { left, right } => match bit {
                0 => left,
                1 => right,
                other => unreachable!("bit value {} outside {{0, 1}}", other),
            },
        };

        match self.nodes[child] {
            Node::Leaf(symbol) => Step::Emit(symbol),
            Node::Internal { .. } => Step::Descend(child),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::DecodeError;

    async fn parse(bytes: &[u8]) -> Result<CodeTree> {
        let mut cursor = ByteCursor::new(bytes, "tree.huf");
        CodeTree::read(&mut cursor).await
    }

    fn decode_bits(tree: &CodeTree, bits: &[u8]) -> Vec<u8> {
        let mut at = CodeTree::ROOT;
        let mut out = Vec::new();
        for &bit in bits {
            match tree.step(at, bit) {
                Step::Descend(next) => at = next,
                Step::Emit(symbol) => {
                    out.push(symbol);
                    at = CodeTree::ROOT;
                }
            }
        }
        out
    }

    #[tokio::test]
    async fn reads_three_symbol_tree() {
        // a -> 0, b -> 10, c -> 11
        let tree = parse(b"01a01b1c").await.unwrap();
        assert_eq!(tree.len(), 5);
        assert_eq!(tree.leaf_count(), 3);
        assert_eq!(tree.height(), 2);
        assert_eq!(tree.root_symbol(), None);
        assert_eq!(decode_bits(&tree, &[0, 1, 0, 1, 1, 0]), b"abca".to_vec());
    }

    #[tokio::test]
    async fn stops_exactly_after_tree() {
        let bytes = b"01x1y\x02\x00";
        let mut cursor = ByteCursor::new(&bytes[..], "tree.huf");
        CodeTree::read(&mut cursor).await.unwrap();
        assert_eq!(cursor.offset(), 5);
        assert_eq!(cursor.read_u16_le("file count").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn leaf_symbol_may_be_a_tag_byte() {
        let tree = parse(b"01011").await.unwrap();
        assert_eq!(decode_bits(&tree, &[0, 1]), b"01".to_vec());
    }

    #[tokio::test]
    async fn single_leaf_tree_emits_once_per_bit() {
        let tree = parse(b"1z").await.unwrap();
        assert_eq!(tree.root_symbol(), Some(b'z'));
        assert_eq!(tree.height(), 0);
        assert_eq!(decode_bits(&tree, &[1, 0, 1]), b"zzz".to_vec());
    }

    #[tokio::test]
    async fn rejects_unknown_tag() {
        let err = parse(b"01a2b").await.unwrap_err();
        match err {
            DecodeError::Corrupt(Corruption::InvalidNodeTag { offset, tag }) => {
                assert_eq!(offset, 3);
                assert_eq!(tag, b'2');
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn rejects_truncated_tree() {
        let err = parse(b"001a1b").await.unwrap_err();
        assert!(matches!(
            err,
            DecodeError::Corrupt(Corruption::TruncatedHeader { field: "tree node tag", .. })
        ));

        let err = parse(b"01").await.unwrap_err();
        assert!(matches!(
            err,
            DecodeError::Corrupt(Corruption::TruncatedHeader { field: "leaf symbol", .. })
        ));
    }

    #[tokio::test]
    async fn deep_skewed_tree_parses_without_recursion() {
        // 255 internal nodes down the right spine, one leaf hanging left of each
        let mut bytes = Vec::new();
        for symbol in 0..255u8 {
            bytes.extend_from_slice(&[NODE_INTERNAL, NODE_LEAF, symbol]);
        }
        bytes.extend_from_slice(&[NODE_LEAF, 255]);

        let tree = parse(&bytes).await.unwrap();
        assert_eq!(tree.len(), MAX_TREE_NODES);
        assert_eq!(tree.leaf_count(), 256);
        assert_eq!(tree.height(), 255);

        let mut bits = vec![1u8; 255];
        assert_eq!(decode_bits(&tree, &bits), vec![255]);
        bits = vec![1, 1, 0];
        assert_eq!(decode_bits(&tree, &bits), vec![2]);
    }

    #[tokio::test]
    async fn rejects_oversized_tree() {
        let mut bytes = Vec::new();
        for _ in 0..300 {
            bytes.extend_from_slice(&[NODE_INTERNAL, NODE_LEAF, b'x']);
        }
        bytes.extend_from_slice(&[NODE_LEAF, b'y']);

        let err = parse(&bytes).await.unwrap_err();
        assert!(matches!(err, DecodeError::Corrupt(Corruption::TreeTooLarge { .. })));
    }
}
