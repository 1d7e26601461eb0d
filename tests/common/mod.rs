//! Reference encoder used only to produce containers for the decoder tests.

#![allow(dead_code)]

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use hufunzip::protocol::{NODE_INTERNAL, NODE_LEAF, PATH_SEPARATOR};

enum Tree {
    Leaf(u8),
    Internal(Box<Tree>, Box<Tree>),
}

pub struct Code {
    pub tree: Vec<u8>,
    pub codes: Vec<Option<Vec<bool>>>,
}

/// Build a prefix code over every byte in `inputs`.
///
/// One distinct symbol gives a single-leaf tree spending one bit per symbol.
pub fn build_code(inputs: &[&[u8]]) -> Code {
    let mut freq = [0u64; 256];
    for input in inputs {
        for &b in input.iter() {
            freq[b as usize] += 1;
        }
    }

    let mut arena: Vec<Option<Tree>> = Vec::new();
    let mut heap = BinaryHeap::new();
    for (symbol, &count) in freq.iter().enumerate() {
        if count > 0 {
            heap.push(Reverse((count, arena.len())));
            arena.push(Some(Tree::Leaf(symbol as u8)));
        }
    }

    if heap.is_empty() {
        heap.push(Reverse((0, 0)));
        arena.push(Some(Tree::Leaf(0)));
    }

    while heap.len() > 1 {
        let Reverse((fa, a)) = heap.pop().unwrap();
        let Reverse((fb, b)) = heap.pop().unwrap();
        let left = arena[a].take().unwrap();
        let right = arena[b].take().unwrap();
        heap.push(Reverse((fa + fb, arena.len())));
        arena.push(Some(Tree::Internal(Box::new(left), Box::new(right))));
    }

    let Reverse((_, root)) = heap.pop().unwrap();
    let root = arena[root].take().unwrap();

    let mut tree = Vec::new();
    serialize(&root, &mut tree);

    let mut codes = vec![None; 256];
    match &root {
        Tree::Leaf(symbol) => codes[*symbol as usize] = Some(vec![false]),
        Tree::Internal(..) => assign(&root, Vec::new(), &mut codes),
    }

    Code { tree, codes }
}

fn serialize(node: &Tree, out: &mut Vec<u8>) {
    match node {
        Tree::Leaf(symbol) => {
            out.push(NODE_LEAF);
            out.push(*symbol);
        }
        Tree::Internal(left, right) => {
            out.push(NODE_INTERNAL);
            serialize(left, out);
            serialize(right, out);
        }
    }
}

fn assign(node: &Tree, prefix: Vec<bool>, codes: &mut [Option<Vec<bool>>]) {
    match node {
        Tree::Leaf(symbol) => codes[*symbol as usize] = Some(prefix),
        Tree::Internal(left, right) => {
            let mut l = prefix.clone();
            l.push(false);
            assign(left, l, codes);
            let mut r = prefix;
            r.push(true);
            assign(right, r, codes);
        }
    }
}

pub fn pack_bits(bits: &[bool]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(bits.len() / 8 + 1);
    let mut current = 0u8;
    let mut count = 0;
    for &bit in bits {
        if bit {
            current |= 1 << (7 - count);
        }
        count += 1;
        if count == 8 {
            bytes.push(current);
            current = 0;
            count = 0;
        }
    }
    if count > 0 {
        bytes.push(current);
    }
    bytes
}

/// Encode `(relative path, contents)` pairs into one container
pub fn encode_container(files: &[(&[u8], &[u8])]) -> Vec<u8> {
    let contents: Vec<&[u8]> = files.iter().map(|(_, data)| *data).collect();
    let code = build_code(&contents);

    let mut out = code.tree.clone();
    out.extend_from_slice(&(files.len() as u16).to_le_bytes());
    for (path, data) in files {
        out.extend_from_slice(&(data.len() as u32).to_le_bytes());
        out.extend_from_slice(path);
        out.push(PATH_SEPARATOR);
    }

    let mut bits = Vec::new();
    for data in &contents {
        for &b in data.iter() {
            bits.extend(code.codes[b as usize].as_ref().unwrap());
        }
    }
    out.extend(pack_bits(&bits));
    out
}
