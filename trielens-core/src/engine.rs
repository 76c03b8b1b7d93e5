//! Trie engine contract and node-dump types.
//!
//! The inspector consumes the engine as a black box through the
//! [`TrieEngine`] trait; [`MemoryTrie`](crate::memory::MemoryTrie) is the
//! reference implementation. The dump types model the flat collection of
//! committed internal nodes that every render pass is rebuilt from.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::Result;

/// 32-byte content hash of an encoded trie node; also the commitment root.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeHash(pub [u8; 32]);

/// Root hash of the empty trie.
pub const EMPTY_ROOT: NodeHash = NodeHash([0u8; 32]);

impl NodeHash {
    /// The raw hash bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex rendering.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for NodeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Index of a descriptor within a [`NodeDump`].
pub type NodeId = usize;

/// Tag of a committed trie node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Empty,
    Leaf,
    Branch,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            NodeKind::Empty => "Empty",
            NodeKind::Leaf => "Leaf",
            NodeKind::Branch => "Branch",
        };
        f.write_str(tag)
    }
}

/// One committed trie node as reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeDescriptor {
    pub kind: NodeKind,
    /// Content hash under which the node is stored.
    pub hash: Option<NodeHash>,
    /// Partial nibble path carried on the node itself (each `0..=15`).
    pub nibbles: Vec<u8>,
    /// Child index under the parent branch; absent on the root.
    pub parent_nibble: Option<u8>,
    pub value: Option<Vec<u8>>,
    /// Children as indices into the dump, in engine-reported order.
    pub children: Vec<NodeId>,
    /// Size in bytes of the node's stored encoding.
    pub encoded_size: usize,
}

/// Flat dump of the committed node graph.
///
/// Descriptors form a single rooted, acyclic parent→child structure
/// reachable from `root`. An empty trie dumps with no root and no nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeDump {
    pub root: Option<NodeId>,
    pub nodes: Vec<NodeDescriptor>,
}

impl NodeDump {
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }
}

/// Contract of the external content-addressed trie engine.
///
/// All calls are synchronous and non-reentrant; the inspector never issues
/// an overlapping mutating call. Engine rejections are propagated to the
/// caller unmodified; operations are local and deterministic, so no layer
/// above adds retry logic.
pub trait TrieEngine {
    fn insert(&mut self, key: &[u8], value: &[u8]) -> Result<()>;

    /// Removing an absent key is the engine's choice of no-op or error;
    /// callers must tolerate either.
    fn remove(&mut self, key: &[u8]) -> Result<()>;

    fn clear(&mut self);

    /// Persist pending mutations; returns the new commitment root.
    fn commit(&mut self) -> Result<NodeHash>;

    /// Root of the last commit.
    fn root(&self) -> NodeHash;

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Stored leaf key → value mapping.
    fn values(&self) -> BTreeMap<Vec<u8>, Vec<u8>>;

    /// Flat dump of the committed internal nodes.
    fn db_values(&self) -> NodeDump;
}

/// Expand a byte key into its nibble path, high nibble first.
pub fn key_nibbles(key: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(key.len() * 2);
    for byte in key {
        out.push(byte >> 4);
        out.push(byte & 0x0f);
    }
    out
}

/// Render a nibble sequence as hex characters.
pub fn nibbles_to_string(nibbles: &[u8]) -> String {
    nibbles
        .iter()
        .map(|n| char::from_digit(u32::from(*n), 16).unwrap_or('?'))
        .collect()
}
