//! Reference in-memory trie engine.
//!
//! A 16-ary nibble patricia trie with content-addressed commits. `commit`
//! encodes every live node deterministically, hashes each encoding with
//! SHA-256 and rebuilds the node store keyed by hash; the root hash is the
//! commitment proof. The dump consumed by the hierarchy view is decoded
//! back out of that store, so it always reflects the last commit rather
//! than live mutations.
//!
//! Node encoding (all integers big-endian):
//!
//! ```text
//! leaf:   0x01 | u16 nibble-count | packed nibbles | u32 value-len | value
//! branch: 0x02 | u16 nibble-count | packed nibbles | u8 has-value
//!         | [u32 value-len | value] | u16 child-bitmap | 32-byte child hashes
//! ```

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::engine::{
    key_nibbles, NodeDescriptor, NodeDump, NodeHash, NodeId, NodeKind, TrieEngine, EMPTY_ROOT,
};
use crate::error::{Error, Result};
use crate::hash::sha256_digest;

const TAG_LEAF: u8 = 0x01;
const TAG_BRANCH: u8 = 0x02;

/// Live (uncommitted) trie node.
#[derive(Debug, Clone)]
enum Node {
    Leaf {
        partial: Vec<u8>,
        value: Vec<u8>,
    },
    Branch {
        partial: Vec<u8>,
        value: Option<Vec<u8>>,
        children: Box<[Option<Box<Node>>; 16]>,
    },
}

fn empty_children() -> Box<[Option<Box<Node>>; 16]> {
    Box::new(std::array::from_fn(|_| None))
}

/// In-memory content-addressed trie engine.
#[derive(Debug, Default)]
pub struct MemoryTrie {
    root: Option<Box<Node>>,
    /// Content-addressed store of the last commit: hash → encoded node.
    store: BTreeMap<NodeHash, Vec<u8>>,
    committed_root: NodeHash,
}

impl MemoryTrie {
    pub fn new() -> Self {
        Self {
            root: None,
            store: BTreeMap::new(),
            committed_root: EMPTY_ROOT,
        }
    }

    fn build_descriptors(
        &self,
        hash: NodeHash,
        parent_nibble: Option<u8>,
        dump: &mut NodeDump,
    ) -> Option<NodeId> {
        let Some(encoded) = self.store.get(&hash) else {
            warn!(%hash, "node missing from committed store");
            return None;
        };
        let decoded = match decode_node(encoded) {
            Ok(decoded) => decoded,
            Err(err) => {
                warn!(%hash, %err, "undecodable node in committed store");
                return None;
            }
        };
        let id = dump.nodes.len();
        dump.nodes.push(NodeDescriptor {
            kind: decoded.kind,
            hash: Some(hash),
            nibbles: decoded.nibbles,
            parent_nibble,
            value: decoded.value,
            children: Vec::new(),
            encoded_size: encoded.len(),
        });
        let mut child_ids = Vec::new();
        for (nibble, child_hash) in decoded.children {
            if let Some(child_id) = self.build_descriptors(child_hash, Some(nibble), dump) {
                child_ids.push(child_id);
            }
        }
        dump.nodes[id].children = child_ids;
        Some(id)
    }
}

impl TrieEngine for MemoryTrie {
    fn insert(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        let path = key_nibbles(key);
        let root = self.root.take();
        self.root = Some(insert_at(root, &path, value.to_vec()));
        Ok(())
    }

    fn remove(&mut self, key: &[u8]) -> Result<()> {
        // Absent keys are a silent no-op for this engine.
        let path = key_nibbles(key);
        if let Some(root) = self.root.take() {
            self.root = remove_at(root, &path);
        }
        Ok(())
    }

    fn clear(&mut self) {
        self.root = None;
        self.store.clear();
        self.committed_root = EMPTY_ROOT;
    }

    fn commit(&mut self) -> Result<NodeHash> {
        self.store.clear();
        self.committed_root = match &self.root {
            Some(node) => commit_node(node, &mut self.store),
            None => EMPTY_ROOT,
        };
        debug!(root = %self.committed_root, nodes = self.store.len(), "committed trie");
        Ok(self.committed_root)
    }

    fn root(&self) -> NodeHash {
        self.committed_root
    }

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(lookup(self.root.as_deref(), &key_nibbles(key)))
    }

    fn values(&self) -> BTreeMap<Vec<u8>, Vec<u8>> {
        let mut out = BTreeMap::new();
        if let Some(root) = self.root.as_deref() {
            collect_leaves(root, &mut Vec::new(), &mut out);
        }
        out
    }

    fn db_values(&self) -> NodeDump {
        let mut dump = NodeDump::default();
        if self.committed_root == EMPTY_ROOT {
            return dump;
        }
        dump.root = self.build_descriptors(self.committed_root, None, &mut dump);
        dump
    }
}

// ============================================================================
// Live-tree operations
// ============================================================================

fn common_prefix(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

fn insert_at(node: Option<Box<Node>>, path: &[u8], value: Vec<u8>) -> Box<Node> {
    let Some(node) = node else {
        return Box::new(Node::Leaf {
            partial: path.to_vec(),
            value,
        });
    };
    match *node {
        Node::Leaf {
            partial,
            value: existing,
        } => {
            let cp = common_prefix(&partial, path);
            if cp == partial.len() && cp == path.len() {
                // Equal key: overwrite in place.
                return Box::new(Node::Leaf { partial, value });
            }
            // Diverge: split into a branch at the common prefix.
            let mut children = empty_children();
            let mut branch_value = None;
            if cp == partial.len() {
                branch_value = Some(existing);
            } else {
                children[partial[cp] as usize] = Some(Box::new(Node::Leaf {
                    partial: partial[cp + 1..].to_vec(),
                    value: existing,
                }));
            }
            if cp == path.len() {
                branch_value = Some(value);
            } else {
                children[path[cp] as usize] = Some(Box::new(Node::Leaf {
                    partial: path[cp + 1..].to_vec(),
                    value,
                }));
            }
            Box::new(Node::Branch {
                partial: path[..cp].to_vec(),
                value: branch_value,
                children,
            })
        }
        Node::Branch {
            partial,
            value: branch_value,
            mut children,
        } => {
            let cp = common_prefix(&partial, path);
            if cp == partial.len() {
                if cp == path.len() {
                    return Box::new(Node::Branch {
                        partial,
                        value: Some(value),
                        children,
                    });
                }
                let idx = path[cp] as usize;
                let child = children[idx].take();
                children[idx] = Some(insert_at(child, &path[cp + 1..], value));
                return Box::new(Node::Branch {
                    partial,
                    value: branch_value,
                    children,
                });
            }
            // Split the branch at the divergence point.
            let mut split = empty_children();
            split[partial[cp] as usize] = Some(Box::new(Node::Branch {
                partial: partial[cp + 1..].to_vec(),
                value: branch_value,
                children,
            }));
            let mut new_value = None;
            if cp == path.len() {
                new_value = Some(value);
            } else {
                split[path[cp] as usize] = Some(Box::new(Node::Leaf {
                    partial: path[cp + 1..].to_vec(),
                    value,
                }));
            }
            Box::new(Node::Branch {
                partial: path[..cp].to_vec(),
                value: new_value,
                children: split,
            })
        }
    }
}

fn remove_at(node: Box<Node>, path: &[u8]) -> Option<Box<Node>> {
    match *node {
        Node::Leaf { partial, value } => {
            if partial == path {
                None
            } else {
                Some(Box::new(Node::Leaf { partial, value }))
            }
        }
        Node::Branch {
            partial,
            value,
            mut children,
        } => {
            if path.len() < partial.len() || path[..partial.len()] != partial[..] {
                return Some(Box::new(Node::Branch {
                    partial,
                    value,
                    children,
                }));
            }
            let rest = &path[partial.len()..];
            let value = if rest.is_empty() {
                None
            } else {
                let idx = rest[0] as usize;
                if let Some(child) = children[idx].take() {
                    children[idx] = remove_at(child, &rest[1..]);
                }
                value
            };
            normalize(partial, value, children)
        }
    }
}

/// Restore branch invariants after a removal: a branch with a single child
/// and no value collapses into the child; a branch with only a value
/// becomes a leaf; an empty branch disappears.
fn normalize(
    partial: Vec<u8>,
    value: Option<Vec<u8>>,
    mut children: Box<[Option<Box<Node>>; 16]>,
) -> Option<Box<Node>> {
    let child_count = children.iter().filter(|c| c.is_some()).count();
    match (value, child_count) {
        (None, 0) => None,
        (Some(value), 0) => Some(Box::new(Node::Leaf { partial, value })),
        (None, 1) => {
            let (idx, child) = children
                .iter_mut()
                .enumerate()
                .find_map(|(i, slot)| slot.take().map(|c| (i, c)))?;
            let mut merged = partial;
            merged.push(idx as u8);
            Some(Box::new(match *child {
                Node::Leaf {
                    partial: child_partial,
                    value,
                } => {
                    merged.extend_from_slice(&child_partial);
                    Node::Leaf {
                        partial: merged,
                        value,
                    }
                }
                Node::Branch {
                    partial: child_partial,
                    value,
                    children,
                } => {
                    merged.extend_from_slice(&child_partial);
                    Node::Branch {
                        partial: merged,
                        value,
                        children,
                    }
                }
            }))
        }
        (value, _) => Some(Box::new(Node::Branch {
            partial,
            value,
            children,
        })),
    }
}

fn lookup(node: Option<&Node>, path: &[u8]) -> Option<Vec<u8>> {
    match node? {
        Node::Leaf { partial, value } => (partial[..] == *path).then(|| value.clone()),
        Node::Branch {
            partial,
            value,
            children,
        } => {
            if path.len() < partial.len() || path[..partial.len()] != partial[..] {
                return None;
            }
            let rest = &path[partial.len()..];
            if rest.is_empty() {
                value.clone()
            } else {
                lookup(children[rest[0] as usize].as_deref(), &rest[1..])
            }
        }
    }
}

fn collect_leaves(node: &Node, prefix: &mut Vec<u8>, out: &mut BTreeMap<Vec<u8>, Vec<u8>>) {
    match node {
        Node::Leaf { partial, value } => {
            prefix.extend_from_slice(partial);
            out.insert(nibbles_to_key(prefix), value.clone());
            prefix.truncate(prefix.len() - partial.len());
        }
        Node::Branch {
            partial,
            value,
            children,
        } => {
            prefix.extend_from_slice(partial);
            if let Some(value) = value {
                out.insert(nibbles_to_key(prefix), value.clone());
            }
            for (i, child) in children.iter().enumerate() {
                if let Some(child) = child {
                    prefix.push(i as u8);
                    collect_leaves(child, prefix, out);
                    prefix.pop();
                }
            }
            prefix.truncate(prefix.len() - partial.len());
        }
    }
}

fn nibbles_to_key(nibbles: &[u8]) -> Vec<u8> {
    nibbles
        .chunks(2)
        .map(|pair| {
            if pair.len() == 2 {
                (pair[0] << 4) | pair[1]
            } else {
                pair[0] << 4
            }
        })
        .collect()
}

// ============================================================================
// Node codec
// ============================================================================

fn commit_node(node: &Node, store: &mut BTreeMap<NodeHash, Vec<u8>>) -> NodeHash {
    let encoded = match node {
        Node::Leaf { partial, value } => encode_leaf(partial, value),
        Node::Branch {
            partial,
            value,
            children,
        } => {
            let mut child_hashes = Vec::new();
            for (i, child) in children.iter().enumerate() {
                if let Some(child) = child {
                    child_hashes.push((i as u8, commit_node(child, store)));
                }
            }
            encode_branch(partial, value.as_deref(), &child_hashes)
        }
    };
    let hash = NodeHash(sha256_digest(&encoded));
    store.insert(hash, encoded);
    hash
}

fn push_nibbles(out: &mut Vec<u8>, nibbles: &[u8]) {
    out.extend_from_slice(&(nibbles.len() as u16).to_be_bytes());
    for pair in nibbles.chunks(2) {
        let lo = if pair.len() == 2 { pair[1] } else { 0 };
        out.push((pair[0] << 4) | lo);
    }
}

fn push_value(out: &mut Vec<u8>, value: &[u8]) {
    out.extend_from_slice(&(value.len() as u32).to_be_bytes());
    out.extend_from_slice(value);
}

fn encode_leaf(partial: &[u8], value: &[u8]) -> Vec<u8> {
    let mut out = vec![TAG_LEAF];
    push_nibbles(&mut out, partial);
    push_value(&mut out, value);
    out
}

fn encode_branch(partial: &[u8], value: Option<&[u8]>, children: &[(u8, NodeHash)]) -> Vec<u8> {
    let mut out = vec![TAG_BRANCH];
    push_nibbles(&mut out, partial);
    match value {
        Some(value) => {
            out.push(1);
            push_value(&mut out, value);
        }
        None => out.push(0),
    }
    let mut bitmap: u16 = 0;
    for (i, _) in children {
        bitmap |= 1 << i;
    }
    out.extend_from_slice(&bitmap.to_be_bytes());
    for (_, hash) in children {
        out.extend_from_slice(hash.as_bytes());
    }
    out
}

struct DecodedNode {
    kind: NodeKind,
    nibbles: Vec<u8>,
    value: Option<Vec<u8>>,
    children: Vec<(u8, NodeHash)>,
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.buf.len())
            .ok_or_else(|| Error::engine("truncated node encoding"))?;
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16> {
        let raw = self.take(2)?;
        Ok(u16::from_be_bytes([raw[0], raw[1]]))
    }

    fn u32(&mut self) -> Result<u32> {
        let raw = self.take(4)?;
        Ok(u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]))
    }
}

fn read_nibbles(reader: &mut Reader<'_>) -> Result<Vec<u8>> {
    let count = reader.u16()? as usize;
    let packed = reader.take(count.div_ceil(2))?;
    let mut nibbles = Vec::with_capacity(count);
    for i in 0..count {
        let byte = packed[i / 2];
        nibbles.push(if i % 2 == 0 { byte >> 4 } else { byte & 0x0f });
    }
    Ok(nibbles)
}

fn read_value(reader: &mut Reader<'_>) -> Result<Vec<u8>> {
    let len = reader.u32()? as usize;
    Ok(reader.take(len)?.to_vec())
}

fn decode_node(bytes: &[u8]) -> Result<DecodedNode> {
    let mut reader = Reader { buf: bytes, pos: 0 };
    match reader.u8()? {
        TAG_LEAF => {
            let nibbles = read_nibbles(&mut reader)?;
            let value = read_value(&mut reader)?;
            Ok(DecodedNode {
                kind: NodeKind::Leaf,
                nibbles,
                value: Some(value),
                children: Vec::new(),
            })
        }
        TAG_BRANCH => {
            let nibbles = read_nibbles(&mut reader)?;
            let value = match reader.u8()? {
                0 => None,
                _ => Some(read_value(&mut reader)?),
            };
            let bitmap = reader.u16()?;
            let mut children = Vec::new();
            for i in 0..16u8 {
                if bitmap & (1 << i) != 0 {
                    let mut hash = [0u8; 32];
                    hash.copy_from_slice(reader.take(32)?);
                    children.push((i, NodeHash(hash)));
                }
            }
            Ok(DecodedNode {
                kind: NodeKind::Branch,
                nibbles,
                value,
                children,
            })
        }
        tag => Err(Error::engine(format!("unknown node tag {tag:#04x}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trie_with(pairs: &[(&[u8], &[u8])]) -> MemoryTrie {
        let mut trie = MemoryTrie::new();
        for (key, value) in pairs {
            trie.insert(key, value).unwrap();
        }
        trie
    }

    #[test]
    fn insert_get_roundtrip() {
        let trie = trie_with(&[(&[0x12, 0x34], &[0xab, 0xcd, 0xef])]);
        assert_eq!(
            trie.get(&[0x12, 0x34]).unwrap(),
            Some(vec![0xab, 0xcd, 0xef])
        );
        assert_eq!(trie.get(&[0x12, 0x35]).unwrap(), None);
    }

    #[test]
    fn reinsert_overwrites_value() {
        let mut trie = trie_with(&[(&[0x12, 0x34], &[0xab])]);
        trie.insert(&[0x12, 0x34], &[0x99]).unwrap();
        assert_eq!(trie.get(&[0x12, 0x34]).unwrap(), Some(vec![0x99]));
        assert_eq!(trie.values().len(), 1);
    }

    #[test]
    fn diverging_keys_split_into_branch() {
        let trie = trie_with(&[(&[0x12, 0x34], &[1]), (&[0x12, 0xff], &[2])]);
        assert_eq!(trie.get(&[0x12, 0x34]).unwrap(), Some(vec![1]));
        assert_eq!(trie.get(&[0x12, 0xff]).unwrap(), Some(vec![2]));
    }

    #[test]
    fn prefix_key_lands_on_branch_value() {
        let trie = trie_with(&[(&[0x12], &[1]), (&[0x12, 0x34], &[2])]);
        assert_eq!(trie.get(&[0x12]).unwrap(), Some(vec![1]));
        assert_eq!(trie.get(&[0x12, 0x34]).unwrap(), Some(vec![2]));
    }

    #[test]
    fn remove_merges_structure_back() {
        let mut a = trie_with(&[(&[0x12, 0x34], &[1])]);
        let root_single = a.commit().unwrap();

        a.insert(&[0x12, 0xff], &[2]).unwrap();
        a.commit().unwrap();
        a.remove(&[0x12, 0xff]).unwrap();
        let root_after_remove = a.commit().unwrap();

        // Removing the second key restores the exact single-leaf commitment.
        assert_eq!(root_single, root_after_remove);
    }

    #[test]
    fn remove_branch_value_keeps_children() {
        let mut trie = trie_with(&[(&[0x12], &[1]), (&[0x12, 0x34], &[2]), (&[0x12, 0x35], &[3])]);
        trie.remove(&[0x12]).unwrap();
        assert_eq!(trie.get(&[0x12]).unwrap(), None);
        assert_eq!(trie.get(&[0x12, 0x34]).unwrap(), Some(vec![2]));
        assert_eq!(trie.get(&[0x12, 0x35]).unwrap(), Some(vec![3]));
    }

    #[test]
    fn remove_absent_key_is_a_noop() {
        let mut trie = trie_with(&[(&[0x12, 0x34], &[1])]);
        trie.remove(&[0x99]).unwrap();
        trie.remove(&[0x12, 0x34, 0x56]).unwrap();
        assert_eq!(trie.get(&[0x12, 0x34]).unwrap(), Some(vec![1]));
    }

    #[test]
    fn commit_is_order_independent() {
        let pairs: &[(&[u8], &[u8])] = &[
            (&[0x12, 0x34], &[1]),
            (&[0x12, 0xff], &[2]),
            (&[0x99], &[3]),
            (&[0x12], &[4]),
        ];
        let mut forward = trie_with(pairs);
        let reversed: Vec<_> = pairs.iter().rev().cloned().collect();
        let mut backward = trie_with(&reversed);
        assert_eq!(forward.commit().unwrap(), backward.commit().unwrap());
    }

    #[test]
    fn empty_trie_commits_to_empty_root() {
        let mut trie = MemoryTrie::new();
        assert_eq!(trie.commit().unwrap(), EMPTY_ROOT);
        assert!(trie.db_values().is_empty());
    }

    #[test]
    fn clear_resets_committed_state() {
        let mut trie = trie_with(&[(&[0x12], &[1])]);
        trie.commit().unwrap();
        trie.clear();
        assert_eq!(trie.root(), EMPTY_ROOT);
        assert!(trie.values().is_empty());
        assert!(trie.db_values().is_empty());
    }

    #[test]
    fn values_returns_leaf_mapping() {
        let trie = trie_with(&[(&[0x12], &[1]), (&[0x12, 0x34], &[2]), (&[0xff], &[3])]);
        let values = trie.values();
        assert_eq!(values.len(), 3);
        assert_eq!(values[&vec![0x12u8]], vec![1]);
        assert_eq!(values[&vec![0x12u8, 0x34]], vec![2]);
        assert_eq!(values[&vec![0xffu8]], vec![3]);
    }

    #[test]
    fn dump_reflects_committed_structure() {
        let mut trie = trie_with(&[(&[0x12, 0x34], &[1]), (&[0x12, 0xff], &[2])]);
        trie.commit().unwrap();

        let dump = trie.db_values();
        let root = &dump.nodes[dump.root.unwrap()];
        assert_eq!(root.kind, NodeKind::Branch);
        // Shared prefix 0x12 plus nothing further until the diverging nibble.
        assert_eq!(root.nibbles, vec![1, 2]);
        assert_eq!(root.parent_nibble, None);
        assert_eq!(root.children.len(), 2);

        let first = &dump.nodes[root.children[0]];
        assert_eq!(first.kind, NodeKind::Leaf);
        assert_eq!(first.parent_nibble, Some(3));
        assert_eq!(first.nibbles, vec![4]);
        assert_eq!(first.value, Some(vec![1]));

        let second = &dump.nodes[root.children[1]];
        assert_eq!(second.parent_nibble, Some(0xf));
        assert_eq!(second.nibbles, vec![0xf]);
        assert_eq!(second.value, Some(vec![2]));
    }

    #[test]
    fn dump_lags_live_mutations_until_commit() {
        let mut trie = trie_with(&[(&[0x12], &[1])]);
        trie.commit().unwrap();
        trie.insert(&[0x34], &[2]).unwrap();

        // Still the single committed leaf.
        assert_eq!(trie.db_values().nodes.len(), 1);
        trie.commit().unwrap();
        assert_eq!(trie.db_values().nodes.len(), 3);
    }

    #[test]
    fn codec_roundtrips_leaf_and_branch() {
        let leaf = encode_leaf(&[1, 2, 3], &[0xaa, 0xbb]);
        let decoded = decode_node(&leaf).unwrap();
        assert_eq!(decoded.kind, NodeKind::Leaf);
        assert_eq!(decoded.nibbles, vec![1, 2, 3]);
        assert_eq!(decoded.value, Some(vec![0xaa, 0xbb]));
        assert!(decoded.children.is_empty());

        let child = NodeHash([7u8; 32]);
        let branch = encode_branch(&[0xf], Some(&[0x01]), &[(4, child), (0xf, child)]);
        let decoded = decode_node(&branch).unwrap();
        assert_eq!(decoded.kind, NodeKind::Branch);
        assert_eq!(decoded.nibbles, vec![0xf]);
        assert_eq!(decoded.value, Some(vec![0x01]));
        assert_eq!(decoded.children, vec![(4, child), (0xf, child)]);
    }

    #[test]
    fn decode_rejects_truncated_input() {
        let mut leaf = encode_leaf(&[1, 2], &[0xaa, 0xbb, 0xcc]);
        leaf.truncate(leaf.len() - 2);
        assert!(decode_node(&leaf).is_err());
        assert!(decode_node(&[0x7f]).is_err());
    }
}
