//! Rebuilds the displayable hierarchy from the engine's node dump.
//!
//! This is a pure structural transform: the dump's parent/child linkage is
//! followed as reported, children keep engine order so repeated renders of
//! unchanged data stay visually stable, and nothing is cached between
//! passes. The builder owns only label and tooltip derivation, including
//! the truncation policy for long paths and oversized values.

use crate::engine::{nibbles_to_string, NodeDescriptor, NodeDump, NodeId};

/// Longest nibble path rendered untruncated in a label.
const LABEL_PATH_MAX: usize = 15;
/// Characters kept from each end of a truncated path.
const PATH_EDGE: usize = 6;
/// Longest value rendered in full in a label, in bytes.
const LABEL_VALUE_MAX: usize = 6;
/// Longest value rendered in full in a tooltip, in bytes.
const TOOLTIP_VALUE_MAX: usize = 32;
const ELLIPSIS: &str = "...";

/// Rendering-ready projection of a node subtree. Ephemeral: rebuilt on
/// every render pass, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HierarchyNode {
    pub label: String,
    pub tooltip: String,
    pub children: Vec<HierarchyNode>,
}

/// Build the hierarchy for a dump. An empty dump yields `None`; the caller
/// renders an empty chart.
pub fn build_hierarchy(dump: &NodeDump) -> Option<HierarchyNode> {
    build_node(dump, dump.root?)
}

fn build_node(dump: &NodeDump, id: NodeId) -> Option<HierarchyNode> {
    let desc = dump.nodes.get(id)?;
    let path = effective_path(desc);
    let mut children = Vec::with_capacity(desc.children.len());
    for &child in &desc.children {
        if let Some(node) = build_node(dump, child) {
            children.push(node);
        }
    }
    Some(HierarchyNode {
        label: label_for(desc, &path),
        tooltip: tooltip_for(desc, &path),
        children,
    })
}

/// The effective nibble path: the parent nibble, when there is one,
/// prepended to the node's own partial path.
fn effective_path(desc: &NodeDescriptor) -> String {
    let mut path = String::with_capacity(desc.nibbles.len() + 1);
    if let Some(nibble) = desc.parent_nibble {
        path.push_str(&nibbles_to_string(&[nibble]));
    }
    path.push_str(&nibbles_to_string(&desc.nibbles));
    path
}

fn label_for(desc: &NodeDescriptor, path: &str) -> String {
    let shown = if path.len() > LABEL_PATH_MAX {
        format!(
            "{}{ELLIPSIS}{}",
            &path[..PATH_EDGE],
            &path[path.len() - PATH_EDGE..]
        )
    } else {
        path.to_string()
    };
    match &desc.value {
        Some(value) => {
            let rendered = if value.len() > LABEL_VALUE_MAX {
                format!("{}{ELLIPSIS}", hex::encode(&value[..LABEL_VALUE_MAX]))
            } else {
                hex::encode(value)
            };
            if shown.is_empty() {
                format!("({rendered})")
            } else {
                format!("{shown} ({rendered})")
            }
        }
        None => shown,
    }
}

fn tooltip_for(desc: &NodeDescriptor, path: &str) -> String {
    let mut out = format!("{} [{}]", desc.kind, path);
    if let Some(value) = &desc.value {
        if value.len() > TOOLTIP_VALUE_MAX {
            out.push_str(&format!(
                " = 0x{}{ELLIPSIS}",
                hex::encode(&value[..TOOLTIP_VALUE_MAX])
            ));
        } else {
            out.push_str(&format!(" = 0x{}", hex::encode(value)));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{NodeDescriptor, NodeDump, NodeKind};

    fn leaf(nibbles: Vec<u8>, parent_nibble: Option<u8>, value: Option<Vec<u8>>) -> NodeDescriptor {
        NodeDescriptor {
            kind: NodeKind::Leaf,
            hash: None,
            nibbles,
            parent_nibble,
            value,
            children: Vec::new(),
            encoded_size: 0,
        }
    }

    fn single(desc: NodeDescriptor) -> NodeDump {
        NodeDump {
            root: Some(0),
            nodes: vec![desc],
        }
    }

    #[test]
    fn empty_dump_builds_no_chart() {
        assert_eq!(build_hierarchy(&NodeDump::default()), None);
    }

    #[test]
    fn short_path_renders_unmodified() {
        let node = build_hierarchy(&single(leaf(vec![1, 2, 3, 4], None, None))).unwrap();
        assert_eq!(node.label, "1234");
    }

    #[test]
    fn path_at_limit_renders_unmodified() {
        let node = build_hierarchy(&single(leaf(vec![1; 15], None, None))).unwrap();
        assert_eq!(node.label, "111111111111111");
    }

    #[test]
    fn long_path_collapses_to_edges() {
        // A 20-character path keeps its first and last 6 characters.
        let nibbles: Vec<u8> = (0..20).map(|i| (i % 16) as u8).collect();
        let node = build_hierarchy(&single(leaf(nibbles, None, None))).unwrap();
        assert_eq!(node.label, "012345...ef0123");
        assert_eq!(node.label.len(), 6 + 3 + 6);
    }

    #[test]
    fn parent_nibble_prefixes_the_path() {
        let node = build_hierarchy(&single(leaf(vec![2, 3], Some(0xa), None))).unwrap();
        assert_eq!(node.label, "a23");
        assert_eq!(node.tooltip, "Leaf [a23]");
    }

    #[test]
    fn short_value_renders_in_full() {
        let node =
            build_hierarchy(&single(leaf(vec![1], None, Some(vec![0xde, 0xad, 0xbe, 0xef]))))
                .unwrap();
        assert_eq!(node.label, "1 (deadbeef)");
    }

    #[test]
    fn long_value_truncates_to_six_bytes() {
        let value: Vec<u8> = (0u8..10).collect();
        let node = build_hierarchy(&single(leaf(vec![1], None, Some(value)))).unwrap();
        assert_eq!(node.label, "1 (000102030405...)");
    }

    #[test]
    fn empty_path_and_no_value_is_an_empty_label() {
        let node = build_hierarchy(&single(leaf(vec![], None, None))).unwrap();
        assert_eq!(node.label, "");
    }

    #[test]
    fn tooltip_shows_full_path_and_capped_value() {
        let nibbles: Vec<u8> = (0..20).map(|i| (i % 16) as u8).collect();
        let full_path: String = "0123456789abcdef0123".into();
        let value: Vec<u8> = (0u8..40).collect();
        let node = build_hierarchy(&single(leaf(nibbles, None, Some(value.clone())))).unwrap();

        let expected = format!("Leaf [{full_path}] = 0x{}...", hex::encode(&value[..32]));
        assert_eq!(node.tooltip, expected);
    }

    #[test]
    fn tooltip_value_at_cap_shows_in_full() {
        let value = vec![0x5a; 32];
        let node = build_hierarchy(&single(leaf(vec![1], None, Some(value.clone())))).unwrap();
        assert_eq!(node.tooltip, format!("Leaf [1] = 0x{}", hex::encode(&value)));
    }

    #[test]
    fn children_keep_engine_order() {
        let mut root = leaf(vec![], None, None);
        root.kind = NodeKind::Branch;
        root.children = vec![2, 1];
        let dump = NodeDump {
            root: Some(0),
            nodes: vec![
                root,
                leaf(vec![1], Some(1), None),
                leaf(vec![2], Some(7), None),
            ],
        };
        let node = build_hierarchy(&dump).unwrap();
        let labels: Vec<_> = node.children.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec!["72", "11"]);
    }
}
