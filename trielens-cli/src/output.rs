//! Terminal rendering of session snapshots.
//!
//! The entry table and storage-node table use comfy-table; the hierarchy
//! chart is drawn as an ASCII tree honoring the layout mode and the two
//! scale factors.

use comfy_table::{ContentArrangement, Table};
use trielens_core::{
    HierarchyNode, LayoutMode, RenderOptions, Snapshot, StorageView, TableRow,
};

/// Rows displayed before the entry table is cut off.
const MAX_TABLE_ROWS: usize = 300;

/// Print every view a snapshot carries.
pub fn print_snapshot(snapshot: &Snapshot, options: &RenderOptions) {
    println!("root: 0x{}", snapshot.root);
    if snapshot.rows.is_empty() {
        println!("(no entries)");
    } else {
        println!("{}", entry_table(&snapshot.rows));
        if snapshot.rows.len() > MAX_TABLE_ROWS {
            println!("... {} more entries not shown", snapshot.rows.len() - MAX_TABLE_ROWS);
        }
    }
    match &snapshot.chart {
        Some(chart) => print!("{}", render_tree(chart, options)),
        None => println!("(empty trie)"),
    }
    if let Some(storage) = &snapshot.storage {
        println!("{}", storage_table(storage));
        println!("storage size: {:.3} KB", storage.total_bytes as f64 / 1000.0);
    }
}

fn entry_table(rows: &[TableRow]) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["#", "key", "value"]);
    for row in rows.iter().take(MAX_TABLE_ROWS) {
        table.add_row(vec![row.index.to_string(), row.key.clone(), row.value.clone()]);
    }
    table
}

fn storage_table(view: &StorageView) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["#", "node", "size"]);
    for (i, node) in view.nodes.iter().enumerate() {
        table.add_row(vec![
            (i + 1).to_string(),
            node.hash.clone(),
            format!("{:.4} KB", node.size as f64 / 1000.0),
        ]);
    }
    table
}

/// Draw the hierarchy as an ASCII tree.
///
/// `x_scale` widens the horizontal connectors, `y_scale` adds blank rows
/// between siblings, and cluster layout pads leaf connectors so all
/// leaves line up at the deepest column.
pub fn render_tree(root: &HierarchyNode, options: &RenderOptions) -> String {
    let mut out = String::new();
    out.push_str(display_label(root));
    out.push('\n');
    let max_depth = depth(root);
    render_children(root, "", options, max_depth, 1, &mut out);
    out
}

fn display_label(node: &HierarchyNode) -> &str {
    if node.label.is_empty() {
        "*"
    } else {
        &node.label
    }
}

fn depth(node: &HierarchyNode) -> usize {
    1 + node
        .children
        .iter()
        .map(depth)
        .max()
        .unwrap_or(0)
}

fn render_children(
    node: &HierarchyNode,
    prefix: &str,
    options: &RenderOptions,
    max_depth: usize,
    level: usize,
    out: &mut String,
) {
    let unit = options.x_scale.max(1) as usize;
    let spacer_rows = (options.y_scale.max(0.0).round() as usize).saturating_sub(1);
    let count = node.children.len();

    for (i, child) in node.children.iter().enumerate() {
        let last = i + 1 == count;

        for _ in 0..spacer_rows {
            out.push_str(prefix);
            out.push_str("|\n");
        }

        // Cluster layout: pad leaf connectors so leaves share a column.
        let extra = match options.layout {
            LayoutMode::Cluster if child.children.is_empty() => {
                max_depth.saturating_sub(level + 1) * (unit + 2)
            }
            _ => 0,
        };

        out.push_str(prefix);
        out.push_str(if last { "`" } else { "|" });
        for _ in 0..unit + extra {
            out.push('-');
        }
        out.push(' ');
        out.push_str(display_label(child));
        out.push('\n');

        let mut child_prefix = String::from(prefix);
        if last {
            for _ in 0..unit + 2 {
                child_prefix.push(' ');
            }
        } else {
            child_prefix.push('|');
            for _ in 0..unit + 1 {
                child_prefix.push(' ');
            }
        }
        render_children(child, &child_prefix, options, max_depth, level + 1, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(label: &str, children: Vec<HierarchyNode>) -> HierarchyNode {
        HierarchyNode {
            label: label.to_string(),
            tooltip: String::new(),
            children,
        }
    }

    #[test]
    fn tree_lists_children_under_the_root() {
        let root = node(
            "12",
            vec![node("34 (aa)", vec![]), node("ff (bb)", vec![])],
        );
        let rendered = render_tree(&root, &RenderOptions::default());

        let lines: Vec<_> = rendered.lines().collect();
        assert_eq!(lines[0], "12");
        assert!(lines[1].contains("34 (aa)"));
        assert!(lines[1].starts_with('|'));
        assert!(lines[2].contains("ff (bb)"));
        assert!(lines[2].starts_with('`'));
    }

    #[test]
    fn empty_label_renders_placeholder() {
        let root = node("", vec![]);
        assert_eq!(render_tree(&root, &RenderOptions::default()), "*\n");
    }

    #[test]
    fn x_scale_widens_connectors() {
        let root = node("r", vec![node("c", vec![])]);
        let mut options = RenderOptions::default();
        options.x_scale = 1;
        let narrow = render_tree(&root, &options);
        options.x_scale = 8;
        let wide = render_tree(&root, &options);
        assert!(wide.len() > narrow.len());
        assert!(wide.contains("`-------- c"));
    }

    #[test]
    fn y_scale_inserts_spacer_rows() {
        let root = node("r", vec![node("a", vec![]), node("b", vec![])]);
        let mut options = RenderOptions::default();
        options.y_scale = 2.0;
        let rendered = render_tree(&root, &options);
        assert!(rendered.lines().any(|line| line.trim() == "|"));
    }

    #[test]
    fn cluster_layout_aligns_leaves() {
        // One shallow leaf, one deep leaf: in cluster mode the shallow
        // leaf's connector stretches to the deep leaf's column.
        let root = node(
            "r",
            vec![
                node("shallow", vec![]),
                node("mid", vec![node("deep", vec![])]),
            ],
        );
        let mut options = RenderOptions::default();
        options.layout = LayoutMode::Cluster;
        let rendered = render_tree(&root, &options);

        let shallow_col = rendered
            .lines()
            .find(|l| l.contains("shallow"))
            .unwrap()
            .find("shallow")
            .unwrap();
        let deep_col = rendered
            .lines()
            .find(|l| l.contains("deep"))
            .unwrap()
            .find("deep")
            .unwrap();
        assert_eq!(shallow_col, deep_col);
    }
}
