//! Render configuration threaded through every render pass.
//!
//! One value per session: created at session start, updated by option
//! handlers, read by every render call. It is passed explicitly rather
//! than held as ambient state.

use serde::{Deserialize, Serialize};

/// Layout mode of the hierarchy view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutMode {
    /// Nodes positioned by their depth.
    Tree,
    /// Leaves aligned at a common depth.
    Cluster,
}

/// Options every render pass reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    pub layout: LayoutMode,
    /// Horizontal spacing factor.
    pub x_scale: u32,
    /// Vertical spacing factor.
    pub y_scale: f32,
    /// Whether the internal storage-node listing is produced.
    pub show_storage_nodes: bool,
    /// Byte-length threshold above which table values are truncated;
    /// `None` disables truncation. Table display only.
    pub value_truncation: Option<usize>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            layout: LayoutMode::Tree,
            x_scale: 5,
            y_scale: 1.0,
            show_storage_nodes: false,
            value_truncation: Some(32),
        }
    }
}
