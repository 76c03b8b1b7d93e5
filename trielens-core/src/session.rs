//! The controlling session: one engine, one mirror, one options value.
//!
//! Everything here runs to completion on a single control flow in
//! response to discrete console or script events; there is no parallelism
//! and mutating engine calls never overlap. Manual edits commit and
//! re-render immediately; script runs commit and re-render
//! unconditionally, even when the script failed partway.

use tracing::{info, warn};

use crate::bytes::{to_hex, ByteInput};
use crate::engine::{NodeHash, TrieEngine};
use crate::error::Result;
use crate::genesis;
use crate::hierarchy::{build_hierarchy, HierarchyNode};
use crate::mirror::Mirror;
use crate::options::RenderOptions;
use crate::script::{ScriptError, ScriptSandbox};

/// One line of the entry table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    /// 1-based position within the mirror.
    pub index: usize,
    pub key: String,
    pub value: String,
}

/// One line of the storage-node listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageNodeRow {
    pub hash: String,
    pub size: usize,
}

/// The internal storage-node view, produced only when enabled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageView {
    pub nodes: Vec<StorageNodeRow>,
    pub total_bytes: usize,
}

/// Everything one render pass produces.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub root: NodeHash,
    pub rows: Vec<TableRow>,
    pub chart: Option<HierarchyNode>,
    pub storage: Option<StorageView>,
}

/// Outcome of a script run: the commit and snapshot always happen, the
/// script itself may have failed partway through.
#[derive(Debug)]
pub struct ScriptRun {
    pub script_error: Option<ScriptError>,
    pub root: NodeHash,
    pub snapshot: Snapshot,
}

/// The single-threaded controlling session.
#[derive(Debug)]
pub struct Session<E> {
    mirror: Mirror<E>,
    pub options: RenderOptions,
}

impl<E: TrieEngine> Session<E> {
    pub fn new(engine: E) -> Self {
        Self::with_options(engine, RenderOptions::default())
    }

    pub fn with_options(engine: E, options: RenderOptions) -> Self {
        Self {
            mirror: Mirror::new(engine),
            options,
        }
    }

    pub fn mirror(&self) -> &Mirror<E> {
        &self.mirror
    }

    pub fn mirror_mut(&mut self) -> &mut Mirror<E> {
        &mut self.mirror
    }

    /// Manual insert: canonicalize, insert, commit, re-render.
    pub fn insert(
        &mut self,
        key: impl Into<ByteInput>,
        value: impl Into<ByteInput>,
    ) -> Result<Snapshot> {
        self.mirror.insert(key, value)?;
        self.mirror.commit()?;
        Ok(self.render_current())
    }

    /// Manual remove: canonicalize, remove, commit, re-render.
    pub fn remove(&mut self, key: impl Into<ByteInput>) -> Result<Snapshot> {
        self.mirror.remove(key)?;
        self.mirror.commit()?;
        Ok(self.render_current())
    }

    /// Look a key up on the engine.
    pub fn get(&self, key: impl Into<ByteInput>) -> Result<Option<Vec<u8>>> {
        self.mirror.get(key)
    }

    /// Committed root of the engine.
    pub fn root(&self) -> NodeHash {
        self.mirror.engine().root()
    }

    /// Replace the entire state from a genesis document. The document is
    /// parsed and validated in full before the current state is touched.
    pub fn load_genesis(&mut self, text: &str) -> Result<Snapshot> {
        let pairs = genesis::parse_genesis(text)?;
        let root = self.mirror.bulk_load(pairs)?;
        info!(entries = self.mirror.len(), %root, "genesis import applied");
        Ok(self.render_current())
    }

    /// Run a script, then unconditionally commit and re-render on whatever
    /// state resulted. A script failure is reported in the outcome but
    /// never prevents the commit; an `Err` here means the commit itself
    /// failed.
    pub fn run_script(&mut self, source: &str) -> Result<ScriptRun> {
        let script_result = ScriptSandbox::new(&mut self.mirror).run(source);
        if let Err(err) = &script_result {
            warn!(%err, "script failed; committing partial state");
        }
        let root = self.mirror.commit()?;
        Ok(ScriptRun {
            script_error: script_result.err(),
            root,
            snapshot: self.render_current(),
        })
    }

    /// Render with the session's current options.
    pub fn render_current(&self) -> Snapshot {
        self.render(&self.options)
    }

    /// Build a snapshot of every view from the current state.
    pub fn render(&self, options: &RenderOptions) -> Snapshot {
        let rows = self
            .mirror
            .entries()
            .iter()
            .enumerate()
            .map(|(i, entry)| TableRow {
                index: i + 1,
                key: to_hex(&entry.key),
                value: format_table_value(&entry.value, options.value_truncation),
            })
            .collect();

        let dump = self.mirror.engine().db_values();
        let chart = build_hierarchy(&dump);
        let storage = options.show_storage_nodes.then(|| {
            let nodes: Vec<StorageNodeRow> = dump
                .nodes
                .iter()
                .map(|node| StorageNodeRow {
                    hash: node.hash.map(|h| h.to_hex()).unwrap_or_default(),
                    size: node.encoded_size,
                })
                .collect();
            let total_bytes = nodes.iter().map(|n| n.size).sum();
            StorageView { nodes, total_bytes }
        });

        Snapshot {
            root: self.mirror.engine().root(),
            rows,
            chart,
            storage,
        }
    }
}

/// Table rendering of a value: values longer than the threshold show the
/// first half of the threshold, an ellipsis, then the following bytes up
/// to the threshold.
fn format_table_value(value: &[u8], truncation: Option<usize>) -> String {
    match truncation {
        Some(limit) if limit > 0 && value.len() > limit => {
            let head = limit.div_ceil(2);
            let tail = limit / 2;
            format!(
                "{}...{}",
                to_hex(&value[..head]),
                to_hex(&value[head..head + tail])
            )
        }
        _ => to_hex(value),
    }
}
