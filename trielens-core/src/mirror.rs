//! Ordered mirror of the trie's logical content.
//!
//! The mirror is what the table view renders from: an insertion-ordered
//! sequence of entries that wraps every trie-mutating call so the two can
//! never diverge. Mutations forward to the engine before touching the
//! mirror, so an engine rejection leaves the mirror untouched.
//!
//! The one exception is [`Mirror::raw`], which hands out the entry vector
//! directly for scripts that want to bypass validation. That divergence is
//! deliberate and visible in the interface.

use tracing::debug;

use crate::bytes::{self, ByteInput};
use crate::engine::{NodeHash, TrieEngine};
use crate::error::Result;

/// One stored key/value pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

/// Ordered projection of the trie's contents plus the engine it mirrors.
#[derive(Debug)]
pub struct Mirror<E> {
    engine: E,
    entries: Vec<Entry>,
}

impl<E: TrieEngine> Mirror<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            entries: Vec::new(),
        }
    }

    /// The mirrored entries in their current order.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Read access to the underlying engine (dump, root, leaf mapping).
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Empty the mirror and the engine. The engine resets immediately;
    /// a commit is still needed before the dump reflects the reset if the
    /// engine defers it.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.engine.clear();
        debug!("cleared mirror and engine");
    }

    /// Canonicalize and insert. An entry with an equal key is overwritten
    /// in place, preserving its position; otherwise the entry is appended.
    pub fn insert(&mut self, key: impl Into<ByteInput>, value: impl Into<ByteInput>) -> Result<()> {
        let key = bytes::to_bytes(key)?;
        let value = bytes::to_bytes(value)?;
        self.engine.insert(&key, &value)?;
        match self.entries.iter_mut().find(|entry| entry.key == key) {
            Some(entry) => entry.value = value,
            None => self.entries.push(Entry { key, value }),
        }
        Ok(())
    }

    /// Canonicalize and remove. The engine call is always forwarded; the
    /// mirror entry (if any) is dropped only once the engine accepts.
    pub fn remove(&mut self, key: impl Into<ByteInput>) -> Result<()> {
        let key = bytes::to_bytes(key)?;
        self.engine.remove(&key)?;
        if let Some(pos) = self.entries.iter().position(|entry| entry.key == key) {
            self.entries.remove(pos);
        }
        Ok(())
    }

    /// Forward to the engine; returns the commitment root.
    pub fn commit(&mut self) -> Result<NodeHash> {
        self.engine.commit()
    }

    /// Canonicalize and look the key up on the engine.
    pub fn get(&self, key: impl Into<ByteInput>) -> Result<Option<Vec<u8>>> {
        let key = bytes::to_bytes(key)?;
        self.engine.get(&key)
    }

    /// Replace the entire state from an import: clear, insert every pair in
    /// input order, re-sort by ascending key byte-order, commit. This is
    /// the only operation that reorders the mirror.
    pub fn bulk_load(
        &mut self,
        pairs: impl IntoIterator<Item = (ByteInput, ByteInput)>,
    ) -> Result<NodeHash> {
        self.clear();
        for (key, value) in pairs {
            self.insert(key, value)?;
        }
        self.entries.sort_by(|a, b| a.key.cmp(&b.key));
        let root = self.commit()?;
        debug!(entries = self.entries.len(), root = %root, "bulk load complete");
        Ok(root)
    }

    /// Direct mutable access to the entry sequence, bypassing the engine.
    pub fn raw(&mut self) -> RawEntries<'_> {
        RawEntries {
            entries: &mut self.entries,
        }
    }
}

/// Unguarded handle over the mirror's entry vector.
///
/// Anything done through this handle skips canonicalization and the engine
/// entirely, so the mirror can diverge from the trie until the next clear
/// or bulk reload. Power-user escape hatch; the validated [`Mirror`] API is
/// the supported path.
#[derive(Debug)]
pub struct RawEntries<'a> {
    pub entries: &'a mut Vec<Entry>,
}
