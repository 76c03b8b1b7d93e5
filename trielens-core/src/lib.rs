//! # trielens-core
//!
//! Core logic of the trielens inspector: everything that sits between an
//! opaque content-addressed trie engine and the views rendered from it.
//!
//! This crate provides:
//! - Canonicalization of heterogeneous key/value inputs into one byte
//!   representation ([`bytes`])
//! - An ordered mirror of stored entries kept consistent with the engine
//!   across inserts, removals and bulk reloads ([`mirror`])
//! - Reconstruction of a displayable hierarchy from the engine's flat
//!   node dump, with label/tooltip derivation ([`hierarchy`])
//! - A scripting surface with a fixed capability set ([`script`])
//! - Genesis-document import ([`genesis`]) and the controlling
//!   [`session`] that ties the pieces together
//!
//! The trie engine itself is consumed through the [`engine::TrieEngine`]
//! trait; [`memory::MemoryTrie`] is the reference implementation used by
//! the CLI and the test suites.
//!
//! ## Design Principles
//!
//! 1. **Single canonical representation**: every key and value is reduced
//!    to bytes before it reaches the engine; views only ever see bytes.
//! 2. **Engine first, mirror second**: mutating operations forward to the
//!    engine before touching the mirror, so an engine rejection can never
//!    leave the two referring to different values for the same key.
//! 3. **Pure re-derivation**: the hierarchy is rebuilt from the committed
//!    node dump on every render pass; nothing is diffed or cached.

pub mod bytes;
pub mod engine;
pub mod error;
pub mod genesis;
pub mod hash;
pub mod hierarchy;
pub mod memory;
pub mod mirror;
pub mod options;
pub mod script;
pub mod session;

pub use bytes::{to_bytes, to_hex, ByteInput};
pub use engine::{
    key_nibbles, nibbles_to_string, NodeDescriptor, NodeDump, NodeHash, NodeId, NodeKind,
    TrieEngine, EMPTY_ROOT,
};
pub use error::{Error, Result};
pub use genesis::parse_genesis;
pub use hierarchy::{build_hierarchy, HierarchyNode};
pub use memory::MemoryTrie;
pub use mirror::{Entry, Mirror, RawEntries};
pub use options::{LayoutMode, RenderOptions};
pub use script::{ScriptError, ScriptSandbox};
pub use session::{ScriptRun, Session, Snapshot, StorageNodeRow, StorageView, TableRow};
