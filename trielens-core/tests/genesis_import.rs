//! Bulk import behavior at the session level.

use trielens_core::{MemoryTrie, Session};

const DOCUMENT: &str = r#"{
    "genesis": {
        "raw": {
            "top": {
                "0x3a636f6465": "0x0001",
                "0x26aa394eea5630e07c48ae0c9558cef7": "0xdeadbeef",
                "0x3a686561707061676573": "0x08000000"
            }
        }
    }
}"#;

fn session() -> Session<MemoryTrie> {
    Session::new(MemoryTrie::new())
}

#[test]
fn import_sorts_entries_by_key_byte_order() {
    let mut s = session();
    let snapshot = s.load_genesis(DOCUMENT).unwrap();

    let keys: Vec<_> = snapshot.rows.iter().map(|r| r.key.clone()).collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);
    assert_eq!(keys.len(), 3);
}

#[test]
fn importing_twice_is_deterministic() {
    let mut a = session();
    let first = a.load_genesis(DOCUMENT).unwrap();
    let root_first = a.root();

    a.mirror_mut().clear();
    a.mirror_mut().commit().unwrap();

    let second = a.load_genesis(DOCUMENT).unwrap();
    let root_second = a.root();

    assert_eq!(root_first, root_second);
    assert_eq!(first.rows, second.rows);
    assert_eq!(
        a.mirror().entries().len(),
        3,
        "reimport must not duplicate entries"
    );
}

#[test]
fn import_replaces_prior_contents_entirely() {
    let mut s = session();
    s.insert("0x7777", "0x01").unwrap();
    s.load_genesis(DOCUMENT).unwrap();

    assert_eq!(s.get("0x7777").unwrap(), None);
    assert_eq!(s.get("0x3a636f6465").unwrap(), Some(vec![0x00, 0x01]));
}

#[test]
fn malformed_document_preserves_prior_state() {
    let mut s = session();
    s.insert("0x7777", "0x01").unwrap();
    let before_root = s.root();

    assert!(s.load_genesis(r#"{"genesis":{"raw":{}}}"#).is_err());

    assert_eq!(s.mirror().len(), 1);
    assert_eq!(s.root(), before_root);
    assert_eq!(s.get("0x7777").unwrap(), Some(vec![0x01]));
}
