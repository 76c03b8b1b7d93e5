//! Genesis import document parsing.
//!
//! The import format is a JSON document carrying `genesis.raw.top`, a
//! mapping of hex-prefixed string keys to hex-prefixed string values.
//! Parsing and validation complete before any session state is touched: a
//! malformed document, missing structure, or undecodable entry raises
//! [`Error::MalformedImport`] and the current state stays as it was. A
//! successful parse replaces the entire state through
//! [`Mirror::bulk_load`](crate::mirror::Mirror::bulk_load).

use serde::Deserialize;
use tracing::info;

use crate::bytes::ByteInput;
use crate::error::{Error, Result};

#[derive(Debug, Deserialize)]
struct ImportFile {
    genesis: GenesisSection,
}

#[derive(Debug, Deserialize)]
struct GenesisSection {
    raw: RawSection,
}

#[derive(Debug, Deserialize)]
struct RawSection {
    top: serde_json::Map<String, serde_json::Value>,
}

/// Parse an import document into fully decoded key/value pairs.
pub fn parse_genesis(text: &str) -> Result<Vec<(ByteInput, ByteInput)>> {
    let file: ImportFile = serde_json::from_str(text)
        .map_err(|e| Error::malformed_import(format!("invalid import document: {e}")))?;

    let top = file.genesis.raw.top;
    let mut pairs = Vec::with_capacity(top.len());
    for (key, value) in top {
        let value = value
            .as_str()
            .ok_or_else(|| Error::malformed_import(format!("value for {key} is not a string")))?;
        let key_hex = key
            .strip_prefix("0x")
            .ok_or_else(|| Error::malformed_import(format!("key {key} is not hex-prefixed")))?;
        let value_hex = value.strip_prefix("0x").ok_or_else(|| {
            Error::malformed_import(format!("value for {key} is not hex-prefixed"))
        })?;
        let key_bytes = hex::decode(key_hex)
            .map_err(|e| Error::malformed_import(format!("key {key}: {e}")))?;
        let value_bytes = hex::decode(value_hex)
            .map_err(|e| Error::malformed_import(format!("value for {key}: {e}")))?;
        pairs.push((ByteInput::Bytes(key_bytes), ByteInput::Bytes(value_bytes)));
    }
    info!(entries = pairs.len(), "parsed genesis document");
    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCUMENT: &str = r#"{
        "genesis": {
            "raw": {
                "top": {
                    "0x3a636f6465": "0x010203",
                    "0xdeadbeef": "0x99"
                }
            }
        }
    }"#;

    fn decoded(pairs: Vec<(ByteInput, ByteInput)>) -> Vec<(Vec<u8>, Vec<u8>)> {
        pairs
            .into_iter()
            .map(|(k, v)| (k.into_bytes().unwrap(), v.into_bytes().unwrap()))
            .collect()
    }

    #[test]
    fn parses_all_top_entries() {
        let pairs = decoded(parse_genesis(DOCUMENT).unwrap());
        assert_eq!(pairs.len(), 2);
        assert!(pairs.contains(&(b":code".to_vec(), vec![1, 2, 3])));
        assert!(pairs.contains(&(vec![0xde, 0xad, 0xbe, 0xef], vec![0x99])));
    }

    #[test]
    fn invalid_json_is_malformed_import() {
        assert!(matches!(
            parse_genesis("{not json"),
            Err(Error::MalformedImport(_))
        ));
    }

    #[test]
    fn missing_structure_is_malformed_import() {
        assert!(matches!(
            parse_genesis(r#"{"genesis": {}}"#),
            Err(Error::MalformedImport(_))
        ));
    }

    #[test]
    fn non_string_value_is_malformed_import() {
        let doc = r#"{"genesis":{"raw":{"top":{"0x00": 7}}}}"#;
        assert!(matches!(
            parse_genesis(doc),
            Err(Error::MalformedImport(_))
        ));
    }

    #[test]
    fn unprefixed_key_is_malformed_import() {
        let doc = r#"{"genesis":{"raw":{"top":{"00": "0x01"}}}}"#;
        assert!(matches!(
            parse_genesis(doc),
            Err(Error::MalformedImport(_))
        ));
    }

    #[test]
    fn undecodable_hex_is_malformed_import() {
        let doc = r#"{"genesis":{"raw":{"top":{"0x0z": "0x01"}}}}"#;
        assert!(matches!(
            parse_genesis(doc),
            Err(Error::MalformedImport(_))
        ));
    }
}
