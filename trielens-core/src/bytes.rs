//! Canonical byte representation for keys and values.
//!
//! Every key and value entering the inspector, whether typed into the
//! console, parsed from a genesis document, or produced by a script, is
//! reduced to a single byte representation before it reaches the trie
//! engine or the mirror. The accepted input shapes are modeled as an
//! explicit tagged union with a total conversion, so an unsupported
//! shape is a named failure rather than a runtime surprise.

use crate::error::{Error, Result};

/// An input value in one of the accepted shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ByteInput {
    /// Already a byte sequence; passed through unchanged.
    Bytes(Vec<u8>),
    /// Hex-encoded text; the stored string excludes the `0x` prefix.
    Hex(String),
    /// 7-bit ASCII text.
    Ascii(String),
    /// A single byte given as an integer.
    Int(u64),
}

impl ByteInput {
    /// Classify a string input: `0x`-prefixed text is hex, anything else
    /// is treated as ASCII.
    pub fn from_text(s: &str) -> Self {
        match s.strip_prefix("0x") {
            Some(rest) => ByteInput::Hex(rest.to_string()),
            None => ByteInput::Ascii(s.to_string()),
        }
    }

    /// Produce the canonical byte sequence.
    ///
    /// Hex decoding failures (odd length, non-hex characters) propagate
    /// from the decoder unmodified. Non-ASCII text and integers outside
    /// `0..=255` are rejected with [`Error::UnsupportedValue`].
    pub fn into_bytes(self) -> Result<Vec<u8>> {
        match self {
            ByteInput::Bytes(bytes) => Ok(bytes),
            ByteInput::Hex(text) => Ok(hex::decode(text)?),
            ByteInput::Ascii(text) => {
                if !text.is_ascii() {
                    return Err(Error::unsupported(format!("non-ASCII text {text:?}")));
                }
                Ok(text.into_bytes())
            }
            ByteInput::Int(n) => u8::try_from(n)
                .map(|byte| vec![byte])
                .map_err(|_| Error::unsupported(format!("integer {n} does not fit in one byte"))),
        }
    }
}

impl From<Vec<u8>> for ByteInput {
    fn from(bytes: Vec<u8>) -> Self {
        ByteInput::Bytes(bytes)
    }
}

impl From<&[u8]> for ByteInput {
    fn from(bytes: &[u8]) -> Self {
        ByteInput::Bytes(bytes.to_vec())
    }
}

impl<const N: usize> From<[u8; N]> for ByteInput {
    fn from(bytes: [u8; N]) -> Self {
        ByteInput::Bytes(bytes.to_vec())
    }
}

impl From<&str> for ByteInput {
    fn from(s: &str) -> Self {
        ByteInput::from_text(s)
    }
}

impl From<String> for ByteInput {
    fn from(s: String) -> Self {
        ByteInput::from_text(&s)
    }
}

impl From<u64> for ByteInput {
    fn from(n: u64) -> Self {
        ByteInput::Int(n)
    }
}

/// Canonicalize any accepted input shape into bytes.
pub fn to_bytes(input: impl Into<ByteInput>) -> Result<Vec<u8>> {
    input.into().into_bytes()
}

/// Lowercase hex encoding used by every view.
pub fn to_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_pass_through_unchanged() {
        let buf = vec![0xde, 0xad, 0xbe, 0xef];
        assert_eq!(to_bytes(buf.clone()).unwrap(), buf);
    }

    #[test]
    fn hex_prefix_decodes() {
        assert_eq!(to_bytes("0x1234").unwrap(), vec![0x12, 0x34]);
        assert_eq!(to_bytes("0xabcdef").unwrap(), vec![0xab, 0xcd, 0xef]);
    }

    #[test]
    fn empty_hex_is_empty_buffer() {
        assert_eq!(to_bytes("0x").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn odd_length_hex_propagates_decoder_error() {
        assert!(matches!(to_bytes("0x123"), Err(Error::InvalidHex(_))));
    }

    #[test]
    fn non_hex_characters_propagate_decoder_error() {
        assert!(matches!(to_bytes("0xzz"), Err(Error::InvalidHex(_))));
    }

    #[test]
    fn plain_string_decodes_as_ascii() {
        assert_eq!(to_bytes(":code").unwrap(), b":code".to_vec());
    }

    #[test]
    fn non_ascii_text_is_rejected() {
        assert!(matches!(
            to_bytes("héllo"),
            Err(Error::UnsupportedValue(_))
        ));
    }

    #[test]
    fn integer_wraps_as_one_byte() {
        assert_eq!(to_bytes(7u64).unwrap(), vec![7]);
        assert_eq!(to_bytes(255u64).unwrap(), vec![255]);
    }

    #[test]
    fn oversized_integer_is_rejected() {
        assert!(matches!(to_bytes(256u64), Err(Error::UnsupportedValue(_))));
    }

    #[test]
    fn from_text_classifies_by_prefix() {
        assert_eq!(ByteInput::from_text("0xff"), ByteInput::Hex("ff".into()));
        assert_eq!(
            ByteInput::from_text("hello"),
            ByteInput::Ascii("hello".into())
        );
    }
}
