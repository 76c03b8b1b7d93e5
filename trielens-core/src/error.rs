//! Error types for trielens-core

use thiserror::Error;

use crate::script::ScriptError;

/// Result type alias using our Error
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type
#[derive(Error, Debug)]
pub enum Error {
    /// Canonicalization was given an input it rejects (non-ASCII text,
    /// integer that does not fit in one byte)
    #[error("unsupported value: {0}")]
    UnsupportedValue(String),

    /// Hex decoding failure, propagated from the decoder unmodified
    #[error("invalid hex input: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    /// Import document parse failure or missing expected structure;
    /// session state is left unchanged when this is raised
    #[error("malformed import: {0}")]
    MalformedImport(String),

    /// Failure raised by user-authored script code; the commit and
    /// re-render that follow a script run still proceed
    #[error("script error: {0}")]
    Script(#[from] ScriptError),

    /// The trie engine rejected an operation
    #[error("engine error: {0}")]
    Engine(String),
}

impl Error {
    /// Create an unsupported-value error
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Error::UnsupportedValue(msg.into())
    }

    /// Create a malformed-import error
    pub fn malformed_import(msg: impl Into<String>) -> Self {
        Error::MalformedImport(msg.into())
    }

    /// Create an engine error
    pub fn engine(msg: impl Into<String>) -> Self {
        Error::Engine(msg.into())
    }
}
