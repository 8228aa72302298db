//! Error types for AXML building and encoding.

use thiserror::Error;

use crate::AttrType;

/// Errors that can occur when building, encoding or compiling AXML documents.
#[derive(Debug, Error)]
pub enum Error {
    /// Binary sink or reader error.
    #[error("{0}")]
    Common(#[from] axml_common::Error),

    /// A required name or URI was empty.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// The attribute value variant does not match its type tag.
    #[error("attribute {name:?} of type {ty:?} cannot hold a {found} value")]
    TypeMismatch {
        name: String,
        ty: AttrType,
        found: &'static str,
    },

    /// `write` was called before `prepare`.
    #[error("document has not been prepared")]
    NotPrepared,

    /// The tree was mutated after `prepare`.
    #[error("document changed after prepare (prepared revision {prepared}, current {current})")]
    StalePreparation { prepared: u64, current: u64 },

    /// A string has more UTF-16 code units than the pool format can express.
    #[error("string of {units} UTF-16 units exceeds the string pool limit")]
    StringTooLong { units: usize },

    /// A chunk or the whole document does not fit a 32-bit size field.
    #[error("{what} size {size} does not fit in a 32-bit size field")]
    DocumentTooLarge { what: &'static str, size: usize },

    /// The bytes emitted do not match the size declared in the header.
    #[error("wrote {actual} bytes but declared {expected}")]
    SizeMismatch { expected: u64, actual: u64 },

    /// A chunk could not be framed while walking encoded bytes.
    #[error("malformed chunk at offset {offset}: {reason}")]
    MalformedChunk { offset: usize, reason: &'static str },

    /// XML parsing error.
    #[error("XML error: {0}")]
    Xml(String),

    /// A name used a prefix with no `xmlns:` declaration.
    #[error("undeclared namespace prefix {0:?}")]
    UnknownPrefix(String),

    /// A resource-id map line could not be parsed.
    #[error("resource id map line {line}: {reason}")]
    InvalidResourceMap { line: usize, reason: String },

    /// UTF-8 decoding error.
    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::str::Utf8Error),
}

/// Result type for AXML operations.
pub type Result<T> = std::result::Result<T, Error>;
