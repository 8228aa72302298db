//! Error types for axml-common.

use thiserror::Error;

/// Common error type for binary reading and writing.
#[derive(Debug, Error)]
pub enum Error {
    /// End of buffer reached while reading.
    #[error("unexpected end of buffer: needed {needed} bytes but only {available} available")]
    UnexpectedEof { needed: usize, available: usize },

    /// I/O error from the underlying sink.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// UTF-16 decoding error.
    #[error("UTF-16 error: {0}")]
    Utf16(#[from] std::string::FromUtf16Error),
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;
