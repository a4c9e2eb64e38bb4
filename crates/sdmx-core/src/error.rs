//! Error types for SDMX operations.
//!
//! This module defines [`SdmxError`] which covers every failure a connection,
//! a cursor, a raw client or a cache store can report.

use thiserror::Error;

/// Errors that can occur while retrieving SDMX data.
#[derive(Error, Debug)]
pub enum SdmxError {
    /// The connection was used after `close()`.
    #[error("Connection closed: '{origin}'")]
    ConnectionClosed {
        /// Source the connection was opened on.
        origin: String,
    },

    /// The dataflow is not known to the source.
    #[error("Missing dataflow '{flow}' in '{origin}'")]
    MissingFlow {
        /// Source that was queried.
        origin: String,
        /// The dataflow reference that was requested.
        flow: String,
    },

    /// The data structure is not known to the source.
    #[error("Missing data structure '{structure}' in '{origin}'")]
    MissingStructure {
        /// Source that was queried.
        origin: String,
        /// The structure reference that was requested.
        structure: String,
    },

    /// No data is available for a dataflow.
    #[error("Missing data for '{flow}' in '{origin}'")]
    MissingData {
        /// Source that was queried.
        origin: String,
        /// The dataflow reference that was requested.
        flow: String,
    },

    /// The key does not fit the data structure.
    #[error("Invalid key '{key}': {reason}")]
    InvalidKey {
        /// The rejected key.
        key: String,
        /// Why the key was rejected.
        reason: String,
    },

    /// An invalid parameter was provided.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// A cursor accessor was called out of protocol order.
    #[error("Invalid cursor state: {0}")]
    CursorState(String),

    /// A cursor was used after `close()`.
    #[error("Cursor closed")]
    CursorClosed,

    /// The source does not exist.
    #[error("Source not found: {0}")]
    SourceNotFound(String),

    /// The source exists but cannot be reached.
    #[error("Source '{origin}' unreachable: {reason}")]
    Unreachable {
        /// Source that was tested.
        origin: String,
        /// Underlying transport failure.
        reason: String,
    },

    /// Network-related errors (connection failures, timeouts, etc.).
    #[error("Network error: {0}")]
    Network(String),

    /// File system errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error decoding data or metadata.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Error interacting with the cache.
    #[error("Cache error: {0}")]
    Cache(String),

    /// The requested feature is not supported.
    #[error("Feature not supported: {0}")]
    NotSupported(String),

    /// Any other error.
    #[error("{0}")]
    Other(String),
}

impl SdmxError {
    pub(crate) fn cursor_state(message: impl Into<String>) -> Self {
        Self::CursorState(message.into())
    }
}

/// Result type alias using [`SdmxError`].
pub type Result<T> = std::result::Result<T, SdmxError>;
