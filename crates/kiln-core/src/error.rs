//! Error types for Kiln.
//!
//! Protocol and connection failures are ordinary errors and travel through
//! [`KilnError`]. Evaluation faults are deliberately *not* represented here:
//! they are contained inside the execution engine and rendered into the
//! response's stderr text (see [`crate::engine::Fault`]).

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the Kiln library.
#[derive(Debug, Error)]
pub enum KilnError {
    /// Malformed frame or undecodable payload. The connection that produced
    /// it is dropped; the server itself keeps running.
    #[error("Protocol error: {message}")]
    Protocol { message: String },

    /// The rendezvous endpoint is missing, refused the connection, or closed
    /// before a reply arrived. Never retried automatically.
    #[error("Cannot connect to execution server at {}: {message}", path.display())]
    Connection { path: PathBuf, message: String },

    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // Generic errors
    #[error("{0}")]
    Other(String),
}

/// Result type alias for Kiln operations.
pub type Result<T> = std::result::Result<T, KilnError>;

impl From<std::io::Error> for KilnError {
    fn from(err: std::io::Error) -> Self {
        KilnError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for KilnError {
    fn from(err: serde_json::Error) -> Self {
        KilnError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl KilnError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        KilnError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Create a protocol error from a message.
    pub fn protocol(message: impl Into<String>) -> Self {
        KilnError::Protocol {
            message: message.into(),
        }
    }

    /// Create a connection error for an endpoint path.
    pub fn connection(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        KilnError::Connection {
            path: path.into(),
            message: message.into(),
        }
    }

    /// True for failures the client should report as "cannot connect".
    pub fn is_connection(&self) -> bool {
        matches!(self, KilnError::Connection { .. })
    }
}
