//! Error types for the collection stack.

use thiserror::Error;

/// Collection error type
///
/// Link-level losses (collisions, missing acks, timeouts), duplicate drops and
/// backpressure drops are absorbed by the connection and never show up here.
#[derive(Error, Debug)]
pub enum CollectError {
    /// Operation on a connection that has not been opened or was closed
    #[error("collect connection is not open")]
    NotOpen,

    /// The reliable unicast endpoint refused the packet immediately
    #[error("reliable unicast transport is busy")]
    TransportBusy,

    /// Other collaborator failure
    #[error("transport error: {0}")]
    Transport(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    InvalidConfig(String),

    /// Frame could not be decoded
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for collection operations
pub type CollectResult<T> = std::result::Result<T, CollectError>;
