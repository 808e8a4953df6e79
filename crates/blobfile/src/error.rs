//! Error types for blobfile

use std::io;
use thiserror::Error;

/// Errors produced by blob file handles and the stores behind them
#[derive(Error, Debug)]
pub enum BlobError {
    /// The underlying object store failed
    #[error("Object store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    /// A store that is not backed by `object_store` failed
    #[error("Remote store error: {0}")]
    Remote(String),

    /// The object does not exist in the store
    #[error("Object not found: {0}")]
    NotFound(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The handle was used after `close()`
    #[error("I/O operation on closed blob file")]
    Closed,

    /// Text could not be encoded or decoded with the configured encoding
    #[error("Codec error: {0}")]
    Codec(String),

    /// Operation that is no longer supported
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// Seek would move the cursor before the start of the buffer
    #[error("Invalid seek to negative position {0}")]
    InvalidSeek(i64),

    /// Malformed or unsupported blob address
    #[error("Invalid blob location: {0}")]
    InvalidLocation(String),

    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// The Tokio runtime could not be created
    #[error("Runtime error: {0}")]
    Runtime(String),
}

/// Result alias used throughout blobfile
pub type Result<T> = std::result::Result<T, BlobError>;

impl From<BlobError> for io::Error {
    fn from(err: BlobError) -> Self {
        let kind = match err {
            BlobError::Io(io_err) => return io_err,
            BlobError::NotFound(_) => io::ErrorKind::NotFound,
            BlobError::Codec(_) => io::ErrorKind::InvalidData,
            BlobError::InvalidSeek(_) | BlobError::InvalidLocation(_) => {
                io::ErrorKind::InvalidInput
            }
            BlobError::Unsupported(_) => io::ErrorKind::Unsupported,
            _ => io::ErrorKind::Other,
        };
        io::Error::new(kind, err)
    }
}
