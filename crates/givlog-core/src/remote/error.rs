//! Remote store error taxonomy
//!
//! Each operation has its own closed error set so callers can match
//! exhaustively. `DataCorruption` is load-only: the transport succeeded but
//! the payload failed schema validation. `EtagMismatch` is save-only: the
//! optimistic-concurrency token no longer matches the remote document.

use thiserror::Error;

/// Errors returned by [`RemoteStore::load`](super::RemoteStore::load)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    /// Transport-level failure (connection refused, timeout, DNS, ...)
    #[error("network error: {0}")]
    Network(String),

    /// The shared secret was rejected
    #[error("not authorized to read the remote document")]
    Unauthorized,

    /// The remote side failed
    #[error("server error: {0}")]
    Server(String),

    /// The payload arrived but failed schema validation
    #[error("remote document is corrupted: {0}")]
    DataCorruption(String),
}

/// Errors returned by [`RemoteStore::save`](super::RemoteStore::save)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SaveError {
    /// Transport-level failure
    #[error("network error: {0}")]
    Network(String),

    /// The shared secret was rejected
    #[error("not authorized to write the remote document")]
    Unauthorized,

    /// The supplied ETag no longer matches the remote document
    #[error("remote document was changed by another writer")]
    EtagMismatch,

    /// The remote side failed; nothing was written
    #[error("server error: {0}")]
    Server(String),
}

/// Errors returned by [`RemoteStore::delete`](super::RemoteStore::delete)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeleteError {
    /// Transport-level failure
    #[error("network error: {0}")]
    Network(String),

    /// The shared secret was rejected
    #[error("not authorized to delete the remote document")]
    Unauthorized,

    /// The remote side failed
    #[error("server error: {0}")]
    Server(String),
}
