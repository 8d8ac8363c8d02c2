//! Observable state of the offline store
//!
//! Two orthogonal dimensions: what the locally held document is
//! ([`DataState`]) and whether an operation is in flight ([`SyncStatus`]).
//! Subscribers receive both together as a [`StorageState`] snapshot on every
//! transition.

use thiserror::Error;

use crate::remote::{DeleteError, LoadError, SaveError};

/// The locally held document and its relationship to the remote side
#[derive(Debug, Clone, PartialEq)]
pub enum DataState<T> {
    /// No successful sync has ever completed; holds the empty value
    New(T),
    /// The local document equals the last loaded/saved remote document
    Unchanged(T),
    /// The local document has an edit not yet confirmed persisted remotely
    Modified(T),
}

impl<T> DataState<T> {
    /// The held document, whatever its state
    pub fn data(&self) -> &T {
        match self {
            DataState::New(data) | DataState::Unchanged(data) | DataState::Modified(data) => data,
        }
    }

    /// Consume the state, returning the held document
    pub fn into_data(self) -> T {
        match self {
            DataState::New(data) | DataState::Unchanged(data) | DataState::Modified(data) => data,
        }
    }

    /// Whether the document is locally unconfirmed (new or modified)
    pub fn is_pending(&self) -> bool {
        matches!(self, DataState::New(_) | DataState::Modified(_))
    }

    /// Short label for display
    pub fn label(&self) -> &'static str {
        match self {
            DataState::New(_) => "new",
            DataState::Unchanged(_) => "unchanged",
            DataState::Modified(_) => "modified",
        }
    }
}

/// The narrow error set consumers of the engine see
///
/// Every remote store error is collapsed into this set at the engine
/// boundary. `Network` is always retryable; `EtagMismatch` is a genuine
/// concurrent-edit conflict that needs a user decision; everything else is
/// `Other`, carrying the source error's text so logs stay actionable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// Transport failure; retrying the sync is always safe
    #[error("network error while syncing")]
    Network,

    /// The remote document changed since the last sync
    #[error("remote document was changed by another writer")]
    EtagMismatch,

    /// Anything else (authorization, server failure, corrupt payload, ...)
    #[error("sync failed: {0}")]
    Other(String),
}

impl From<LoadError> for SyncError {
    fn from(err: LoadError) -> Self {
        match err {
            LoadError::Network(_) => SyncError::Network,
            other => SyncError::Other(other.to_string()),
        }
    }
}

impl From<SaveError> for SyncError {
    fn from(err: SaveError) -> Self {
        match err {
            SaveError::Network(_) => SyncError::Network,
            SaveError::EtagMismatch => SyncError::EtagMismatch,
            other => SyncError::Other(other.to_string()),
        }
    }
}

impl From<DeleteError> for SyncError {
    fn from(err: DeleteError) -> Self {
        match err {
            DeleteError::Network(_) => SyncError::Network,
            other => SyncError::Other(other.to_string()),
        }
    }
}

/// Whether an operation is in flight, and how the last one ended
#[derive(Debug, Clone, PartialEq)]
pub enum SyncStatus {
    /// No operation in flight
    ///
    /// `requires_sync` signals a known-pending local modification that has
    /// not been reconciled with the remote side yet.
    Idle { requires_sync: bool },
    /// An operation is in flight; no other operation may start
    Syncing,
    /// The last operation failed
    Error(SyncError),
}

impl SyncStatus {
    /// Whether an operation is currently in flight
    pub fn is_syncing(&self) -> bool {
        matches!(self, SyncStatus::Syncing)
    }

    /// Short label for display
    pub fn label(&self) -> &'static str {
        match self {
            SyncStatus::Idle { requires_sync: false } => "idle",
            SyncStatus::Idle { requires_sync: true } => "pending sync",
            SyncStatus::Syncing => "syncing",
            SyncStatus::Error(_) => "error",
        }
    }
}

/// The single externally observable snapshot of the store
///
/// Delivered by value to subscribers on every transition; never a live
/// reference into engine-owned state.
#[derive(Debug, Clone, PartialEq)]
pub struct StorageState<T> {
    /// The locally held document
    pub data: DataState<T>,
    /// The operation status
    pub status: SyncStatus,
}
