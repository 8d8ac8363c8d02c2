//! Remote document store contract
//!
//! A [`RemoteStore`] talks to a single remote document: one JSON blob
//! guarded by an opaque [`Etag`]. Writes use compare-and-swap semantics on
//! the ETag, so concurrent edits surface as [`SaveError::EtagMismatch`]
//! instead of being silently overwritten.
//!
//! Two implementations satisfy the contract:
//!
//! - [`WebApiStore`]: a real HTTP endpoint (see `web.rs`)
//! - [`LocalStore`]: a file-backed simulated remote with configurable
//!   failure injection, for development and testing (see `local.rs`)
//!
//! Remote stores are stateless transports; the cached document and its ETag
//! live in the [`OfflineStore`](crate::offline::OfflineStore), never here.
//! (The local simulated store legitimately owns the simulated remote's
//! persistent state.)

mod error;
mod local;
mod web;

use std::fmt;
use std::fmt::Write as _;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

pub use error::{DeleteError, LoadError, SaveError};
pub use local::{FailureRates, LocalStore};
pub use web::WebApiStore;

/// Opaque version token assigned by the remote side on every write
///
/// Two snapshots with equal ETags hold byte-identical content. The token is
/// supplied back on write to detect concurrent modification; every
/// successful write produces a token distinct from all previous ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Etag(String);

impl Etag {
    /// Build an ETag from its raw string form (as received over the wire)
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Mint a fresh ETag for newly written content
    ///
    /// Combines a content hash with a write-time nonce, so the token is
    /// distinct even when identical content is written twice.
    pub fn fresh(content: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(content);
        hasher.update(Uuid::new_v4().as_bytes());
        let digest = hasher.finalize();

        let mut tag = String::with_capacity(32);
        for byte in &digest[..16] {
            let _ = write!(tag, "{:02x}", byte);
        }
        Self(tag)
    }

    /// The raw string form
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Etag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A versioned copy of the remote document
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<T> {
    /// The document content
    pub data: T,
    /// The version token the remote side assigned to this content
    pub etag: Etag,
}

/// Capability contract for the remote document endpoint
///
/// All operations are asynchronous and may suspend for I/O. No operation
/// ever panics on expected failures; every outcome is in the `Result`.
#[async_trait]
pub trait RemoteStore<T: Send + Sync>: Send + Sync {
    /// Fetch the remote document
    ///
    /// Returns `Ok(None)` when no document exists remotely yet; that is a
    /// success, distinct from any error.
    async fn load(&self) -> Result<Option<Snapshot<T>>, LoadError>;

    /// Write the document, guarded by the ETag
    ///
    /// When no document exists remotely, `etag` is ignored and the document
    /// is created unconditionally. When one exists, the write succeeds only
    /// if `etag` matches the remote side's current token; otherwise
    /// [`SaveError::EtagMismatch`] is returned and nothing is mutated. A
    /// failed save never leaves a partial write behind.
    async fn save(&self, data: &T, etag: Option<&Etag>) -> Result<Snapshot<T>, SaveError>;

    /// Delete the remote document
    ///
    /// Idempotent: deleting a document that does not exist is a success.
    async fn delete(&self) -> Result<(), DeleteError>;
}

#[async_trait]
impl<T, S> RemoteStore<T> for Box<S>
where
    T: Send + Sync,
    S: RemoteStore<T> + ?Sized,
{
    async fn load(&self) -> Result<Option<Snapshot<T>>, LoadError> {
        (**self).load().await
    }

    async fn save(&self, data: &T, etag: Option<&Etag>) -> Result<Snapshot<T>, SaveError> {
        (**self).save(data, etag).await
    }

    async fn delete(&self) -> Result<(), DeleteError> {
        (**self).delete().await
    }
}

/// Wire envelope holding the document as a JSON string next to its ETag
///
/// Shared by both store implementations: the HTTP endpoint exchanges this
/// shape as its request/response body, and the local store persists it.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Envelope {
    pub data: String,
    pub etag: String,
}

/// Encode a document into its wire form
pub(crate) fn encode_document<T: Serialize>(data: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string(data)
}

/// Decode and validate a document from its wire form
pub(crate) fn decode_document<T: DeserializeOwned>(raw: &str) -> Result<T, serde_json::Error> {
    serde_json::from_str(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_etags_are_distinct_for_identical_content() {
        let a = Etag::fresh(b"same content");
        let b = Etag::fresh(b"same content");
        assert_ne!(a, b);
    }

    #[test]
    fn test_etag_round_trips_through_raw_form() {
        let tag = Etag::fresh(b"content");
        let restored = Etag::from_raw(tag.as_str());
        assert_eq!(tag, restored);
    }

    #[test]
    fn test_document_wire_round_trip() {
        let raw = encode_document(&vec!["a".to_string(), "b".to_string()]).unwrap();
        let decoded: Vec<String> = decode_document(&raw).unwrap();
        assert_eq!(decoded, vec!["a", "b"]);
    }

    #[test]
    fn test_decode_rejects_wrong_shape() {
        let result: Result<Vec<String>, _> = decode_document("{\"not\": \"a list\"}");
        assert!(result.is_err());
    }
}
