//! HTTP remote document store
//!
//! Talks to the real endpoint: one resource supporting `GET`, `PUT` and
//! `DELETE`, exchanging the `{ data, etag }` envelope and authenticated with
//! a static shared-secret `x-api-key` header.
//!
//! Status mapping: `401` is unauthorized, `409`/`412` is an ETag conflict
//! (save only), `404` means "no document" (absent on load, already-gone on
//! delete), `5xx` is a server failure, and transport-level errors are
//! network failures. Any request timeout is enforced here on the HTTP
//! client; the sync engine imposes none of its own.

use std::marker::PhantomData;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Serialize, Serializer};
use tracing::debug;

use super::error::{DeleteError, LoadError, SaveError};
use super::{decode_document, encode_document, Envelope, Etag, RemoteStore, Snapshot};

/// Header carrying the shared secret
const API_KEY_HEADER: &str = "x-api-key";

/// Request body for `PUT`
#[derive(Debug, Serialize)]
struct PutEnvelope<'a> {
    data: &'a str,
    #[serde(serialize_with = "serialize_opt_etag")]
    etag: Option<&'a Etag>,
}

fn serialize_opt_etag<S: Serializer>(etag: &Option<&Etag>, s: S) -> Result<S::Ok, S::Error> {
    match etag {
        Some(tag) => s.serialize_some(tag.as_str()),
        None => s.serialize_none(),
    }
}

/// [`RemoteStore`] implementation against the HTTP endpoint
pub struct WebApiStore<T> {
    client: Client,
    url: String,
    api_key: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T> WebApiStore<T> {
    /// Create a store for the given endpoint URL and shared secret
    ///
    /// `timeout` bounds every request; a request that exceeds it surfaces
    /// as a network error.
    pub fn new(
        url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
            api_key: api_key.into(),
            _marker: PhantomData,
        })
    }

    /// The endpoint URL
    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Map a non-success load status to its error, `None` for success statuses
fn load_status_error(status: StatusCode) -> Option<LoadError> {
    match status {
        StatusCode::UNAUTHORIZED => Some(LoadError::Unauthorized),
        s if s.is_server_error() => Some(LoadError::Server(format!("status {}", s.as_u16()))),
        s if s.is_success() || s == StatusCode::NOT_FOUND => None,
        s => Some(LoadError::Server(format!("unexpected status {}", s.as_u16()))),
    }
}

/// Map a non-success save status to its error, `None` for success statuses
fn save_status_error(status: StatusCode) -> Option<SaveError> {
    match status {
        StatusCode::UNAUTHORIZED => Some(SaveError::Unauthorized),
        StatusCode::CONFLICT | StatusCode::PRECONDITION_FAILED => Some(SaveError::EtagMismatch),
        s if s.is_server_error() => Some(SaveError::Server(format!("status {}", s.as_u16()))),
        s if s.is_success() => None,
        s => Some(SaveError::Server(format!("unexpected status {}", s.as_u16()))),
    }
}

/// Map a non-success delete status to its error, `None` for success statuses
///
/// `404` is a success: the document is already gone (idempotence).
fn delete_status_error(status: StatusCode) -> Option<DeleteError> {
    match status {
        StatusCode::UNAUTHORIZED => Some(DeleteError::Unauthorized),
        s if s.is_server_error() => Some(DeleteError::Server(format!("status {}", s.as_u16()))),
        s if s.is_success() || s == StatusCode::NOT_FOUND => None,
        s => Some(DeleteError::Server(format!("unexpected status {}", s.as_u16()))),
    }
}

#[async_trait]
impl<T> RemoteStore<T> for WebApiStore<T>
where
    T: Serialize + DeserializeOwned + Send + Sync,
{
    async fn load(&self) -> Result<Option<Snapshot<T>>, LoadError> {
        debug!(url = %self.url, "loading remote document");
        let response = self
            .client
            .get(&self.url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(|e| LoadError::Network(e.to_string()))?;

        let status = response.status();
        if let Some(err) = load_status_error(status) {
            return Err(err);
        }
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let envelope: Envelope = response
            .json()
            .await
            .map_err(|e| LoadError::DataCorruption(format!("malformed response: {}", e)))?;

        let data = decode_document(&envelope.data)
            .map_err(|e| LoadError::DataCorruption(format!("schema validation failed: {}", e)))?;

        Ok(Some(Snapshot {
            data,
            etag: Etag::from_raw(envelope.etag),
        }))
    }

    async fn save(&self, data: &T, etag: Option<&Etag>) -> Result<Snapshot<T>, SaveError> {
        debug!(url = %self.url, has_etag = etag.is_some(), "saving remote document");
        let raw = encode_document(data)
            .map_err(|e| SaveError::Server(format!("failed to encode document: {}", e)))?;
        let body = PutEnvelope {
            data: &raw,
            etag,
        };

        let response = self
            .client
            .put(&self.url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| SaveError::Network(e.to_string()))?;

        if let Some(err) = save_status_error(response.status()) {
            return Err(err);
        }

        // The success response carries the fresh snapshot the remote side
        // just assigned; the engine adopts it wholesale.
        let envelope: Envelope = response
            .json()
            .await
            .map_err(|e| SaveError::Server(format!("malformed save response: {}", e)))?;

        let stored = decode_document(&envelope.data)
            .map_err(|e| SaveError::Server(format!("malformed save response: {}", e)))?;

        Ok(Snapshot {
            data: stored,
            etag: Etag::from_raw(envelope.etag),
        })
    }

    async fn delete(&self) -> Result<(), DeleteError> {
        debug!(url = %self.url, "deleting remote document");
        let response = self
            .client
            .delete(&self.url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(|e| DeleteError::Network(e.to_string()))?;

        if let Some(err) = delete_status_error(response.status()) {
            return Err(err);
        }
        Ok(())
    }
}
