//! Local simulated remote store
//!
//! A [`RemoteStore`] backed by a single file on disk, standing in for the
//! real endpoint during development and testing. It implements the same
//! compare-and-swap contract as the HTTP store and can inject failures with
//! configurable probabilities per error category, plus an artificial delay,
//! so the sync engine can be exercised without a network.
//!
//! The envelope (document JSON string + ETag) is written atomically (temp
//! file, then rename), so a failed save never leaves a partial write.

use std::fs;
use std::io::Write;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use super::error::{DeleteError, LoadError, SaveError};
use super::{decode_document, encode_document, Envelope, Etag, RemoteStore, Snapshot};

/// Failure injection probabilities, one per error category
///
/// Each is an independent probability in `[0, 1]`, checked before the real
/// operation runs. `corruption` applies to loads only; etag mismatches are
/// never injected because they arise naturally from the CAS check.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailureRates {
    /// Probability of a simulated network failure
    pub network: f64,
    /// Probability of a simulated authorization failure
    pub unauthorized: f64,
    /// Probability of a simulated server failure
    pub server: f64,
    /// Probability of a simulated corrupt payload (load only)
    pub corruption: f64,
}

impl FailureRates {
    fn clamped(self) -> Self {
        Self {
            network: self.network.clamp(0.0, 1.0),
            unauthorized: self.unauthorized.clamp(0.0, 1.0),
            server: self.server.clamp(0.0, 1.0),
            corruption: self.corruption.clamp(0.0, 1.0),
        }
    }
}

/// File-backed simulated remote document store
pub struct LocalStore<T> {
    path: PathBuf,
    rates: FailureRates,
    delay: Duration,
    _marker: PhantomData<fn() -> T>,
}

impl<T> LocalStore<T> {
    /// Create a store persisting to the given file, with no injected
    /// failures and no artificial delay
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            rates: FailureRates::default(),
            delay: Duration::ZERO,
            _marker: PhantomData,
        }
    }

    /// Set failure injection rates (clamped to `[0, 1]`)
    pub fn with_failure_rates(mut self, rates: FailureRates) -> Self {
        self.rates = rates.clamped();
        self
    }

    /// Set an artificial delay applied before every operation
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// The file this store persists to
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn simulate_latency(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }

    /// Roll the transport failure categories shared by all operations
    fn roll_transport_failure(&self) -> Option<TransportFailure> {
        let mut rng = rand::rng();
        if rng.random_bool(self.rates.network) {
            Some(TransportFailure::Network)
        } else if rng.random_bool(self.rates.unauthorized) {
            Some(TransportFailure::Unauthorized)
        } else if rng.random_bool(self.rates.server) {
            Some(TransportFailure::Server)
        } else {
            None
        }
    }

    fn roll_corruption(&self) -> bool {
        rand::rng().random_bool(self.rates.corruption)
    }

    fn read_envelope(&self) -> Result<Option<Envelope>, String> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.path)
            .map_err(|e| format!("failed to read {:?}: {}", self.path, e))?;
        let envelope: Envelope = serde_json::from_str(&raw)
            .map_err(|e| format!("invalid envelope in {:?}: {}", self.path, e))?;
        Ok(Some(envelope))
    }
}

enum TransportFailure {
    Network,
    Unauthorized,
    Server,
}

#[async_trait]
impl<T> RemoteStore<T> for LocalStore<T>
where
    T: Serialize + DeserializeOwned + Send + Sync,
{
    async fn load(&self) -> Result<Option<Snapshot<T>>, LoadError> {
        self.simulate_latency().await;

        if let Some(failure) = self.roll_transport_failure() {
            debug!("injecting load failure");
            return Err(match failure {
                TransportFailure::Network => LoadError::Network("injected failure".to_string()),
                TransportFailure::Unauthorized => LoadError::Unauthorized,
                TransportFailure::Server => LoadError::Server("injected failure".to_string()),
            });
        }
        if self.roll_corruption() {
            debug!("injecting corrupt payload");
            return Err(LoadError::DataCorruption("injected failure".to_string()));
        }

        let Some(envelope) = self.read_envelope().map_err(LoadError::DataCorruption)? else {
            return Ok(None);
        };

        let data = decode_document(&envelope.data)
            .map_err(|e| LoadError::DataCorruption(format!("schema validation failed: {}", e)))?;

        Ok(Some(Snapshot {
            data,
            etag: Etag::from_raw(envelope.etag),
        }))
    }

    async fn save(&self, data: &T, etag: Option<&Etag>) -> Result<Snapshot<T>, SaveError> {
        self.simulate_latency().await;

        if let Some(failure) = self.roll_transport_failure() {
            debug!("injecting save failure");
            return Err(match failure {
                TransportFailure::Network => SaveError::Network("injected failure".to_string()),
                TransportFailure::Unauthorized => SaveError::Unauthorized,
                TransportFailure::Server => SaveError::Server("injected failure".to_string()),
            });
        }

        // CAS check: when a document exists, the supplied etag must match
        // its current one. When none exists, the etag is ignored and the
        // document is created unconditionally.
        let existing = self
            .read_envelope()
            .map_err(SaveError::Server)?;
        if let Some(ref envelope) = existing {
            if etag.map(Etag::as_str) != Some(envelope.etag.as_str()) {
                return Err(SaveError::EtagMismatch);
            }
        }

        let raw = encode_document(data)
            .map_err(|e| SaveError::Server(format!("failed to encode document: {}", e)))?;
        let fresh = Etag::fresh(raw.as_bytes());
        let envelope = Envelope {
            data: raw,
            etag: fresh.as_str().to_string(),
        };
        let bytes = serde_json::to_vec(&envelope)
            .map_err(|e| SaveError::Server(format!("failed to encode envelope: {}", e)))?;

        atomic_write(&self.path, &bytes)
            .map_err(|e| SaveError::Server(format!("failed to write {:?}: {}", self.path, e)))?;

        let stored = decode_document(&envelope.data)
            .map_err(|e| SaveError::Server(format!("failed to re-read saved document: {}", e)))?;

        Ok(Snapshot {
            data: stored,
            etag: fresh,
        })
    }

    async fn delete(&self) -> Result<(), DeleteError> {
        self.simulate_latency().await;

        if let Some(failure) = self.roll_transport_failure() {
            debug!("injecting delete failure");
            return Err(match failure {
                TransportFailure::Network => DeleteError::Network("injected failure".to_string()),
                TransportFailure::Unauthorized => DeleteError::Unauthorized,
                TransportFailure::Server => DeleteError::Server("injected failure".to_string()),
            });
        }

        // Idempotent: deleting a missing document is a success
        if self.path.exists() {
            fs::remove_file(&self.path)
                .map_err(|e| DeleteError::Server(format!("failed to delete {:?}: {}", self.path, e)))?;
        }
        Ok(())
    }
}

/// Write bytes atomically: write to a temp file, then rename into place
fn atomic_write(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let tmp_path = path.with_extension("tmp");
    {
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    fs::rename(&tmp_path, path)
}
