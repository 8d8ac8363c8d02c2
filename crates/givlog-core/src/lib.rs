//! Givlog Core Library
//!
//! This crate provides the core functionality for givlog, a personal
//! donation tracker with offline-first sync.
//!
//! # Architecture
//!
//! The whole dataset (organizations + donations) is a single document that
//! is replaced wholesale on every sync. A remote endpoint holds the document
//! as one JSON blob guarded by an ETag; concurrent edits are detected with
//! compare-and-swap semantics, never merged.
//!
//! Three ownership layers, outermost first:
//!
//! - the remote endpoint is the source of truth
//! - a [`remote::RemoteStore`] is a stateless transport to it
//! - the [`offline::OfflineStore`] owns exactly one in-memory copy of the
//!   document plus its ETag, and mediates every read and write the
//!   application performs
//!
//! # Quick Start
//!
//! ```text
//! let config = Config::load()?;
//! let store = Arc::new(OfflineStore::new(config.remote_store(), DonationBook::default()));
//!
//! store.sync(SyncOption::Pull).await?;
//!
//! let mut book = store.state().data.into_data();
//! book.donations.push(donation);
//! store.save(book); // local state updates now, push happens in the background
//! ```
//!
//! # Modules
//!
//! - `offline`: The sync engine (main entry point)
//! - `remote`: Remote store contract and its HTTP / local implementations
//! - `models`: Data structures for organizations and donations
//! - `config`: Application configuration

pub mod config;
pub mod models;
pub mod offline;
pub mod remote;

pub use config::Config;
pub use models::{Donation, DonationBook, Organization};
pub use offline::{DataState, OfflineStore, StorageState, SyncError, SyncOption, SyncStatus};
pub use remote::{DeleteError, Etag, LoadError, RemoteStore, SaveError, Snapshot};
