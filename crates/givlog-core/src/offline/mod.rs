//! Offline-first sync engine
//!
//! The [`OfflineStore`] mediates all reads and writes between the
//! application and a [`RemoteStore`](crate::remote::RemoteStore). Local
//! edits are visible immediately and pushed in the background; remote
//! conflicts surface as [`SyncError::EtagMismatch`] for the application to
//! resolve.
//!
//! ## Usage
//!
//! ```ignore
//! let store = Arc::new(OfflineStore::new(remote, DonationBook::default()));
//!
//! store.sync(SyncOption::Pull).await?;
//! store.save(edited_book); // returns immediately, pushes in the background
//! ```

mod state;
mod store;

pub use state::{DataState, StorageState, SyncError, SyncStatus};
pub use store::{OfflineStore, SubscriberId, SyncOption};
