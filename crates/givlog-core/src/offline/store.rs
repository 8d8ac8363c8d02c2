//! The offline sync engine
//!
//! [`OfflineStore`] owns the single in-memory document, its ETag, and the
//! sync status state machine. All reads and writes the application performs
//! go through it; it reconciles local edits against the remote store and
//! notifies subscribers on every state transition.
//!
//! ## Concurrency
//!
//! At most one sync or delete is in flight at a time, guarded by the
//! `Syncing` status check at the top of each operation. There is no queue:
//! a second caller gets an immediate error and must retry later. Locks are
//! only held for state snapshots and updates, never across an await.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::state::{DataState, StorageState, SyncError, SyncStatus};
use crate::remote::{Etag, RemoteStore};

/// Which cycle a [`OfflineStore::sync`] call runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOption {
    /// Fetch the remote document and adopt it wholesale
    Pull,
    /// Push the local document first if it is unconfirmed, otherwise pull
    PushThenPull,
}

/// Handle for removing a subscriber registered with
/// [`OfflineStore::on_change`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriberId(u64);

type Callback<T> = Arc<dyn Fn(&StorageState<T>) + Send + Sync>;

struct Subscribers<T> {
    next_id: u64,
    entries: Vec<(SubscriberId, Callback<T>)>,
}

struct Inner<T> {
    data: DataState<T>,
    status: SyncStatus,
    etag: Option<Etag>,
}

impl<T: Clone> Inner<T> {
    fn snapshot(&self) -> StorageState<T> {
        StorageState {
            data: self.data.clone(),
            status: self.status.clone(),
        }
    }
}

/// Client-side cache and sync engine in front of a [`RemoteStore`]
///
/// Long-lived: constructed once per session with a remote store and an
/// empty document value. The engine owns exactly one cached document and
/// one ETag; subscribers only ever see cloned snapshots.
pub struct OfflineStore<T> {
    remote: Box<dyn RemoteStore<T>>,
    empty: T,
    inner: Mutex<Inner<T>>,
    subscribers: Mutex<Subscribers<T>>,
    watch_tx: watch::Sender<StorageState<T>>,
}

impl<T> OfflineStore<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create an engine over the given remote store
    ///
    /// `empty` is the document value held until the first successful sync,
    /// and the value the store resets to after a successful delete.
    pub fn new(remote: impl RemoteStore<T> + 'static, empty: T) -> Self {
        let initial = StorageState {
            data: DataState::New(empty.clone()),
            status: SyncStatus::Idle {
                requires_sync: false,
            },
        };
        let (watch_tx, _) = watch::channel(initial);

        Self {
            remote: Box::new(remote),
            empty: empty.clone(),
            inner: Mutex::new(Inner {
                data: DataState::New(empty),
                status: SyncStatus::Idle {
                    requires_sync: false,
                },
                etag: None,
            }),
            subscribers: Mutex::new(Subscribers {
                next_id: 0,
                entries: Vec::new(),
            }),
            watch_tx,
        }
    }

    fn lock_inner(&self) -> MutexGuard<'_, Inner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_subscribers(&self) -> MutexGuard<'_, Subscribers<T>> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Current state, as a cloned snapshot
    pub fn state(&self) -> StorageState<T> {
        self.lock_inner().snapshot()
    }

    /// The ETag of the last successfully synced remote document, if any
    pub fn etag(&self) -> Option<Etag> {
        self.lock_inner().etag.clone()
    }

    /// Register a callback invoked synchronously with the full state on
    /// every transition
    ///
    /// A panicking callback is isolated: it is logged and the remaining
    /// subscribers are still notified.
    pub fn on_change(
        &self,
        callback: impl Fn(&StorageState<T>) + Send + Sync + 'static,
    ) -> SubscriberId {
        let mut subs = self.lock_subscribers();
        let id = SubscriberId(subs.next_id);
        subs.next_id += 1;
        subs.entries.push((id, Arc::new(callback)));
        id
    }

    /// Remove one subscriber registration
    ///
    /// Returns `false` if the id was already removed. Safe to call from
    /// inside a callback.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let mut subs = self.lock_subscribers();
        let before = subs.entries.len();
        subs.entries.retain(|(entry_id, _)| *entry_id != id);
        subs.entries.len() < before
    }

    /// Watch channel carrying every state snapshot
    ///
    /// The async counterpart to [`on_change`](Self::on_change); useful for
    /// awaiting the terminal state of the background cycle a
    /// [`save`](Self::save) triggers.
    pub fn subscribe(&self) -> watch::Receiver<StorageState<T>> {
        self.watch_tx.subscribe()
    }

    fn notify(&self, state: StorageState<T>) {
        self.watch_tx.send_replace(state.clone());

        // Iterate over a snapshot of the list so callbacks can unsubscribe
        // (or subscribe) without deadlocking the notification.
        let entries: Vec<(SubscriberId, Callback<T>)> = self.lock_subscribers().entries.clone();
        for (id, callback) in entries {
            if catch_unwind(AssertUnwindSafe(|| callback(&state))).is_err() {
                warn!(subscriber = id.0, "state change subscriber panicked");
            }
        }
    }

    /// Record a local edit and sync it in the background
    ///
    /// Synchronous and non-blocking: the state reflects the edit before
    /// this returns, so the caller can render it with no perceived latency.
    /// A push-then-pull cycle is then spawned; its result is not delivered
    /// to the caller. Callers that need the result must call
    /// [`sync`](Self::sync) themselves.
    pub fn save(self: &Arc<Self>, data: T) {
        let state = {
            let mut inner = self.lock_inner();
            inner.data = DataState::Modified(data);
            inner.status = SyncStatus::Idle {
                requires_sync: true,
            };
            inner.snapshot()
        };
        self.notify(state);

        let store = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = store.sync(SyncOption::PushThenPull).await {
                debug!("background sync after save failed: {}", e);
            }
        });
    }

    /// Run one sync cycle against the remote store
    ///
    /// Fails fast with [`SyncError::Other`] if a sync or delete is already
    /// in flight; there is no queueing. On any failure the locally modified
    /// document is preserved unchanged, so retrying re-sends the same
    /// content.
    pub async fn sync(&self, option: SyncOption) -> Result<(), SyncError> {
        let state = {
            let mut inner = self.lock_inner();
            if inner.status.is_syncing() {
                return Err(SyncError::Other("a sync is already in progress".to_string()));
            }
            inner.status = SyncStatus::Syncing;
            inner.snapshot()
        };
        // Notified before any I/O so observers see the in-flight state
        // promptly.
        self.notify(state);

        info!(?option, "starting sync");
        let result = self.run_cycle(option).await;
        match &result {
            Ok(()) => info!("sync complete"),
            Err(e) => warn!("sync failed: {}", e),
        }

        let state = {
            let mut inner = self.lock_inner();
            inner.status = match &result {
                Ok(()) => SyncStatus::Idle {
                    requires_sync: false,
                },
                Err(e) => SyncStatus::Error(e.clone()),
            };
            inner.snapshot()
        };
        self.notify(state);
        result
    }

    async fn run_cycle(&self, option: SyncOption) -> Result<(), SyncError> {
        if option == SyncOption::PushThenPull {
            // Only push when something is locally unconfirmed.
            let pending = {
                let inner = self.lock_inner();
                match &inner.data {
                    DataState::New(data) | DataState::Modified(data) => {
                        Some((data.clone(), inner.etag.clone()))
                    }
                    DataState::Unchanged(_) => None,
                }
            };

            if let Some((data, etag)) = pending {
                debug!("pushing local document");
                let snapshot = self.remote.save(&data, etag.as_ref()).await?;
                let mut inner = self.lock_inner();
                inner.etag = Some(snapshot.etag);
                inner.data = DataState::Unchanged(snapshot.data);
                return Ok(());
            }
        }

        debug!("pulling remote document");
        match self.remote.load().await? {
            Some(snapshot) => {
                let mut inner = self.lock_inner();
                inner.etag = Some(snapshot.etag);
                inner.data = DataState::Unchanged(snapshot.data);
            }
            None => {
                // Nothing remote yet; local state stays as it is.
                debug!("no remote document yet");
            }
        }
        Ok(())
    }

    /// Delete the remote document and reset to the initial state
    ///
    /// Destructive of local edits by design: on success the store holds the
    /// empty document again and the ETag is cleared. On failure the prior
    /// data state is preserved.
    pub async fn delete(&self) -> Result<(), SyncError> {
        let state = {
            let mut inner = self.lock_inner();
            if inner.status.is_syncing() {
                return Err(SyncError::Other("a sync is already in progress".to_string()));
            }
            inner.status = SyncStatus::Syncing;
            inner.snapshot()
        };
        self.notify(state);

        info!("deleting remote document");
        let result = self.remote.delete().await.map_err(SyncError::from);
        if let Err(ref e) = result {
            warn!("delete failed: {}", e);
        }

        let state = {
            let mut inner = self.lock_inner();
            match &result {
                Ok(()) => {
                    inner.data = DataState::New(self.empty.clone());
                    inner.etag = None;
                    inner.status = SyncStatus::Idle {
                        requires_sync: false,
                    };
                }
                Err(e) => inner.status = SyncStatus::Error(e.clone()),
            }
            inner.snapshot()
        };
        self.notify(state);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::{DeleteError, LoadError, SaveError, Snapshot};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Scripted in-memory remote for exercising the engine
    #[derive(Clone, Default)]
    struct FakeRemote {
        inner: Arc<FakeInner>,
    }

    #[derive(Default)]
    struct FakeInner {
        doc: Mutex<Option<(String, Etag)>>,
        fail_load: Mutex<Option<LoadError>>,
        fail_save: Mutex<Option<SaveError>>,
        fail_delete: Mutex<Option<DeleteError>>,
        delay: Mutex<Duration>,
    }

    impl FakeRemote {
        fn new() -> Self {
            Self::default()
        }

        fn with_delay(self, delay: Duration) -> Self {
            *self.inner.delay.lock().unwrap() = delay;
            self
        }

        fn preload(&self, content: &str) -> Etag {
            let etag = Etag::fresh(content.as_bytes());
            *self.inner.doc.lock().unwrap() = Some((content.to_string(), etag.clone()));
            etag
        }

        fn remote_doc(&self) -> Option<String> {
            self.inner
                .doc
                .lock()
                .unwrap()
                .as_ref()
                .map(|(data, _)| data.clone())
        }

        fn fail_saves_with(&self, err: Option<SaveError>) {
            *self.inner.fail_save.lock().unwrap() = err;
        }

        fn fail_loads_with(&self, err: Option<LoadError>) {
            *self.inner.fail_load.lock().unwrap() = err;
        }

        fn fail_deletes_with(&self, err: Option<DeleteError>) {
            *self.inner.fail_delete.lock().unwrap() = err;
        }

        async fn maybe_delay(&self) {
            let delay = *self.inner.delay.lock().unwrap();
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
    }

    #[async_trait]
    impl RemoteStore<String> for FakeRemote {
        async fn load(&self) -> Result<Option<Snapshot<String>>, LoadError> {
            self.maybe_delay().await;
            if let Some(err) = self.inner.fail_load.lock().unwrap().clone() {
                return Err(err);
            }
            Ok(self
                .inner
                .doc
                .lock()
                .unwrap()
                .as_ref()
                .map(|(data, etag)| Snapshot {
                    data: data.clone(),
                    etag: etag.clone(),
                }))
        }

        async fn save(
            &self,
            data: &String,
            etag: Option<&Etag>,
        ) -> Result<Snapshot<String>, SaveError> {
            self.maybe_delay().await;
            if let Some(err) = self.inner.fail_save.lock().unwrap().clone() {
                return Err(err);
            }
            let mut doc = self.inner.doc.lock().unwrap();
            if let Some((_, current)) = doc.as_ref() {
                if etag != Some(current) {
                    return Err(SaveError::EtagMismatch);
                }
            }
            let fresh = Etag::fresh(data.as_bytes());
            *doc = Some((data.clone(), fresh.clone()));
            Ok(Snapshot {
                data: data.clone(),
                etag: fresh,
            })
        }

        async fn delete(&self) -> Result<(), DeleteError> {
            self.maybe_delay().await;
            if let Some(err) = self.inner.fail_delete.lock().unwrap().clone() {
                return Err(err);
            }
            *self.inner.doc.lock().unwrap() = None;
            Ok(())
        }
    }

    fn new_store(remote: FakeRemote) -> Arc<OfflineStore<String>> {
        Arc::new(OfflineStore::new(remote, String::new()))
    }

    /// Wait for the background cycle triggered by `save` to finish
    async fn wait_terminal(store: &OfflineStore<String>) -> StorageState<String> {
        let mut rx = store.subscribe();
        let state = rx
            .wait_for(|s| {
                matches!(
                    s.status,
                    SyncStatus::Error(_)
                        | SyncStatus::Idle {
                            requires_sync: false
                        }
                )
            })
            .await
            .unwrap();
        state.clone()
    }

    #[tokio::test]
    async fn test_initial_state() {
        let store = new_store(FakeRemote::new());
        let state = store.state();

        assert_eq!(state.data, DataState::New(String::new()));
        assert_eq!(
            state.status,
            SyncStatus::Idle {
                requires_sync: false
            }
        );
        assert_eq!(store.etag(), None);
    }

    #[tokio::test]
    async fn test_save_is_immediately_visible_then_syncs() {
        let remote = FakeRemote::new();
        let store = new_store(remote.clone());

        store.save("local edit".to_string());

        // Visible before the background push has run
        let state = store.state();
        assert_eq!(state.data, DataState::Modified("local edit".to_string()));
        assert_eq!(
            state.status,
            SyncStatus::Idle {
                requires_sync: true
            }
        );

        let state = wait_terminal(&store).await;
        assert_eq!(state.data, DataState::Unchanged("local edit".to_string()));
        assert_eq!(
            state.status,
            SyncStatus::Idle {
                requires_sync: false
            }
        );
        assert_eq!(remote.remote_doc(), Some("local edit".to_string()));
        assert!(store.etag().is_some());
    }

    #[tokio::test]
    async fn test_failed_push_preserves_local_edit() {
        let remote = FakeRemote::new();
        remote.fail_saves_with(Some(SaveError::Network("refused".to_string())));
        let store = new_store(remote.clone());

        store.save("precious edit".to_string());
        let state = wait_terminal(&store).await;

        // Not reverted, not cleared
        assert_eq!(state.data, DataState::Modified("precious edit".to_string()));
        assert_eq!(state.status, SyncStatus::Error(SyncError::Network));
        assert_eq!(remote.remote_doc(), None);
    }

    #[tokio::test]
    async fn test_retry_after_failure_sends_same_payload() {
        let remote = FakeRemote::new();
        remote.fail_saves_with(Some(SaveError::Network("refused".to_string())));
        let store = new_store(remote.clone());

        store.save("precious edit".to_string());
        wait_terminal(&store).await;

        remote.fail_saves_with(None);
        store.sync(SyncOption::PushThenPull).await.unwrap();

        let state = store.state();
        assert_eq!(
            state.data,
            DataState::Unchanged("precious edit".to_string())
        );
        assert_eq!(remote.remote_doc(), Some("precious edit".to_string()));
    }

    #[tokio::test]
    async fn test_second_sync_fails_fast_while_one_is_in_flight() {
        let remote = FakeRemote::new().with_delay(Duration::from_millis(50));
        let store = new_store(remote);

        let first = {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.sync(SyncOption::Pull).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(store.state().status.is_syncing());

        let second = store.sync(SyncOption::Pull).await;
        assert!(matches!(second, Err(SyncError::Other(_))));

        // The first call's result is unaffected
        first.await.unwrap().unwrap();
        assert_eq!(
            store.state().status,
            SyncStatus::Idle {
                requires_sync: false
            }
        );
    }

    #[tokio::test]
    async fn test_delete_resets_to_initial_state() {
        let remote = FakeRemote::new();
        let store = new_store(remote.clone());

        store.save("doomed".to_string());
        wait_terminal(&store).await;
        assert!(remote.remote_doc().is_some());

        store.delete().await.unwrap();

        let state = store.state();
        assert_eq!(state.data, DataState::New(String::new()));
        assert_eq!(
            state.status,
            SyncStatus::Idle {
                requires_sync: false
            }
        );
        assert_eq!(store.etag(), None);
        assert_eq!(remote.remote_doc(), None);
    }

    #[tokio::test]
    async fn test_delete_failure_preserves_data_state() {
        let remote = FakeRemote::new();
        let store = new_store(remote.clone());

        store.save("kept".to_string());
        wait_terminal(&store).await;

        remote.fail_deletes_with(Some(DeleteError::Network("refused".to_string())));
        let err = store.delete().await.unwrap_err();
        assert_eq!(err, SyncError::Network);

        let state = store.state();
        assert_eq!(state.data, DataState::Unchanged("kept".to_string()));
        assert_eq!(state.status, SyncStatus::Error(SyncError::Network));
    }

    #[tokio::test]
    async fn test_pull_of_nothing_leaves_new_as_new() {
        let store = new_store(FakeRemote::new());

        store.sync(SyncOption::Pull).await.unwrap();

        let state = store.state();
        assert_eq!(state.data, DataState::New(String::new()));
        assert_eq!(
            state.status,
            SyncStatus::Idle {
                requires_sync: false
            }
        );
    }

    #[tokio::test]
    async fn test_pull_adopts_remote_wholesale() {
        let remote = FakeRemote::new();
        let etag = remote.preload("server truth");
        let store = new_store(remote);

        store.sync(SyncOption::Pull).await.unwrap();

        let state = store.state();
        assert_eq!(state.data, DataState::Unchanged("server truth".to_string()));
        assert_eq!(store.etag(), Some(etag));
    }

    #[tokio::test]
    async fn test_pull_error_collapses_to_other() {
        let remote = FakeRemote::new();
        remote.fail_loads_with(Some(LoadError::Unauthorized));
        let store = new_store(remote);

        let err = store.sync(SyncOption::Pull).await.unwrap_err();
        assert!(matches!(err, SyncError::Other(_)));
        assert_eq!(store.state().status, SyncStatus::Error(err));
    }

    #[tokio::test]
    async fn test_concurrent_edit_surfaces_etag_mismatch() {
        let remote = FakeRemote::new();
        remote.preload("version one");
        let store = new_store(remote.clone());

        store.sync(SyncOption::Pull).await.unwrap();

        // Another writer advances the remote document behind our back
        remote.preload("version two");

        store.save("my conflicting edit".to_string());
        let state = wait_terminal(&store).await;

        assert_eq!(state.status, SyncStatus::Error(SyncError::EtagMismatch));
        assert_eq!(
            state.data,
            DataState::Modified("my conflicting edit".to_string())
        );
        // The remote document was not clobbered
        assert_eq!(remote.remote_doc(), Some("version two".to_string()));
    }

    #[tokio::test]
    async fn test_push_then_pull_only_pulls_when_unchanged() {
        let remote = FakeRemote::new();
        remote.preload("version one");
        let store = new_store(remote.clone());

        store.sync(SyncOption::Pull).await.unwrap();
        remote.preload("version two");

        // Nothing locally unconfirmed, so this must pull, not push
        store.sync(SyncOption::PushThenPull).await.unwrap();
        assert_eq!(
            store.state().data,
            DataState::Unchanged("version two".to_string())
        );
    }

    #[tokio::test]
    async fn test_fresh_store_pushes_empty_document() {
        let remote = FakeRemote::new();
        let store = new_store(remote.clone());

        // New counts as locally unconfirmed
        store.sync(SyncOption::PushThenPull).await.unwrap();

        assert_eq!(remote.remote_doc(), Some(String::new()));
        assert_eq!(store.state().data, DataState::Unchanged(String::new()));
    }

    #[tokio::test]
    async fn test_subscribers_see_syncing_then_terminal() {
        let store = new_store(FakeRemote::new());
        let seen: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));
        let recorder = Arc::clone(&seen);
        store.on_change(move |state| {
            recorder.lock().unwrap().push(state.status.label());
        });

        store.sync(SyncOption::Pull).await.unwrap();

        assert_eq!(*seen.lock().unwrap(), vec!["syncing", "idle"]);
    }

    #[tokio::test]
    async fn test_panicking_subscriber_does_not_break_delivery() {
        let store = new_store(FakeRemote::new());
        let delivered = Arc::new(AtomicUsize::new(0));

        store.on_change(|_| panic!("misbehaving subscriber"));
        let counter = Arc::clone(&delivered);
        store.on_change(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        store.sync(SyncOption::Pull).await.unwrap();

        // Both transitions (syncing, terminal) reached the healthy one
        assert_eq!(delivered.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unsubscribe_removes_exactly_one() {
        let store = new_store(FakeRemote::new());
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&first);
        let first_id = store.on_change(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let counter = Arc::clone(&second);
        store.on_change(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(store.unsubscribe(first_id));
        assert!(!store.unsubscribe(first_id));

        store.sync(SyncOption::Pull).await.unwrap();

        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_state_returns_detached_snapshot() {
        let store = new_store(FakeRemote::new());

        let mut snapshot = store.state();
        if let DataState::New(data) = &mut snapshot.data {
            data.push_str("mutated copy");
        }

        assert_eq!(store.state().data, DataState::New(String::new()));
    }
}
