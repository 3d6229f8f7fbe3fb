/// Immutable card catalog.
pub mod catalog;
/// Live play session.
pub mod session;
/// Question/reveal state machine.
pub mod session_machine;
mod sse;
/// Identity and reconciliation state.
pub mod sync;

use std::sync::Arc;

use tokio::sync::{Mutex, RwLock, watch};

use crate::{
    config::AppConfig,
    dao::{local_store::LocalStatsStore, remote_store::RemoteStatsStore},
    state::{
        catalog::Catalog,
        session::SessionTracker,
        sync::{Identity, SyncGuard, SyncStatus},
    },
};

pub use self::sse::SseHub;

/// State handle shared by handlers and background tasks.
pub type SharedState = Arc<AppState>;

/// Capacity of the SSE broadcast channel.
const EVENTS_CAPACITY: usize = 32;

/// Application context: catalog, stores, identity, session and sync bookkeeping.
pub struct AppState {
    config: AppConfig,
    catalog: Arc<Catalog>,
    local: Arc<LocalStatsStore>,
    remote_store: RwLock<Option<Arc<dyn RemoteStatsStore>>>,
    identity: watch::Sender<Identity>,
    session: Mutex<SessionTracker>,
    sync_guard: Mutex<SyncGuard>,
    sync_status: watch::Sender<SyncStatus>,
    events: SseHub,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts anonymous and in degraded mode until a remote store is installed.
    pub fn new(config: AppConfig, catalog: Catalog, local: LocalStatsStore) -> SharedState {
        let catalog = Arc::new(catalog);
        let local = Arc::new(local);
        let session =
            SessionTracker::new(catalog.clone(), local.clone(), config.recent_answers_limit);
        Self::with_session(config, catalog, local, session)
    }

    /// Construct the state around an already built session tracker.
    pub fn with_session(
        config: AppConfig,
        catalog: Arc<Catalog>,
        local: Arc<LocalStatsStore>,
        session: SessionTracker,
    ) -> SharedState {
        let (identity_tx, _rx) = watch::channel(Identity::Anonymous);
        let (sync_status_tx, _rx) = watch::channel(SyncStatus::default());
        Arc::new(Self {
            config,
            catalog,
            local,
            remote_store: RwLock::new(None),
            identity: identity_tx,
            session: Mutex::new(session),
            sync_guard: Mutex::new(SyncGuard::default()),
            sync_status: sync_status_tx,
            events: SseHub::new(EVENTS_CAPACITY),
        })
    }

    /// Runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Loaded card catalog.
    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Device-local stats store.
    pub fn local(&self) -> &Arc<LocalStatsStore> {
        &self.local
    }

    /// Obtain a handle to the current remote store, if one is installed.
    pub async fn remote_store(&self) -> Option<Arc<dyn RemoteStatsStore>> {
        let guard = self.remote_store.read().await;
        guard.as_ref().cloned()
    }

    /// Install a new remote store implementation and leave degraded mode.
    pub async fn install_remote_store(&self, store: Arc<dyn RemoteStatsStore>) {
        {
            let mut guard = self.remote_store.write().await;
            *guard = Some(store);
        }
    }

    /// Remove the current remote store and enter degraded mode.
    pub async fn clear_remote_store(&self) {
        {
            let mut guard = self.remote_store.write().await;
            guard.take();
        }
    }

    /// Current degraded flag.
    pub async fn is_degraded(&self) -> bool {
        let guard = self.remote_store.read().await;
        guard.is_none()
    }

    /// Current identity.
    pub fn identity(&self) -> Identity {
        self.identity.borrow().clone()
    }

    /// Replace the identity, returning the previous one.
    pub fn set_identity(&self, identity: Identity) -> Identity {
        self.identity.send_replace(identity)
    }

    /// Live play session, serialized behind an async mutex.
    pub fn session(&self) -> &Mutex<SessionTracker> {
        &self.session
    }

    /// Reconciliation guard for the current sign-in session.
    pub fn sync_guard(&self) -> &Mutex<SyncGuard> {
        &self.sync_guard
    }

    /// Latest sync indicator.
    pub fn sync_status(&self) -> SyncStatus {
        self.sync_status.borrow().clone()
    }

    /// Mutate the sync status in place and notify watchers, returning the new value.
    pub fn update_sync_status(&self, update: impl FnOnce(&mut SyncStatus)) -> SyncStatus {
        self.sync_status.send_modify(update);
        self.sync_status()
    }

    /// Subscribe to sync status updates.
    pub fn sync_status_watcher(&self) -> watch::Receiver<SyncStatus> {
        self.sync_status.subscribe()
    }

    /// Broadcast hub feeding the SSE stream.
    pub fn events(&self) -> &SseHub {
        &self.events
    }
}
