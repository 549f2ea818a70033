use std::sync::Arc;

use configs::{StoreBackend, StoreConfig};
use tracing::{error, info};

use super::{
    firestore::FirestoreNameStore, json_file::JsonFileNameStore, memory::MemoryNameStore,
    mongo::MongoNameStore, NameStore,
};
use crate::errors::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    Unconnected,
    Connected,
    Failed,
}

enum Inner {
    Unconnected,
    Connected(Arc<dyn NameStore>),
    Failed(String),
}

/// Process-wide connection to the name collection.
///
/// Built once at startup and never mutated afterwards; a failed connect
/// stays failed for the lifetime of the process.
pub struct StoreHandle {
    inner: Inner,
}

impl StoreHandle {
    pub fn unconnected() -> Self {
        Self { inner: Inner::Unconnected }
    }

    pub fn connected(store: Arc<dyn NameStore>) -> Self {
        Self { inner: Inner::Connected(store) }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self { inner: Inner::Failed(reason.into()) }
    }

    /// Connect to the configured backend and run its liveness check.
    ///
    /// Never returns an error: timeouts, refusals and auth failures all
    /// produce a `Failed` handle and an error log line.
    pub async fn connect(cfg: &StoreConfig) -> Self {
        let timeout = cfg.connect_timeout();
        let backend = cfg.backend;

        let attempt = async {
            let store: Arc<dyn NameStore> = match backend {
                StoreBackend::Mongodb => Arc::new(MongoNameStore::connect(cfg).await?),
                StoreBackend::Firestore => Arc::new(FirestoreNameStore::connect(cfg).await?),
                StoreBackend::File => Arc::new(JsonFileNameStore::open(&cfg.file_path).await?),
                StoreBackend::Memory => Arc::new(MemoryNameStore::default()),
            };
            Ok::<_, StoreError>(store)
        };

        match tokio::time::timeout(timeout, attempt).await {
            Ok(Ok(store)) => {
                info!(%backend, collection = %cfg.collection, "connected to document store");
                Self::connected(store)
            }
            Ok(Err(e)) => {
                error!(%backend, err = %e, "failed to connect to document store");
                Self::failed(e.to_string())
            }
            Err(_) => {
                let reason = format!("connection timed out after {}s", timeout.as_secs());
                error!(%backend, err = %reason, "failed to connect to document store");
                Self::failed(reason)
            }
        }
    }

    pub fn state(&self) -> HandleState {
        match self.inner {
            Inner::Unconnected => HandleState::Unconnected,
            Inner::Connected(_) => HandleState::Connected,
            Inner::Failed(_) => HandleState::Failed,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state() == HandleState::Connected
    }

    /// Reason recorded by a failed connect.
    pub fn failure(&self) -> Option<&str> {
        match &self.inner {
            Inner::Failed(reason) => Some(reason),
            _ => None,
        }
    }

    pub fn backend(&self) -> Option<&'static str> {
        match &self.inner {
            Inner::Connected(store) => Some(store.backend()),
            _ => None,
        }
    }

    fn store(&self) -> Result<&Arc<dyn NameStore>, StoreError> {
        match &self.inner {
            Inner::Connected(store) => Ok(store),
            _ => Err(StoreError::Unavailable),
        }
    }

    pub async fn insert(&self, name: &str) -> Result<String, StoreError> {
        self.store()?.insert(name).await
    }

    pub async fn list_all(&self) -> Result<Vec<String>, StoreError> {
        self.store()?.list_all().await
    }
}

impl Default for StoreHandle {
    fn default() -> Self {
        Self::unconnected()
    }
}

impl std::fmt::Debug for StoreHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut s = f.debug_struct("StoreHandle");
        s.field("state", &self.state());
        match &self.inner {
            Inner::Connected(store) => {
                s.field("backend", &store.backend());
            }
            Inner::Failed(reason) => {
                s.field("failure", reason);
            }
            Inner::Unconnected => {}
        }
        s.finish()
    }
}
