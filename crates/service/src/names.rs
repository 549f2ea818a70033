use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

use crate::errors::{ServiceError, StoreError};
use crate::storage::StoreHandle;

/// Request payload for adding a name. `name` stays optional so a missing
/// field is reported as a validation error instead of a decode error.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct NameInput {
    #[serde(default)]
    pub name: Option<String>,
}

impl NameInput {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: Some(name.into()) }
    }

    /// Returns the trimmed name; blank or missing names are rejected.
    pub fn validate(&self) -> Result<String, ServiceError> {
        match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => Ok(name.to_string()),
            _ => Err(ServiceError::name_required()),
        }
    }
}

/// A stored name together with the identifier the backend assigned.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct NameRecord {
    pub id: String,
    pub name: String,
}

/// Business operations over the name collection, independent of the web framework.
#[derive(Clone, Debug)]
pub struct NameService {
    handle: Arc<StoreHandle>,
}

impl NameService {
    pub fn new(handle: Arc<StoreHandle>) -> Self {
        Self { handle }
    }

    /// Store routes answer "Database not connected" before looking at the request.
    pub fn is_connected(&self) -> bool {
        self.handle.is_connected()
    }

    /// Check connectivity, then validate, trim and store a name.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    /// use service::names::{NameInput, NameService};
    /// use service::storage::{memory::MemoryNameStore, StoreHandle};
    /// let handle = StoreHandle::connected(Arc::new(MemoryNameStore::default()));
    /// let svc = NameService::new(Arc::new(handle));
    /// let rec = tokio_test::block_on(svc.add(NameInput::new("  Ada  "))).unwrap();
    /// assert_eq!(rec.name, "Ada");
    /// assert_eq!(tokio_test::block_on(svc.list()).unwrap(), vec!["Ada".to_string()]);
    /// ```
    #[instrument(skip(self, input))]
    pub async fn add(&self, input: NameInput) -> Result<NameRecord, ServiceError> {
        if !self.is_connected() {
            error!("cannot add name: database not connected");
            return Err(StoreError::Unavailable.into());
        }
        let name = match input.validate() {
            Ok(name) => name,
            Err(e) => {
                warn!("rejected name: missing or blank");
                return Err(e);
            }
        };
        match self.handle.insert(&name).await {
            Ok(id) => {
                info!(%id, %name, "name added");
                Ok(NameRecord { id, name })
            }
            Err(StoreError::Unavailable) => {
                error!("cannot add name: database not connected");
                Err(StoreError::Unavailable.into())
            }
            Err(e) => {
                error!(err = %e, "error adding name");
                Err(e.into())
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<String>, ServiceError> {
        match self.handle.list_all().await {
            Ok(names) => {
                info!(count = names.len(), "retrieved names");
                Ok(names)
            }
            Err(StoreError::Unavailable) => {
                error!("cannot list names: database not connected");
                Err(StoreError::Unavailable.into())
            }
            Err(e) => {
                error!(err = %e, "error retrieving names");
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{memory::MemoryNameStore, NameStore};
    use async_trait::async_trait;

    struct BrokenStore;

    #[async_trait]
    impl NameStore for BrokenStore {
        fn backend(&self) -> &'static str { "broken" }
        async fn insert(&self, _name: &str) -> Result<String, StoreError> {
            Err(StoreError::Write("disk full".into()))
        }
        async fn list_all(&self) -> Result<Vec<String>, StoreError> {
            Err(StoreError::Read("cursor killed".into()))
        }
    }

    fn memory_service() -> NameService {
        NameService::new(Arc::new(StoreHandle::connected(Arc::new(MemoryNameStore::default()))))
    }

    #[test]
    fn validation_trims_and_rejects_blank() {
        assert_eq!(NameInput::new(" Ada\t").validate().unwrap(), "Ada");
        assert!(matches!(NameInput::new("").validate(), Err(ServiceError::Validation(_))));
        assert!(matches!(NameInput::new(" \n ").validate(), Err(ServiceError::Validation(_))));
        assert!(matches!(NameInput::default().validate(), Err(ServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn add_then_list_returns_trimmed_names() {
        let svc = memory_service();
        let a = svc.add(NameInput::new("  Ada ")).await.unwrap();
        let b = svc.add(NameInput::new("Grace")).await.unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(svc.list().await.unwrap(), vec!["Ada", "Grace"]);
    }

    #[tokio::test]
    async fn invalid_input_is_not_stored() {
        let svc = memory_service();
        assert!(svc.add(NameInput::new("   ")).await.is_err());
        assert!(svc.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn connectivity_is_checked_before_validation() {
        let svc = NameService::new(Arc::new(StoreHandle::failed("refused")));
        assert!(!svc.is_connected());
        assert!(matches!(
            svc.add(NameInput::default()).await,
            Err(ServiceError::Store(StoreError::Unavailable))
        ));
        assert!(matches!(
            svc.add(NameInput::new("   ")).await,
            Err(ServiceError::Store(StoreError::Unavailable))
        ));
        assert!(matches!(
            svc.add(NameInput::new("Ada")).await,
            Err(ServiceError::Store(StoreError::Unavailable))
        ));
        assert!(matches!(svc.list().await, Err(ServiceError::Store(StoreError::Unavailable))));
    }

    #[tokio::test]
    async fn backend_failures_keep_their_kind() {
        let svc = NameService::new(Arc::new(StoreHandle::connected(Arc::new(BrokenStore))));
        assert!(matches!(
            svc.add(NameInput::new("Ada")).await,
            Err(ServiceError::Store(StoreError::Write(_)))
        ));
        assert!(matches!(svc.list().await, Err(ServiceError::Store(StoreError::Read(_)))));
    }
}
