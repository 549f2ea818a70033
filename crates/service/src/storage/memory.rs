use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::NameStore;
use crate::errors::StoreError;

/// Simple in-memory store for tests and local demos.
/// Keeps `(id, name)` pairs in insertion order.
#[derive(Default)]
pub struct MemoryNameStore {
    docs: RwLock<Vec<(String, String)>>,
}

#[async_trait]
impl NameStore for MemoryNameStore {
    fn backend(&self) -> &'static str { "memory" }

    async fn insert(&self, name: &str) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        self.docs.write().await.push((id.clone(), name.to_string()));
        Ok(id)
    }

    async fn list_all(&self) -> Result<Vec<String>, StoreError> {
        let docs = self.docs.read().await;
        Ok(docs.iter().map(|(_, name)| name.clone()).collect())
    }
}
