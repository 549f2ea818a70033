//! Storage abstractions for the name collection
//!
//! `NameStore` is the capability every document-store backend implements;
//! `StoreHandle` is the connected-or-failed wrapper owned by the process.

use async_trait::async_trait;

use crate::errors::StoreError;

pub mod firestore;
pub mod handle;
pub mod json_file;
pub mod memory;
pub mod mongo;

pub use handle::{HandleState, StoreHandle};

/// Document field holding the stored name.
pub const NAME_FIELD: &str = "name";

/// Trait abstraction for name persistence.
/// Implementations can be a remote document database, a local file or memory.
#[async_trait]
pub trait NameStore: Send + Sync {
    /// Short backend label used in logs.
    fn backend(&self) -> &'static str;

    /// Store one document `{name}` and return the identifier the store assigned.
    async fn insert(&self, name: &str) -> Result<String, StoreError>;

    /// Every stored `name`, in the backend's natural iteration order.
    /// Documents without a string `name` field are skipped.
    async fn list_all(&self) -> Result<Vec<String>, StoreError>;
}
