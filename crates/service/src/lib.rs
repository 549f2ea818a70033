//! Service layer for the names collection.
//! - `storage` hides each document-store backend behind the `NameStore` trait.
//! - `names` holds validation and the add/list operations used by the HTTP layer.

pub mod errors;
pub mod names;
pub mod storage;

pub use names::{NameInput, NameRecord, NameService};
pub use storage::{HandleState, StoreHandle};
