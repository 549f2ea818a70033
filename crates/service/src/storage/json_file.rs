use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::{fs, sync::RwLock};
use uuid::Uuid;

use super::{NameStore, NAME_FIELD};
use crate::errors::StoreError;

const ID_FIELD: &str = "_id";

type Doc = Map<String, Value>;

/// JSON file-backed document collection.
///
/// Persists the collection as a JSON array of objects, one per document,
/// in insertion order. Intended for single-node setups where running a
/// database server is overkill.
pub struct JsonFileNameStore {
    docs: RwLock<Vec<Doc>>,
    file_path: PathBuf,
}

impl JsonFileNameStore {
    /// Open the collection at `path`. Creates the file with an empty array if missing.
    /// A file that exists but does not hold a JSON array is a connect failure.
    pub async fn open<P: Into<PathBuf>>(path: P) -> Result<Self, StoreError> {
        let file_path = path.into();
        if let Some(parent) = file_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::Connect(format!("cannot create {}: {e}", parent.display())))?;
        }

        let docs: Vec<Doc> = match fs::read(&file_path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                StoreError::Connect(format!("{} is not a document array: {e}", file_path.display()))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                fs::write(&file_path, b"[]")
                    .await
                    .map_err(|e| StoreError::Connect(e.to_string()))?;
                Vec::new()
            }
            Err(e) => return Err(StoreError::Connect(e.to_string())),
        };

        Ok(Self { docs: RwLock::new(docs), file_path })
    }

    async fn save(&self, docs: &[Doc]) -> Result<(), StoreError> {
        let data = serde_json::to_vec_pretty(docs).map_err(|e| StoreError::Write(e.to_string()))?;
        fs::write(&self.file_path, data).await.map_err(|e| StoreError::Write(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl NameStore for JsonFileNameStore {
    fn backend(&self) -> &'static str { "file" }

    async fn insert(&self, name: &str) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        let mut doc = Doc::new();
        doc.insert(ID_FIELD.to_string(), Value::String(id.clone()));
        doc.insert(NAME_FIELD.to_string(), Value::String(name.to_string()));

        // 持有写锁直到落盘，保证文件内容与内存顺序一致
        let mut docs = self.docs.write().await;
        docs.push(doc);
        if let Err(e) = self.save(&docs).await {
            docs.pop();
            return Err(e);
        }
        Ok(id)
    }

    async fn list_all(&self) -> Result<Vec<String>, StoreError> {
        let docs = self.docs.read().await;
        Ok(docs
            .iter()
            .filter_map(|doc| doc.get(NAME_FIELD).and_then(Value::as_str))
            .map(str::to_owned)
            .collect())
    }
}
