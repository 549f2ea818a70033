use async_trait::async_trait;
use configs::StoreConfig;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, Bson, Document},
    options::ClientOptions,
    Client, Collection,
};
use tracing::debug;

use super::{NameStore, NAME_FIELD};
use crate::errors::StoreError;

const APP_NAME: &str = "names-api";

/// Self-hosted document database backend (MongoDB wire protocol).
pub struct MongoNameStore {
    collection: Collection<Document>,
}

impl MongoNameStore {
    /// Parse the URI, bound server selection by the connect timeout and
    /// `ping` the target database before handing out the collection.
    pub async fn connect(cfg: &StoreConfig) -> Result<Self, StoreError> {
        let mut opts = ClientOptions::parse(&cfg.uri)
            .await
            .map_err(|e| StoreError::Connect(e.to_string()))?;
        opts.server_selection_timeout = Some(cfg.connect_timeout());
        opts.connect_timeout = Some(cfg.connect_timeout());
        opts.app_name = Some(APP_NAME.to_string());

        let client = Client::with_options(opts).map_err(|e| StoreError::Connect(e.to_string()))?;
        let db = client.database(&cfg.database);
        db.run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| StoreError::Connect(e.to_string()))?;
        debug!(database = %cfg.database, collection = %cfg.collection, "mongodb ping ok");

        Ok(Self { collection: db.collection::<Document>(&cfg.collection) })
    }
}

fn id_to_string(id: &Bson) -> String {
    match id {
        Bson::ObjectId(oid) => oid.to_hex(),
        Bson::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn new_document(name: &str) -> Document {
    doc! { NAME_FIELD: name }
}

fn name_of(doc: &Document) -> Option<String> {
    doc.get_str(NAME_FIELD).ok().map(str::to_owned)
}

#[async_trait]
impl NameStore for MongoNameStore {
    fn backend(&self) -> &'static str { "mongodb" }

    async fn insert(&self, name: &str) -> Result<String, StoreError> {
        let res = self
            .collection
            .insert_one(new_document(name), None)
            .await
            .map_err(|e| StoreError::Write(e.to_string()))?;
        Ok(id_to_string(&res.inserted_id))
    }

    async fn list_all(&self) -> Result<Vec<String>, StoreError> {
        let mut cursor = self
            .collection
            .find(None, None)
            .await
            .map_err(|e| StoreError::Read(e.to_string()))?;

        let mut names = Vec::new();
        while let Some(doc) = cursor.try_next().await.map_err(|e| StoreError::Read(e.to_string()))? {
            if let Some(name) = name_of(&doc) {
                names.push(name);
            }
        }
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::oid::ObjectId;

    #[test]
    fn object_ids_render_as_hex() {
        let oid = ObjectId::new();
        assert_eq!(id_to_string(&Bson::ObjectId(oid)), oid.to_hex());
        assert_eq!(id_to_string(&Bson::String("custom".into())), "custom");
    }

    #[test]
    fn inserted_documents_are_listed_back() {
        let doc = new_document("Ada");
        assert_eq!(doc.keys().collect::<Vec<_>>(), vec![NAME_FIELD]);
        assert_eq!(name_of(&doc).as_deref(), Some("Ada"));
    }

    #[test]
    fn only_string_names_are_listed() {
        assert_eq!(name_of(&doc! { "name": "Ada" }).as_deref(), Some("Ada"));
        assert_eq!(name_of(&doc! { "other": "x" }), None);
        assert_eq!(name_of(&doc! { "name": 7 }), None);
        assert_eq!(name_of(&doc! { "name": Bson::Null }), None);
    }
}
