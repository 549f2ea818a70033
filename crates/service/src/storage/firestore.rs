//! Cloud document store backend talking to the Firestore REST API.
//!
//! Each name is a document `{"fields": {"name": {"stringValue": ...}}}` in
//! the configured collection; the document id is generated by the service.
//!
//! Requests carry a bearer token: a configured static token, none for an
//! emulator, otherwise Application Default Credentials through `gcp_auth`
//! (metadata server on Cloud Run/GCE, or a service-account file).

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use configs::{is_path_segment, StoreConfig};
use gcp_auth::TokenProvider;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::{NameStore, NAME_FIELD};
use crate::errors::StoreError;

const DEFAULT_ENDPOINT: &str = "https://firestore.googleapis.com";
const PAGE_SIZE: u32 = 300;
const DATASTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";

#[derive(Debug, Deserialize)]
struct FirestoreDocument {
    /// Full resource name, `projects/{p}/databases/{d}/documents/{collection}/{id}`.
    name: String,
    #[serde(default)]
    fields: HashMap<String, Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListDocumentsResponse {
    #[serde(default)]
    documents: Vec<FirestoreDocument>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum CredentialSource {
    Anonymous,
    Static(String),
    ApplicationDefault,
}

/// A static token always wins; an emulator without one goes unauthenticated.
fn credential_source(cfg: &StoreConfig) -> CredentialSource {
    let token = cfg.access_token.as_deref().map(str::trim).filter(|t| !t.is_empty());
    match (token, cfg.emulator_host.is_some()) {
        (Some(token), _) => CredentialSource::Static(token.to_string()),
        (None, true) => CredentialSource::Anonymous,
        (None, false) => CredentialSource::ApplicationDefault,
    }
}

enum Credentials {
    Anonymous,
    Static(String),
    /// Caches and refreshes tokens itself; asked once per request.
    Provider(Arc<dyn TokenProvider>),
}

impl Credentials {
    async fn resolve(source: CredentialSource) -> Result<Self, StoreError> {
        match source {
            CredentialSource::Anonymous => Ok(Credentials::Anonymous),
            CredentialSource::Static(token) => Ok(Credentials::Static(token)),
            CredentialSource::ApplicationDefault => gcp_auth::provider()
                .await
                .map(Credentials::Provider)
                .map_err(|e| StoreError::Connect(format!("no application default credentials: {e}"))),
        }
    }

    async fn bearer(&self) -> Result<Option<String>, String> {
        match self {
            Credentials::Anonymous => Ok(None),
            Credentials::Static(token) => Ok(Some(token.clone())),
            Credentials::Provider(provider) => provider
                .token(&[DATASTORE_SCOPE])
                .await
                .map(|token| Some(token.as_str().to_string()))
                .map_err(|e| format!("cannot obtain access token: {e}")),
        }
    }
}

pub struct FirestoreNameStore {
    client: Client,
    collection_url: String,
    credentials: Credentials,
}

impl FirestoreNameStore {
    /// Build the collection URL and list a single document as a liveness check.
    pub async fn connect(cfg: &StoreConfig) -> Result<Self, StoreError> {
        let project = cfg
            .project_id
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .ok_or_else(|| StoreError::Connect("firestore project id is not configured".into()))?;
        for (what, value) in [
            ("project id", project),
            ("database", cfg.firestore_database.as_str()),
            ("collection", cfg.collection.as_str()),
        ] {
            if !is_path_segment(value) {
                return Err(StoreError::Connect(format!("firestore {what} '{value}' is not a plain path segment")));
            }
        }

        let endpoint = match cfg.emulator_host.as_deref() {
            Some(host) => format!("http://{}", host.trim_end_matches('/')),
            None => DEFAULT_ENDPOINT.to_string(),
        };
        let collection_url = format!(
            "{endpoint}/v1/projects/{project}/databases/{}/documents/{}",
            cfg.firestore_database, cfg.collection
        );

        let client = Client::builder()
            .connect_timeout(cfg.connect_timeout())
            .build()
            .map_err(|e| StoreError::Connect(e.to_string()))?;

        let credentials = Credentials::resolve(credential_source(cfg)).await?;
        let store = Self { client, collection_url, credentials };
        store
            .list_page(1, None)
            .await
            .map_err(|e| StoreError::Connect(e.to_string()))?;
        debug!(url = %store.collection_url, "firestore collection reachable");
        Ok(store)
    }

    async fn authorize(&self, req: RequestBuilder) -> Result<RequestBuilder, String> {
        Ok(match self.credentials.bearer().await? {
            Some(token) => req.bearer_auth(token),
            None => req,
        })
    }

    async fn list_page(
        &self,
        page_size: u32,
        page_token: Option<&str>,
    ) -> Result<ListDocumentsResponse, StoreError> {
        let mut query = vec![("pageSize", page_size.to_string())];
        if let Some(token) = page_token {
            query.push(("pageToken", token.to_string()));
        }
        let req = self
            .authorize(self.client.get(&self.collection_url).query(&query))
            .await
            .map_err(StoreError::Read)?;
        let resp = req.send().await.map_err(|e| StoreError::Read(e.to_string()))?;
        let resp = ensure_success(resp).await.map_err(StoreError::Read)?;
        resp.json::<ListDocumentsResponse>()
            .await
            .map_err(|e| StoreError::Read(e.to_string()))
    }
}

/// Turn a non-2xx response into its status plus body text.
async fn ensure_success(resp: Response) -> Result<Response, String> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(format!("firestore returned {status}: {}", body.trim()))
}

fn document_id(resource_name: &str) -> &str {
    resource_name.rsplit('/').next().unwrap_or(resource_name)
}

fn string_field(doc: &FirestoreDocument, field: &str) -> Option<String> {
    doc.fields
        .get(field)?
        .get("stringValue")?
        .as_str()
        .map(str::to_owned)
}

#[async_trait]
impl NameStore for FirestoreNameStore {
    fn backend(&self) -> &'static str { "firestore" }

    async fn insert(&self, name: &str) -> Result<String, StoreError> {
        let body = json!({ "fields": { NAME_FIELD: { "stringValue": name } } });
        let req = self
            .authorize(self.client.post(&self.collection_url).json(&body))
            .await
            .map_err(StoreError::Write)?;
        let resp = req.send().await.map_err(|e| StoreError::Write(e.to_string()))?;
        let resp = ensure_success(resp).await.map_err(StoreError::Write)?;
        let created = resp
            .json::<FirestoreDocument>()
            .await
            .map_err(|e| StoreError::Write(e.to_string()))?;
        Ok(document_id(&created.name).to_string())
    }

    async fn list_all(&self) -> Result<Vec<String>, StoreError> {
        let mut names = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let page = self.list_page(PAGE_SIZE, page_token.as_deref()).await?;
            names.extend(page.documents.iter().filter_map(|d| string_field(d, NAME_FIELD)));
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use axum::{
        extract::{Path, Query, State},
        http::{HeaderMap, StatusCode},
        routing::get,
        Json, Router,
    };
    use configs::StoreBackend;

    /// Minimal stand-in for the Firestore documents endpoint.
    #[derive(Clone, Default)]
    struct FakeFirestore {
        docs: Arc<Mutex<Vec<Value>>>,
        fail_writes: bool,
    }

    async fn list_docs(
        State(fake): State<FakeFirestore>,
        Query(q): Query<HashMap<String, String>>,
    ) -> Json<Value> {
        let docs = fake.docs.lock().unwrap();
        let size: usize = q.get("pageSize").and_then(|s| s.parse().ok()).unwrap_or(300);
        let start: usize = q.get("pageToken").and_then(|s| s.parse().ok()).unwrap_or(0);
        let end = (start + size).min(docs.len());
        let mut out = json!({ "documents": docs[start..end].to_vec() });
        if end < docs.len() {
            out["nextPageToken"] = json!(end.to_string());
        }
        Json(out)
    }

    async fn create_doc(
        State(fake): State<FakeFirestore>,
        Path((project, database, collection)): Path<(String, String, String)>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> Result<Json<Value>, (StatusCode, String)> {
        if fake.fail_writes {
            return Err((StatusCode::FORBIDDEN, "permission denied".into()));
        }
        if headers.get("authorization").and_then(|v| v.to_str().ok()) != Some("Bearer owner") {
            return Err((StatusCode::UNAUTHORIZED, "missing token".into()));
        }
        let mut docs = fake.docs.lock().unwrap();
        let id = format!("doc{}", docs.len());
        let doc = json!({
            "name": format!("projects/{project}/databases/{database}/documents/{collection}/{id}"),
            "fields": body["fields"].clone(),
        });
        docs.push(doc.clone());
        Ok(Json(doc))
    }

    async fn spawn_fake(fake: FakeFirestore) -> String {
        let app = Router::new()
            .route(
                "/v1/projects/:project/databases/:database/documents/:collection",
                get(list_docs).post(create_doc),
            )
            .with_state(fake);
        let listener = tokio::net::TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0))
            .await
            .unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        addr.to_string()
    }

    fn cfg_for(host: String) -> StoreConfig {
        StoreConfig {
            backend: StoreBackend::Firestore,
            project_id: Some("demo-project".into()),
            emulator_host: Some(host),
            access_token: Some("owner".into()),
            ..StoreConfig::default()
        }
    }

    #[test]
    fn document_id_is_last_path_segment() {
        assert_eq!(document_id("projects/p/databases/(default)/documents/names/abc123"), "abc123");
        assert_eq!(document_id("plain"), "plain");
    }

    #[test]
    fn list_response_tolerates_missing_fields() {
        let page: ListDocumentsResponse = serde_json::from_value(json!({})).unwrap();
        assert!(page.documents.is_empty());
        assert!(page.next_page_token.is_none());

        let page: ListDocumentsResponse = serde_json::from_value(json!({
            "documents": [
                { "name": "a/1", "fields": { "name": { "stringValue": "Ada" } } },
                { "name": "a/2", "fields": { "other": { "stringValue": "x" } } },
                { "name": "a/3", "fields": { "name": { "integerValue": "3" } } },
                { "name": "a/4" }
            ],
            "nextPageToken": "t"
        }))
        .unwrap();
        let names: Vec<String> =
            page.documents.iter().filter_map(|d| string_field(d, NAME_FIELD)).collect();
        assert_eq!(names, vec!["Ada"]);
        assert_eq!(page.next_page_token.as_deref(), Some("t"));
    }

    #[test]
    fn credentials_follow_configuration() {
        let mut cfg = StoreConfig { project_id: Some("p".into()), ..StoreConfig::default() };
        assert_eq!(credential_source(&cfg), CredentialSource::ApplicationDefault);

        cfg.access_token = Some("  ".into());
        assert_eq!(credential_source(&cfg), CredentialSource::ApplicationDefault);

        cfg.access_token = Some("tok".into());
        assert_eq!(credential_source(&cfg), CredentialSource::Static("tok".into()));

        cfg.emulator_host = Some("localhost:8081".into());
        assert_eq!(credential_source(&cfg), CredentialSource::Static("tok".into()));

        cfg.access_token = None;
        assert_eq!(credential_source(&cfg), CredentialSource::Anonymous);
    }

    #[tokio::test]
    async fn emulator_without_token_sends_no_authorization() {
        let fake = FakeFirestore::default();
        let host = spawn_fake(fake).await;
        let cfg = StoreConfig { access_token: None, ..cfg_for(host) };
        let store = FirestoreNameStore::connect(&cfg).await.unwrap();

        assert!(store.list_all().await.unwrap().is_empty());
        match store.insert("Ada").await {
            Err(StoreError::Write(msg)) => assert!(msg.contains("401")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn collection_with_path_characters_fails_connect() {
        let host = spawn_fake(FakeFirestore::default()).await;
        for collection in ["names/other", "names?x=1", "names#frag", "na%2Fmes"] {
            let cfg = StoreConfig { collection: collection.into(), ..cfg_for(host.clone()) };
            match FirestoreNameStore::connect(&cfg).await {
                Err(StoreError::Connect(msg)) => assert!(msg.contains("collection"), "{msg}"),
                Err(other) => panic!("{collection}: unexpected error {other:?}"),
                Ok(_) => panic!("{collection}: connected"),
            }
        }
    }

    #[tokio::test]
    async fn insert_and_list_across_pages() {
        let fake = FakeFirestore::default();
        let host = spawn_fake(fake.clone()).await;
        let store = FirestoreNameStore::connect(&cfg_for(host)).await.unwrap();

        let mut ids = Vec::new();
        for i in 0..(PAGE_SIZE as usize + 5) {
            ids.push(store.insert(&format!("n{i}")).await.unwrap());
        }
        assert_eq!(ids[0], "doc0");

        let names = store.list_all().await.unwrap();
        assert_eq!(names.len(), PAGE_SIZE as usize + 5);
        assert_eq!(names.first().map(String::as_str), Some("n0"));
        assert_eq!(names.last().map(String::as_str), Some("n304"));
    }

    #[tokio::test]
    async fn write_rejection_surfaces_as_write_error() {
        let fake = FakeFirestore { fail_writes: true, ..FakeFirestore::default() };
        let host = spawn_fake(fake).await;
        let store = FirestoreNameStore::connect(&cfg_for(host)).await.unwrap();

        match store.insert("Ada").await {
            Err(StoreError::Write(msg)) => assert!(msg.contains("403")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unreachable_endpoint_fails_connect() {
        // bind then drop to get a port nothing listens on
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let host = listener.local_addr().unwrap().to_string();
        drop(listener);

        let res = FirestoreNameStore::connect(&cfg_for(host)).await;
        assert!(matches!(res, Err(StoreError::Connect(_))));
    }
}
