use std::{fmt, path::Path, str::FromStr, time::Duration};

use anyhow::{anyhow, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: default_host(), port: default_port() }
    }
}

/// Which document-store implementation backs the name collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Mongodb,
    Firestore,
    File,
    Memory,
}

impl StoreBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreBackend::Mongodb => "mongodb",
            StoreBackend::Firestore => "firestore",
            StoreBackend::File => "file",
            StoreBackend::Memory => "memory",
        }
    }
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mongodb" | "mongo" => Ok(StoreBackend::Mongodb),
            "firestore" => Ok(StoreBackend::Firestore),
            "file" => Ok(StoreBackend::File),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(anyhow!("unknown store backend '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    /// Connection string for the self-hosted document database.
    #[serde(default = "default_uri")]
    pub uri: String,
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default = "default_collection")]
    pub collection: String,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default = "default_firestore_database")]
    pub firestore_database: String,
    /// `host:port` of a local Firestore emulator; switches the client to plain http.
    #[serde(default)]
    pub emulator_host: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default = "default_file_path")]
    pub file_path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            uri: default_uri(),
            database: default_database(),
            collection: default_collection(),
            connect_timeout_secs: default_connect_timeout(),
            project_id: None,
            firestore_database: default_firestore_database(),
            emulator_host: None,
            access_token: None,
            file_path: default_file_path(),
        }
    }
}

impl StoreConfig {
    /// In-process store, used by tests and local demos.
    pub fn memory() -> Self {
        Self { backend: StoreBackend::Memory, ..Self::default() }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "compact" | "text" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            other => Err(anyhow!("unknown log format '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
}

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_uri() -> String { "mongodb://localhost:27017".to_string() }
fn default_database() -> String { "names_db".to_string() }
fn default_collection() -> String { "names".to_string() }
fn default_connect_timeout() -> u64 { 5 }
fn default_firestore_database() -> String { "(default)".to_string() }
fn default_file_path() -> String { "data/names.json".to_string() }

/// Load `CONFIG_PATH` (or `config.toml`); a missing file means defaults.
pub fn load_default() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    if !Path::new(&path).exists() {
        return Ok(AppConfig::default());
    }
    load_from_file(&path)
}

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let cfg: AppConfig = toml::from_str(&content)?;
    Ok(cfg)
}

impl AppConfig {
    /// File values, then process environment overrides, then validation.
    pub fn load_and_validate() -> Result<Self> {
        let mut cfg = load_default()?;
        cfg.apply_env(|key| std::env::var(key).ok())?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Override file values with environment-style lookups.
    ///
    /// Blank values are ignored so an exported-but-empty variable does not
    /// wipe a configured default.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(host) = get("SERVER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = get("PORT") {
            self.server.port = port
                .trim()
                .parse::<u16>()
                .map_err(|e| anyhow!("PORT '{port}' is not a valid port: {e}"))?;
        }

        if let Some(backend) = get("STORE_BACKEND") {
            self.store.backend = backend.parse()?;
        }
        if let Some(uri) = get("MONGODB_URI") {
            self.store.uri = uri;
        }
        if let Some(database) = get("DATABASE_NAME") {
            self.store.database = database;
        }
        if let Some(collection) = get("COLLECTION_NAME") {
            self.store.collection = collection;
        }
        if let Some(secs) = get("STORE_CONNECT_TIMEOUT_SECS") {
            self.store.connect_timeout_secs = secs
                .trim()
                .parse::<u64>()
                .map_err(|e| anyhow!("STORE_CONNECT_TIMEOUT_SECS '{secs}' is invalid: {e}"))?;
        }
        // 兼容 GCP 运行时自动注入的 GOOGLE_CLOUD_PROJECT
        if let Some(project) = get("FIRESTORE_PROJECT_ID").or_else(|| get("GOOGLE_CLOUD_PROJECT")) {
            self.store.project_id = Some(project);
        }
        if let Some(database) = get("FIRESTORE_DATABASE") {
            self.store.firestore_database = database;
        }
        if let Some(host) = get("FIRESTORE_EMULATOR_HOST") {
            self.store.emulator_host = Some(host);
        }
        if let Some(token) = get("GOOGLE_OAUTH_ACCESS_TOKEN") {
            self.store.access_token = Some(token);
        }
        if let Some(path) = get("STORE_FILE_PATH") {
            self.store.file_path = path;
        }

        if let Some(format) = get("LOG_FORMAT") {
            self.logging.format = format.parse()?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.host.trim().is_empty() {
            return Err(anyhow!("server.host must not be empty"));
        }
        if self.server.port == 0 {
            return Err(anyhow!("server.port must be in 1..=65535"));
        }
        if self.store.collection.trim().is_empty() {
            return Err(anyhow!("store.collection must not be empty"));
        }
        if self.store.database.trim().is_empty() {
            return Err(anyhow!("store.database must not be empty"));
        }
        // collection, database and project end up as Firestore URL path segments
        for (key, value) in [
            ("store.collection", Some(self.store.collection.as_str())),
            ("store.firestore_database", Some(self.store.firestore_database.as_str())),
            ("store.project_id", self.store.project_id.as_deref()),
        ] {
            if let Some(value) = value {
                if !is_path_segment(value) {
                    return Err(anyhow!("{key} must not contain '/', '?', '#', '%' or control characters"));
                }
            }
        }
        if self.store.connect_timeout_secs == 0 {
            return Err(anyhow!("store.connect_timeout_secs must be a positive number of seconds"));
        }
        Ok(())
    }
}

/// True when `value` can be placed in a URL path without escaping it away.
pub fn is_path_segment(value: &str) -> bool {
    !value.is_empty() && !value.chars().any(|c| matches!(c, '/' | '?' | '#' | '%') || c.is_control())
}
