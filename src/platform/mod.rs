//! Backend platform seam: accounts, documents, blobs.
//!
//! The orchestrator only sees these traits; the SQLite/filesystem
//! implementations below are what the server wires in.

pub mod accounts;
pub mod avatars;
pub mod blobs;
pub mod documents;
pub mod query;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use url::Url;

use crate::db::models::{Account, Session, StoredFile};

pub use self::accounts::SqliteAccountService;
pub use self::blobs::FsBlobStore;
pub use self::documents::SqliteDocumentStore;
pub use self::query::Query;

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid request: {0}")]
    Invalid(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Unavailable: {0}")]
    Unavailable(String),

    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("SQL error: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type PlatformResult<T> = Result<T, PlatformError>;

/// Address of a document collection inside a database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection {
    pub database_id: String,
    pub collection_id: String,
}

impl Collection {
    pub fn new(database_id: impl Into<String>, collection_id: impl Into<String>) -> Self {
        Self {
            database_id: database_id.into(),
            collection_id: collection_id.into(),
        }
    }
}

/// A stored document: store-owned metadata plus free-form fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub created_at: String,
    pub updated_at: String,
    pub fields: Map<String, Value>,
}

impl Document {
    /// Look up a field, including the `$id`/`$createdAt`/`$updatedAt` meta attributes.
    pub fn attribute(&self, name: &str) -> Option<Value> {
        match name {
            "$id" => Some(Value::String(self.id.clone())),
            "$createdAt" => Some(Value::String(self.created_at.clone())),
            "$updatedAt" => Some(Value::String(self.updated_at.clone())),
            other => self.fields.get(other).cloned(),
        }
    }

    /// Flatten into one JSON object with the meta attributes inlined.
    pub fn into_value(self) -> Value {
        let mut map = self.fields;
        map.insert("$id".to_string(), Value::String(self.id));
        map.insert("$createdAt".to_string(), Value::String(self.created_at));
        map.insert("$updatedAt".to_string(), Value::String(self.updated_at));
        Value::Object(map)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DocumentPage {
    pub total: usize,
    pub documents: Vec<Document>,
}

/// Bytes handed to the blob store, with the client-supplied file name.
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub name: String,
    pub bytes: Bytes,
}

impl FileUpload {
    pub fn new(name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Gravity {
    Center,
    Top,
    Bottom,
    Left,
    Right,
}

impl Gravity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gravity::Center => "center",
            Gravity::Top => "top",
            Gravity::Bottom => "bottom",
            Gravity::Left => "left",
            Gravity::Right => "right",
        }
    }
}

/// Rendering parameters baked into a preview URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviewOptions {
    pub width: u32,
    pub height: u32,
    pub gravity: Gravity,
    pub quality: u8,
}

impl PreviewOptions {
    /// Used for every post image and profile picture.
    pub const IMAGE: PreviewOptions = PreviewOptions {
        width: 2000,
        height: 2000,
        gravity: Gravity::Top,
        quality: 100,
    };
}

#[async_trait]
pub trait AccountService: Send + Sync {
    /// Create an account under a caller-chosen id.
    async fn create(
        &self,
        account_id: &str,
        email: &str,
        password: &str,
        name: &str,
    ) -> PlatformResult<Account>;

    async fn create_email_password_session(
        &self,
        email: &str,
        password: &str,
    ) -> PlatformResult<Session>;

    /// Account behind a live session secret.
    async fn get(&self, session_secret: &str) -> PlatformResult<Account>;

    async fn delete_session(&self, session_secret: &str) -> PlatformResult<()>;
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn create_document(
        &self,
        collection: &Collection,
        document_id: &str,
        fields: Map<String, Value>,
    ) -> PlatformResult<Document>;

    async fn get_document(&self, collection: &Collection, document_id: &str)
        -> PlatformResult<Document>;

    async fn list_documents(
        &self,
        collection: &Collection,
        queries: &[Query],
    ) -> PlatformResult<DocumentPage>;

    /// Merge `fields` into the document and bump `$updatedAt`.
    async fn update_document(
        &self,
        collection: &Collection,
        document_id: &str,
        fields: Map<String, Value>,
    ) -> PlatformResult<Document>;

    async fn delete_document(&self, collection: &Collection, document_id: &str)
        -> PlatformResult<()>;
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn create_file(
        &self,
        bucket_id: &str,
        file_id: &str,
        upload: FileUpload,
    ) -> PlatformResult<StoredFile>;

    async fn get_file(&self, bucket_id: &str, file_id: &str) -> PlatformResult<(Bytes, StoredFile)>;

    async fn file_preview(
        &self,
        bucket_id: &str,
        file_id: &str,
        options: &PreviewOptions,
    ) -> PlatformResult<Url>;

    async fn delete_file(&self, bucket_id: &str, file_id: &str) -> PlatformResult<()>;
}

/// Resolve `path` against the public base URL, keeping any base path prefix.
pub fn public_endpoint(base: &Url, path: &str) -> PlatformResult<Url> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let with_slash = format!("{}/", base.path());
        base.set_path(&with_slash);
    }
    base.join(path)
        .map_err(|e| PlatformError::Invalid(format!("cannot build URL for {}: {}", path, e)))
}

/// Fresh id for a document, file or account.
pub fn unique_id() -> String {
    uuid::Uuid::now_v7().simple().to_string()
}

/// Store timestamp format: RFC 3339, UTC, microseconds. Sorts lexically.
pub fn timestamp_now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}
