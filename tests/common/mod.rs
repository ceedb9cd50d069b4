//! Shared harness: real SQLite/filesystem platform services wrapped in
//! switches that make individual calls fail on demand.
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::{Map, Value};
use tempfile::TempDir;
use url::Url;

use picgram::db;
use picgram::db::models::{StoredFile, UserProfile};
use picgram::orchestrator::{NewUser, Orchestrator, PlatformIds};
use picgram::platform::{
    BlobStore, Collection, Document, DocumentPage, DocumentStore, FileUpload, FsBlobStore,
    PlatformError, PlatformResult, PreviewOptions, Query, SqliteAccountService,
    SqliteDocumentStore,
};

pub const PUBLIC_URL: &str = "http://localhost:3000";
pub const BUCKET: &str = "media";

pub fn ids() -> PlatformIds {
    PlatformIds {
        database_id: "main".to_string(),
        user_collection_id: "users".to_string(),
        post_collection_id: "posts".to_string(),
        saves_collection_id: "saves".to_string(),
        storage_id: BUCKET.to_string(),
    }
}

fn injected(what: &str) -> PlatformError {
    PlatformError::Unavailable(format!("injected {} failure", what))
}

#[derive(Default)]
pub struct Switches {
    pub fail_upload: AtomicBool,
    pub fail_preview: AtomicBool,
    pub fail_delete_file: AtomicBool,
    pub fail_create_document: AtomicBool,
    pub fail_update_document: AtomicBool,
    pub document_calls: AtomicUsize,
    pub blob_calls: AtomicUsize,
}

impl Switches {
    pub fn set(flag: &AtomicBool, on: bool) {
        flag.store(on, Ordering::SeqCst);
    }

    pub fn store_calls(&self) -> usize {
        self.document_calls.load(Ordering::SeqCst) + self.blob_calls.load(Ordering::SeqCst)
    }
}

pub struct FlakyDocuments {
    inner: SqliteDocumentStore,
    switches: Arc<Switches>,
}

#[async_trait]
impl DocumentStore for FlakyDocuments {
    async fn create_document(
        &self,
        collection: &Collection,
        document_id: &str,
        fields: Map<String, Value>,
    ) -> PlatformResult<Document> {
        self.switches.document_calls.fetch_add(1, Ordering::SeqCst);
        if self.switches.fail_create_document.load(Ordering::SeqCst) {
            return Err(injected("create document"));
        }
        self.inner
            .create_document(collection, document_id, fields)
            .await
    }

    async fn get_document(
        &self,
        collection: &Collection,
        document_id: &str,
    ) -> PlatformResult<Document> {
        self.switches.document_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.get_document(collection, document_id).await
    }

    async fn list_documents(
        &self,
        collection: &Collection,
        queries: &[Query],
    ) -> PlatformResult<DocumentPage> {
        self.switches.document_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.list_documents(collection, queries).await
    }

    async fn update_document(
        &self,
        collection: &Collection,
        document_id: &str,
        fields: Map<String, Value>,
    ) -> PlatformResult<Document> {
        self.switches.document_calls.fetch_add(1, Ordering::SeqCst);
        if self.switches.fail_update_document.load(Ordering::SeqCst) {
            return Err(injected("update document"));
        }
        self.inner
            .update_document(collection, document_id, fields)
            .await
    }

    async fn delete_document(
        &self,
        collection: &Collection,
        document_id: &str,
    ) -> PlatformResult<()> {
        self.switches.document_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.delete_document(collection, document_id).await
    }
}

pub struct FlakyBlobs {
    inner: Arc<FsBlobStore>,
    switches: Arc<Switches>,
}

#[async_trait]
impl BlobStore for FlakyBlobs {
    async fn create_file(
        &self,
        bucket_id: &str,
        file_id: &str,
        upload: FileUpload,
    ) -> PlatformResult<StoredFile> {
        self.switches.blob_calls.fetch_add(1, Ordering::SeqCst);
        if self.switches.fail_upload.load(Ordering::SeqCst) {
            return Err(injected("upload"));
        }
        self.inner.create_file(bucket_id, file_id, upload).await
    }

    async fn get_file(
        &self,
        bucket_id: &str,
        file_id: &str,
    ) -> PlatformResult<(Bytes, StoredFile)> {
        self.switches.blob_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.get_file(bucket_id, file_id).await
    }

    async fn file_preview(
        &self,
        bucket_id: &str,
        file_id: &str,
        options: &PreviewOptions,
    ) -> PlatformResult<Url> {
        self.switches.blob_calls.fetch_add(1, Ordering::SeqCst);
        if self.switches.fail_preview.load(Ordering::SeqCst) {
            return Err(injected("preview"));
        }
        self.inner.file_preview(bucket_id, file_id, options).await
    }

    async fn delete_file(&self, bucket_id: &str, file_id: &str) -> PlatformResult<()> {
        self.switches.blob_calls.fetch_add(1, Ordering::SeqCst);
        if self.switches.fail_delete_file.load(Ordering::SeqCst) {
            return Err(injected("delete file"));
        }
        self.inner.delete_file(bucket_id, file_id).await
    }
}

pub struct Harness {
    _tmp: TempDir,
    pub blobs: Arc<FsBlobStore>,
    pub switches: Arc<Switches>,
    pub orchestrator: Orchestrator,
}

impl Harness {
    pub fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        let pool = db::memory_pool().unwrap();
        db::run_migrations(&pool).unwrap();

        let public_url = Url::parse(PUBLIC_URL).unwrap();
        let switches = Arc::new(Switches::default());
        let blobs = Arc::new(FsBlobStore::new(
            pool.clone(),
            tmp.path().join("uploads"),
            public_url.clone(),
            1024 * 1024,
        ));

        let orchestrator = Orchestrator::new(
            Arc::new(SqliteAccountService::new(pool.clone(), 24, 4)),
            Arc::new(FlakyDocuments {
                inner: SqliteDocumentStore::new(pool),
                switches: switches.clone(),
            }),
            Arc::new(FlakyBlobs {
                inner: blobs.clone(),
                switches: switches.clone(),
            }),
            ids(),
            public_url,
        );

        Self {
            _tmp: tmp,
            blobs,
            switches,
            orchestrator,
        }
    }

    pub fn live_files(&self) -> Vec<String> {
        self.blobs.list_file_ids(BUCKET).unwrap()
    }

    pub fn reset_calls(&self) {
        self.switches.document_calls.store(0, Ordering::SeqCst);
        self.switches.blob_calls.store(0, Ordering::SeqCst);
    }

    pub async fn user(&self, name: &str) -> UserProfile {
        let email = format!("{}@example.com", name.to_lowercase().replace(' ', "."));
        self.orchestrator
            .create_account(NewUser {
                name: name.to_string(),
                email,
                password: "correct horse battery".to_string(),
                username: Some(name.to_lowercase().replace(' ', "_")),
            })
            .await
            .unwrap()
    }
}

pub fn image(name: &str) -> FileUpload {
    FileUpload::new(name, format!("bytes of {}", name).into_bytes())
}

pub fn preview_url(file_id: &str) -> String {
    format!(
        "{}/storage/buckets/{}/files/{}/preview?width=2000&height=2000&gravity=top&quality=100",
        PUBLIC_URL, BUCKET, file_id
    )
}
