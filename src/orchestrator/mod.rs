//! Data-access orchestration over the account, document and blob services.
//!
//! Each operation is a short sequential chain of platform calls. When a later
//! step fails after an earlier one already stored a blob, the blob is deleted
//! again before the failure is returned, so no call leaves an orphaned file.
//! The orchestrator keeps no mutable state and is shared freely between requests.

mod accounts;
mod files;
mod posts;
mod users;

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use url::Url;

use crate::db::models::DocumentList;
use crate::error::{ApiError, ApiResult};
use crate::platform::{
    AccountService, BlobStore, Collection, Document, DocumentPage, DocumentStore, FileUpload,
};

pub use self::files::StoredImage;

/// Page size of the infinite post feed.
pub const INFINITE_PAGE_SIZE: usize = 10;
/// Number of posts on the recent feed.
pub const RECENT_POSTS_LIMIT: usize = 20;
/// Page size of a user's saved posts.
pub const SAVED_POSTS_PAGE_SIZE: usize = 25;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformIds {
    pub database_id: String,
    pub user_collection_id: String,
    pub post_collection_id: String,
    pub saves_collection_id: String,
    pub storage_id: String,
}

impl PlatformIds {
    pub fn users(&self) -> Collection {
        Collection::new(&self.database_id, &self.user_collection_id)
    }

    pub fn posts(&self) -> Collection {
        Collection::new(&self.database_id, &self.post_collection_id)
    }

    pub fn saves(&self) -> Collection {
        Collection::new(&self.database_id, &self.saves_collection_id)
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub username: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub creator_id: String,
    pub caption: String,
    pub file: Option<FileUpload>,
    pub location: String,
    pub tags: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UpdatePost {
    pub post_id: String,
    pub caption: String,
    pub location: String,
    pub tags: Option<String>,
    pub image_url: String,
    pub image_id: String,
    pub file: Option<FileUpload>,
}

#[derive(Debug, Clone)]
pub struct UpdateUser {
    pub user_id: String,
    pub name: String,
    pub bio: String,
    pub image_url: String,
    pub image_id: Option<String>,
    pub file: Option<FileUpload>,
}

pub struct Orchestrator {
    accounts: Arc<dyn AccountService>,
    documents: Arc<dyn DocumentStore>,
    blobs: Arc<dyn BlobStore>,
    ids: PlatformIds,
    public_url: Url,
}

impl Orchestrator {
    pub fn new(
        accounts: Arc<dyn AccountService>,
        documents: Arc<dyn DocumentStore>,
        blobs: Arc<dyn BlobStore>,
        ids: PlatformIds,
        public_url: Url,
    ) -> Self {
        Self {
            accounts,
            documents,
            blobs,
            ids,
            public_url,
        }
    }
}

/// Split a comma-separated tag string after removing every whitespace character.
/// Empty segments are dropped, so `None` and `""` both give no tags.
pub fn parse_tags(tags: Option<&str>) -> Vec<String> {
    let compact: String = tags
        .unwrap_or_default()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    compact
        .split(',')
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

fn require(value: &str, what: &str) -> ApiResult<()> {
    if value.trim().is_empty() {
        return Err(ApiError::validation(format!("{} is required", what)));
    }
    Ok(())
}

fn record<T: DeserializeOwned>(document: Document) -> ApiResult<T> {
    let id = document.id.clone();
    serde_json::from_value(document.into_value())
        .map_err(|e| ApiError::upstream(format!("malformed document {}: {}", id, e)))
}

fn records<T: DeserializeOwned>(page: DocumentPage) -> ApiResult<DocumentList<T>> {
    let documents = page
        .documents
        .into_iter()
        .map(record)
        .collect::<ApiResult<Vec<T>>>()?;
    Ok(DocumentList {
        total: page.total,
        documents,
    })
}

fn fields(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Log a failed operation at its boundary and hand the error back.
fn logged<T>(operation: &str, result: ApiResult<T>) -> ApiResult<T> {
    if let Err(e) = &result {
        tracing::error!("{} failed: {}", operation, e);
    }
    result
}
