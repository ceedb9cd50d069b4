use url::Url;

use super::Orchestrator;
use crate::db::models::StoredFile;
use crate::error::{ApiError, ApiResult};
use crate::platform::{unique_id, FileUpload, PreviewOptions};

/// An uploaded blob together with its derived preview URL. The two are only
/// ever written to a record as a pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    pub id: String,
    pub url: String,
}

impl Orchestrator {
    /// Store a blob under a fresh id. Failures are always returned so that
    /// multi-step callers stop before writing any document.
    pub async fn upload_file(&self, upload: FileUpload) -> ApiResult<StoredFile> {
        let file_id = unique_id();
        self.blobs
            .create_file(&self.ids.storage_id, &file_id, upload)
            .await
            .map_err(|e| {
                tracing::error!("File upload failed: {}", e);
                ApiError::from(e)
            })
    }

    /// Preview URL for a stored file with the fixed image rendering parameters.
    pub async fn get_file_preview(&self, file_id: &str) -> ApiResult<Url> {
        self.blobs
            .file_preview(&self.ids.storage_id, file_id, &PreviewOptions::IMAGE)
            .await
            .map_err(|e| {
                tracing::error!("File preview generation failed for {}: {}", file_id, e);
                ApiError::from(e)
            })
    }

    /// Best-effort delete. Errors are logged and swallowed so a compensating
    /// delete never replaces the failure that triggered it.
    pub async fn delete_file(&self, file_id: &str) -> bool {
        match self.blobs.delete_file(&self.ids.storage_id, file_id).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Failed to delete file {}: {}", file_id, e);
                false
            }
        }
    }

    /// Upload then derive the preview URL; removes the upload again when the
    /// preview cannot be derived.
    pub(super) async fn store_image(&self, upload: FileUpload) -> ApiResult<StoredImage> {
        let file = self.upload_file(upload).await?;

        match self.get_file_preview(&file.id).await {
            Ok(url) => Ok(StoredImage {
                id: file.id,
                url: url.to_string(),
            }),
            Err(e) => {
                self.delete_file(&file.id).await;
                Err(e)
            }
        }
    }
}
