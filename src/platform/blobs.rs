use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use rusqlite::{params, OptionalExtension};
use url::Url;

use super::{
    public_endpoint, timestamp_now, BlobStore, FileUpload, PlatformError, PlatformResult,
    PreviewOptions,
};
use crate::db::models::StoredFile;
use crate::state::DbPool;

/// Blob store keeping bytes under `<root>/<bucket>/<file id>` and metadata in SQLite.
pub struct FsBlobStore {
    pool: DbPool,
    root: PathBuf,
    public_url: Url,
    max_file_bytes: u64,
}

impl FsBlobStore {
    pub fn new(
        pool: DbPool,
        root: impl Into<PathBuf>,
        public_url: Url,
        max_file_bytes: u64,
    ) -> Self {
        Self {
            pool,
            root: root.into(),
            public_url,
            max_file_bytes,
        }
    }

    fn blob_path(&self, bucket_id: &str, file_id: &str) -> PlatformResult<PathBuf> {
        check_component("bucket id", bucket_id)?;
        check_component("file id", file_id)?;
        Ok(self.root.join(bucket_id).join(file_id))
    }

    /// Number of files currently stored in a bucket.
    pub fn count_files(&self, bucket_id: &str) -> PlatformResult<u64> {
        let conn = self.pool.get()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM files WHERE bucket_id = ?1",
            params![bucket_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Ids of every file in a bucket, oldest first.
    pub fn list_file_ids(&self, bucket_id: &str) -> PlatformResult<Vec<String>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT id FROM files WHERE bucket_id = ?1 ORDER BY created_at ASC, id ASC",
        )?;
        let ids = stmt
            .query_map(params![bucket_id], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(ids)
    }

    fn metadata(&self, bucket_id: &str, file_id: &str) -> PlatformResult<StoredFile> {
        let conn = self.pool.get()?;
        conn.query_row(
            "SELECT id, bucket_id, name, mime_type, size, created_at
             FROM files
             WHERE bucket_id = ?1 AND id = ?2",
            params![bucket_id, file_id],
            |row| {
                Ok(StoredFile {
                    id: row.get(0)?,
                    bucket_id: row.get(1)?,
                    name: row.get(2)?,
                    mime_type: row.get(3)?,
                    size: row.get::<_, i64>(4)? as u64,
                    created_at: row.get(5)?,
                })
            },
        )
        .optional()?
        .ok_or_else(|| PlatformError::NotFound(format!("file {} in bucket {}", file_id, bucket_id)))
    }
}

/// Ids become path components, so only a conservative alphabet is accepted.
fn check_component(what: &str, value: &str) -> PlatformResult<()> {
    let valid = !value.is_empty()
        && value.len() <= 64
        && !value.starts_with('.')
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.');
    if valid {
        Ok(())
    } else {
        Err(PlatformError::Invalid(format!("invalid {}: {:?}", what, value)))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn create_file(
        &self,
        bucket_id: &str,
        file_id: &str,
        upload: FileUpload,
    ) -> PlatformResult<StoredFile> {
        let path = self.blob_path(bucket_id, file_id)?;

        if upload.bytes.is_empty() {
            return Err(PlatformError::Invalid("file is empty".into()));
        }
        let size = upload.bytes.len() as u64;
        if size > self.max_file_bytes {
            return Err(PlatformError::Invalid(format!(
                "file is {} bytes, limit is {}",
                size, self.max_file_bytes
            )));
        }

        let mime_type = mime_guess::from_path(&upload.name)
            .first_or_octet_stream()
            .to_string();
        let record = StoredFile {
            id: file_id.to_string(),
            bucket_id: bucket_id.to_string(),
            name: upload.name,
            mime_type,
            size,
            created_at: timestamp_now(),
        };

        {
            let conn = self.pool.get()?;
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO files (bucket_id, id, name, mime_type, size, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    record.bucket_id,
                    record.id,
                    record.name,
                    record.mime_type,
                    record.size as i64,
                    record.created_at
                ],
            )?;
            if inserted == 0 {
                return Err(PlatformError::Conflict(format!(
                    "file {} already exists in bucket {}",
                    file_id, bucket_id
                )));
            }
        }

        let written = async {
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&path, &upload.bytes).await
        }
        .await;

        if let Err(e) = written {
            // Bytes never landed; drop the metadata row again.
            let conn = self.pool.get()?;
            conn.execute(
                "DELETE FROM files WHERE bucket_id = ?1 AND id = ?2",
                params![bucket_id, file_id],
            )?;
            return Err(e.into());
        }

        tracing::debug!("Stored file {} ({} bytes) in bucket {}", file_id, size, bucket_id);
        Ok(record)
    }

    async fn get_file(
        &self,
        bucket_id: &str,
        file_id: &str,
    ) -> PlatformResult<(Bytes, StoredFile)> {
        let path = self.blob_path(bucket_id, file_id)?;
        let record = self.metadata(bucket_id, file_id)?;
        let data = tokio::fs::read(&path).await?;
        Ok((Bytes::from(data), record))
    }

    async fn file_preview(
        &self,
        bucket_id: &str,
        file_id: &str,
        options: &PreviewOptions,
    ) -> PlatformResult<Url> {
        self.blob_path(bucket_id, file_id)?;
        self.metadata(bucket_id, file_id)?;

        let mut url = public_endpoint(
            &self.public_url,
            &format!("storage/buckets/{}/files/{}/preview", bucket_id, file_id),
        )?;
        url.query_pairs_mut()
            .append_pair("width", &options.width.to_string())
            .append_pair("height", &options.height.to_string())
            .append_pair("gravity", options.gravity.as_str())
            .append_pair("quality", &options.quality.to_string());
        Ok(url)
    }

    async fn delete_file(&self, bucket_id: &str, file_id: &str) -> PlatformResult<()> {
        let path = self.blob_path(bucket_id, file_id)?;
        self.metadata(bucket_id, file_id)?;

        // Bytes go first: a failed removal must leave the record in place.
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!("File {} had metadata but no bytes on disk", file_id);
            }
            Err(e) => return Err(e.into()),
        }

        let conn = self.pool.get()?;
        conn.execute(
            "DELETE FROM files WHERE bucket_id = ?1 AND id = ?2",
            params![bucket_id, file_id],
        )?;

        tracing::debug!("Deleted file {} from bucket {}", file_id, bucket_id);
        Ok(())
    }
}
