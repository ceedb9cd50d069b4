use serde_json::json;

use super::{fields, logged, record, records, require, Orchestrator, StoredImage, UpdateUser};
use crate::db::models::{DocumentList, UserProfile};
use crate::error::ApiResult;
use crate::platform::Query;

impl Orchestrator {
    /// Update name, bio and picture. With a new file, the new upload is
    /// removed if the write fails and the previous picture is removed once
    /// the write succeeds.
    pub async fn update_user(&self, user: UpdateUser) -> ApiResult<UserProfile> {
        logged("update_user", self.update_user_inner(user).await)
    }

    async fn update_user_inner(&self, user: UpdateUser) -> ApiResult<UserProfile> {
        require(&user.user_id, "user id")?;

        let (image_url, image_id, uploaded) = match user.file {
            Some(upload) => {
                let StoredImage { id, url } = self.store_image(upload).await?;
                (url, Some(id), true)
            }
            None => (user.image_url, user.image_id.clone(), false),
        };

        let updated = self
            .documents
            .update_document(
                &self.ids.users(),
                &user.user_id,
                fields(json!({
                    "name": user.name,
                    "bio": user.bio,
                    "imageUrl": image_url,
                    "imageId": image_id,
                })),
            )
            .await;

        let document = match updated {
            Ok(document) => document,
            Err(e) => {
                if let (true, Some(new_id)) = (uploaded, image_id.as_deref()) {
                    self.delete_file(new_id).await;
                }
                return Err(e.into());
            }
        };

        if uploaded {
            if let Some(old_id) = user.image_id.as_deref().filter(|id| !id.is_empty()) {
                self.delete_file(old_id).await;
            }
        }

        tracing::info!("Updated user {}", document.id);
        record(document)
    }

    pub async fn get_user_by_id(&self, user_id: &str) -> ApiResult<UserProfile> {
        let result = async {
            require(user_id, "user id")?;
            record(self.documents.get_document(&self.ids.users(), user_id).await?)
        }
        .await;
        logged("get_user_by_id", result)
    }

    /// Users by creation time, newest first. `None` or `Some(0)` means no explicit cap.
    pub async fn get_users(&self, limit: Option<usize>) -> ApiResult<DocumentList<UserProfile>> {
        let mut queries = vec![Query::order_desc("$createdAt")];
        if let Some(limit) = limit.filter(|n| *n > 0) {
            queries.push(Query::limit(limit));
        }

        let result = match self.documents.list_documents(&self.ids.users(), &queries).await {
            Ok(page) => records(page),
            Err(e) => Err(e.into()),
        };
        logged("get_users", result)
    }
}
