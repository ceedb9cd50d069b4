use serde_json::json;

use super::{
    fields, logged, parse_tags, record, records, require, NewPost, Orchestrator, StoredImage,
    UpdatePost, INFINITE_PAGE_SIZE, RECENT_POSTS_LIMIT, SAVED_POSTS_PAGE_SIZE,
};
use crate::db::models::{Deleted, DocumentList, Post, SavedPost};
use crate::error::{ApiError, ApiResult};
use crate::platform::{unique_id, Query};

impl Orchestrator {
    /// Upload the image, derive its preview and write the post document.
    /// Any failure after the upload deletes the uploaded file again.
    pub async fn create_post(&self, post: NewPost) -> ApiResult<Post> {
        logged("create_post", self.create_post_inner(post).await)
    }

    async fn create_post_inner(&self, post: NewPost) -> ApiResult<Post> {
        require(&post.creator_id, "creator id")?;
        let upload = post
            .file
            .ok_or_else(|| ApiError::validation("an image file is required"))?;

        let image = self.store_image(upload).await?;
        tracing::debug!("Uploaded post image {}", image.id);

        let tags = parse_tags(post.tags.as_deref());

        let created = self
            .documents
            .create_document(
                &self.ids.posts(),
                &unique_id(),
                fields(json!({
                    "creator": post.creator_id,
                    "caption": post.caption,
                    "image": image.url,
                    "imageId": image.id,
                    "location": post.location,
                    "tags": tags,
                    "likes": [],
                })),
            )
            .await;

        match created {
            Ok(document) => {
                tracing::info!("Created post {}", document.id);
                record(document)
            }
            Err(e) => {
                self.delete_file(&image.id).await;
                Err(e.into())
            }
        }
    }

    /// Rewrite caption, location and tags; swap the image only when a new
    /// file is supplied. The replaced image is left in storage.
    pub async fn update_post(&self, post: UpdatePost) -> ApiResult<Post> {
        logged("update_post", self.update_post_inner(post).await)
    }

    async fn update_post_inner(&self, post: UpdatePost) -> ApiResult<Post> {
        require(&post.post_id, "post id")?;

        let (image, uploaded) = match post.file {
            Some(upload) => (self.store_image(upload).await?, true),
            None => (
                StoredImage {
                    id: post.image_id,
                    url: post.image_url,
                },
                false,
            ),
        };

        let tags = parse_tags(post.tags.as_deref());

        let updated = self
            .documents
            .update_document(
                &self.ids.posts(),
                &post.post_id,
                fields(json!({
                    "caption": post.caption,
                    "image": image.url,
                    "imageId": image.id,
                    "location": post.location,
                    "tags": tags,
                })),
            )
            .await;

        match updated {
            Ok(document) => {
                tracing::info!("Updated post {}", document.id);
                record(document)
            }
            Err(e) => {
                if uploaded {
                    self.delete_file(&image.id).await;
                }
                Err(e.into())
            }
        }
    }

    /// Delete the post document. The image blob is kept.
    pub async fn delete_post(&self, post_id: &str, image_id: &str) -> ApiResult<Deleted> {
        let result = async {
            require(post_id, "post id")?;
            require(image_id, "image id")?;

            self.documents
                .delete_document(&self.ids.posts(), post_id)
                .await?;
            Ok::<_, ApiError>(Deleted::ok())
        }
        .await;
        logged("delete_post", result)
    }

    pub async fn get_post_by_id(&self, post_id: &str) -> ApiResult<Post> {
        let result = async {
            require(post_id, "post id")?;
            record(self.documents.get_document(&self.ids.posts(), post_id).await?)
        }
        .await;
        logged("get_post_by_id", result)
    }

    /// Newest posts by creation time.
    pub async fn get_recent_posts(&self) -> ApiResult<DocumentList<Post>> {
        self.list_posts(
            "get_recent_posts",
            vec![
                Query::order_desc("$createdAt"),
                Query::limit(RECENT_POSTS_LIMIT),
            ],
        )
        .await
    }

    /// One page of the feed, most recently updated first. `cursor` is the id
    /// of the last post of the previous page.
    pub async fn get_infinite_posts(&self, cursor: Option<&str>) -> ApiResult<DocumentList<Post>> {
        let mut queries = vec![
            Query::order_desc("$updatedAt"),
            Query::limit(INFINITE_PAGE_SIZE),
        ];
        if let Some(cursor) = cursor.filter(|c| !c.is_empty()) {
            queries.push(Query::cursor_after(cursor));
        }
        self.list_posts("get_infinite_posts", queries).await
    }

    /// Full-text match on captions.
    pub async fn search_posts(&self, term: &str) -> ApiResult<DocumentList<Post>> {
        self.list_posts("search_posts", vec![Query::search("caption", term)])
            .await
    }

    async fn list_posts(
        &self,
        operation: &str,
        queries: Vec<Query>,
    ) -> ApiResult<DocumentList<Post>> {
        let result = match self.documents.list_documents(&self.ids.posts(), &queries).await {
            Ok(page) => records(page),
            Err(e) => Err(e.into()),
        };
        logged(operation, result)
    }

    /// Replace the like list wholesale with `likes`.
    pub async fn like_post(&self, post_id: &str, likes: Vec<String>) -> ApiResult<Post> {
        let result = async {
            require(post_id, "post id")?;
            let document = self
                .documents
                .update_document(&self.ids.posts(), post_id, fields(json!({ "likes": likes })))
                .await?;
            record(document)
        }
        .await;
        logged("like_post", result)
    }

    pub async fn save_post(&self, post_id: &str, user_id: &str) -> ApiResult<SavedPost> {
        let result = async {
            require(post_id, "post id")?;
            require(user_id, "user id")?;
            let document = self
                .documents
                .create_document(
                    &self.ids.saves(),
                    &unique_id(),
                    fields(json!({ "user": user_id, "post": post_id })),
                )
                .await?;
            record(document)
        }
        .await;
        logged("save_post", result)
    }

    pub async fn get_saved_post(&self, saved_record_id: &str) -> ApiResult<SavedPost> {
        let result = async {
            require(saved_record_id, "saved record id")?;
            record(
                self.documents
                    .get_document(&self.ids.saves(), saved_record_id)
                    .await?,
            )
        }
        .await;
        logged("get_saved_post", result)
    }

    /// Remove a save by the id of the save record itself.
    pub async fn delete_saved_post(&self, saved_record_id: &str) -> ApiResult<Deleted> {
        let result = async {
            require(saved_record_id, "saved record id")?;
            self.documents
                .delete_document(&self.ids.saves(), saved_record_id)
                .await?;
            Ok::<_, ApiError>(Deleted::ok())
        }
        .await;
        logged("delete_saved_post", result)
    }

    /// One page of a user's saves, newest first. `cursor` is the id of the
    /// last save of the previous page.
    pub async fn get_saved_posts(
        &self,
        user_id: &str,
        cursor: Option<&str>,
    ) -> ApiResult<DocumentList<SavedPost>> {
        let result = async {
            require(user_id, "user id")?;

            let mut queries = vec![
                Query::equal("user", user_id),
                Query::order_desc("$createdAt"),
                Query::limit(SAVED_POSTS_PAGE_SIZE),
            ];
            if let Some(cursor) = cursor.filter(|c| !c.is_empty()) {
                queries.push(Query::cursor_after(cursor));
            }
            records(
                self.documents
                    .list_documents(&self.ids.saves(), &queries)
                    .await?,
            )
        }
        .await;
        logged("get_saved_posts", result)
    }
}
