use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, put};
use axum::{Json, Router};
use serde::Deserialize;

use crate::db::models::Post;
use crate::error::{ApiError, ApiResult};
use crate::extractors::CurrentUser;
use crate::orchestrator::{NewPost, UpdatePost};
use crate::routes::FormData;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct FeedParams {
    pub cursor: Option<String>,
}

#[derive(Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteParams {
    #[serde(default)]
    pub image_id: String,
}

#[derive(Deserialize)]
pub struct LikesRequest {
    pub likes: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRequest {
    pub post_id: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/posts", get(infinite_posts).post(create_post))
        .route("/api/posts/recent", get(recent_posts))
        .route("/api/posts/search", get(search_posts))
        .route(
            "/api/posts/{id}",
            get(get_post).put(update_post).delete(delete_post),
        )
        .route("/api/posts/{id}/likes", put(like_post))
        .route("/api/saves", get(saved_posts).post(save_post))
        .route("/api/saves/{id}", delete(delete_saved_post))
}

async fn infinite_posts(
    State(state): State<AppState>,
    Query(params): Query<FeedParams>,
) -> ApiResult<Response> {
    let page = state
        .orchestrator
        .get_infinite_posts(params.cursor.as_deref())
        .await?;
    Ok(Json(page).into_response())
}

async fn recent_posts(State(state): State<AppState>) -> ApiResult<Response> {
    let page = state.orchestrator.get_recent_posts().await?;
    Ok(Json(page).into_response())
}

async fn search_posts(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Response> {
    let page = state.orchestrator.search_posts(&params.q).await?;
    Ok(Json(page).into_response())
}

async fn get_post(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Response> {
    let post = state.orchestrator.get_post_by_id(&id).await?;
    Ok(Json(post).into_response())
}

async fn create_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    multipart: Multipart,
) -> ApiResult<Response> {
    let form = FormData::read(multipart).await?;

    let post = state
        .orchestrator
        .create_post(NewPost {
            creator_id: user.id,
            caption: form.text("caption"),
            location: form.text("location"),
            tags: form.optional("tags"),
            file: form.file,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(post)).into_response())
}

async fn update_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    multipart: Multipart,
) -> ApiResult<Response> {
    let existing = owned_post(&state, &user.id, &id).await?;
    let form = FormData::read(multipart).await?;

    let post = state
        .orchestrator
        .update_post(UpdatePost {
            post_id: id,
            caption: form.text("caption"),
            location: form.text("location"),
            tags: form.optional("tags"),
            image_url: existing.image_url,
            image_id: existing.image_id,
            file: form.file,
        })
        .await?;

    Ok(Json(post).into_response())
}

async fn delete_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    Query(params): Query<DeleteParams>,
) -> ApiResult<Response> {
    if params.image_id.trim().is_empty() {
        return Err(ApiError::validation("image id is required"));
    }
    owned_post(&state, &user.id, &id).await?;

    let deleted = state.orchestrator.delete_post(&id, &params.image_id).await?;
    Ok(Json(deleted).into_response())
}

async fn like_post(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<LikesRequest>,
) -> ApiResult<Response> {
    let post = state.orchestrator.like_post(&id, req.likes).await?;
    Ok(Json(post).into_response())
}

async fn saved_posts(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(params): Query<FeedParams>,
) -> ApiResult<Response> {
    let saves = state
        .orchestrator
        .get_saved_posts(&user.id, params.cursor.as_deref())
        .await?;
    Ok(Json(saves).into_response())
}

async fn save_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<SaveRequest>,
) -> ApiResult<Response> {
    let saved = state.orchestrator.save_post(&req.post_id, &user.id).await?;
    Ok((StatusCode::CREATED, Json(saved)).into_response())
}

async fn delete_saved_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let saved = state.orchestrator.get_saved_post(&id).await?;
    if saved.user != user.id {
        return Err(ApiError::unauthorized("only the saver can remove this save"));
    }

    let deleted = state.orchestrator.delete_saved_post(&id).await?;
    Ok(Json(deleted).into_response())
}

/// Fetch a post and make sure `user_id` created it.
async fn owned_post(state: &AppState, user_id: &str, post_id: &str) -> ApiResult<Post> {
    let post = state.orchestrator.get_post_by_id(post_id).await?;
    if post.creator != user_id {
        return Err(ApiError::unauthorized("only the creator can change this post"));
    }
    Ok(post)
}
