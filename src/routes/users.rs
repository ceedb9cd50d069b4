use axum::extract::{Multipart, Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::extractors::CurrentUser;
use crate::orchestrator::UpdateUser;
use crate::routes::FormData;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ListParams {
    pub limit: Option<usize>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/users", get(list_users))
        .route("/api/users/{id}", get(get_user).put(update_user))
}

async fn list_users(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> ApiResult<Response> {
    let users = state.orchestrator.get_users(params.limit).await?;
    Ok(Json(users).into_response())
}

async fn get_user(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Response> {
    let user = state.orchestrator.get_user_by_id(&id).await?;
    Ok(Json(user).into_response())
}

async fn update_user(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
    Path(id): Path<String>,
    multipart: Multipart,
) -> ApiResult<Response> {
    if current.id != id {
        return Err(ApiError::unauthorized("users can only edit their own profile"));
    }
    let form = FormData::read(multipart).await?;

    // The current picture pair is taken from the stored profile, never the form.
    let user = state
        .orchestrator
        .update_user(UpdateUser {
            user_id: id,
            name: form.optional("name").unwrap_or(current.name),
            bio: form
                .text
                .get("bio")
                .cloned()
                .unwrap_or_else(|| current.bio.unwrap_or_default()),
            image_url: current.image_url,
            image_id: current.image_id,
            file: form.file,
        })
        .await?;

    Ok(Json(user).into_response())
}
