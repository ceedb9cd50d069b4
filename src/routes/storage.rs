use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::platform::avatars;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct InitialsParams {
    #[serde(default)]
    pub name: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/storage/buckets/{bucket}/files/{id}/preview",
            get(file_preview),
        )
        .route("/avatars/initials", get(initials_avatar))
}

/// Serves the stored bytes. Rendering parameters in the query are accepted
/// but the image is returned as uploaded.
async fn file_preview(
    State(state): State<AppState>,
    Path((bucket, id)): Path<(String, String)>,
) -> ApiResult<Response> {
    let (bytes, file) = state
        .blobs
        .get_file(&bucket, &id)
        .await
        .map_err(ApiError::from)?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, file.mime_type),
            (header::CACHE_CONTROL, "public, max-age=86400".to_string()),
        ],
        bytes,
    )
        .into_response())
}

async fn initials_avatar(Query(params): Query<InitialsParams>) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "image/svg+xml"),
            (header::CACHE_CONTROL, "public, max-age=86400"),
        ],
        avatars::initials_svg(&params.name),
    )
        .into_response()
}
