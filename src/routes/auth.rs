use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use crate::db::models::Deleted;
use crate::error::ApiResult;
use crate::extractors::{CurrentUser, SessionSecret};
use crate::orchestrator::NewUser;
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccountRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub username: Option<String>,
}

#[derive(Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/account", post(create_account))
        .route("/api/session", post(sign_in).delete(sign_out))
        .route("/api/me", get(current_user))
}

async fn create_account(
    State(state): State<AppState>,
    Json(req): Json<CreateAccountRequest>,
) -> ApiResult<Response> {
    let profile = state
        .orchestrator
        .create_account(NewUser {
            name: req.name,
            email: req.email,
            password: req.password,
            username: req.username,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(profile)).into_response())
}

async fn sign_in(
    State(state): State<AppState>,
    Json(req): Json<SignInRequest>,
) -> ApiResult<Response> {
    let session = state.orchestrator.sign_in(&req.email, &req.password).await?;

    let cookie = format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        state.config.auth.cookie_name,
        session.secret,
        state.config.auth.session_hours * 3600
    );

    Ok((StatusCode::OK, [(header::SET_COOKIE, cookie)], Json(session)).into_response())
}

async fn sign_out(
    State(state): State<AppState>,
    SessionSecret(secret): SessionSecret,
) -> ApiResult<Response> {
    state.orchestrator.sign_out(&secret).await?;

    let cookie = format!(
        "{}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0",
        state.config.auth.cookie_name
    );
    Ok((StatusCode::OK, [(header::SET_COOKIE, cookie)], Json(Deleted::ok())).into_response())
}

async fn current_user(CurrentUser(user): CurrentUser) -> impl IntoResponse {
    Json(user)
}
