pub mod auth;
pub mod posts;
pub mod storage;
pub mod users;

use std::collections::HashMap;

use axum::extract::{DefaultBodyLimit, Multipart};
use axum::http::{header, HeaderValue, Method};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::error::{ApiError, ApiResult};
use crate::platform::FileUpload;
use crate::state::AppState;

/// Headroom on top of the largest file for the other multipart fields.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn app(state: AppState) -> Router {
    let body_limit = state.config.storage.max_file_bytes as usize + FORM_OVERHEAD_BYTES;
    let cors = cors_layer(&state.config.server.allowed_origins);

    let mut app = Router::new()
        .merge(auth::router())
        .merge(posts::router())
        .merge(users::router())
        .merge(storage::router())
        .layer(DefaultBodyLimit::max(body_limit));

    if let Some(cors) = cors {
        app = app.layer(cors);
    }

    app.layer(TraceLayer::new_for_http()).with_state(state)
}

fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    if origins.is_empty() {
        return None;
    }

    Some(
        CorsLayer::new()
            .allow_origin(origins)
            .allow_credentials(true)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([header::CONTENT_TYPE]),
    )
}

/// Text fields plus the optional `file` part of a multipart form.
#[derive(Debug, Default)]
pub struct FormData {
    pub text: HashMap<String, String>,
    pub file: Option<FileUpload>,
}

impl FormData {
    pub async fn read(mut multipart: Multipart) -> ApiResult<Self> {
        let mut form = FormData::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::validation(e.body_text()))?
        {
            let name = field.name().unwrap_or_default().to_string();
            if name == "file" {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::validation(e.body_text()))?;
                // Browsers send an empty part when no file was picked.
                if !bytes.is_empty() {
                    form.file = Some(FileUpload::new(file_name, bytes));
                }
            } else {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::validation(e.body_text()))?;
                form.text.insert(name, value);
            }
        }

        Ok(form)
    }

    pub fn text(&self, name: &str) -> String {
        self.text.get(name).cloned().unwrap_or_default()
    }

    pub fn optional(&self, name: &str) -> Option<String> {
        self.text.get(name).cloned().filter(|v| !v.is_empty())
    }
}
