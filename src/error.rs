use std::fmt;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::platform::PlatformError;

/// What went wrong, at the granularity callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Validation,
    NotFound,
    Unauthorized,
    UpstreamUnavailable,
    Conflict,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::Validation => "validation",
            FailureKind::NotFound => "not found",
            FailureKind::Unauthorized => "unauthorized",
            FailureKind::UpstreamUnavailable => "upstream unavailable",
            FailureKind::Conflict => "conflict",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ApiError {
    pub kind: FailureKind,
    pub message: String,
}

impl ApiError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Validation, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(FailureKind::NotFound, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Unauthorized, message)
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::new(FailureKind::UpstreamUnavailable, message)
    }
}

impl From<PlatformError> for ApiError {
    fn from(err: PlatformError) -> Self {
        let kind = match &err {
            PlatformError::NotFound(_) => FailureKind::NotFound,
            PlatformError::Conflict(_) => FailureKind::Conflict,
            PlatformError::Invalid(_) => FailureKind::Validation,
            PlatformError::Unauthorized(_) => FailureKind::Unauthorized,
            PlatformError::Unavailable(_)
            | PlatformError::Pool(_)
            | PlatformError::Sql(_)
            | PlatformError::Io(_)
            | PlatformError::Serialization(_) => FailureKind::UpstreamUnavailable,
        };
        ApiError::new(kind, err.to_string())
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    kind: FailureKind,
    message: &'a str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.kind {
            FailureKind::Validation => StatusCode::BAD_REQUEST,
            FailureKind::NotFound => StatusCode::NOT_FOUND,
            FailureKind::Unauthorized => StatusCode::UNAUTHORIZED,
            FailureKind::Conflict => StatusCode::CONFLICT,
            FailureKind::UpstreamUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        };

        let message = match self.kind {
            FailureKind::UpstreamUnavailable => {
                tracing::error!("Upstream error: {}", self.message);
                "Service temporarily unavailable"
            }
            _ => self.message.as_str(),
        };

        (
            status,
            Json(ErrorBody {
                kind: self.kind,
                message,
            }),
        )
            .into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn response_status(err: ApiError) -> StatusCode {
        let response = err.into_response();
        response.status()
    }

    #[test]
    fn validation_returns_400() {
        assert_eq!(
            response_status(ApiError::validation("oops")),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn not_found_returns_404() {
        assert_eq!(
            response_status(ApiError::not_found("post")),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn unauthorized_returns_401() {
        assert_eq!(
            response_status(ApiError::unauthorized("no session")),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn conflict_returns_409() {
        assert_eq!(
            response_status(ApiError::new(FailureKind::Conflict, "dup")),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn upstream_returns_503() {
        assert_eq!(
            response_status(ApiError::upstream("disk full")),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn platform_errors_map_to_kinds() {
        let cases = [
            (PlatformError::NotFound("x".into()), FailureKind::NotFound),
            (PlatformError::Conflict("x".into()), FailureKind::Conflict),
            (PlatformError::Invalid("x".into()), FailureKind::Validation),
            (PlatformError::Unauthorized("x".into()), FailureKind::Unauthorized),
            (
                PlatformError::Unavailable("x".into()),
                FailureKind::UpstreamUnavailable,
            ),
            (
                PlatformError::Io(std::io::Error::other("boom")),
                FailureKind::UpstreamUnavailable,
            ),
        ];
        for (err, kind) in cases {
            assert_eq!(ApiError::from(err).kind, kind);
        }
    }
}
