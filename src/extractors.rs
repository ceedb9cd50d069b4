use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;

use crate::db::models::UserProfile;
use crate::error::ApiError;
use crate::state::AppState;

/// Secret of the caller's session, read from the session cookie.
#[derive(Debug, Clone)]
pub struct SessionSecret(pub String);

impl FromRequestParts<AppState> for SessionSecret {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        extract_cookie(parts, &state.config.auth.cookie_name)
            .map(|secret| SessionSecret(secret.to_string()))
            .ok_or_else(|| ApiError::unauthorized("no session cookie"))
    }
}

/// Profile of the signed-in user. Rejects with 401 when there is no live session.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub UserProfile);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let SessionSecret(secret) = SessionSecret::from_request_parts(parts, state).await?;
        state
            .orchestrator
            .get_current_user(&secret)
            .await
            .map(CurrentUser)
    }
}

pub fn extract_cookie<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|s| s.split(';'))
        .map(|s| s.trim())
        .find_map(|cookie| {
            let mut split = cookie.splitn(2, '=');
            let key = split.next()?.trim();
            let val = split.next()?.trim();
            if key == name && !val.is_empty() {
                Some(val)
            } else {
                None
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with_cookie(cookie: &str) -> Parts {
        let (parts, _) = Request::builder()
            .header(header::COOKIE, cookie)
            .body(())
            .unwrap()
            .into_parts();
        parts
    }

    #[test]
    fn finds_named_cookie_among_others() {
        let parts = parts_with_cookie("theme=dark; picgram_session=abc123; lang=en");
        assert_eq!(extract_cookie(&parts, "picgram_session"), Some("abc123"));
    }

    #[test]
    fn missing_or_empty_cookie_is_none() {
        let parts = parts_with_cookie("theme=dark");
        assert_eq!(extract_cookie(&parts, "picgram_session"), None);

        let parts = parts_with_cookie("picgram_session=");
        assert_eq!(extract_cookie(&parts, "picgram_session"), None);
    }
}
