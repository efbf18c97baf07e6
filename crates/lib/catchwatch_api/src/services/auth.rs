//! Authentication service - login and session flows delegating to `catchwatch_core::auth`.

use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum_extra::extract::CookieJar;
use catchwatch_core::auth::authorizer::Authorizer;
use catchwatch_core::auth::jwt::SessionCodec;
use catchwatch_core::auth::session::build_session_view;
use catchwatch_core::auth::validation::RawCredentials;
use catchwatch_core::models::auth::{BaseSession, Principal, SessionClaims};
use chrono::{DateTime, Utc};
use tracing::info;

use crate::error::AppResult;
use crate::models::{LoginRequest, NoSession, SessionResponse};
use crate::services::cookies::SESSION_COOKIE;

/// Authenticate a login request and sign a session token for it.
pub async fn login(
    authorizer: &Authorizer,
    codec: &SessionCodec,
    request: LoginRequest,
) -> AppResult<(String, Principal)> {
    let raw = RawCredentials::from(request);
    let principal = authorizer.authorize(&raw).await?;
    let token = codec.encode(&principal)?;
    info!(user_id = %principal.id(), max_age = principal.max_age(), "session issued");
    Ok((token, principal))
}

/// Session token from the session cookie, falling back to `Authorization: Bearer`.
pub fn session_token(jar: &CookieJar, headers: &HeaderMap) -> Option<String> {
    if let Some(cookie) = jar.get(SESSION_COOKIE)
        && !cookie.value().is_empty()
    {
        return Some(cookie.value().to_string());
    }
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}

/// Decode a session token; any decode failure is simply no session.
pub fn decode_session(codec: &SessionCodec, token: Option<&str>) -> Option<SessionClaims> {
    codec.decode(token?).ok()
}

/// The session view for `token` at `now`, or an empty session.
pub fn current_session(
    codec: &SessionCodec,
    token: Option<&str>,
    now: DateTime<Utc>,
) -> SessionResponse {
    match decode_session(codec, token) {
        Some(claims) => {
            SessionResponse::Active(build_session_view(BaseSession::default(), &claims, now))
        }
        None => SessionResponse::None(NoSession {}),
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;
    use axum_extra::extract::cookie::Cookie;
    use catchwatch_core::auth::jwt::SessionConfig;

    use super::*;

    fn codec() -> SessionCodec {
        SessionCodec::new(&SessionConfig::new("test-secret")).unwrap()
    }

    #[test]
    fn cookie_wins_over_bearer() {
        let jar = CookieJar::new().add(Cookie::new(SESSION_COOKIE, "from-cookie"));
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
        assert_eq!(session_token(&jar, &headers).as_deref(), Some("from-cookie"));
    }

    #[test]
    fn bearer_is_used_without_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
        assert_eq!(
            session_token(&CookieJar::new(), &headers).as_deref(),
            Some("from-header")
        );
    }

    #[test]
    fn other_schemes_are_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert!(session_token(&CookieJar::new(), &headers).is_none());
    }

    #[test]
    fn garbage_token_is_no_session() {
        let resp = current_session(&codec(), Some("garbage"), Utc::now());
        assert!(matches!(resp, SessionResponse::None(_)));
        let resp = current_session(&codec(), None, Utc::now());
        assert!(matches!(resp, SessionResponse::None(_)));
    }
}
