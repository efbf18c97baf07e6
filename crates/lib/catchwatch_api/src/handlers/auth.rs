//! Authentication request handlers.

use axum::extract::{FromRequest, Request, State};
use axum::http::HeaderMap;
use axum::http::header::CONTENT_TYPE;
use axum::{Form, Json};
use axum_extra::extract::CookieJar;
use chrono::Utc;
use tracing::{debug, warn};

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::models::{LoginRequest, LoginResponse, SessionResponse, SignoutResponse};
use crate::services::auth;
use crate::services::cookies::{
    MAX_COOKIE_BYTES, clear_session_cookie, exceeds_browser_limit, session_cookie,
};

/// Login body, accepted as JSON or as a url-encoded form.
///
/// A body that cannot be read at all is a credential failure like any other.
pub struct LoginBody(pub LoginRequest);

impl<S> FromRequest<S> for LoginBody
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_json = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/json"));

        let body = if is_json {
            Json::<LoginRequest>::from_request(req, state)
                .await
                .map(|Json(body)| body)
                .map_err(|e| e.body_text())
        } else {
            Form::<LoginRequest>::from_request(req, state)
                .await
                .map(|Form(body)| body)
                .map_err(|e| e.body_text())
        };

        body.map(LoginBody).map_err(|reason| {
            debug!("unreadable login body: {reason}");
            AppError::InvalidCredentials
        })
    }
}

/// `POST /api/auth/callback/credentials` - authenticate and set the session cookie.
pub async fn login_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    LoginBody(body): LoginBody,
) -> AppResult<(CookieJar, Json<LoginResponse>)> {
    let (token, principal) = auth::login(&state.authorizer, &state.codec, body).await?;
    let cookie = session_cookie(&token, principal.max_age(), state.config.cookie_secure);
    if exceeds_browser_limit(&cookie) {
        warn!(
            user_id = %principal.id(),
            token_bytes = token.len(),
            groups = principal.groups().len(),
            "session cookie exceeds {MAX_COOKIE_BYTES} bytes; browsers may drop it"
        );
    }
    Ok((jar.add(cookie), Json(LoginResponse { user: principal })))
}

/// `GET /api/auth/session` - the current session view, or `{}`.
pub async fn session_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
) -> Json<SessionResponse> {
    let token = auth::session_token(&jar, &headers);
    Json(auth::current_session(
        &state.codec,
        token.as_deref(),
        Utc::now(),
    ))
}

/// `POST /api/auth/signout` - clear the session cookie.
pub async fn signout_handler(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, Json<SignoutResponse>) {
    (
        jar.add(clear_session_cookie(state.config.cookie_secure)),
        Json(SignoutResponse { success: true }),
    )
}
