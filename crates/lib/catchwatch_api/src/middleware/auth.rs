//! Session middleware - decode the session token and attach its claims.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;
use catchwatch_core::models::auth::SessionClaims;

use crate::AppState;
use crate::error::AppError;
use crate::services::auth::{decode_session, session_token};

/// Request extension holding the decoded session claims.
#[derive(Debug, Clone)]
pub struct AuthenticatedSession(pub SessionClaims);

/// Axum middleware: reads the session cookie (or `Authorization: Bearer`),
/// decodes it, and injects `AuthenticatedSession` into request extensions.
pub async fn require_session(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = session_token(&jar, request.headers());
    let claims = decode_session(&state.codec, token.as_deref())
        .ok_or_else(|| AppError::Unauthorized("No active session".into()))?;

    request.extensions_mut().insert(AuthenticatedSession(claims));

    Ok(next.run(request).await)
}
