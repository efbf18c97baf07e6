//! Request and response bodies.

use catchwatch_core::auth::validation::RawCredentials;
use catchwatch_core::models::auth::{Principal, SessionView};
use serde::{Deserialize, Serialize};

/// Error body for every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// `rememberMe` as sent by forms (`"true"`/`"false"`) or JSON clients (`true`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RememberMeField {
    Flag(bool),
    Text(String),
}

/// Only `true` or the exact string `"true"` count as set.
pub fn coerce_remember_me(value: Option<&RememberMeField>) -> bool {
    match value {
        Some(RememberMeField::Flag(flag)) => *flag,
        Some(RememberMeField::Text(text)) => text == "true",
        None => false,
    }
}

/// Credentials submitted to the login route.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(rename = "rememberMe", default)]
    pub remember_me: Option<RememberMeField>,
}

impl From<LoginRequest> for RawCredentials {
    fn from(req: LoginRequest) -> Self {
        let remember_me = coerce_remember_me(req.remember_me.as_ref());
        RawCredentials {
            email: req.email,
            password: req.password,
            remember_me: Some(remember_me),
        }
    }
}

/// Successful login: the authorized principal.
#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub user: Principal,
}

/// Empty session body (`{}`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NoSession {}

/// `GET /api/auth/session` body.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum SessionResponse {
    Active(SessionView),
    None(NoSession),
}

/// Sign-out result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignoutResponse {
    pub success: bool,
}

/// Permission check result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionCheckResponse {
    pub allowed: bool,
}
