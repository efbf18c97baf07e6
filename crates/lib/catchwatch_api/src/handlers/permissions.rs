//! Permission check handler.

use axum::Json;
use axum::extract::{Extension, Query};
use catchwatch_core::auth::permission::Scope;
use catchwatch_core::models::auth::Action;
use serde::Deserialize;
use tracing::debug;

use crate::middleware::auth::AuthenticatedSession;
use crate::models::PermissionCheckResponse;

/// Query for `GET /api/permissions/check`.
#[derive(Debug, Deserialize)]
pub struct PermissionQuery {
    pub action: Action,
    pub country: String,
    #[serde(default)]
    pub bmu: Option<String>,
    #[serde(default)]
    pub person: Option<String>,
}

/// `GET /api/permissions/check` - whether the session may perform `action` on the scope.
pub async fn check_permission_handler(
    Extension(AuthenticatedSession(claims)): Extension<AuthenticatedSession>,
    Query(query): Query<PermissionQuery>,
) -> Json<PermissionCheckResponse> {
    let scope = Scope {
        country: query.country,
        bmu: query.bmu,
        person: query.person,
    };
    let allowed = claims.can(query.action, &scope);
    debug!(user_id = %claims.id, action = %query.action, allowed, "permission check");
    Json(PermissionCheckResponse { allowed })
}
