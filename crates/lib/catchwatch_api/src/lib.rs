//! # catchwatch_api
//!
//! HTTP boundary for Catchwatch logins and sessions.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use catchwatch_core::auth::authorizer::Authorizer;
use catchwatch_core::auth::jwt::SessionCodec;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ApiConfig;
use crate::handlers::{auth, permissions};

/// Route paths.
pub mod routes {
    pub const POST_AUTH_CALLBACK_CREDENTIALS: &str = "/api/auth/callback/credentials";
    pub const GET_AUTH_SESSION: &str = "/api/auth/session";
    pub const POST_AUTH_SIGNOUT: &str = "/api/auth/signout";
    pub const GET_PERMISSIONS_CHECK: &str = "/api/permissions/check";
}

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Credential login flow.
    pub authorizer: Arc<Authorizer>,
    /// Session token signing and verification.
    pub codec: Arc<SessionCodec>,
    /// API configuration.
    pub config: ApiConfig,
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Public routes (no session required)
    let public = Router::new()
        .route(
            routes::POST_AUTH_CALLBACK_CREDENTIALS,
            post(auth::login_handler),
        )
        .route(routes::GET_AUTH_SESSION, get(auth::session_handler))
        .route(routes::POST_AUTH_SIGNOUT, post(auth::signout_handler));

    // Protected routes (require a session)
    let protected = Router::new()
        .route(
            routes::GET_PERMISSIONS_CHECK,
            get(permissions::check_permission_handler),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_session,
        ));

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
