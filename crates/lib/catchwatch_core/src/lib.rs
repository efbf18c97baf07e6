//! # catchwatch_core
//!
//! Authorization and session logic for the Catchwatch dashboard: credential
//! validation, group/permission resolution, password verification, session
//! token encoding and the caller-facing session view.

pub mod auth;
pub mod migrate;
pub mod models;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
