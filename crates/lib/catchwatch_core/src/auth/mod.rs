//! Authentication and authorization logic.
//!
//! Login runs validator → credential store → password verifier inside the
//! [`authorizer::Authorizer`]; the resulting principal is encoded by
//! [`jwt::SessionCodec`] and later projected by [`session::build_session_view`].
//! External provider sign-ins go through [`accounts::sign_in_with_provider`].

pub mod accounts;
pub mod authorizer;
pub mod jwt;
pub mod password;
pub mod permission;
pub mod session;
pub mod store;
pub mod validation;

use thiserror::Error;

use self::store::StoreError;

/// Authentication errors.
///
/// The credential kinds stay distinct here for logging; callers outside the
/// crate should only look at [`AuthError::failure`].
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid login payload")]
    InvalidPayload,

    #[error("User not found")]
    UserNotFound,

    #[error("Password mismatch")]
    PasswordMismatch,

    #[error("Credential store error: {0}")]
    Store(#[from] StoreError),

    #[error("Token error: {0}")]
    TokenError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// What a login failure looks like from outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    /// Any credential problem: bad payload, unknown user, wrong password.
    InvalidCredentials,
    /// The service could not complete the attempt; retrying later may work.
    Unavailable,
}

impl AuthError {
    pub fn failure(&self) -> AuthFailure {
        match self {
            AuthError::InvalidPayload | AuthError::UserNotFound | AuthError::PasswordMismatch => {
                AuthFailure::InvalidCredentials
            }
            AuthError::Store(_) | AuthError::TokenError(_) | AuthError::Internal(_) => {
                AuthFailure::Unavailable
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_kinds_collapse_to_one_failure() {
        assert_eq!(
            AuthError::UserNotFound.failure(),
            AuthError::PasswordMismatch.failure()
        );
        assert_eq!(
            AuthError::InvalidPayload.failure(),
            AuthFailure::InvalidCredentials
        );
    }

    #[test]
    fn store_errors_are_unavailable() {
        let err = AuthError::from(StoreError::Db(sqlx::Error::PoolTimedOut));
        assert_eq!(err.failure(), AuthFailure::Unavailable);
    }
}
