//! Password hashing via bcrypt.

use tracing::warn;

use super::AuthError;

/// bcrypt cost factor.
const BCRYPT_COST: u32 = 10;

/// Hash a password with bcrypt (cost 10).
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    bcrypt::hash(password, BCRYPT_COST)
        .map_err(|e| AuthError::Internal(format!("bcrypt hash: {e}")))
}

/// Verify a password against a stored bcrypt hash.
///
/// An account without a stored hash never matches. An unreadable hash is
/// logged and treated as a mismatch.
pub fn verify_password(password: &str, stored_hash: Option<&str>) -> bool {
    let Some(hash) = stored_hash else {
        return false;
    };
    match bcrypt::verify(password, hash) {
        Ok(matches) => matches,
        Err(e) => {
            warn!("bcrypt verify failed on stored hash: {e}");
            false
        }
    }
}
