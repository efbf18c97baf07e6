//! Session view: what callers see for a decoded session token.

use chrono::{DateTime, Duration, Utc};

use crate::models::auth::{BaseSession, SessionClaims, SessionUser, SessionView};

/// Project decoded claims onto the caller's base session.
///
/// `maxAge` and `expires` appear only when the claims carry a `maxAge`;
/// `expires` is `now + maxAge`, clamped to the representable range.
/// `user.id` and `user.email` always come from the claims.
pub fn build_session_view(
    base: BaseSession,
    claims: &SessionClaims,
    now: DateTime<Utc>,
) -> SessionView {
    let expires = claims.max_age.map(|max_age| expiry_after(now, max_age));

    SessionView {
        user: SessionUser {
            id: claims.id.clone(),
            email: claims.email.clone(),
            name: base.user.name,
            image: base.user.image,
        },
        max_age: claims.max_age,
        expires,
    }
}

/// `now + max_age` seconds, saturating at the earliest or latest instant.
fn expiry_after(now: DateTime<Utc>, max_age: i64) -> DateTime<Utc> {
    Duration::try_seconds(max_age)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .unwrap_or(if max_age < 0 {
            DateTime::<Utc>::MIN_UTC
        } else {
            DateTime::<Utc>::MAX_UTC
        })
}
