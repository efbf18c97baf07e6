//! Session cookie - set/clear the httpOnly cookie holding the session token.

use axum_extra::extract::cookie::{Cookie, SameSite};
use time::Duration;

/// Cookie name for the session token.
pub const SESSION_COOKIE: &str = "catchwatch.session-token";

/// Largest `Set-Cookie` value browsers reliably keep.
pub const MAX_COOKIE_BYTES: usize = 4096;

/// Build a httpOnly cookie holding the session token for `max_age_secs`.
pub fn session_cookie(token: &str, max_age_secs: i64, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE.to_string(), token.to_string()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/".to_string())
        .max_age(Duration::seconds(max_age_secs))
        .build()
}

/// Build an expired cookie to clear the session.
pub fn clear_session_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE.to_string(), String::new()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/".to_string())
        .max_age(Duration::ZERO)
        .build()
}

/// Whether browsers are likely to drop `cookie` for its size.
pub fn exceeds_browser_limit(cookie: &Cookie<'_>) -> bool {
    cookie.to_string().len() > MAX_COOKIE_BYTES
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_cookie_attributes() {
        let cookie = session_cookie("tok", 86_400, true);
        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.value(), "tok");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.max_age(), Some(Duration::seconds(86_400)));
    }

    #[test]
    fn cleared_cookie_expires_immediately() {
        let cookie = clear_session_cookie(false);
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.max_age(), Some(Duration::ZERO));
    }

    #[test]
    fn size_limit_counts_the_whole_cookie() {
        assert!(!exceeds_browser_limit(&session_cookie("tok", 60, false)));

        let near = "t".repeat(MAX_COOKIE_BYTES - SESSION_COOKIE.len() - 1);
        assert!(exceeds_browser_limit(&session_cookie(&near, 60, false)));
    }
}
