//! Login payload validation.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use super::AuthError;

/// Minimum accepted password length, in characters.
pub const MIN_PASSWORD_LENGTH: usize = 6;

static EMAIL_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").ok());

/// Credentials as submitted, before any field is trusted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawCredentials {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(rename = "rememberMe", default)]
    pub remember_me: Option<bool>,
}

/// A login payload that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginPayload {
    pub email: String,
    pub password: String,
    pub remember_me: bool,
}

pub(crate) fn valid_email(email: &str) -> bool {
    EMAIL_RE.as_ref().is_some_and(|re| re.is_match(email))
}

/// Validate a raw credentials bag.
///
/// Every failure is the same [`AuthError::InvalidPayload`]; which field was
/// wrong is not reported.
pub fn validate(raw: &RawCredentials) -> Result<LoginPayload, AuthError> {
    let email = raw
        .email
        .as_deref()
        .map(str::trim)
        .filter(|e| valid_email(e))
        .ok_or(AuthError::InvalidPayload)?;

    let password = raw
        .password
        .as_deref()
        .filter(|p| p.chars().count() >= MIN_PASSWORD_LENGTH)
        .ok_or(AuthError::InvalidPayload)?;

    Ok(LoginPayload {
        email: email.to_string(),
        password: password.to_string(),
        remember_me: raw.remember_me.unwrap_or(false),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(email: Option<&str>, password: Option<&str>, remember_me: Option<bool>) -> RawCredentials {
        RawCredentials {
            email: email.map(String::from),
            password: password.map(String::from),
            remember_me,
        }
    }

    #[test]
    fn accepts_well_formed_payload() {
        let payload = validate(&raw(Some("a@x.com"), Some("correct"), Some(true))).unwrap();
        assert_eq!(
            payload,
            LoginPayload {
                email: "a@x.com".into(),
                password: "correct".into(),
                remember_me: true,
            }
        );
    }

    #[test]
    fn remember_me_defaults_to_false() {
        let payload = validate(&raw(Some("a@x.com"), Some("correct"), None)).unwrap();
        assert!(!payload.remember_me);
    }

    #[test]
    fn trims_email() {
        let payload = validate(&raw(Some("  a@x.com "), Some("correct"), None)).unwrap();
        assert_eq!(payload.email, "a@x.com");
    }

    #[test]
    fn rejects_bad_email() {
        for email in [None, Some(""), Some("a@x"), Some("no-at.com"), Some("a b@x.com")] {
            assert!(
                matches!(
                    validate(&raw(email, Some("correct"), None)),
                    Err(AuthError::InvalidPayload)
                ),
                "{email:?} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_missing_or_short_password() {
        for password in [None, Some(""), Some("12345")] {
            assert!(matches!(
                validate(&raw(Some("a@x.com"), password, None)),
                Err(AuthError::InvalidPayload)
            ));
        }
    }

    #[test]
    fn password_length_counts_characters() {
        assert!(validate(&raw(Some("a@x.com"), Some("ñññññe"), None)).is_ok());
    }

    #[test]
    fn deserializes_camel_case_flag() {
        let raw: RawCredentials =
            serde_json::from_str(r#"{"email":"a@x.com","password":"correct","rememberMe":true}"#)
                .unwrap();
        assert_eq!(raw.remember_me, Some(true));
    }
}
