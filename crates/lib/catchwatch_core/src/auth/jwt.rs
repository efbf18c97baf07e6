//! Session token encoding and decoding (HS256 JWT).

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::distr::Alphanumeric;
use rand::{Rng, rng};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::AuthError;
use crate::models::auth::{Principal, SessionClaims};

/// Token lifetime when the claims carry no `maxAge`: 30 days.
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 30 * 24 * 60 * 60;

/// Session codec configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Session secret must not be empty")]
    EmptySecret,
}

/// Why a token could not be decoded. Every variant means "no session".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("malformed session token")]
    Malformed,

    #[error("session token signature is invalid")]
    InvalidSignature,

    #[error("session token has expired")]
    Expired,
}

impl From<jsonwebtoken::errors::Error> for DecodeError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        match e.kind() {
            ErrorKind::InvalidSignature => DecodeError::InvalidSignature,
            ErrorKind::ExpiredSignature => DecodeError::Expired,
            _ => DecodeError::Malformed,
        }
    }
}

/// Signing configuration for session tokens.
#[derive(Clone)]
pub struct SessionConfig {
    pub secret: String,
    /// Lifetime applied to tokens whose claims have no `maxAge`.
    pub default_ttl_secs: i64,
}

impl SessionConfig {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            default_ttl_secs: DEFAULT_TOKEN_TTL_SECS,
        }
    }
}

impl std::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConfig")
            .field("secret", &"<redacted>")
            .field("default_ttl_secs", &self.default_ttl_secs)
            .finish()
    }
}

/// Wire payload: session claims plus the registered `iat`/`exp` claims.
#[derive(Debug, Serialize, Deserialize)]
struct TokenPayload {
    #[serde(flatten)]
    claims: SessionClaims,
    iat: i64,
    exp: i64,
}

/// Signs principals into session tokens and reads them back.
#[derive(Clone)]
pub struct SessionCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    default_ttl_secs: i64,
}

impl SessionCodec {
    pub fn new(config: &SessionConfig) -> Result<Self, ConfigError> {
        if config.secret.is_empty() {
            return Err(ConfigError::EmptySecret);
        }
        let secret = config.secret.as_bytes();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;
        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            default_ttl_secs: config.default_ttl_secs,
        })
    }

    /// Encode a principal issued now.
    pub fn encode(&self, principal: &Principal) -> Result<String, AuthError> {
        self.encode_at(principal, Utc::now())
    }

    /// Encode a principal as if issued at `issued_at`.
    pub fn encode_at(
        &self,
        principal: &Principal,
        issued_at: DateTime<Utc>,
    ) -> Result<String, AuthError> {
        self.encode_claims_at(SessionClaims::from(principal), issued_at)
    }

    /// Sign arbitrary session claims. Expiry follows `maxAge`, or the
    /// configured default when absent.
    pub fn encode_claims_at(
        &self,
        claims: SessionClaims,
        issued_at: DateTime<Utc>,
    ) -> Result<String, AuthError> {
        let ttl = claims.max_age.unwrap_or(self.default_ttl_secs);
        let expires_at = Duration::try_seconds(ttl)
            .and_then(|ttl| issued_at.checked_add_signed(ttl))
            .ok_or_else(|| AuthError::TokenError(format!("token lifetime out of range: {ttl}s")))?;
        let payload = TokenPayload {
            claims,
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        };
        encode(
            &Header::new(Algorithm::HS256),
            &payload,
            &self.encoding_key,
        )
        .map_err(|e| AuthError::TokenError(format!("jwt encode: {e}")))
    }

    /// Decode and verify a session token.
    pub fn decode(&self, token: &str) -> Result<SessionClaims, DecodeError> {
        decode::<TokenPayload>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims.claims)
            .map_err(|e| {
                let err = DecodeError::from(e);
                debug!("session token rejected: {err}");
                err
            })
    }
}

/// Resolve the session secret: env var `AUTH_SECRET` → `JWT_SECRET` → persisted file.
pub fn resolve_session_secret() -> String {
    for var in ["AUTH_SECRET", "JWT_SECRET"] {
        if let Ok(secret) = std::env::var(var)
            && !secret.is_empty()
        {
            return secret;
        }
    }
    resolve_session_secret_at(&session_secret_path())
}

/// Read the secret persisted at `path`, generating and saving one if missing.
pub fn resolve_session_secret_at(path: &Path) -> String {
    if let Ok(existing) = std::fs::read_to_string(path) {
        let trimmed = existing.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }
    let secret: String = rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect();
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    match std::fs::write(path, &secret) {
        Ok(()) => info!(path = %path.display(), "generated new session secret"),
        Err(e) => warn!(path = %path.display(), "could not persist session secret: {e}"),
    }
    secret
}

/// Path to the persisted session secret file.
fn session_secret_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("catchwatch")
        .join("session-secret")
}
