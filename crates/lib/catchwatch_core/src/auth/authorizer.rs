//! Credential login: validate, look up, verify, then build the principal.

use std::sync::Arc;

use tracing::debug;

use super::AuthError;
use super::password::verify_password;
use super::store::CredentialStore;
use super::validation::{RawCredentials, validate};
use crate::models::auth::Principal;

/// Session lifetime with "remember me": 30 days.
pub const REMEMBER_ME_MAX_AGE_SECS: i64 = 30 * 24 * 60 * 60;

/// Session lifetime otherwise: 1 day.
pub const DEFAULT_MAX_AGE_SECS: i64 = 24 * 60 * 60;

/// Cost-10 bcrypt hash compared against when the email is unknown, so both
/// rejection paths pay for one full bcrypt verification.
const UNKNOWN_USER_HASH: &str = "$2b$10$ifbd2g3lvSEStigQQ9As8.Fta79y1K4q0YfnpFg0UyLC6OBNrs9i.";

/// Session max age for a login.
pub fn max_age_for(remember_me: bool) -> i64 {
    if remember_me {
        REMEMBER_ME_MAX_AGE_SECS
    } else {
        DEFAULT_MAX_AGE_SECS
    }
}

/// Runs credential logins against a [`CredentialStore`].
#[derive(Clone)]
pub struct Authorizer {
    store: Arc<dyn CredentialStore>,
}

impl Authorizer {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    /// Authenticate a credentials bag.
    ///
    /// Returns the principal on success. Store failures come back as
    /// [`AuthError::Store`], never as a credential rejection.
    pub async fn authorize(&self, raw: &RawCredentials) -> Result<Principal, AuthError> {
        let payload = validate(raw).inspect_err(|_| debug!("login rejected: invalid payload"))?;

        let Some(user) = self
            .store
            .find_by_email_with_permissions(&payload.email)
            .await?
        else {
            let _ = verify_password(&payload.password, Some(UNKNOWN_USER_HASH));
            debug!("login rejected: user not found");
            return Err(AuthError::UserNotFound);
        };

        if !verify_password(&payload.password, user.password_hash.as_deref()) {
            debug!(user_id = %user.id, "login rejected: password mismatch");
            return Err(AuthError::PasswordMismatch);
        }

        let max_age = max_age_for(payload.remember_me);
        debug!(user_id = %user.id, max_age, groups = user.groups.len(), "login authorized");
        Ok(Principal::new(user.id, user.email, user.groups, max_age))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use async_trait::async_trait;
    use chrono::Utc;

    use super::*;
    use crate::auth::AuthFailure;
    use crate::auth::password::hash_password;
    use crate::auth::store::{MemoryCredentialStore, StoreError};
    use crate::models::auth::{
        Action, BmuScope, DomainRule, Group, Permission, ResolvedUser, User,
    };

    fn user(email: &str, password: Option<&str>) -> User {
        User {
            id: format!("id-{email}"),
            name: None,
            email: email.into(),
            password: password.map(|p| hash_password(p).unwrap()),
            email_verified: None,
            image: None,
            groups: vec!["g1".into()],
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    fn authorizer() -> Authorizer {
        let store = MemoryCredentialStore::new()
            .with_permission(Permission {
                id: "p1".into(),
                name: "officer".into(),
                domain: vec![DomainRule {
                    country: "KE".into(),
                    bmu: BmuScope::All,
                    person: String::new(),
                }],
                actions: BTreeSet::from([Action::Read, Action::Submit]),
                group_id: Some("g1".into()),
            })
            .with_group(Group {
                id: "g1".into(),
                name: "Officers".into(),
                permission_id: "p1".into(),
            })
            .with_user(user("a@x.com", Some("correct")))
            .with_user(user("oauth@x.com", None));
        Authorizer::new(Arc::new(store))
    }

    fn creds(email: &str, password: &str, remember_me: Option<bool>) -> RawCredentials {
        RawCredentials {
            email: Some(email.into()),
            password: Some(password.into()),
            remember_me,
        }
    }

    #[tokio::test]
    async fn remember_me_grants_thirty_days() {
        let principal = authorizer()
            .authorize(&creds("a@x.com", "correct", Some(true)))
            .await
            .unwrap();
        assert_eq!(principal.max_age(), 2_592_000);
        assert_eq!(principal.email(), "a@x.com");
        assert_eq!(principal.id(), "id-a@x.com");
        assert_eq!(principal.groups().len(), 1);
        assert_eq!(principal.groups()[0].permission.id, "p1");
    }

    #[tokio::test]
    async fn default_session_is_one_day() {
        let az = authorizer();
        for remember_me in [Some(false), None] {
            let principal = az
                .authorize(&creds("a@x.com", "correct", remember_me))
                .await
                .unwrap();
            assert_eq!(principal.max_age(), 86_400);
        }
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let err = authorizer()
            .authorize(&creds("a@x.com", "wrong-one", None))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::PasswordMismatch));
        assert_eq!(err.failure(), AuthFailure::InvalidCredentials);
    }

    #[tokio::test]
    async fn unknown_user_looks_like_wrong_password() {
        let az = authorizer();
        let missing = az
            .authorize(&creds("missing@x.com", "correct", None))
            .await
            .unwrap_err();
        let wrong = az
            .authorize(&creds("a@x.com", "wrong-one", None))
            .await
            .unwrap_err();
        assert!(matches!(missing, AuthError::UserNotFound));
        assert_eq!(missing.failure(), wrong.failure());
    }

    #[tokio::test]
    async fn account_without_password_never_authorizes() {
        let err = authorizer()
            .authorize(&creds("oauth@x.com", "whatever", None))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::PasswordMismatch));
    }

    #[tokio::test]
    async fn invalid_payload_skips_lookup() {
        let err = authorizer()
            .authorize(&RawCredentials::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidPayload));
    }

    struct DownStore;

    #[async_trait]
    impl CredentialStore for DownStore {
        async fn find_by_email_with_permissions(
            &self,
            _email: &str,
        ) -> Result<Option<ResolvedUser>, StoreError> {
            Err(StoreError::Db(sqlx::Error::PoolTimedOut))
        }
    }

    #[tokio::test]
    async fn store_outage_is_not_a_credential_failure() {
        let err = Authorizer::new(Arc::new(DownStore))
            .authorize(&creds("a@x.com", "correct", None))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Store(_)));
        assert_eq!(err.failure(), AuthFailure::Unavailable);
    }

    #[test]
    fn max_age_classes() {
        assert_eq!(max_age_for(true), 2_592_000);
        assert_eq!(max_age_for(false), 86_400);
    }

    #[test]
    fn unknown_user_hash_is_a_full_cost_bcrypt_hash() {
        let parts: bcrypt::HashParts = UNKNOWN_USER_HASH.parse().unwrap();
        assert_eq!(parts.get_cost(), 10);
        assert!(bcrypt::verify("catchwatch-unknown-user", UNKNOWN_USER_HASH).unwrap());
        assert!(!verify_password("correct", Some(UNKNOWN_USER_HASH)));
    }
}
