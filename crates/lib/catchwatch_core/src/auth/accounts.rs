//! External provider sign-in and account linking.
//!
//! A provider identity resolves to a user in three steps: an account already
//! linked to it, else a user with the same email (linked on the spot), else a
//! new password-less user. Users provisioned here never pass a credential
//! login until a password is set for them.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{debug, info};

use super::AuthError;
use super::store::StoreError;
use super::validation::valid_email;
use crate::models::auth::{Account, NewUser, SessionClaims, User};

/// Account type recorded when the provider does not name one.
pub const DEFAULT_ACCOUNT_TYPE: &str = "oauth";

/// Users and their linked provider accounts.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_user_by_account(
        &self,
        provider: &str,
        provider_account_id: &str,
    ) -> Result<Option<User>, StoreError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn create_user(&self, user: NewUser) -> Result<User, StoreError>;

    /// Link `account` to its user. Re-linking the same provider identity
    /// refreshes its tokens.
    async fn link_account(&self, account: Account) -> Result<(), StoreError>;
}

/// Identity asserted by an external provider after its own sign-in flow.
#[derive(Debug, Clone, Default)]
pub struct ProviderSignIn {
    pub provider: String,
    pub provider_account_id: String,
    /// Defaults to [`DEFAULT_ACCOUNT_TYPE`] when empty.
    pub account_type: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub image: Option<String>,
    pub email_verified: bool,
    pub access_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub expires_in: Option<i64>,
    pub refresh_token: Option<String>,
    pub scope: Option<String>,
}

/// How a provider identity was matched to its user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderLink {
    /// The identity was already linked.
    Existing,
    /// An existing user with the same email was linked to it.
    LinkedByEmail,
    /// A new password-less user was created and linked.
    Created,
}

/// Result of a provider sign-in.
#[derive(Debug, Clone)]
pub struct ProviderSession {
    pub user: User,
    pub link: ProviderLink,
}

impl ProviderSession {
    /// Session claims for the signed-in user. Provider sessions carry no
    /// `maxAge` or groups, so they take the codec's default lifetime.
    pub fn claims(&self) -> SessionClaims {
        SessionClaims {
            id: self.user.id.clone(),
            email: self.user.email.clone(),
            max_age: None,
            groups: None,
        }
    }
}

/// Resolve a provider identity to a user, linking or creating as needed.
pub async fn sign_in_with_provider(
    store: &dyn AccountStore,
    profile: ProviderSignIn,
) -> Result<ProviderSession, AuthError> {
    if profile.provider.trim().is_empty() || profile.provider_account_id.trim().is_empty() {
        debug!("provider sign-in rejected: missing provider identity");
        return Err(AuthError::InvalidPayload);
    }

    if let Some(user) = store
        .find_user_by_account(&profile.provider, &profile.provider_account_id)
        .await?
    {
        debug!(user_id = %user.id, provider = %profile.provider, "provider account already linked");
        return Ok(ProviderSession {
            user,
            link: ProviderLink::Existing,
        });
    }

    let email = profile
        .email
        .as_deref()
        .map(str::trim)
        .filter(|e| valid_email(e))
        .ok_or_else(|| {
            debug!(provider = %profile.provider, "provider sign-in rejected: no usable email");
            AuthError::InvalidPayload
        })?
        .to_string();

    let (user, link) = match store.find_user_by_email(&email).await? {
        Some(user) => (user, ProviderLink::LinkedByEmail),
        None => {
            let user = store
                .create_user(NewUser {
                    name: profile.name.clone(),
                    email,
                    image: profile.image.clone(),
                    email_verified: profile.email_verified.then(Utc::now),
                })
                .await?;
            (user, ProviderLink::Created)
        }
    };

    let account_type = if profile.account_type.is_empty() {
        DEFAULT_ACCOUNT_TYPE.to_string()
    } else {
        profile.account_type
    };
    store
        .link_account(Account {
            user_id: user.id.clone(),
            account_type,
            provider: profile.provider,
            provider_account_id: profile.provider_account_id,
            access_token: profile.access_token,
            expires_at: profile.expires_at,
            expires_in: profile.expires_in,
            refresh_token: profile.refresh_token,
            scope: profile.scope,
        })
        .await?;

    info!(user_id = %user.id, ?link, "provider account linked");
    Ok(ProviderSession { user, link })
}

const FIND_USER_BY_ACCOUNT: &str = "\
SELECT u.id::text, u.name, u.email, u.password, u.email_verified, u.image, \
       ARRAY(SELECT ug.group_id::text FROM user_groups ug \
             WHERE ug.user_id = u.id ORDER BY ug.position) AS groups, \
       u.created_at, u.updated_at \
FROM accounts a \
JOIN users u ON u.id = a.user_id \
WHERE a.provider = $1 AND a.provider_account_id = $2";

const FIND_USER_BY_EMAIL: &str = "\
SELECT u.id::text, u.name, u.email, u.password, u.email_verified, u.image, \
       ARRAY(SELECT ug.group_id::text FROM user_groups ug \
             WHERE ug.user_id = u.id ORDER BY ug.position) AS groups, \
       u.created_at, u.updated_at \
FROM users u \
WHERE u.email = $1";

const CREATE_USER: &str = "\
WITH u AS ( \
    INSERT INTO users (name, email, email_verified, image) \
    VALUES ($1, $2, $3, $4) \
    RETURNING * \
) \
SELECT u.id::text, u.name, u.email, u.password, u.email_verified, u.image, \
       ARRAY[]::text[] AS groups, u.created_at, u.updated_at \
FROM u";

const LINK_ACCOUNT: &str = "\
INSERT INTO accounts (user_id, type, provider, provider_account_id, \
                      access_token, expires_at, expires_in, refresh_token, scope) \
VALUES ($1::uuid, $2, $3, $4, $5, $6, $7, $8, $9) \
ON CONFLICT (provider, provider_account_id) DO UPDATE SET \
    access_token = EXCLUDED.access_token, \
    expires_at = EXCLUDED.expires_at, \
    expires_in = EXCLUDED.expires_in, \
    refresh_token = EXCLUDED.refresh_token, \
    scope = EXCLUDED.scope";

type UserRow = (
    String,
    Option<String>,
    String,
    Option<String>,
    Option<DateTime<Utc>>,
    Option<String>,
    Vec<String>,
    DateTime<Utc>,
    Option<DateTime<Utc>>,
);

fn user_from_row(row: UserRow) -> User {
    let (id, name, email, password, email_verified, image, groups, created_at, updated_at) = row;
    User {
        id,
        name,
        email,
        password,
        email_verified,
        image,
        groups,
        created_at,
        updated_at,
    }
}

/// PostgreSQL-backed account store.
#[derive(Debug, Clone)]
pub struct PgAccountStore {
    pool: PgPool,
}

impl PgAccountStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn find_user_by_account(
        &self,
        provider: &str,
        provider_account_id: &str,
    ) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(FIND_USER_BY_ACCOUNT)
            .bind(provider)
            .bind(provider_account_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(user_from_row))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(FIND_USER_BY_EMAIL)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(user_from_row))
    }

    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(CREATE_USER)
            .bind(user.name)
            .bind(user.email)
            .bind(user.email_verified)
            .bind(user.image)
            .fetch_one(&self.pool)
            .await?;
        Ok(user_from_row(row))
    }

    async fn link_account(&self, account: Account) -> Result<(), StoreError> {
        sqlx::query(LINK_ACCOUNT)
            .bind(account.user_id)
            .bind(account.account_type)
            .bind(account.provider)
            .bind(account.provider_account_id)
            .bind(account.access_token)
            .bind(account.expires_at)
            .bind(account.expires_in)
            .bind(account.refresh_token)
            .bind(account.scope)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[derive(Debug, Default)]
struct MemoryAccounts {
    users: Vec<User>,
    /// Keyed by `(provider, provider_account_id)`.
    accounts: HashMap<(String, String), Account>,
}

/// In-memory account store.
#[derive(Debug, Default)]
pub struct MemoryAccountStore {
    inner: RwLock<MemoryAccounts>,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(self, user: User) -> Self {
        let mut inner = self.inner.into_inner().unwrap_or_else(PoisonError::into_inner);
        inner.users.push(user);
        Self {
            inner: RwLock::new(inner),
        }
    }

    /// Accounts linked to `user_id`.
    pub fn accounts_of(&self, user_id: &str) -> Vec<Account> {
        self.read()
            .accounts
            .values()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect()
    }

    fn read(&self) -> RwLockReadGuard<'_, MemoryAccounts> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, MemoryAccounts> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn find_user_by_account(
        &self,
        provider: &str,
        provider_account_id: &str,
    ) -> Result<Option<User>, StoreError> {
        let inner = self.read();
        let key = (provider.to_string(), provider_account_id.to_string());
        Ok(inner
            .accounts
            .get(&key)
            .and_then(|a| inner.users.iter().find(|u| u.id == a.user_id))
            .cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self.read().users.iter().find(|u| u.email == email).cloned())
    }

    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let mut inner = self.write();
        if inner.users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict(format!("email {} is taken", user.email)));
        }
        let created = User {
            id: format!("user-{}", inner.users.len() + 1),
            name: user.name,
            email: user.email,
            password: None,
            email_verified: user.email_verified,
            image: user.image,
            groups: Vec::new(),
            created_at: Utc::now(),
            updated_at: None,
        };
        inner.users.push(created.clone());
        Ok(created)
    }

    async fn link_account(&self, account: Account) -> Result<(), StoreError> {
        let mut inner = self.write();
        if !inner.users.iter().any(|u| u.id == account.user_id) {
            return Err(StoreError::Conflict(format!(
                "no user {} to link",
                account.user_id
            )));
        }
        let key = (
            account.provider.clone(),
            account.provider_account_id.clone(),
        );
        inner.accounts.insert(key, account);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthFailure;
    use crate::auth::password::{hash_password, verify_password};

    fn credential_user(email: &str) -> User {
        User {
            id: "u1".into(),
            name: Some("Ana".into()),
            email: email.into(),
            password: Some(hash_password("correct").unwrap()),
            email_verified: None,
            image: None,
            groups: vec!["g1".into()],
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    fn google(account_id: &str, email: Option<&str>) -> ProviderSignIn {
        ProviderSignIn {
            provider: "google".into(),
            provider_account_id: account_id.into(),
            email: email.map(str::to_string),
            name: Some("Baraka".into()),
            email_verified: true,
            access_token: Some("ya29.first".into()),
            ..ProviderSignIn::default()
        }
    }

    #[tokio::test]
    async fn matching_email_links_existing_user() {
        let store = MemoryAccountStore::new().with_user(credential_user("a@x.com"));

        let session = sign_in_with_provider(&store, google("1093", Some(" a@x.com ")))
            .await
            .unwrap();

        assert_eq!(session.link, ProviderLink::LinkedByEmail);
        assert_eq!(session.user.id, "u1");
        assert_eq!(session.user.groups, ["g1"]);
        let accounts = store.accounts_of("u1");
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].account_type, DEFAULT_ACCOUNT_TYPE);
        assert_eq!(accounts[0].provider_account_id, "1093");
    }

    #[tokio::test]
    async fn linked_identity_wins_over_email() {
        let store = MemoryAccountStore::new().with_user(credential_user("a@x.com"));
        sign_in_with_provider(&store, google("1093", Some("a@x.com")))
            .await
            .unwrap();

        // The provider now reports a different address for the same identity.
        let again = sign_in_with_provider(&store, google("1093", Some("renamed@x.com")))
            .await
            .unwrap();
        assert_eq!(again.link, ProviderLink::Existing);
        assert_eq!(again.user.id, "u1");
    }

    #[tokio::test]
    async fn relinking_refreshes_tokens() {
        let store = MemoryAccountStore::new().with_user(credential_user("a@x.com"));
        sign_in_with_provider(&store, google("1093", Some("a@x.com")))
            .await
            .unwrap();
        store
            .link_account(Account {
                user_id: "u1".into(),
                account_type: DEFAULT_ACCOUNT_TYPE.into(),
                provider: "google".into(),
                provider_account_id: "1093".into(),
                access_token: Some("ya29.second".into()),
                expires_at: None,
                expires_in: Some(3599),
                refresh_token: None,
                scope: None,
            })
            .await
            .unwrap();
        let accounts = store.accounts_of("u1");
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].access_token.as_deref(), Some("ya29.second"));
    }

    #[tokio::test]
    async fn unknown_email_creates_password_less_user() {
        let store = MemoryAccountStore::new();

        let session = sign_in_with_provider(&store, google("77", Some("new@x.com")))
            .await
            .unwrap();

        assert_eq!(session.link, ProviderLink::Created);
        assert_eq!(session.user.email, "new@x.com");
        assert_eq!(session.user.name.as_deref(), Some("Baraka"));
        assert!(session.user.email_verified.is_some());
        assert!(session.user.password.is_none());
        assert!(!verify_password("anything", session.user.password.as_deref()));
        assert_eq!(store.accounts_of(&session.user.id).len(), 1);
    }

    #[tokio::test]
    async fn identity_and_email_are_required() {
        let store = MemoryAccountStore::new();
        for profile in [
            google("", Some("a@x.com")),
            ProviderSignIn {
                provider: " ".into(),
                ..google("1", Some("a@x.com"))
            },
            google("1", None),
            google("1", Some("not-an-email")),
        ] {
            let err = sign_in_with_provider(&store, profile).await.unwrap_err();
            assert_eq!(err.failure(), AuthFailure::InvalidCredentials);
        }
    }

    #[tokio::test]
    async fn provider_claims_have_no_max_age() {
        let store = MemoryAccountStore::new().with_user(credential_user("a@x.com"));
        let session = sign_in_with_provider(&store, google("1093", Some("a@x.com")))
            .await
            .unwrap();
        let claims = session.claims();
        assert_eq!(claims.id, "u1");
        assert_eq!(claims.email, "a@x.com");
        assert_eq!(claims.max_age, None);
        assert_eq!(claims.groups, None);
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let store = MemoryAccountStore::new().with_user(credential_user("a@x.com"));
        let err = store
            .create_user(NewUser {
                name: None,
                email: "a@x.com".into(),
                image: None,
                email_verified: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL pointing at a migrated PostgreSQL"]
    async fn pg_store_links_and_finds_by_account() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL");
        let pool = PgPool::connect(&url).await.expect("connect");
        crate::migrate::migrate(&pool).await.expect("migrate");
        let store = PgAccountStore::new(pool);

        let suffix = Utc::now().timestamp_nanos_opt().unwrap_or_default();
        let email = format!("provider-{suffix}@catchwatch.invalid");
        let account_id = format!("acct-{suffix}");

        let created = sign_in_with_provider(&store, google(&account_id, Some(&email)))
            .await
            .expect("sign in");
        assert_eq!(created.link, ProviderLink::Created);

        let found = store
            .find_user_by_account("google", &account_id)
            .await
            .expect("query")
            .expect("linked user");
        assert_eq!(found.id, created.user.id);
        assert!(found.password.is_none());
    }
}
