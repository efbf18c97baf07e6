//! Credential store: user lookup with groups and permissions resolved eagerly.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::types::Json;
use thiserror::Error;
use tracing::debug;

use crate::models::auth::{Group, GroupRef, Permission, ResolvedUser, User};

/// Failures reaching or reading the store. Never used for "not found".
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Db(#[from] sqlx::Error),

    #[error("Corrupt group or permission document: {0}")]
    CorruptDocument(#[from] serde_json::Error),

    #[error("Conflict: {0}")]
    Conflict(String),
}

/// Read-only access to users and their resolved permissions.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Look up a user by email with every group's permission populated.
    ///
    /// `Ok(None)` means no such user. A group is returned with its
    /// permission or not at all.
    async fn find_by_email_with_permissions(
        &self,
        email: &str,
    ) -> Result<Option<ResolvedUser>, StoreError>;
}

/// Groups and permissions are aggregated inside the same statement, so the
/// whole result comes from a single snapshot.
const FIND_USER_WITH_PERMISSIONS: &str = "\
SELECT u.id::text, u.email, u.name, u.image, u.password, \
       COALESCE(( \
           SELECT json_agg(json_build_object( \
                      '_id', g.id::text, \
                      'name', g.name, \
                      'permission_id', json_build_object( \
                          '_id', p.id::text, \
                          'name', p.name, \
                          'domain', p.domain, \
                          'actions', to_json(p.actions), \
                          'group_id', p.group_id::text)) \
                  ORDER BY ug.position, g.name) \
           FROM user_groups ug \
           JOIN groups g ON g.id = ug.group_id \
           JOIN permissions p ON p.id = g.permission_id \
           WHERE ug.user_id = u.id \
       ), '[]'::json) AS groups \
FROM users u \
WHERE u.email = $1";

type UserRow = (
    String,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    Json<serde_json::Value>,
);

/// PostgreSQL-backed credential store.
#[derive(Debug, Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_by_email_with_permissions(
        &self,
        email: &str,
    ) -> Result<Option<ResolvedUser>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(FIND_USER_WITH_PERMISSIONS)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        let Some((id, email, name, image, password_hash, Json(groups))) = row else {
            return Ok(None);
        };
        let groups = parse_groups(groups)?;

        Ok(Some(ResolvedUser {
            id,
            email,
            name,
            image,
            password_hash,
            groups,
        }))
    }
}

fn parse_groups(value: serde_json::Value) -> Result<Vec<GroupRef>, StoreError> {
    Ok(serde_json::from_value(value)?)
}

/// In-memory credential store, joined on lookup.
#[derive(Debug, Clone, Default)]
pub struct MemoryCredentialStore {
    users: HashMap<String, User>,
    groups: HashMap<String, Group>,
    permissions: HashMap<String, Permission>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_permission(mut self, permission: Permission) -> Self {
        self.permissions.insert(permission.id.clone(), permission);
        self
    }

    pub fn with_group(mut self, group: Group) -> Self {
        self.groups.insert(group.id.clone(), group);
        self
    }

    /// Insert a user, keyed by email. A later user with the same email replaces it.
    pub fn with_user(mut self, user: User) -> Self {
        self.users.insert(user.email.clone(), user);
        self
    }

    fn resolve_group(&self, group_id: &str) -> Option<GroupRef> {
        let group = self.groups.get(group_id)?;
        let permission = self.permissions.get(&group.permission_id)?;
        Some(GroupRef {
            id: group.id.clone(),
            name: group.name.clone(),
            permission: permission.clone(),
        })
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn find_by_email_with_permissions(
        &self,
        email: &str,
    ) -> Result<Option<ResolvedUser>, StoreError> {
        let Some(user) = self.users.get(email) else {
            return Ok(None);
        };

        let groups = user
            .groups
            .iter()
            .filter_map(|gid| {
                let resolved = self.resolve_group(gid);
                if resolved.is_none() {
                    debug!(group_id = %gid, "skipping group without a resolvable permission");
                }
                resolved
            })
            .collect();

        Ok(Some(ResolvedUser {
            id: user.id.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            image: user.image.clone(),
            password_hash: user.password.clone(),
            groups,
        }))
    }
}
