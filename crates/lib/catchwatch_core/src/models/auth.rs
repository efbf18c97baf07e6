//! Authentication and authorization domain models.
//!
//! Field names on the wire follow the stored documents (`maxAge`, `BMU`,
//! `permission_id`, `_id`), so tokens and session payloads stay readable by
//! clients written against the dashboard's existing JSON.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Closed action vocabulary a permission may grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Admin,
    Read,
    Write,
    Submit,
    Receive,
    Review,
}

impl Action {
    /// Every action, in vocabulary order.
    pub const ALL: [Action; 6] = [
        Action::Admin,
        Action::Read,
        Action::Write,
        Action::Submit,
        Action::Receive,
        Action::Review,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Admin => "admin",
            Action::Read => "read",
            Action::Write => "write",
            Action::Submit => "submit",
            Action::Receive => "receive",
            Action::Review => "review",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wildcard value for [`BmuScope::All`].
pub const BMU_WILDCARD: &str = "*";

/// Fishing units covered by a domain rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BmuScope {
    /// Every unit in the rule's country (`"*"`).
    All,
    /// An explicit list of unit identifiers.
    Units(Vec<String>),
}

impl BmuScope {
    /// Whether `bmu` falls inside this scope.
    pub fn covers(&self, bmu: &str) -> bool {
        match self {
            BmuScope::All => true,
            BmuScope::Units(units) => units.iter().any(|u| u == bmu),
        }
    }
}

impl Serialize for BmuScope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            BmuScope::All => serializer.serialize_str(BMU_WILDCARD),
            BmuScope::Units(units) => units.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for BmuScope {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            List(Vec<String>),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Text(s) if s == BMU_WILDCARD => Ok(BmuScope::All),
            Raw::Text(s) => Err(serde::de::Error::custom(format!(
                "BMU must be \"{BMU_WILDCARD}\" or a list of unit identifiers, got \"{s}\""
            ))),
            Raw::List(units) => Ok(BmuScope::Units(units)),
        }
    }
}

/// One scoping rule of a permission's domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainRule {
    pub country: String,
    #[serde(rename = "BMU")]
    pub bmu: BmuScope,
    #[serde(default)]
    pub person: String,
}

/// Permission document: which actions are allowed, and where.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    #[serde(rename = "_id", alias = "id", default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub domain: Vec<DomainRule>,
    #[serde(default)]
    pub actions: BTreeSet<Action>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
}

/// Stored group: a name plus a reference to exactly one permission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub name: String,
    pub permission_id: String,
}

/// Group with its permission populated, as carried by principals and tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRef {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub name: String,
    #[serde(rename = "permission_id")]
    pub permission: Permission,
}

/// Persisted account record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: Option<String>,
    pub email: String,
    /// bcrypt hash. `None` for accounts without local credentials.
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
    #[serde(rename = "emailVerified", default)]
    pub email_verified: Option<DateTime<Utc>>,
    #[serde(default)]
    pub image: Option<String>,
    /// Group ids, in membership order.
    #[serde(default)]
    pub groups: Vec<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// New user provisioned by an external sign-in; it never has a password.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub name: Option<String>,
    pub email: String,
    pub image: Option<String>,
    pub email_verified: Option<DateTime<Utc>>,
}

/// External provider identity linked to a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "type")]
    pub account_type: String,
    pub provider: String,
    #[serde(rename = "providerAccountId")]
    pub provider_account_id: String,
    #[serde(default, skip_serializing)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default, skip_serializing)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

/// User with groups and permissions resolved in one read.
#[derive(Debug, Clone)]
pub struct ResolvedUser {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub image: Option<String>,
    pub password_hash: Option<String>,
    pub groups: Vec<GroupRef>,
}

/// Identity produced by a successful login.
///
/// Only the authorizer constructs one; it lives just long enough to be
/// encoded into a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    id: String,
    email: String,
    groups: Vec<GroupRef>,
    #[serde(rename = "maxAge")]
    max_age: i64,
}

impl Principal {
    pub(crate) fn new(id: String, email: String, groups: Vec<GroupRef>, max_age: i64) -> Self {
        Self {
            id,
            email,
            groups,
            max_age,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn groups(&self) -> &[GroupRef] {
        &self.groups
    }

    /// Session lifetime in seconds.
    pub fn max_age(&self) -> i64 {
        self.max_age
    }
}

/// Claims carried inside a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub id: String,
    pub email: String,
    #[serde(rename = "maxAge", default, skip_serializing_if = "Option::is_none")]
    pub max_age: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groups: Option<Vec<GroupRef>>,
}

impl From<&Principal> for SessionClaims {
    fn from(principal: &Principal) -> Self {
        Self {
            id: principal.id.clone(),
            email: principal.email.clone(),
            max_age: Some(principal.max_age),
            groups: Some(principal.groups.clone()),
        }
    }
}

/// User fields a session starts with before token claims are applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseUser {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Session defaults supplied by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseSession {
    #[serde(default)]
    pub user: BaseUser,
}

/// User projection inside a [`SessionView`]; id and email always come from claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Caller-facing session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionView {
    pub user: SessionUser,
    #[serde(rename = "maxAge", default, skip_serializing_if = "Option::is_none")]
    pub max_age: Option<i64>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_iso_millis"
    )]
    pub expires: Option<DateTime<Utc>>,
}

/// `2024-05-01T10:00:00.000Z`, the same layout as JavaScript's `toISOString()`.
pub fn to_iso_millis(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn serialize_iso_millis<S: Serializer>(
    value: &Option<DateTime<Utc>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(at) => serializer.serialize_str(&to_iso_millis(at)),
        None => serializer.serialize_none(),
    }
}
