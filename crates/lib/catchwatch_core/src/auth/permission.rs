//! Scoped permission checks against a permission's domain rules.

use serde::Deserialize;

use crate::models::auth::{Action, BmuScope, DomainRule, Permission, SessionClaims};

/// Person value that matches anyone.
const ANY_PERSON: &str = "*";

/// The resource an action is attempted on.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Scope {
    pub country: String,
    #[serde(default)]
    pub bmu: Option<String>,
    #[serde(default)]
    pub person: Option<String>,
}

impl Scope {
    pub fn country(country: impl Into<String>) -> Self {
        Self {
            country: country.into(),
            bmu: None,
            person: None,
        }
    }

    pub fn with_bmu(mut self, bmu: impl Into<String>) -> Self {
        self.bmu = Some(bmu.into());
        self
    }

    pub fn with_person(mut self, person: impl Into<String>) -> Self {
        self.person = Some(person.into());
        self
    }
}

impl DomainRule {
    /// Whether this rule covers `scope`.
    ///
    /// A scope without a BMU is only covered by a wildcard rule. A rule with
    /// an empty or `"*"` person covers every person.
    pub fn covers(&self, scope: &Scope) -> bool {
        if self.country != scope.country {
            return false;
        }
        let bmu_ok = match scope.bmu.as_deref() {
            Some(bmu) => self.bmu.covers(bmu),
            None => self.bmu == BmuScope::All,
        };
        let person_ok = self.person.is_empty()
            || self.person == ANY_PERSON
            || scope.person.as_deref() == Some(self.person.as_str());
        bmu_ok && person_ok
    }
}

impl Permission {
    /// Whether this permission grants `action` on `scope`. `admin` implies
    /// every other action.
    pub fn allows(&self, action: Action, scope: &Scope) -> bool {
        let granted = self.actions.contains(&action) || self.actions.contains(&Action::Admin);
        granted && self.domain.iter().any(|rule| rule.covers(scope))
    }
}

impl SessionClaims {
    /// Whether any group carried by the session allows `action` on `scope`.
    pub fn can(&self, action: Action, scope: &Scope) -> bool {
        self.groups
            .iter()
            .flatten()
            .any(|group| group.permission.allows(action, scope))
    }
}
