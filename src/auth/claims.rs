use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// The groups claim arrives as a single string, a list, or not at all.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RoleClaim {
    Single(String),
    Many(Vec<String>),
}

impl RoleClaim {
    pub fn into_roles(self) -> BTreeSet<String> {
        match self {
            RoleClaim::Single(role) => BTreeSet::from([role]),
            RoleClaim::Many(roles) => roles.into_iter().collect(),
        }
    }
}

/// Claims read from the identity assertion.
#[derive(Debug, Clone, Deserialize)]
pub struct IdTokenClaims {
    pub sub: String, // Subject (provider user id)
    #[serde(default)]
    pub email: Option<String>,
    #[serde(rename = "cognito:groups", default)]
    pub groups: Option<RoleClaim>,
}

/// Who the caller is, recomputed from the token store on every check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub subject_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub roles: BTreeSet<String>,
}

impl Identity {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    pub fn display_name(&self) -> &str {
        self.email.as_deref().unwrap_or(&self.subject_id)
    }
}

impl From<IdTokenClaims> for Identity {
    fn from(claims: IdTokenClaims) -> Self {
        Self {
            subject_id: claims.sub,
            email: claims.email,
            // No groups claim means the unprivileged student role.
            roles: claims.groups.map(RoleClaim::into_roles).unwrap_or_default(),
        }
    }
}
