use std::sync::Arc;

use crate::{
    auth::{claims::Identity, resolver::SessionResolver, token_store::TokenStore},
    errors::{AppError, AppResult},
};

pub const ADMIN_HOME: &str = "/admin";
pub const STUDENT_HOME: &str = "/exams";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    Granted(Identity),
    RedirectToLogin,
    /// Sent back to the caller's own area so the response does not reveal
    /// whether the requested resource exists.
    Forbidden { home: &'static str },
}

impl AccessDecision {
    pub fn into_result(self) -> AppResult<Identity> {
        match self {
            AccessDecision::Granted(identity) => Ok(identity),
            AccessDecision::RedirectToLogin => Err(AppError::NotAuthenticated),
            AccessDecision::Forbidden { home } => Err(AppError::Forbidden {
                home: home.to_string(),
            }),
        }
    }
}

/// Role checks for role-scoped regions. Nothing is cached between calls; the
/// token set may be replaced or cleared at any point.
#[derive(Clone)]
pub struct AccessGuard {
    resolver: Arc<SessionResolver>,
    admin_role: String,
}

impl AccessGuard {
    pub fn new(resolver: Arc<SessionResolver>, admin_role: impl Into<String>) -> Self {
        Self {
            resolver,
            admin_role: admin_role.into(),
        }
    }

    pub fn resolver(&self) -> &SessionResolver {
        &self.resolver
    }

    pub fn require_role(&self, store: &TokenStore, role: &str) -> AccessDecision {
        let Some(identity) = self.resolver.current_identity(store) else {
            return AccessDecision::RedirectToLogin;
        };

        if identity.has_role(role) {
            AccessDecision::Granted(identity)
        } else {
            log::info!("Subject {} lacks role {}", identity.subject_id, role);
            AccessDecision::Forbidden {
                home: self.home_for(&identity),
            }
        }
    }

    pub fn require_authenticated(&self, store: &TokenStore) -> AccessDecision {
        match self.resolver.current_identity(store) {
            Some(identity) => AccessDecision::Granted(identity),
            None => AccessDecision::RedirectToLogin,
        }
    }

    pub fn require_admin(&self, store: &TokenStore) -> AccessDecision {
        self.require_role(store, &self.admin_role)
    }

    pub fn is_admin(&self, identity: &Identity) -> bool {
        identity.has_role(&self.admin_role)
    }

    pub fn home_for(&self, identity: &Identity) -> &'static str {
        if self.is_admin(identity) {
            ADMIN_HOME
        } else {
            STUDENT_HOME
        }
    }
}
