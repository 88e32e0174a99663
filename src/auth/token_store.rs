use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock},
};

use actix_web::{
    cookie::{time::Duration as CookieDuration, Cookie, SameSite},
    HttpRequest,
};
use chrono::{DateTime, Duration, Utc};
use secrecy::{ExposeSecret, SecretString};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SecretKind {
    IdToken,
    AccessToken,
    RefreshToken,
}

impl SecretKind {
    pub const ALL: [SecretKind; 3] = [
        SecretKind::IdToken,
        SecretKind::AccessToken,
        SecretKind::RefreshToken,
    ];

    pub fn cookie_name(self) -> &'static str {
        match self {
            SecretKind::IdToken => "id_token",
            SecretKind::AccessToken => "access_token",
            SecretKind::RefreshToken => "refresh_token",
        }
    }
}

/// Tokens returned by one successful code exchange.
#[derive(Clone, Debug)]
pub struct TokenSet {
    pub id_token: SecretString,
    pub access_token: SecretString,
    pub refresh_token: Option<SecretString>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
struct StoredSecret {
    value: SecretString,
    // None when the secret came back from a cookie; the browser enforces max-age.
    expires_at: Option<DateTime<Utc>>,
}

impl StoredSecret {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

type Secrets = HashMap<SecretKind, StoredSecret>;

/// Session-scoped holder of the current token set.
///
/// Clones share the same secrets, so one store can be handed to the gateway of
/// a running attempt and refreshed from later requests of the same client.
/// Every write replaces or clears the whole set.
#[derive(Clone, Debug, Default)]
pub struct TokenStore {
    secrets: Arc<RwLock<Secrets>>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the session cookies of an incoming request into a fresh store.
    pub fn from_request(req: &HttpRequest) -> Self {
        let secrets = SecretKind::ALL
            .iter()
            .filter_map(|kind| {
                let cookie = req.cookie(kind.cookie_name())?;
                if cookie.value().is_empty() {
                    return None;
                }
                Some((
                    *kind,
                    StoredSecret {
                        value: SecretString::from(cookie.value().to_string()),
                        expires_at: None,
                    },
                ))
            })
            .collect();

        Self {
            secrets: Arc::new(RwLock::new(secrets)),
        }
    }

    pub fn get(&self, kind: SecretKind) -> Option<SecretString> {
        let now = Utc::now();
        self.read()
            .get(&kind)
            .filter(|secret| secret.is_live(now))
            .map(|secret| secret.value.clone())
    }

    pub fn contains(&self, kind: SecretKind) -> bool {
        self.get(kind).is_some()
    }

    pub fn is_empty(&self) -> bool {
        SecretKind::ALL.iter().all(|kind| !self.contains(*kind))
    }

    /// Installs a new token set. The refresh credential gets its own, longer
    /// horizon independent of the provider's lifetime.
    pub fn replace(&self, tokens: TokenSet, refresh_ttl: Duration) {
        let mut secrets = Secrets::new();
        secrets.insert(
            SecretKind::IdToken,
            StoredSecret {
                value: tokens.id_token,
                expires_at: Some(tokens.expires_at),
            },
        );
        secrets.insert(
            SecretKind::AccessToken,
            StoredSecret {
                value: tokens.access_token,
                expires_at: Some(tokens.expires_at),
            },
        );
        if let Some(refresh_token) = tokens.refresh_token {
            secrets.insert(
                SecretKind::RefreshToken,
                StoredSecret {
                    value: refresh_token,
                    expires_at: Some(Utc::now() + refresh_ttl),
                },
            );
        }

        *self.write() = secrets;
    }

    pub fn clear(&self) {
        self.write().clear();
    }

    /// Makes this store hold exactly what `other` holds.
    pub fn adopt(&self, other: &TokenStore) {
        if Arc::ptr_eq(&self.secrets, &other.secrets) {
            return;
        }
        let snapshot = other.read().clone();
        *self.write() = snapshot;
    }

    /// Cookies carrying the live secrets: script-unreadable, root scoped,
    /// `Secure` when requested.
    pub fn cookies(&self, secure: bool) -> Vec<Cookie<'static>> {
        let now = Utc::now();
        let secrets = self.read();

        SecretKind::ALL
            .iter()
            .filter_map(|kind| {
                let secret = secrets.get(kind).filter(|s| s.is_live(now))?;
                let mut cookie = Cookie::build(
                    kind.cookie_name(),
                    secret.value.expose_secret().to_string(),
                )
                .path("/")
                .http_only(true)
                .secure(secure)
                .same_site(SameSite::Lax)
                .finish();

                if let Some(expires_at) = secret.expires_at {
                    let seconds = (expires_at - now).num_seconds().max(0);
                    cookie.set_max_age(CookieDuration::seconds(seconds));
                }
                Some(cookie)
            })
            .collect()
    }

    /// Cookies that delete every session secret from the browser.
    pub fn removal_cookies() -> Vec<Cookie<'static>> {
        SecretKind::ALL
            .iter()
            .map(|kind| {
                Cookie::build(kind.cookie_name(), "")
                    .path("/")
                    .http_only(true)
                    .max_age(CookieDuration::ZERO)
                    .finish()
            })
            .collect()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Secrets> {
        self.secrets.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Secrets> {
        self.secrets.write().unwrap_or_else(PoisonError::into_inner)
    }
}
