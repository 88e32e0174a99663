use chrono::{DateTime, Duration, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use url::Url;

use crate::{
    auth::token_store::{TokenSet, TokenStore},
    config::Config,
    errors::{AppError, AppResult},
};

/// Lifetime assumed when the provider omits `expires_in`.
const DEFAULT_LIFETIME_SECS: i64 = 3600;

const MAX_REFRESH_TTL_DAYS: i64 = 3650;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    id_token: String,
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    token_type: Option<String>,
}

/// Trades an authorization code for tokens at the identity provider.
///
/// A failed exchange is never retried here; the user has to start the login
/// flow again with a fresh code.
pub struct TokenExchangeService {
    client: reqwest::Client,
    domain: String,
    client_id: String,
    client_secret: Option<SecretString>,
    redirect_uri: String,
    logout_redirect_uri: String,
    scopes: String,
    refresh_ttl: Duration,
}

impl TokenExchangeService {
    pub fn new(client: reqwest::Client, config: &Config) -> AppResult<Self> {
        let refresh_ttl = Some(config.refresh_token_ttl_days)
            .filter(|days| (1..=MAX_REFRESH_TTL_DAYS).contains(days))
            .and_then(Duration::try_days)
            .ok_or_else(|| {
                AppError::Configuration(format!(
                    "REFRESH_TOKEN_TTL_DAYS must be between 1 and {}, got {}",
                    MAX_REFRESH_TTL_DAYS, config.refresh_token_ttl_days
                ))
            })?;

        Ok(Self {
            client,
            domain: config.idp_domain.trim_end_matches('/').to_string(),
            client_id: config.idp_client_id.clone(),
            client_secret: config.idp_client_secret.clone(),
            redirect_uri: config.idp_redirect_uri.clone(),
            logout_redirect_uri: config.idp_logout_redirect_uri.clone(),
            scopes: config.idp_scopes.clone(),
            refresh_ttl,
        })
    }

    pub fn hosted_login_url(&self) -> AppResult<Url> {
        Url::parse_with_params(
            &format!("{}/login", self.domain),
            &[
                ("client_id", self.client_id.as_str()),
                ("response_type", "code"),
                ("scope", self.scopes.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
            ],
        )
        .map_err(|e| AppError::Configuration(format!("Invalid IDP_DOMAIN: {}", e)))
    }

    pub fn hosted_logout_url(&self) -> AppResult<Url> {
        Url::parse_with_params(
            &format!("{}/logout", self.domain),
            &[
                ("client_id", self.client_id.as_str()),
                ("logout_uri", self.logout_redirect_uri.as_str()),
            ],
        )
        .map_err(|e| AppError::Configuration(format!("Invalid IDP_DOMAIN: {}", e)))
    }

    /// Exchanges `code` and installs the resulting token set into `store`.
    pub async fn exchange(&self, code: &str, store: &TokenStore) -> AppResult<TokenSet> {
        if code.trim().is_empty() {
            return Err(AppError::AuthExchange {
                status: None,
                detail: "missing authorization code".to_string(),
            });
        }

        let mut request = self
            .client
            .post(format!("{}/oauth2/token", self.domain))
            .header("accept", "application/json")
            .form(&[
                ("grant_type", "authorization_code"),
                ("client_id", self.client_id.as_str()),
                ("code", code),
                ("redirect_uri", self.redirect_uri.as_str()),
            ]);

        if let Some(secret) = &self.client_secret {
            request = request.basic_auth(&self.client_id, Some(secret.expose_secret()));
        }

        let response = request.send().await.map_err(|e| {
            log::error!("Failed to reach token endpoint: {}", e);
            AppError::AuthExchange {
                status: None,
                detail: e.to_string(),
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response
                .text()
                .await
                .unwrap_or_else(|_| "Could not read response body".to_string());
            log::error!("Token exchange rejected with status {}", status);
            return Err(AppError::AuthExchange {
                status: Some(status.as_u16()),
                detail,
            });
        }

        let body = response.json::<TokenResponse>().await.map_err(|e| {
            log::error!("Failed to parse token response: {}", e);
            AppError::AuthExchange {
                status: Some(status.as_u16()),
                detail: format!("Failed to parse token response: {}", e),
            }
        })?;

        if let Some(token_type) = body.token_type.as_deref() {
            if !token_type.eq_ignore_ascii_case("bearer") {
                log::warn!("Unexpected token type from provider: {}", token_type);
            }
        }

        let lifetime = body.expires_in.unwrap_or(DEFAULT_LIFETIME_SECS);
        let expires_at = expiry_after(lifetime).ok_or_else(|| {
            log::error!("Provider returned unusable token lifetime {}", lifetime);
            AppError::AuthExchange {
                status: Some(status.as_u16()),
                detail: format!("invalid expires_in {}", lifetime),
            }
        })?;

        let tokens = TokenSet {
            id_token: SecretString::from(body.id_token),
            access_token: SecretString::from(body.access_token),
            refresh_token: body.refresh_token.map(SecretString::from),
            expires_at,
        };

        store.replace(tokens.clone(), self.refresh_ttl);
        log::info!("Token exchange succeeded; session valid for {}s", lifetime);

        Ok(tokens)
    }
}

/// `now + seconds`, or `None` for a non-positive or unrepresentable lifetime.
fn expiry_after(seconds: i64) -> Option<DateTime<Utc>> {
    if seconds <= 0 {
        return None;
    }
    Utc::now().checked_add_signed(Duration::try_seconds(seconds)?)
}
