use std::env;

use secrecy::SecretString;

use crate::errors::{AppError, AppResult};

const DEFAULT_CLIENT_ID: &str = "idp_client_id";

#[derive(Clone, Debug)]
pub struct Config {
    pub idp_domain: String,
    pub idp_client_id: String,
    pub idp_client_secret: Option<SecretString>,
    pub idp_redirect_uri: String,
    pub idp_logout_redirect_uri: String,
    pub idp_scopes: String,
    pub api_base_url: String,
    pub web_server_host: String,
    pub web_server_port: u16,
    pub production: bool,
    pub refresh_token_ttl_days: i64,
    pub admin_role: String,
    pub submit_timeout_secs: u64,
    /// PEM encoded RSA public key of the identity provider. When unset, id
    /// token claims are decoded without signature verification.
    pub id_token_public_key_pem: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            idp_domain: env::var("IDP_DOMAIN")
                .unwrap_or_else(|_| "http://localhost:9000".to_string()),
            idp_client_id: env::var("IDP_CLIENT_ID")
                .unwrap_or_else(|_| DEFAULT_CLIENT_ID.to_string()),
            idp_client_secret: env::var("IDP_CLIENT_SECRET")
                .ok()
                .filter(|s| !s.is_empty())
                .map(SecretString::from),
            idp_redirect_uri: env::var("IDP_REDIRECT_URI")
                .unwrap_or_else(|_| "http://localhost:8080/auth/callback".to_string()),
            idp_logout_redirect_uri: env::var("IDP_LOGOUT_REDIRECT_URI")
                .unwrap_or_else(|_| "http://localhost:8080/".to_string()),
            idp_scopes: env::var("IDP_SCOPES")
                .unwrap_or_else(|_| "email openid phone".to_string()),
            api_base_url: env::var("API_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:3001".to_string()),
            web_server_host: env::var("WEB_SERVER_HOST")
                .unwrap_or_else(|_| "localhost".to_string()),
            web_server_port: env::var("WEB_SERVER_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            production: env::var("APP_ENV")
                .map(|v| v.eq_ignore_ascii_case("production"))
                .unwrap_or(false),
            refresh_token_ttl_days: env::var("REFRESH_TOKEN_TTL_DAYS")
                .ok()
                .and_then(|d| d.parse().ok())
                .unwrap_or(30),
            admin_role: env::var("ADMIN_ROLE").unwrap_or_else(|_| "admin".to_string()),
            submit_timeout_secs: env::var("SUBMIT_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
            id_token_public_key_pem: env::var("ID_TOKEN_PUBLIC_KEY_PEM")
                .ok()
                .filter(|s| !s.trim().is_empty()),
        }
    }

    /// Rejects settings that are only acceptable for local development.
    pub fn validate_for_production(&self) -> AppResult<()> {
        if !self.production {
            return Ok(());
        }

        if self.idp_client_id == DEFAULT_CLIENT_ID {
            return Err(AppError::Configuration(
                "IDP_CLIENT_ID is using its default value".to_string(),
            ));
        }

        if !self.idp_redirect_uri.starts_with("https://") {
            return Err(AppError::Configuration(
                "IDP_REDIRECT_URI must use https in production".to_string(),
            ));
        }

        if self.id_token_public_key_pem.is_none() {
            return Err(AppError::Configuration(
                "ID_TOKEN_PUBLIC_KEY_PEM must be set in production; role claims are not trusted unverified"
                    .to_string(),
            ));
        }

        Ok(())
    }

    #[cfg(test)]
    pub fn test_config() -> Self {
        Self {
            idp_domain: "https://idp.example.com".to_string(),
            idp_client_id: "test-client".to_string(),
            idp_client_secret: Some(SecretString::from("test-secret".to_string())),
            idp_redirect_uri: "http://localhost:8080/auth/callback".to_string(),
            idp_logout_redirect_uri: "http://localhost:8080/".to_string(),
            idp_scopes: "email openid phone".to_string(),
            api_base_url: "http://127.0.0.1:9".to_string(),
            web_server_host: "127.0.0.1".to_string(),
            web_server_port: 8080,
            production: false,
            refresh_token_ttl_days: 30,
            admin_role: "admin".to_string(),
            submit_timeout_secs: 5,
            id_token_public_key_pem: None,
        }
    }
}
