use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use secrecy::ExposeSecret;

use crate::{
    auth::{
        claims::{IdTokenClaims, Identity},
        token_store::{SecretKind, TokenStore},
    },
    config::Config,
    errors::{AppError, AppResult},
};

/// How far the resolver trusts the claims of an identity assertion.
#[derive(Clone)]
pub enum ClaimTrust {
    /// Structural decode only. Role claims are taken at face value, so this
    /// is for development against a provider whose keys are not configured.
    Unverified,
    /// RS256 signature and audience are checked against the issuer's key.
    Verified { key: DecodingKey, audience: String },
}

/// Derives the caller's identity from the token store without network calls.
#[derive(Clone)]
pub struct SessionResolver {
    key: DecodingKey,
    validation: Validation,
    verified: bool,
}

impl SessionResolver {
    pub fn new(trust: ClaimTrust) -> Self {
        match trust {
            ClaimTrust::Unverified => {
                let mut validation = Validation::default();
                validation.insecure_disable_signature_validation();
                validation.validate_exp = false;
                validation.validate_aud = false;
                validation.required_spec_claims.clear();

                Self {
                    key: DecodingKey::from_secret(&[]),
                    validation,
                    verified: false,
                }
            }
            ClaimTrust::Verified { key, audience } => {
                let mut validation = Validation::new(Algorithm::RS256);
                validation.set_audience(&[audience]);

                Self {
                    key,
                    validation,
                    verified: true,
                }
            }
        }
    }

    pub fn from_config(config: &Config) -> AppResult<Self> {
        let trust = match &config.id_token_public_key_pem {
            Some(pem) => ClaimTrust::Verified {
                key: DecodingKey::from_rsa_pem(pem.as_bytes()).map_err(|e| {
                    AppError::Configuration(format!("Invalid ID_TOKEN_PUBLIC_KEY_PEM: {}", e))
                })?,
                audience: config.idp_client_id.clone(),
            },
            None => {
                log::warn!("No id token public key configured; role claims are trusted without signature verification");
                ClaimTrust::Unverified
            }
        };

        Ok(Self::new(trust))
    }

    pub fn is_verified(&self) -> bool {
        self.verified
    }

    /// `Ok(None)` when there is no identity assertion at all.
    pub fn resolve(&self, store: &TokenStore) -> AppResult<Option<Identity>> {
        let Some(token) = store.get(SecretKind::IdToken) else {
            return Ok(None);
        };

        let claims = self.decode_claims(token.expose_secret())?;
        Ok(Some(Identity::from(claims)))
    }

    /// Identity of the current session. A malformed assertion counts as
    /// signed out.
    pub fn current_identity(&self, store: &TokenStore) -> Option<Identity> {
        match self.resolve(store) {
            Ok(identity) => identity,
            Err(e) => {
                log::warn!("Discarding unreadable id token: {}", e);
                None
            }
        }
    }

    fn decode_claims(&self, token: &str) -> AppResult<IdTokenClaims> {
        if token.split('.').count() != 3 {
            return Err(AppError::MalformedSession(
                "id token is not three dot-separated segments".to_string(),
            ));
        }

        decode::<IdTokenClaims>(token, &self.key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => {
                    AppError::MalformedSession("id token has expired".to_string())
                }
                ErrorKind::InvalidSignature => {
                    AppError::MalformedSession("id token signature is invalid".to_string())
                }
                ErrorKind::InvalidAudience => {
                    AppError::MalformedSession("id token was issued to another client".to_string())
                }
                _ => AppError::from(e),
            })
    }
}
