use std::future::{ready, Ready};

use actix_web::{web, FromRequest, HttpRequest};

use crate::{
    app_state::AppState,
    auth::{AccessDecision, AccessGuard, Identity, TokenStore},
    errors::AppError,
    middleware::request_tokens,
};

/// Extractor for any signed-in caller. Carries the request's token store so
/// handlers can forward the credential.
pub struct AuthenticatedUser {
    pub identity: Identity,
    pub tokens: TokenStore,
}

/// Extractor for callers holding the admin role.
pub struct AdminUser {
    pub identity: Identity,
    pub tokens: TokenStore,
}

fn authorize(
    req: &HttpRequest,
    check: impl FnOnce(&AccessGuard, &TokenStore) -> AccessDecision,
) -> Result<(Identity, TokenStore), AppError> {
    let state = req
        .app_data::<web::Data<AppState>>()
        .ok_or_else(|| AppError::InternalError("Application state not configured".to_string()))?;

    let tokens = request_tokens(req);
    let identity = check(&state.guard, &tokens).into_result()?;
    Ok((identity, tokens))
}

impl FromRequest for AuthenticatedUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
        let user = authorize(req, |guard, tokens| guard.require_authenticated(tokens))
            .map(|(identity, tokens)| AuthenticatedUser { identity, tokens });

        ready(user)
    }
}

impl FromRequest for AdminUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
        let user = authorize(req, |guard, tokens| guard.require_admin(tokens))
            .map(|(identity, tokens)| AdminUser { identity, tokens });

        ready(user)
    }
}
