use actix_web::{get, http::header, web, HttpRequest, HttpResponse};
use url::form_urlencoded;

use crate::{
    app_state::AppState,
    auth::TokenStore,
    errors::{AppError, SIGN_IN_AGAIN},
    middleware::request_tokens,
    models::dto::request::CallbackParams,
};

pub const POST_LOGIN_PATH: &str = "/dashboard";

fn redirect(location: &str) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, location))
        .finish()
}

/// Landing page URL carrying an end-user message; provider details never
/// make it into the query.
fn error_landing(message: &str) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("error", message)
        .finish();
    format!("/?{}", query)
}

#[get("/auth/login")]
pub async fn login(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let url = state.exchange.hosted_login_url()?;
    Ok(redirect(url.as_str()))
}

#[get("/auth/callback")]
pub async fn callback(
    state: web::Data<AppState>,
    web::Query(params): web::Query<CallbackParams>,
) -> HttpResponse {
    if let Some(error) = &params.error {
        log::warn!("Identity provider returned error: {}", error);
        return redirect(&error_landing(SIGN_IN_AGAIN));
    }

    let Some(code) = params.code.as_deref() else {
        log::warn!("Callback without authorization code");
        return redirect(&error_landing(SIGN_IN_AGAIN));
    };

    let store = TokenStore::new();
    match state.exchange.exchange(code, &store).await {
        Ok(_) => {
            let mut response = redirect(POST_LOGIN_PATH);
            for cookie in store.cookies(state.config.production) {
                if let Err(e) = response.add_cookie(&cookie) {
                    log::error!("Failed to set session cookie: {}", e);
                    return redirect(&error_landing(SIGN_IN_AGAIN));
                }
            }
            response
        }
        Err(e) => {
            log::error!("Login failed: {}", e);
            redirect(&error_landing(&e.user_message()))
        }
    }
}

/// Signs the caller out. A running attempt is abandoned and its copy of the
/// credentials wiped, so no later expiry posts on the old session.
#[get("/auth/logout")]
pub async fn logout(req: HttpRequest, state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let url = state.exchange.hosted_logout_url()?;

    if let Some(identity) = state.guard.resolver().current_identity(&request_tokens(&req)) {
        if let Some(handle) = state.attempts.discard(&identity.subject_id).await {
            handle.tokens().clear();
            log::info!(
                "Abandoned attempt {} on logout of {}",
                handle.attempt_id(),
                identity.subject_id
            );
        }
    }

    let mut response = redirect(url.as_str());
    for cookie in TokenStore::removal_cookies() {
        response
            .add_cookie(&cookie)
            .map_err(|e| AppError::InternalError(format!("Failed to clear cookie: {}", e)))?;
    }
    Ok(response)
}
