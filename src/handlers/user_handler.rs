use actix_web::{get, web, HttpResponse};

use crate::{
    app_state::AppState,
    auth::{AdminUser, AuthenticatedUser},
    errors::AppError,
    models::dto::response::{AdminAreaResponse, SessionResponse},
};

#[get("/health")]
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

/// Display identity of the signed-in user and where their area lives.
#[get("/me")]
pub async fn current_user(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let identity = user.identity;
    let response = SessionResponse {
        home: state.guard.home_for(&identity),
        is_admin: state.guard.is_admin(&identity),
        identity,
    };
    Ok(HttpResponse::Ok().json(response))
}

#[get("/admin")]
pub async fn admin_area(
    state: web::Data<AppState>,
    admin: AdminUser,
) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(AdminAreaResponse {
        signed_in_as: admin.identity.display_name().to_string(),
        active_attempts: state.attempts.len().await,
    }))
}
