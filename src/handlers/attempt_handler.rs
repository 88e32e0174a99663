use std::sync::Arc;

use actix_web::{delete, get, post, web, HttpResponse};
use validator::Validate;

use crate::{
    app_state::AppState,
    auth::{AuthenticatedUser, TokenStore},
    errors::{AppError, AppResult},
    models::{
        domain::{AttemptPhase, Navigation},
        dto::{request::SelectAnswerRequest, response::AttemptView},
    },
    services::{AttemptHandle, AttemptRunner, ExamApi, HttpExamApi},
};

/// Fetches the exam and starts a fresh attempt for the caller, replacing any
/// attempt they already had running.
#[post("/exams/{exam_id}/attempt")]
pub async fn start_attempt(
    state: web::Data<AppState>,
    exam_id: web::Path<String>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    // The attempt outlives this request, so it gets its own store.
    let tokens = TokenStore::new();
    tokens.adopt(&user.tokens);

    let api = HttpExamApi::new(state.http.clone(), &state.config.api_base_url, tokens.clone());
    let exam = api.fetch_exam(&exam_id).await?;

    let api: Arc<dyn ExamApi> = Arc::new(api);
    let handle = AttemptRunner::start(exam, api, tokens)?;
    let view = handle.view().await?;

    let subject_id = &user.identity.subject_id;
    state.attempts.insert(subject_id, handle.clone()).await;
    state.attempts.release_when_submitted(subject_id, &handle);

    Ok(HttpResponse::Created().json(view))
}

#[get("/attempt")]
pub async fn get_attempt(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let handle = attempt_for(&state, &user).await?;
    let view = handle.view().await?;
    respond(&state, &user, view).await
}

#[post("/attempt/answers")]
pub async fn select_answer(
    state: web::Data<AppState>,
    request: web::Json<SelectAnswerRequest>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    request.validate()?;
    let request = request.into_inner();

    let handle = attempt_for(&state, &user).await?;
    let view = handle
        .select_answer(request.question_id, request.choice)
        .await?;
    respond(&state, &user, view).await
}

#[post("/attempt/navigate")]
pub async fn navigate(
    state: web::Data<AppState>,
    navigation: web::Json<Navigation>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let handle = attempt_for(&state, &user).await?;
    let view = handle.navigate(navigation.into_inner()).await?;
    respond(&state, &user, view).await
}

/// Manual submit. Answers once the submission has settled; a failure keeps
/// the attempt open and the view carries the message to show.
#[post("/attempt/submit")]
pub async fn submit_attempt(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let handle = attempt_for(&state, &user).await?;
    let view = handle.submit().await?;
    respond(&state, &user, view).await
}

/// Abandons the caller's attempt without submitting it. Its timer stops with
/// the last handle, so nothing is posted afterwards.
#[delete("/attempt")]
pub async fn abandon_attempt(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let handle = state
        .attempts
        .discard(&user.identity.subject_id)
        .await
        .ok_or_else(|| AppError::NotFound("No active attempt".to_string()))?;

    log::info!(
        "Attempt {} abandoned by {}",
        handle.attempt_id(),
        user.identity.subject_id
    );
    Ok(HttpResponse::NoContent().finish())
}

/// The caller's running attempt, with its credentials refreshed from this
/// request's session.
async fn attempt_for(state: &AppState, user: &AuthenticatedUser) -> AppResult<AttemptHandle> {
    let handle = state
        .attempts
        .get(&user.identity.subject_id)
        .await
        .ok_or_else(|| AppError::NotFound("No active attempt".to_string()))?;

    handle.tokens().adopt(&user.tokens);
    Ok(handle)
}

async fn respond(
    state: &AppState,
    user: &AuthenticatedUser,
    view: AttemptView,
) -> Result<HttpResponse, AppError> {
    if view.phase == AttemptPhase::Submitted {
        state
            .attempts
            .discard_if(&user.identity.subject_id, view.attempt_id)
            .await;
        log::info!(
            "Attempt {} finished for {}",
            view.attempt_id,
            user.identity.subject_id
        );
    }
    Ok(HttpResponse::Ok().json(view))
}
