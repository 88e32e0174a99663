use async_trait::async_trait;
use reqwest::{RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;

use crate::{
    auth::{SecretKind, TokenStore},
    errors::{AppError, AppResult},
    models::{
        domain::{AnswerMap, ExamDetail, SubmissionReceipt},
        dto::request::SubmitAnswersRequest,
    },
};

/// Calls the core makes against the exam API.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ExamApi: Send + Sync {
    async fn fetch_exam(&self, exam_id: &str) -> AppResult<ExamDetail>;
    async fn submit_answers(&self, exam_id: &str, answers: &AnswerMap) -> AppResult<SubmissionReceipt>;
}

/// reqwest implementation authorizing every call with the session's id token.
pub struct HttpExamApi {
    client: reqwest::Client,
    base_url: String,
    tokens: TokenStore,
}

impl HttpExamApi {
    pub fn new(client: reqwest::Client, base_url: &str, tokens: TokenStore) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            tokens,
        }
    }

    fn bearer(&self) -> AppResult<SecretString> {
        self.tokens
            .get(SecretKind::IdToken)
            .ok_or(AppError::NotAuthenticated)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder, path: &str) -> AppResult<T> {
        // Checked before any traffic: no credential, no request.
        let token = self.bearer()?;

        let response = request
            .bearer_auth(token.expose_secret())
            .send()
            .await
            .map_err(|e| {
                log::error!("Exam API call {} failed: {}", path, e);
                AppError::from(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            log::warn!("Exam API call {} returned {}", path, status);
            return Err(classify_status(status, path));
        }

        response.json::<T>().await.map_err(|e| {
            AppError::InternalError(format!("Unexpected response from {}: {}", path, e))
        })
    }
}

#[async_trait]
impl ExamApi for HttpExamApi {
    async fn fetch_exam(&self, exam_id: &str) -> AppResult<ExamDetail> {
        let path = exam_path(exam_id, "questions")?;
        let request = self.client.get(format!("{}{}", self.base_url, path));
        self.send(request, &path).await
    }

    async fn submit_answers(&self, exam_id: &str, answers: &AnswerMap) -> AppResult<SubmissionReceipt> {
        let path = exam_path(exam_id, "submit")?;
        let body = SubmitAnswersRequest {
            answers: answers.clone(),
        };
        let request = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .json(&body);
        self.send(request, &path).await
    }
}

fn classify_status(status: StatusCode, path: &str) -> AppError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AppError::NotAuthenticated,
        StatusCode::NOT_FOUND => AppError::NotFound(path.to_string()),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            AppError::Timeout(format!("{} returned {}", path, status))
        }
        _ => AppError::Api {
            status: status.as_u16(),
            path: path.to_string(),
        },
    }
}

/// `/exams/{exam_id}/{action}` for ids that are a single safe path segment.
fn exam_path(exam_id: &str, action: &str) -> AppResult<String> {
    let valid = !exam_id.is_empty()
        && exam_id.len() <= 128
        && exam_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

    if !valid {
        return Err(AppError::ValidationError(format!(
            "Invalid exam id {:?}",
            exam_id
        )));
    }

    Ok(format!("/exams/{}/{}", exam_id, action))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{
        fixtures::{sample_exam, store_with_id_token},
        test_helpers::spawn_stub_server,
    };
    use actix_web::{web, HttpRequest, HttpResponse};

    async fn questions(req: HttpRequest, path: web::Path<String>) -> HttpResponse {
        let authorized = req
            .headers()
            .get("authorization")
            .and_then(|h| h.to_str().ok())
            == Some("Bearer a.b.c");

        if !authorized {
            return HttpResponse::Unauthorized().finish();
        }
        match path.as_str() {
            "e1" => HttpResponse::Ok().json(sample_exam("e1", 2, 10)),
            "broken" => HttpResponse::InternalServerError().finish(),
            _ => HttpResponse::NotFound().finish(),
        }
    }

    async fn submit(body: web::Json<SubmitAnswersRequest>) -> HttpResponse {
        HttpResponse::Ok().json(serde_json::json!({ "received": body.answers.len() }))
    }

    fn stub() -> String {
        spawn_stub_server(|cfg| {
            cfg.route("/exams/{id}/questions", web::get().to(questions))
                .route("/exams/{id}/submit", web::post().to(submit));
        })
    }

    #[test]
    fn test_exam_path_validation() {
        assert_eq!(exam_path("e-1_x", "submit").unwrap(), "/exams/e-1_x/submit");
        for bad in ["", "../admin", "a/b", "a?b", "a b"] {
            assert!(exam_path(bad, "submit").is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_status_classification() {
        assert_eq!(
            classify_status(StatusCode::UNAUTHORIZED, "/p"),
            AppError::NotAuthenticated
        );
        assert!(matches!(
            classify_status(StatusCode::NOT_FOUND, "/p"),
            AppError::NotFound(_)
        ));
        assert_eq!(
            classify_status(StatusCode::BAD_GATEWAY, "/p"),
            AppError::Api {
                status: 502,
                path: "/p".into()
            }
        );
    }

    #[actix_web::test]
    async fn test_missing_token_fails_without_network() {
        // Nothing listens on this port; NotAuthenticated proves no request went out.
        let api = HttpExamApi::new(reqwest::Client::new(), "http://127.0.0.1:9", TokenStore::new());

        assert_eq!(api.fetch_exam("e1").await.unwrap_err(), AppError::NotAuthenticated);
        assert_eq!(
            api.submit_answers("e1", &AnswerMap::new()).await.unwrap_err(),
            AppError::NotAuthenticated
        );
    }

    #[actix_web::test]
    async fn test_fetch_and_submit_with_bearer() {
        let api = HttpExamApi::new(reqwest::Client::new(), &stub(), store_with_id_token("a.b.c"));

        let exam = api.fetch_exam("e1").await.unwrap();
        assert_eq!(exam.questions.len(), 2);

        let answers = AnswerMap::from([("q1".to_string(), "A".to_string())]);
        let receipt = api.submit_answers("e1", &answers).await.unwrap();
        assert_eq!(receipt.0["received"], 1);
    }

    #[actix_web::test]
    async fn test_http_failures_are_classified() {
        let base = stub();

        let api = HttpExamApi::new(reqwest::Client::new(), &base, store_with_id_token("a.b.c"));
        assert!(matches!(api.fetch_exam("missing").await, Err(AppError::NotFound(_))));
        assert!(matches!(
            api.fetch_exam("broken").await,
            Err(AppError::Api { status: 500, .. })
        ));

        let rejected = HttpExamApi::new(reqwest::Client::new(), &base, store_with_id_token("x.y.z"));
        assert_eq!(rejected.fetch_exam("e1").await.unwrap_err(), AppError::NotAuthenticated);
    }
}
