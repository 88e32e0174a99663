use actix_web::{
    http::{header, StatusCode},
    HttpResponse, ResponseError,
};
use serde::Serialize;
use thiserror::Error;

/// Body shown for every authentication-class failure. Provider and decoder
/// details stay in the logs.
pub const SIGN_IN_AGAIN: &str = "please sign in again";

pub const LOGIN_PATH: &str = "/auth/login";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AppError {
    #[error("Token exchange failed (status {status:?}): {detail}")]
    AuthExchange { status: Option<u16>, detail: String },

    #[error("Malformed session: {0}")]
    MalformedSession(String),

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Forbidden, redirecting to {home}")]
    Forbidden { home: String },

    #[error("Submission failed: {0}")]
    Submission(String),

    #[error("API call {path} failed with status {status}")]
    Api { status: u16, path: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl AppError {
    fn error_code(&self) -> &'static str {
        match self {
            AppError::AuthExchange { .. } => "AUTH_EXCHANGE",
            AppError::MalformedSession(_) => "MALFORMED_SESSION",
            AppError::NotAuthenticated => "NOT_AUTHENTICATED",
            AppError::Forbidden { .. } => "FORBIDDEN",
            AppError::Submission(_) => "SUBMISSION_FAILED",
            AppError::Api { .. } => "API_ERROR",
            AppError::Transport(_) => "TRANSPORT_ERROR",
            AppError::Timeout(_) => "TIMEOUT",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::Conflict(_) => "CONFLICT",
            AppError::Configuration(_) => "CONFIGURATION_ERROR",
            AppError::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    /// Errors that mean the caller has to go through login again.
    pub fn is_authentication(&self) -> bool {
        matches!(
            self,
            AppError::AuthExchange { .. } | AppError::MalformedSession(_) | AppError::NotAuthenticated
        )
    }

    /// Message safe to show to an end user.
    pub fn user_message(&self) -> String {
        if self.is_authentication() {
            SIGN_IN_AGAIN.to_string()
        } else {
            self.to_string()
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::AuthExchange { .. }
            | AppError::MalformedSession(_)
            | AppError::NotAuthenticated => StatusCode::UNAUTHORIZED,
            AppError::Forbidden { .. } => StatusCode::SEE_OTHER,
            AppError::Submission(_) | AppError::Api { .. } | AppError::Transport(_) => {
                StatusCode::BAD_GATEWAY
            }
            AppError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Configuration(_) | AppError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();

        if let AppError::Forbidden { home } = self {
            return HttpResponse::build(status)
                .insert_header((header::LOCATION, home.as_str()))
                .finish();
        }

        let redirect = self.is_authentication().then(|| LOGIN_PATH.to_string());
        HttpResponse::build(status).json(ErrorResponse {
            error: self.user_message(),
            code: status.as_u16(),
            kind: self.error_code(),
            redirect,
        })
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::Timeout(err.to_string())
        } else {
            AppError::Transport(err.to_string())
        }
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        AppError::MalformedSession(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::ValidationError(err.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(
            AppError::NotAuthenticated.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::Submission("boom".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AppError::Timeout("slow".into()).status_code(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            AppError::Conflict("busy".into()).status_code(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_authentication_errors_collapse_to_sign_in_again() {
        let errors = [
            AppError::AuthExchange {
                status: Some(400),
                detail: "invalid_grant".into(),
            },
            AppError::MalformedSession("bad segments".into()),
            AppError::NotAuthenticated,
        ];

        for err in errors {
            assert!(err.is_authentication());
            assert_eq!(err.user_message(), SIGN_IN_AGAIN);
        }

        assert!(!AppError::Submission("x".into()).is_authentication());
    }

    #[actix_web::test]
    async fn test_auth_error_body_hides_provider_detail() {
        let err = AppError::AuthExchange {
            status: Some(400),
            detail: "invalid_grant: code already used".into(),
        };
        let body = to_bytes(err.error_response().into_body()).await.unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();

        assert!(text.contains(SIGN_IN_AGAIN));
        assert!(text.contains(LOGIN_PATH));
        assert!(!text.contains("invalid_grant"));
    }

    #[test]
    fn test_forbidden_redirects_home() {
        let response = AppError::Forbidden {
            home: "/exams".into(),
        }
        .error_response();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "/exams"
        );
    }

    #[test]
    fn test_error_messages() {
        let err = AppError::NotFound("exam e1".into());
        assert_eq!(err.to_string(), "Not found: exam e1");
    }
}
