use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::domain::AnswerMap;

/// Query of the identity provider's redirect back to `/auth/callback`.
#[derive(Debug, Clone, Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SelectAnswerRequest {
    /// Defaults to the question currently shown.
    #[validate(length(min = 1, max = 200))]
    pub question_id: Option<String>,

    #[validate(length(min = 1, max = 2000))]
    pub choice: String,
}

/// Body of `POST /exams/{examId}/submit`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitAnswersRequest {
    pub answers: AnswerMap,
}
