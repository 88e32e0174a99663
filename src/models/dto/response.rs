use serde::Serialize;
use uuid::Uuid;

use crate::{
    auth::Identity,
    models::domain::{AnswerMap, AttemptPhase, Question, SubmissionReceipt, SubmissionState},
    services::deadline_timer::Urgency,
};

/// Snapshot of a running attempt, enough to render the exam view.
#[derive(Debug, Clone, Serialize)]
pub struct AttemptView {
    pub attempt_id: Uuid,
    pub exam_id: String,
    pub exam_name: String,
    pub phase: AttemptPhase,
    pub submission_state: SubmissionState,
    pub current_index: usize,
    pub question_count: usize,
    pub current_question: Question,
    pub answers: AnswerMap,
    /// One flag per question, in order.
    pub answered: Vec<bool>,
    pub remaining_seconds: u64,
    pub time_left: String,
    pub urgency: Urgency,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt: Option<SubmissionReceipt>,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub identity: Identity,
    pub home: &'static str,
    pub is_admin: bool,
}

#[derive(Debug, Serialize)]
pub struct AdminAreaResponse {
    pub signed_in_as: String,
    pub active_attempts: usize,
}
