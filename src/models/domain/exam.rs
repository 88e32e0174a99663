use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub question_id: String,
    pub text: String,
    pub choices: Vec<String>,
    pub points: f64,
}

impl Question {
    pub fn offers(&self, choice: &str) -> bool {
        self.choices.iter().any(|c| c == choice)
    }
}

/// Seed data for an attempt, as returned by `GET /exams/{examId}/questions`.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamDetail {
    pub exam_id: String,
    #[serde(default)]
    pub exam_name: String,
    pub duration_minutes: u64,
    #[serde(default)]
    pub questions: Vec<Question>,
}

impl ExamDetail {
    pub fn allowed_duration_seconds(&self) -> u64 {
        self.duration_minutes.saturating_mul(60)
    }

    pub fn question(&self, question_id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.question_id == question_id)
    }
}
