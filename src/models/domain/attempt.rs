use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// questionId -> chosen choice. Re-selecting overwrites.
pub type AnswerMap = BTreeMap<String, String>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitTrigger {
    Manual,
    Expiry,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionState {
    #[default]
    Idle,
    Submitting,
    Submitted, // terminal
    Failed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptPhase {
    Navigating,
    Submitting,
    Submitted,
}

impl From<SubmissionState> for AttemptPhase {
    fn from(state: SubmissionState) -> Self {
        match state {
            // A failed submission hands control back with answers intact.
            SubmissionState::Idle | SubmissionState::Failed => AttemptPhase::Navigating,
            SubmissionState::Submitting => AttemptPhase::Submitting,
            SubmissionState::Submitted => AttemptPhase::Submitted,
        }
    }
}

/// Where to move the current question pointer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "target", rename_all = "snake_case")]
pub enum Navigation {
    Next,
    Previous,
    Index { index: usize },
}

/// Whatever the exam API answers to a successful submission.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct SubmissionReceipt(pub serde_json::Value);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_submission_returns_to_navigating() {
        assert_eq!(AttemptPhase::from(SubmissionState::Failed), AttemptPhase::Navigating);
        assert_eq!(AttemptPhase::from(SubmissionState::Submitted), AttemptPhase::Submitted);
    }

    #[test]
    fn test_navigation_parses_tagged_requests() {
        let next: Navigation = serde_json::from_str(r#"{"target":"next"}"#).unwrap();
        let jump: Navigation = serde_json::from_str(r#"{"target":"index","index":2}"#).unwrap();

        assert_eq!(next, Navigation::Next);
        assert_eq!(jump, Navigation::Index { index: 2 });
    }

    #[test]
    fn test_trigger_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&SubmitTrigger::Expiry).unwrap(), "\"expiry\"");
    }
}
