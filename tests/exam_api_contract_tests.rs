use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::sync::RwLock;

use exam_session_server::{
    auth::TokenStore,
    errors::{AppError, AppResult, SIGN_IN_AGAIN},
    models::domain::{
        AnswerMap, AttemptPhase, ExamDetail, Navigation, Question, SubmissionReceipt,
        SubmissionState,
    },
    services::{
        submission_guard::{EXPIRY_FAILURE_MESSAGE, MANUAL_FAILURE_MESSAGE},
        AttemptRunner, ExamApi,
    },
};

/// Exam API double recording every submission it receives.
struct InMemoryExamApi {
    exams: HashMap<String, ExamDetail>,
    submissions: Arc<RwLock<Vec<(String, AnswerMap)>>>,
    failures: RwLock<Vec<AppError>>,
    latency: Duration,
}

impl InMemoryExamApi {
    fn new(exam: ExamDetail) -> Self {
        Self {
            exams: HashMap::from([(exam.exam_id.clone(), exam)]),
            submissions: Arc::new(RwLock::new(Vec::new())),
            failures: RwLock::new(Vec::new()),
            latency: Duration::ZERO,
        }
    }

    fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Queues errors returned by the next submissions, oldest first.
    fn failing_with(self, errors: Vec<AppError>) -> Self {
        Self {
            failures: RwLock::new(errors.into_iter().rev().collect()),
            ..self
        }
    }
}

#[async_trait]
impl ExamApi for InMemoryExamApi {
    async fn fetch_exam(&self, exam_id: &str) -> AppResult<ExamDetail> {
        self.exams
            .get(exam_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("exam {}", exam_id)))
    }

    async fn submit_answers(&self, exam_id: &str, answers: &AnswerMap) -> AppResult<SubmissionReceipt> {
        tokio::time::sleep(self.latency).await;
        self.submissions
            .write()
            .await
            .push((exam_id.to_string(), answers.clone()));

        if let Some(error) = self.failures.write().await.pop() {
            return Err(error);
        }
        Ok(SubmissionReceipt(serde_json::json!({ "answered": answers.len() })))
    }
}

fn exam(exam_id: &str, questions: usize, minutes: u64) -> ExamDetail {
    ExamDetail {
        exam_id: exam_id.to_string(),
        exam_name: "Contract exam".to_string(),
        duration_minutes: minutes,
        questions: (1..=questions)
            .map(|n| Question {
                question_id: format!("q{}", n),
                text: format!("Question {}", n),
                choices: vec!["A".into(), "B".into(), "C".into(), "D".into()],
                points: 2.0,
            })
            .collect(),
    }
}

#[tokio::test(start_paused = true)]
async fn test_expiry_submits_exactly_the_selected_answers() {
    let api = InMemoryExamApi::new(exam("e1", 3, 1));
    let submissions = Arc::clone(&api.submissions);
    let seed = api.fetch_exam("e1").await.unwrap();

    let handle = AttemptRunner::start(seed, Arc::new(api), TokenStore::new()).unwrap();
    handle.select_answer(Some("q1".into()), "A".into()).await.unwrap();
    handle.navigate(Navigation::Index { index: 2 }).await.unwrap();
    handle.select_answer(None, "C".into()).await.unwrap();

    tokio::time::sleep(Duration::from_secs(61)).await;

    let view = handle.view().await.unwrap();
    assert_eq!(view.phase, AttemptPhase::Submitted);
    assert_eq!(view.remaining_seconds, 0);

    let recorded = submissions.read().await;
    assert_eq!(recorded.len(), 1);
    assert_eq!(
        recorded[0].1,
        AnswerMap::from([("q1".into(), "A".into()), ("q3".into(), "C".into())])
    );
}

#[tokio::test(start_paused = true)]
async fn test_manual_submit_racing_expiry_posts_once() {
    let api = InMemoryExamApi::new(exam("e1", 2, 1)).with_latency(Duration::from_secs(3));
    let submissions = Arc::clone(&api.submissions);
    let seed = api.fetch_exam("e1").await.unwrap();
    let handle = AttemptRunner::start(seed, Arc::new(api), TokenStore::new()).unwrap();

    tokio::time::sleep(Duration::from_millis(59_500)).await;

    // The submission is still in flight when the deadline passes.
    let view = handle.submit().await.unwrap();
    assert_eq!(view.submission_state, SubmissionState::Submitted);
    assert_eq!(submissions.read().await.len(), 1);

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(submissions.read().await.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_manual_submit_after_expiry_fired_posts_once() {
    let api = InMemoryExamApi::new(exam("e1", 2, 1)).with_latency(Duration::from_secs(3));
    let submissions = Arc::clone(&api.submissions);
    let seed = api.fetch_exam("e1").await.unwrap();
    let handle = AttemptRunner::start(seed, Arc::new(api), TokenStore::new()).unwrap();
    handle.select_answer(None, "D".into()).await.unwrap();

    // The expiry submission is in flight; the user clicks submit anyway.
    tokio::time::sleep(Duration::from_millis(60_500)).await;
    assert_eq!(handle.view().await.unwrap().phase, AttemptPhase::Submitting);

    let view = handle.submit().await.unwrap();
    assert_eq!(view.phase, AttemptPhase::Submitted);
    assert!(view.message.is_none());

    tokio::time::sleep(Duration::from_secs(30)).await;
    let recorded = submissions.read().await;
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].1, AnswerMap::from([("q1".into(), "D".into())]));
}

#[tokio::test(start_paused = true)]
async fn test_failed_expiry_submission_can_be_retried_manually() {
    let api = InMemoryExamApi::new(exam("e1", 2, 1)).failing_with(vec![AppError::Api {
        status: 503,
        path: "/exams/e1/submit".into(),
    }]);
    let submissions = Arc::clone(&api.submissions);
    let seed = api.fetch_exam("e1").await.unwrap();
    let handle = AttemptRunner::start(seed, Arc::new(api), TokenStore::new()).unwrap();
    handle.select_answer(None, "B".into()).await.unwrap();

    tokio::time::sleep(Duration::from_secs(61)).await;

    let failed = handle.view().await.unwrap();
    assert_eq!(failed.submission_state, SubmissionState::Failed);
    assert_eq!(failed.message.as_deref(), Some(EXPIRY_FAILURE_MESSAGE));
    assert_eq!(failed.answers["q1"], "B");

    // The deadline passing again would not resubmit; only the user can.
    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(submissions.read().await.len(), 1);

    let view = handle.submit().await.unwrap();
    assert_eq!(view.phase, AttemptPhase::Submitted);
    assert_eq!(submissions.read().await.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_failure_messages_follow_the_cause() {
    let api = InMemoryExamApi::new(exam("e1", 1, 10)).failing_with(vec![
        AppError::Transport("connection refused".into()),
        AppError::NotAuthenticated,
    ]);
    let seed = api.fetch_exam("e1").await.unwrap();
    let handle = AttemptRunner::start(seed, Arc::new(api), TokenStore::new()).unwrap();

    let first = handle.submit().await.unwrap();
    assert_eq!(first.message.as_deref(), Some(MANUAL_FAILURE_MESSAGE));

    let second = handle.submit().await.unwrap();
    assert_eq!(second.message.as_deref(), Some(SIGN_IN_AGAIN));
    assert_eq!(second.phase, AttemptPhase::Navigating);

    let third = handle.submit().await.unwrap();
    assert_eq!(third.phase, AttemptPhase::Submitted);
    assert!(third.message.is_none());
}

#[tokio::test]
async fn test_unknown_exam_is_not_found() {
    let api = InMemoryExamApi::new(exam("e1", 1, 10));
    assert!(matches!(api.fetch_exam("nope").await, Err(AppError::NotFound(_))));
}
