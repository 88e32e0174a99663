use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    errors::{AppError, AppResult},
    models::{
        domain::{
            AnswerMap, AttemptPhase, ExamDetail, Navigation, Question, SubmissionReceipt,
            SubmissionState, SubmitTrigger,
        },
        dto::response::AttemptView,
    },
    services::{
        deadline_timer::{format_clock, urgency_for},
        submission_guard::{SubmissionGuard, SubmissionOutcome, SubmitCompletion, SubmitTicket},
    },
};

/// One student's run through one exam.
///
/// The current-question pointer and the answer map are independent: moving
/// around never touches answers. Answers only change through
/// `select_answer`, and only while the attempt is navigable.
pub struct ExamAttempt {
    attempt_id: Uuid,
    exam: ExamDetail,
    answers: AnswerMap,
    current: usize,
    started_at: DateTime<Utc>,
    guard: SubmissionGuard,
    message: Option<&'static str>,
    receipt: Option<SubmissionReceipt>,
}

impl ExamAttempt {
    pub fn new(exam: ExamDetail) -> AppResult<Self> {
        if exam.questions.is_empty() {
            return Err(AppError::NotFound(format!(
                "No questions found for exam {}",
                exam.exam_id
            )));
        }

        Ok(Self {
            attempt_id: Uuid::new_v4(),
            exam,
            answers: AnswerMap::new(),
            current: 0,
            started_at: Utc::now(),
            guard: SubmissionGuard::new(),
            message: None,
            receipt: None,
        })
    }

    pub fn attempt_id(&self) -> Uuid {
        self.attempt_id
    }

    pub fn exam_id(&self) -> &str {
        &self.exam.exam_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn allowed_duration_seconds(&self) -> u64 {
        self.exam.allowed_duration_seconds()
    }

    pub fn answers(&self) -> &AnswerMap {
        &self.answers
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_question(&self) -> &Question {
        &self.exam.questions[self.current]
    }

    pub fn question_count(&self) -> usize {
        self.exam.questions.len()
    }

    pub fn submission_state(&self) -> SubmissionState {
        self.guard.state()
    }

    pub fn phase(&self) -> AttemptPhase {
        AttemptPhase::from(self.guard.state())
    }

    pub fn select_answer(&mut self, question_id: &str, choice: &str) -> AppResult<()> {
        self.ensure_navigable()?;

        let question = self.exam.question(question_id).ok_or_else(|| {
            AppError::ValidationError(format!("Unknown question {}", question_id))
        })?;

        if !question.offers(choice) {
            return Err(AppError::ValidationError(format!(
                "Question {} has no choice {:?}",
                question_id, choice
            )));
        }

        self.answers
            .insert(question_id.to_string(), choice.to_string());
        Ok(())
    }

    pub fn select_for_current(&mut self, choice: &str) -> AppResult<()> {
        let question_id = self.current_question().question_id.clone();
        self.select_answer(&question_id, choice)
    }

    /// Moves to `index`, clamped to the question range.
    pub fn go_to_question(&mut self, index: usize) -> AppResult<usize> {
        self.ensure_navigable()?;
        self.current = index.min(self.question_count() - 1);
        Ok(self.current)
    }

    pub fn navigate(&mut self, navigation: Navigation) -> AppResult<usize> {
        let target = match navigation {
            Navigation::Next => self.current.saturating_add(1),
            Navigation::Previous => self.current.saturating_sub(1),
            Navigation::Index { index } => index,
        };
        self.go_to_question(target)
    }

    /// Asks the submission guard for a ticket. `None` means the trigger was
    /// absorbed by an in-flight or completed submission.
    pub fn submit(&mut self, trigger: SubmitTrigger) -> Option<SubmitTicket> {
        let ticket = self.guard.try_begin(trigger, &self.answers)?;
        self.message = None;
        log::info!(
            "Attempt {} submitting exam {} ({:?}, round {}, {} answers)",
            self.attempt_id,
            self.exam.exam_id,
            trigger,
            ticket.round,
            ticket.answers.len()
        );
        Some(ticket)
    }

    pub fn submission_finished(&mut self, completion: SubmitCompletion) -> SubmissionOutcome {
        let outcome = self.guard.finish(completion);

        match &outcome {
            SubmissionOutcome::Submitted(receipt) => {
                log::info!("Attempt {} submitted", self.attempt_id);
                self.receipt = Some(receipt.clone());
                self.message = None;
            }
            SubmissionOutcome::Failed {
                trigger,
                error,
                message,
            } => {
                log::warn!(
                    "Attempt {} {:?} submission failed: {}",
                    self.attempt_id,
                    trigger,
                    error
                );
                self.message = Some(*message);
            }
            SubmissionOutcome::Stale => {}
        }

        outcome
    }

    pub fn view(&self, remaining_seconds: u64) -> AttemptView {
        AttemptView {
            attempt_id: self.attempt_id,
            exam_id: self.exam.exam_id.clone(),
            exam_name: self.exam.exam_name.clone(),
            phase: self.phase(),
            submission_state: self.submission_state(),
            current_index: self.current,
            question_count: self.question_count(),
            current_question: self.current_question().clone(),
            answers: self.answers.clone(),
            answered: self
                .exam
                .questions
                .iter()
                .map(|q| self.answers.contains_key(&q.question_id))
                .collect(),
            remaining_seconds,
            time_left: format_clock(remaining_seconds),
            urgency: urgency_for(remaining_seconds),
            message: self.message.map(str::to_string),
            receipt: self.receipt.clone(),
        }
    }

    fn ensure_navigable(&self) -> AppResult<()> {
        match self.phase() {
            AttemptPhase::Navigating => Ok(()),
            AttemptPhase::Submitting => Err(AppError::Conflict(
                "Submission in progress; answers are locked".to_string(),
            )),
            AttemptPhase::Submitted => Err(AppError::Conflict(
                "Attempt has already been submitted".to_string(),
            )),
        }
    }
}
