use crate::{
    errors::{AppError, AppResult, SIGN_IN_AGAIN},
    models::domain::{AnswerMap, SubmissionReceipt, SubmissionState, SubmitTrigger},
};

pub const MANUAL_FAILURE_MESSAGE: &str = "Submission failed. Please try again.";
pub const EXPIRY_FAILURE_MESSAGE: &str =
    "Time is up, but we could not submit your exam. Please try again.";

/// Permission to make the one network submission for the current round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitTicket {
    pub round: u32,
    pub trigger: SubmitTrigger,
    /// Answers captured when the latch closed; later edits do not leak in.
    pub answers: AnswerMap,
}

/// Result of the network call issued for a ticket.
#[derive(Debug, Clone)]
pub struct SubmitCompletion {
    pub round: u32,
    pub trigger: SubmitTrigger,
    pub result: AppResult<SubmissionReceipt>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionOutcome {
    Submitted(SubmissionReceipt),
    Failed {
        trigger: SubmitTrigger,
        error: AppError,
        message: &'static str,
    },
    /// Completion for a round that is no longer in flight.
    Stale,
}

/// Latch that turns any number of submit triggers into at most one in-flight
/// submission, and at most one successful one per attempt.
#[derive(Debug, Default)]
pub struct SubmissionGuard {
    latch_closed: bool,
    state: SubmissionState,
    round: u32,
}

impl SubmissionGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SubmissionState {
        self.state
    }

    pub fn is_latched(&self) -> bool {
        self.latch_closed
    }

    /// Number of network submissions issued so far.
    pub fn rounds(&self) -> u32 {
        self.round
    }

    /// Closes the latch and hands out a ticket, or returns `None` when a
    /// submission is already in flight or has succeeded.
    pub fn try_begin(&mut self, trigger: SubmitTrigger, answers: &AnswerMap) -> Option<SubmitTicket> {
        if self.latch_closed {
            log::debug!("Ignoring {:?} submit, latch closed in {:?}", trigger, self.state);
            return None;
        }

        self.latch_closed = true;
        self.state = SubmissionState::Submitting;
        self.round += 1;

        Some(SubmitTicket {
            round: self.round,
            trigger,
            answers: answers.clone(),
        })
    }

    pub fn finish(&mut self, completion: SubmitCompletion) -> SubmissionOutcome {
        if self.state != SubmissionState::Submitting || completion.round != self.round {
            return SubmissionOutcome::Stale;
        }

        match completion.result {
            Ok(receipt) => {
                // Terminal; the latch never reopens.
                self.state = SubmissionState::Submitted;
                SubmissionOutcome::Submitted(receipt)
            }
            Err(err) => {
                self.state = SubmissionState::Failed;
                self.latch_closed = false;

                let (error, message) = if err.is_authentication() {
                    (err, SIGN_IN_AGAIN)
                } else {
                    let message = match completion.trigger {
                        SubmitTrigger::Manual => MANUAL_FAILURE_MESSAGE,
                        SubmitTrigger::Expiry => EXPIRY_FAILURE_MESSAGE,
                    };
                    (AppError::Submission(err.to_string()), message)
                };

                SubmissionOutcome::Failed {
                    trigger: completion.trigger,
                    error,
                    message,
                }
            }
        }
    }
}
