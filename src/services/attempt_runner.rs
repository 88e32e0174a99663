use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use uuid::Uuid;

use crate::{
    auth::TokenStore,
    errors::{AppError, AppResult},
    models::{
        domain::{AttemptPhase, ExamDetail, Navigation, SubmissionState, SubmitTrigger},
        dto::response::AttemptView,
    },
    services::{
        api_gateway::ExamApi,
        deadline_timer::{DeadlineTimer, TimerHandle},
        exam_attempt::ExamAttempt,
        submission_guard::{SubmitCompletion, SubmitTicket},
    },
};

const COMMAND_BUFFER: usize = 32;

type Reply<T> = oneshot::Sender<AppResult<T>>;

enum AttemptCommand {
    SelectAnswer {
        question_id: Option<String>,
        choice: String,
        reply: Reply<AttemptView>,
    },
    Navigate {
        navigation: Navigation,
        reply: Reply<AttemptView>,
    },
    Submit {
        reply: Reply<AttemptView>,
    },
    View {
        reply: Reply<AttemptView>,
    },
}

/// Events raised by the attempt's own timer and submission tasks.
enum AttemptEvent {
    TimerExpired,
    SubmissionFinished(SubmitCompletion),
}

/// Command side of a running attempt. Clones talk to the same attempt; when
/// the last clone is dropped the attempt is torn down and its timer stopped.
#[derive(Clone)]
pub struct AttemptHandle {
    attempt_id: Uuid,
    exam_id: String,
    tokens: TokenStore,
    commands: mpsc::Sender<AttemptCommand>,
    phase: watch::Receiver<AttemptPhase>,
}

impl AttemptHandle {
    pub fn attempt_id(&self) -> Uuid {
        self.attempt_id
    }

    pub fn exam_id(&self) -> &str {
        &self.exam_id
    }

    /// Session credentials used for this attempt's API calls.
    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    pub fn is_active(&self) -> bool {
        !self.commands.is_closed()
    }

    /// Follows the attempt's phase. The sender goes away with the runner.
    pub fn phase_updates(&self) -> watch::Receiver<AttemptPhase> {
        self.phase.clone()
    }

    pub async fn select_answer(
        &self,
        question_id: Option<String>,
        choice: String,
    ) -> AppResult<AttemptView> {
        self.request(|reply| AttemptCommand::SelectAnswer {
            question_id,
            choice,
            reply,
        })
        .await
    }

    pub async fn navigate(&self, navigation: Navigation) -> AppResult<AttemptView> {
        self.request(|reply| AttemptCommand::Navigate { navigation, reply })
            .await
    }

    /// Manual submit. Resolves once the submission this call joined has
    /// settled, or immediately when there is nothing to submit.
    pub async fn submit(&self) -> AppResult<AttemptView> {
        self.request(|reply| AttemptCommand::Submit { reply }).await
    }

    pub async fn view(&self) -> AppResult<AttemptView> {
        self.request(|reply| AttemptCommand::View { reply }).await
    }

    async fn request(
        &self,
        command: impl FnOnce(Reply<AttemptView>) -> AttemptCommand,
    ) -> AppResult<AttemptView> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| attempt_closed())?;
        response.await.map_err(|_| attempt_closed())?
    }
}

fn attempt_closed() -> AppError {
    AppError::NotFound("attempt is no longer active".to_string())
}

/// Owns one `ExamAttempt` and runs every event against it on a single task,
/// one at a time, so a timer expiry and a manual submit can only interleave,
/// never overlap.
pub struct AttemptRunner {
    attempt: ExamAttempt,
    api: Arc<dyn ExamApi>,
    timer: Option<TimerHandle>,
    commands: mpsc::Receiver<AttemptCommand>,
    events: mpsc::UnboundedReceiver<AttemptEvent>,
    events_tx: mpsc::UnboundedSender<AttemptEvent>,
    phase: watch::Sender<AttemptPhase>,
    // Manual submitters waiting for the in-flight round to settle.
    waiters: Vec<Reply<AttemptView>>,
}

impl AttemptRunner {
    /// Starts the attempt and its deadline timer.
    pub fn start(exam: ExamDetail, api: Arc<dyn ExamApi>, tokens: TokenStore) -> AppResult<AttemptHandle> {
        let attempt = ExamAttempt::new(exam)?;
        let (commands_tx, commands) = mpsc::channel(COMMAND_BUFFER);
        let (events_tx, events) = mpsc::unbounded_channel();
        let (phase, phase_rx) = watch::channel(attempt.phase());

        let expiry_tx = events_tx.clone();
        let timer = DeadlineTimer::new(attempt.allowed_duration_seconds(), move || {
            let _ = expiry_tx.send(AttemptEvent::TimerExpired);
        })
        .spawn();

        let handle = AttemptHandle {
            attempt_id: attempt.attempt_id(),
            exam_id: attempt.exam_id().to_string(),
            tokens,
            commands: commands_tx,
            phase: phase_rx,
        };

        log::info!(
            "Started attempt {} for exam {} ({}s allowed)",
            attempt.attempt_id(),
            attempt.exam_id(),
            attempt.allowed_duration_seconds()
        );

        let runner = AttemptRunner {
            attempt,
            api,
            timer: Some(timer),
            commands,
            events,
            events_tx,
            phase,
            waiters: Vec::new(),
        };
        tokio::spawn(runner.run());

        Ok(handle)
    }

    async fn run(mut self) {
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                Some(event) = self.events.recv() => self.handle_event(event),
            }

            let current = self.attempt.phase();
            self.phase.send_if_modified(|phase| {
                let changed = *phase != current;
                *phase = current;
                changed
            });
        }
        log::debug!("Attempt {} torn down", self.attempt.attempt_id());
    }

    fn handle_command(&mut self, command: AttemptCommand) {
        match command {
            AttemptCommand::SelectAnswer {
                question_id,
                choice,
                reply,
            } => {
                let result = match question_id {
                    Some(question_id) => self.attempt.select_answer(&question_id, &choice),
                    None => self.attempt.select_for_current(&choice),
                };
                let _ = reply.send(result.map(|_| self.view()));
            }
            AttemptCommand::Navigate { navigation, reply } => {
                let result = self.attempt.navigate(navigation);
                let _ = reply.send(result.map(|_| self.view()));
            }
            AttemptCommand::Submit { reply } => {
                if let Some(ticket) = self.attempt.submit(SubmitTrigger::Manual) {
                    self.dispatch(ticket);
                }

                if self.attempt.submission_state() == SubmissionState::Submitting {
                    self.waiters.push(reply);
                } else {
                    let _ = reply.send(Ok(self.view()));
                }
            }
            AttemptCommand::View { reply } => {
                let _ = reply.send(Ok(self.view()));
            }
        }
    }

    fn handle_event(&mut self, event: AttemptEvent) {
        match event {
            AttemptEvent::TimerExpired => {
                log::info!("Time expired for attempt {}", self.attempt.attempt_id());
                if let Some(ticket) = self.attempt.submit(SubmitTrigger::Expiry) {
                    self.dispatch(ticket);
                }
            }
            AttemptEvent::SubmissionFinished(completion) => {
                self.attempt.submission_finished(completion);

                if self.attempt.phase() == AttemptPhase::Submitted {
                    // Nothing left to count down for.
                    self.timer = None;
                }
                if self.attempt.submission_state() != SubmissionState::Submitting {
                    let view = self.view();
                    for waiter in self.waiters.drain(..) {
                        let _ = waiter.send(Ok(view.clone()));
                    }
                }
            }
        }
    }

    /// Issues the ticket's single network call off the event loop.
    fn dispatch(&self, ticket: SubmitTicket) {
        let api = Arc::clone(&self.api);
        let events = self.events_tx.clone();
        let exam_id = self.attempt.exam_id().to_string();

        tokio::spawn(async move {
            let result = api.submit_answers(&exam_id, &ticket.answers).await;
            let _ = events.send(AttemptEvent::SubmissionFinished(SubmitCompletion {
                round: ticket.round,
                trigger: ticket.trigger,
                result,
            }));
        });
    }

    fn view(&self) -> AttemptView {
        let remaining = self.timer.as_ref().map_or(0, TimerHandle::remaining);
        self.attempt.view(remaining)
    }
}
