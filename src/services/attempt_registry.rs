use std::{collections::HashMap, sync::Arc};

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::domain::AttemptPhase;

use super::attempt_runner::AttemptHandle;

/// Running attempts keyed by the student's subject id. One attempt per
/// student; starting another one drops the previous handle.
#[derive(Default)]
pub struct AttemptRegistry {
    attempts: RwLock<HashMap<String, AttemptHandle>>,
}

impl AttemptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handle` for `subject_id`, returning the attempt it replaced.
    pub async fn insert(&self, subject_id: &str, handle: AttemptHandle) -> Option<AttemptHandle> {
        let previous = self
            .attempts
            .write()
            .await
            .insert(subject_id.to_string(), handle);

        if let Some(previous) = &previous {
            log::info!(
                "Replacing attempt {} for {}",
                previous.attempt_id(),
                subject_id
            );
        }
        previous
    }

    pub async fn get(&self, subject_id: &str) -> Option<AttemptHandle> {
        self.attempts
            .read()
            .await
            .get(subject_id)
            .cloned()
    }

    pub async fn discard(&self, subject_id: &str) -> Option<AttemptHandle> {
        self.attempts.write().await.remove(subject_id)
    }

    /// Removes the subject's attempt only if it is still `attempt_id`; a
    /// newer attempt registered since is left alone.
    pub async fn discard_if(&self, subject_id: &str, attempt_id: Uuid) -> Option<AttemptHandle> {
        let mut attempts = self.attempts.write().await;
        if attempts
            .get(subject_id)
            .is_some_and(|handle| handle.attempt_id() == attempt_id)
        {
            attempts.remove(subject_id)
        } else {
            None
        }
    }

    /// Drops `handle` from the registry once it reaches `Submitted`, whether
    /// the user submitted or the deadline did. Ends quietly if the attempt is
    /// torn down first.
    pub fn release_when_submitted(self: &Arc<Self>, subject_id: &str, handle: &AttemptHandle) {
        let registry = Arc::clone(self);
        let subject_id = subject_id.to_string();
        let attempt_id = handle.attempt_id();
        let mut phases = handle.phase_updates();

        tokio::spawn(async move {
            let submitted = phases
                .wait_for(|phase| *phase == AttemptPhase::Submitted)
                .await
                .is_ok();
            if !submitted {
                return;
            }
            if registry.discard_if(&subject_id, attempt_id).await.is_some() {
                log::info!("Released submitted attempt {} for {}", attempt_id, subject_id);
            }
        });
    }

    pub async fn len(&self) -> usize {
        self.attempts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
