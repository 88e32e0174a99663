use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use serde::Serialize;
use tokio::{
    task::JoinHandle,
    time::{interval, MissedTickBehavior},
};

const TICK: Duration = Duration::from_secs(1);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Normal,
    Warning,  // five minutes or less
    Critical, // last minute
}

type ExpiryCallback = Box<dyn FnOnce() + Send + 'static>;

/// Countdown for one attempt with one-second resolution.
///
/// The expiry callback is consumed when remaining time reaches zero, so it
/// runs at most once however many ticks follow. There is no pause; build a
/// new timer from `remaining()` instead.
pub struct DeadlineTimer {
    remaining: u64,
    on_expire: Option<ExpiryCallback>,
}

impl DeadlineTimer {
    pub fn new(allowed_duration_seconds: u64, on_expire: impl FnOnce() + Send + 'static) -> Self {
        Self {
            remaining: allowed_duration_seconds,
            on_expire: Some(Box::new(on_expire)),
        }
    }

    /// Advances one second and returns what is left. A zero-length timer
    /// expires on its first tick.
    pub fn tick(&mut self) -> u64 {
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            if let Some(on_expire) = self.on_expire.take() {
                on_expire();
            }
        }
        self.remaining
    }

    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    pub fn has_expired(&self) -> bool {
        self.on_expire.is_none()
    }

    /// Drives the timer from the tokio clock. Dropping the returned handle
    /// stops the countdown without firing.
    pub fn spawn(mut self) -> TimerHandle {
        let remaining = Arc::new(AtomicU64::new(self.remaining));
        let shared = Arc::clone(&remaining);

        let task = tokio::spawn(async move {
            let mut ticks = interval(TICK);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick of an interval completes immediately.
            ticks.tick().await;

            while !self.has_expired() {
                ticks.tick().await;
                let left = self.tick();
                shared.store(left, Ordering::Relaxed);
            }
            log::debug!("Deadline timer expired");
        });

        TimerHandle { remaining, task }
    }
}

pub struct TimerHandle {
    remaining: Arc<AtomicU64>,
    task: JoinHandle<()>,
}

impl TimerHandle {
    pub fn remaining(&self) -> u64 {
        self.remaining.load(Ordering::Relaxed)
    }

    pub fn display(&self) -> String {
        format_clock(self.remaining())
    }

    pub fn urgency(&self) -> Urgency {
        urgency_for(self.remaining())
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub fn cancel(self) {
        // Drop aborts the task.
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// `mm:ss`, minutes unbounded.
pub fn format_clock(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

pub fn urgency_for(seconds: u64) -> Urgency {
    if seconds <= 60 {
        Urgency::Critical
    } else if seconds <= 5 * 60 {
        Urgency::Warning
    } else {
        Urgency::Normal
    }
}
