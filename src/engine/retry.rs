//! Reconnect scheduling.

use std::{future::pending, pin::Pin, time::Duration};

use tokio::time::{Sleep, sleep};

/// Counts reconnect attempts and holds the next scheduled one.
#[derive(Debug, Default)]
pub(super) struct RetryState {
    attempts: u32,
    scheduled: Option<Pin<Box<Sleep>>>,
}

impl RetryState {
    /// Attempts made since the last successful open.
    pub(super) fn attempts(&self) -> u32 { self.attempts }

    pub(super) fn is_scheduled(&self) -> bool { self.scheduled.is_some() }

    /// Whether another attempt is allowed under `max_retries`.
    pub(super) fn can_retry(&self, max_retries: u32) -> bool { self.attempts < max_retries }

    pub(super) fn schedule(&mut self, delay: Duration) { self.scheduled = Some(Box::pin(sleep(delay))); }

    /// Drop any scheduled attempt. Returns `true` if one was pending.
    pub(super) fn cancel(&mut self) -> bool { self.scheduled.take().is_some() }

    /// Forget previous attempts and any schedule.
    pub(super) fn reset(&mut self) {
        self.attempts = 0;
        self.scheduled = None;
    }

    /// Consume the schedule and count the attempt about to start.
    pub(super) fn begin_attempt(&mut self) -> u32 {
        self.scheduled = None;
        self.attempts += 1;
        self.attempts
    }

    /// Wait until the scheduled attempt is due. Never resolves when nothing
    /// is scheduled.
    pub(super) async fn wait(&mut self) {
        match self.scheduled.as_mut() {
            Some(delay) => delay.as_mut().await,
            None => pending().await,
        }
    }
}
