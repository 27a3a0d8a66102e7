//! Two-stage call timers.
//!
//! A call first waits for its soft timeout. When that expires the call gets a
//! short grace period before it is rejected, so a reply racing the deadline
//! still reaches its caller.

use std::{future::poll_fn, time::Duration};

use tokio_util::time::{DelayQueue, delay_queue::Key};

/// Extra time granted after a soft timeout expires.
pub(crate) const GRACE_PERIOD: Duration = Duration::from_millis(100);

/// Timer stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Stage {
    Soft,
    Grace,
}

/// A timer that fired.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Expired {
    pub(crate) id: u64,
    pub(crate) stage: Stage,
}

/// Deadlines for every pending call.
#[derive(Default)]
pub(crate) struct CallTimers {
    queue: DelayQueue<(u64, Stage)>,
}

impl CallTimers {
    /// Start the soft stage for call `id`.
    pub(crate) fn start(&mut self, id: u64, timeout: Duration) -> Key {
        self.queue.insert((id, Stage::Soft), timeout)
    }

    /// Start the grace stage for call `id`.
    pub(crate) fn grace(&mut self, id: u64) -> Key { self.queue.insert((id, Stage::Grace), GRACE_PERIOD) }

    /// Stop a timer. Keys for timers that already fired are ignored.
    pub(crate) fn cancel(&mut self, key: &Key) { let _ = self.queue.try_remove(key); }

    pub(crate) fn clear(&mut self) { self.queue.clear(); }

    pub(crate) fn is_empty(&self) -> bool { self.queue.is_empty() }

    /// Wait for the next timer to fire.
    ///
    /// Resolves to `None` when no timers are pending. Cancel safe.
    pub(crate) async fn next_expired(&mut self) -> Option<Expired> {
        let expired = poll_fn(|cx| self.queue.poll_expired(cx)).await?;
        let (id, stage) = expired.into_inner();
        Some(Expired { id, stage })
    }
}
