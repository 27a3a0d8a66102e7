//! Event sources polled by the engine loop.

use std::future::pending;

use super::{Engine, OpenFuture, event::Event, state::Closing};
use crate::{
    error::ClientError,
    transport::{Link, TransportEvent},
};

impl Engine {
    /// Wait for the next event.
    ///
    /// Link output is polled first so a reply that lands together with its
    /// call's deadline is delivered rather than timed out. Commands come next
    /// and are always enabled, which keeps the `select!` from running out of
    /// branches.
    pub(super) async fn next_event(&mut self) -> Event {
        tokio::select! {
            biased;

            event = Self::poll_link(self.link.as_mut()), if self.link.is_some() => Event::Link(event),
            command = self.commands.recv() => Event::Command(command),
            opened = Self::poll_opening(self.opening.as_mut()), if self.opening.is_some() => {
                Event::Opened(opened)
            }
            Some(expired) = self.timers.next_expired(), if !self.timers.is_empty() => {
                Event::Timer(expired)
            }
            () = self.keepalive.idle(), if self.keepalive.is_armed() => Event::Keepalive,
            () = self.retry.wait(), if self.retry.is_scheduled() => Event::Retry,
            () = Self::poll_deadline(self.closing.as_mut()), if self.closing.is_some() => {
                Event::CloseDeadline
            }
        }
    }

    async fn poll_link(link: Option<&mut Box<dyn Link>>) -> Option<TransportEvent> {
        match link {
            Some(link) => link.recv().await,
            None => pending().await,
        }
    }

    async fn poll_opening(opening: Option<&mut OpenFuture>) -> Result<Box<dyn Link>, ClientError> {
        match opening {
            Some(opening) => opening.await,
            None => pending().await,
        }
    }

    async fn poll_deadline(closing: Option<&mut Closing>) {
        match closing {
            Some(closing) => closing.deadline.as_mut().await,
            None => pending().await,
        }
    }
}
