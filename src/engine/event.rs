//! Internal event types for the engine select loop.

use super::{command::Command, timers::Expired};
use crate::{
    error::ClientError,
    transport::{Link, TransportEvent},
};

/// Events returned by [`Engine::next_event`][super::Engine::next_event].
pub(super) enum Event {
    /// Output of the open link. `None` means the link ended silently.
    Link(Option<TransportEvent>),
    /// A command from a client handle. `None` once every handle is dropped.
    Command(Option<Command>),
    /// The pending open finished.
    Opened(Result<Box<dyn Link>, ClientError>),
    Timer(Expired),
    /// The connection has been idle for the keepalive delay.
    Keepalive,
    Retry,
    /// The node did not complete a requested close in time.
    CloseDeadline,
}
