//! Connection lifecycle state.

use std::{pin::Pin, time::Duration};

use tokio::{
    sync::oneshot,
    time::{Sleep, sleep},
};
use url::Url;

use crate::{error::ClientError, options::ValidatedOptions};

/// Lifecycle state of the connection engine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConnectionState {
    /// No link is open or being opened.
    #[default]
    Disconnected,
    /// A link is being opened.
    Connecting,
    /// The link is open and API identifiers are being requested.
    Handshaking,
    /// The connection is usable.
    Open,
    /// A caller-initiated close is in progress.
    Closing,
}

/// Snapshot of the engine state published to client handles.
///
/// `recovering` is set while the engine silently reopens after an abnormal
/// closure. Calls issued meanwhile are queued and replayed once the new
/// connection is ready.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ConnectionStatus {
    /// Current lifecycle state.
    pub state: ConnectionState,
    /// Whether transparent recovery is in progress.
    pub recovering: bool,
}

impl ConnectionStatus {
    /// Returns `true` when calls are accepted right away or queued for
    /// replay.
    #[must_use]
    pub fn accepts_calls(&self) -> bool { self.recovering || self.state == ConnectionState::Open }
}

pub(crate) type Reply<T> = oneshot::Sender<Result<T, ClientError>>;

/// Address and options of the last successful `connect` call.
#[derive(Debug)]
pub(super) struct Session {
    pub(super) url: Url,
    pub(super) options: ValidatedOptions,
}

/// Why a link is being opened.
#[derive(Debug)]
pub(super) enum OpenPurpose {
    /// An explicit `connect` or `reconnect` awaiting the outcome.
    Connect(Reply<()>),
    /// A scheduled retry after a closure the caller did not ask for.
    Retry,
    /// Silent recovery after an abnormal closure.
    Recover,
}

/// A caller-initiated close awaiting the node's close frame.
pub(super) struct Closing {
    pub(super) reply: Option<Reply<()>>,
    /// Set when the close is the first half of a `reconnect`.
    pub(super) reopen: Option<Reply<()>>,
    pub(super) deadline: Pin<Box<Sleep>>,
}

impl Closing {
    pub(super) fn new(reply: Option<Reply<()>>, reopen: Option<Reply<()>>, limit: Duration) -> Self {
        Self {
            reply,
            reopen,
            deadline: Box::pin(sleep(limit)),
        }
    }
}
