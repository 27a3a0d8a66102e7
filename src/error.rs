//! Canonical error types for the crate.
//!
//! Every failure surfaced by [`crate::Client`] is a [`ClientError`]. Calling
//! code branches on [`ClientError::kind`] rather than on display strings.

use std::{sync::Arc, time::Duration};

use serde_json::Value;
use thiserror::Error;

use crate::{api::ApiName, options::OptionsError};

/// Stable discriminant for [`ClientError`].
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The requested API was not granted for this connection.
    Capability,
    /// A single inbound frame violated the wire protocol.
    Protocol,
    /// No reply arrived within the soft timeout plus the grace window.
    Timeout,
    /// The socket closed while the call was pending.
    ConnectionClosed,
    /// The retry budget is exhausted; the engine stopped reconnecting.
    Terminal,
    /// The node answered the call with an `error` member.
    Remote,
    /// A connection option failed validation.
    InvalidOption,
    /// The transport failed to open or to carry a frame.
    Transport,
    /// An outbound request could not be encoded.
    Encoding,
    /// The operation is not valid in the current lifecycle state.
    State,
}

/// Protocol violations detected while decoding inbound frames.
///
/// These are reported through the error hook and never tear down the
/// connection.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ProtocolError {
    /// The frame was not a JSON object.
    #[error("malformed frame: {0}")]
    MalformedFrame(String),
    /// The reply `id` member was missing or not an unsigned integer.
    #[error("reply id {0} is not an unsigned integer")]
    InvalidId(Value),
    /// A reply referenced an id with no pending call.
    #[error("unexpected response id {0}")]
    UnexpectedResponseId(u64),
    /// A notice did not carry `[subscriberId, payload]` params.
    #[error("malformed notice: {0}")]
    MalformedNotice(String),
    /// A notice addressed a subscriber id that is not registered.
    #[error("notice for unknown subscriber {0}")]
    UnknownSubscriber(u64),
    /// A notice arrived before the subscribing call was answered.
    #[error("notice for subscriber {0} before its subscription was confirmed")]
    UnarmedSubscriber(u64),
}

/// Errors emitted by [`crate::Client`] and its executors.
#[non_exhaustive]
#[derive(Clone, Debug, Error)]
pub enum ClientError {
    /// The API was not granted on the current connection.
    #[error(
        "api `{api}` is not available on this connection; add it to ConnectionOptions::apis \
         before connecting"
    )]
    ApiNotGranted {
        /// API the caller attempted to use.
        api: ApiName,
    },
    /// The node rejected or garbled the handshake for an API.
    #[error("handshake for api `{api}` failed: {detail}")]
    HandshakeRejected {
        /// API whose identifier could not be obtained.
        api: ApiName,
        /// Description of the rejection.
        detail: String,
    },
    /// An inbound frame violated the wire protocol.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    /// The call did not receive a reply in time.
    #[error("call {id} (`{method}`) timed out after {timeout:?}")]
    Timeout {
        /// Wire id of the timed out attempt.
        id: u64,
        /// Method name of the call.
        method: String,
        /// Soft timeout configured for the call.
        timeout: Duration,
    },
    /// The socket closed before a reply arrived.
    #[error("connection closed before a reply arrived")]
    ConnectionClosed,
    /// The engine gave up reconnecting.
    #[error("gave up reconnecting after {attempts} attempts")]
    RetriesExhausted {
        /// Number of reconnect attempts made.
        attempts: u32,
    },
    /// The node returned an error for the call.
    #[error("node returned an error: {0}")]
    Remote(Value),
    /// A connection option failed validation.
    #[error(transparent)]
    InvalidOption(#[from] OptionsError),
    /// The transport failed.
    #[error("transport error: {0}")]
    Transport(#[source] Arc<dyn std::error::Error + Send + Sync>),
    /// An outbound request could not be serialised.
    #[error("failed to serialise request: {0}")]
    Serialize(#[source] Arc<serde_json::Error>),
    /// `connect` was invoked on a live connection.
    #[error("already connected")]
    AlreadyConnected,
    /// The operation requires an open connection.
    #[error("not connected")]
    NotConnected,
    /// The engine task has stopped.
    #[error("client engine has stopped")]
    EngineStopped,
}

impl ClientError {
    /// Wrap a transport failure.
    pub fn transport<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Transport(Arc::new(error))
    }

    /// Return the stable discriminant for this error.
    ///
    /// # Examples
    ///
    /// ```
    /// use chainwire::{ClientError, ErrorKind};
    ///
    /// assert_eq!(ClientError::ConnectionClosed.kind(), ErrorKind::ConnectionClosed);
    /// ```
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ApiNotGranted { .. } | Self::HandshakeRejected { .. } => ErrorKind::Capability,
            Self::Protocol(_) => ErrorKind::Protocol,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::ConnectionClosed => ErrorKind::ConnectionClosed,
            Self::RetriesExhausted { .. } => ErrorKind::Terminal,
            Self::Remote(_) => ErrorKind::Remote,
            Self::InvalidOption(_) => ErrorKind::InvalidOption,
            Self::Serialize(_) => ErrorKind::Encoding,
            Self::Transport(_) => ErrorKind::Transport,
            Self::AlreadyConnected | Self::NotConnected | Self::EngineStopped => ErrorKind::State,
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(error: serde_json::Error) -> Self { Self::Serialize(Arc::new(error)) }
}
