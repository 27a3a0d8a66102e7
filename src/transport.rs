//! Transport abstraction consumed by the connection engine.
//!
//! A [`Transport`] opens [`Link`]s: bidirectional text-message channels that
//! report closure with a code and reason. The engine owns at most one link at
//! a time and drives it from a single task.

use std::fmt;

use async_trait::async_trait;
use url::Url;

use crate::error::ClientError;

mod websocket;

pub use websocket::WebSocketTransport;

/// Close code sent for an orderly shutdown.
pub const NORMAL_CLOSURE: u16 = 1000;
/// Close code reported when no status code was present in the close frame.
pub const NO_STATUS_RECEIVED: u16 = 1005;
/// Close code reported when the transport ended without a close frame.
pub const ABNORMAL_CLOSURE: u16 = 1006;

/// Code and reason attached to a transport closure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CloseInfo {
    /// Close code.
    pub code: u16,
    /// Human-readable reason, possibly empty.
    pub reason: String,
}

impl CloseInfo {
    /// Build a close description.
    #[must_use]
    pub fn new(code: u16, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }

    /// Closure without a close handshake.
    #[must_use]
    pub fn abnormal(reason: impl Into<String>) -> Self { Self::new(ABNORMAL_CLOSURE, reason) }

    /// Orderly closure.
    #[must_use]
    pub fn normal() -> Self { Self::new(NORMAL_CLOSURE, "") }

    /// Returns `true` when the closure lacked an orderly close handshake.
    ///
    /// Such closures are treated as transient network failures and trigger
    /// silent recovery.
    #[must_use]
    pub fn is_abnormal(&self) -> bool { self.code == ABNORMAL_CLOSURE }
}

impl fmt::Display for CloseInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.reason.is_empty() {
            write!(f, "code {}", self.code)
        } else {
            write!(f, "code {}: {}", self.code, self.reason)
        }
    }
}

/// Events produced by an open link.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportEvent {
    /// A text message arrived.
    Message(String),
    /// The link closed. No further events follow.
    Closed(CloseInfo),
    /// A non-fatal transport error.
    Error(String),
}

/// Opens links to a node.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Open a link to `url`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the link cannot be established.
    async fn open(&self, url: &Url) -> Result<Box<dyn Link>, ClientError>;
}

/// One open connection to a node.
///
/// [`Link::recv`] must be cancel safe: the engine polls it inside a
/// `tokio::select!` loop.
#[async_trait]
pub trait Link: Send {
    /// Send a text message.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the message cannot be written.
    async fn send(&mut self, text: String) -> Result<(), ClientError>;

    /// Wait for the next event. Returns `None` once the link has closed and
    /// its [`TransportEvent::Closed`] event has been delivered.
    async fn recv(&mut self) -> Option<TransportEvent>;

    /// Begin an orderly close handshake.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the close frame cannot be written.
    async fn close(&mut self) -> Result<(), ClientError>;
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(CloseInfo::abnormal("reset"), true)]
    #[case(CloseInfo::normal(), false)]
    #[case(CloseInfo::new(NO_STATUS_RECEIVED, ""), false)]
    #[case(CloseInfo::new(1001, "going away"), false)]
    fn classifies_closures(#[case] info: CloseInfo, #[case] abnormal: bool) {
        assert_eq!(info.is_abnormal(), abnormal);
    }

    #[test]
    fn display_includes_reason_when_present() {
        assert_eq!(CloseInfo::normal().to_string(), "code 1000");
        assert_eq!(
            CloseInfo::new(1001, "going away").to_string(),
            "code 1001: going away"
        );
    }
}
