//! Metric helpers for `chainwire`.
//!
//! This module defines metric names and simple helper functions wrapping the
//! [`metrics`](https://docs.rs/metrics) crate. Without the `metrics` feature
//! every helper compiles to a no-op.

#[cfg(feature = "metrics")]
use metrics::{counter, gauge};
use serde_json::Value;

use crate::error::{ClientError, ErrorKind};

/// Name of the counter tracking frames on the wire.
pub const FRAMES_TOTAL: &str = "chainwire_frames_total";
/// Name of the counter tracking settled caller calls by outcome.
pub const CALLS_TOTAL: &str = "chainwire_calls_total";
/// Name of the gauge tracking calls awaiting a reply.
pub const PENDING_CALLS: &str = "chainwire_pending_calls";
/// Name of the counter tracking dropped inbound frames.
pub const PROTOCOL_ERRORS_TOTAL: &str = "chainwire_protocol_errors_total";
/// Name of the counter tracking transparent recoveries started.
pub const RECOVERIES_TOTAL: &str = "chainwire_recoveries_total";
/// Name of the counter tracking reconnect attempts.
pub const RETRY_ATTEMPTS_TOTAL: &str = "chainwire_retry_attempts_total";

/// Direction of frame processing.
#[derive(Clone, Copy, Debug)]
pub enum Direction {
    /// Frames received from the node.
    Inbound,
    /// Frames sent to the node.
    Outbound,
}

impl Direction {
    #[cfg_attr(not(feature = "metrics"), allow(dead_code))]
    fn as_str(self) -> &'static str {
        match self {
            Direction::Inbound => "inbound",
            Direction::Outbound => "outbound",
        }
    }
}

/// How a call settled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallOutcome {
    /// The node returned a result.
    Ok,
    /// The node returned an error.
    Remote,
    /// No reply arrived in time.
    Timeout,
    /// The connection closed first.
    Closed,
    /// The call never reached the wire.
    Rejected,
}

impl CallOutcome {
    /// Classify a call result.
    #[must_use]
    pub fn of(result: &Result<Value, ClientError>) -> Self {
        match result {
            Ok(_) => Self::Ok,
            Err(error) => match error.kind() {
                ErrorKind::Remote => Self::Remote,
                ErrorKind::Timeout => Self::Timeout,
                ErrorKind::ConnectionClosed => Self::Closed,
                _ => Self::Rejected,
            },
        }
    }

    #[cfg_attr(not(feature = "metrics"), allow(dead_code))]
    fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Remote => "remote",
            Self::Timeout => "timeout",
            Self::Closed => "closed",
            Self::Rejected => "rejected",
        }
    }
}

/// Record a frame for the given direction.
pub fn inc_frames(direction: Direction) {
    #[cfg(feature = "metrics")]
    counter!(FRAMES_TOTAL, "direction" => direction.as_str()).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = direction;
}

/// Record a settled call.
pub fn record_call(outcome: CallOutcome) {
    #[cfg(feature = "metrics")]
    counter!(CALLS_TOTAL, "outcome" => outcome.as_str()).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = outcome;
}

/// Set the number of calls awaiting a reply.
#[cfg_attr(
    feature = "metrics",
    expect(
        clippy::cast_precision_loss,
        reason = "gauge values are f64; pending call counts stay far below 2^52"
    )
)]
pub fn set_pending_calls(count: usize) {
    #[cfg(feature = "metrics")]
    gauge!(PENDING_CALLS).set(count as f64);
    #[cfg(not(feature = "metrics"))]
    let _ = count;
}

/// Record a dropped inbound frame.
pub fn inc_protocol_errors() {
    #[cfg(feature = "metrics")]
    counter!(PROTOCOL_ERRORS_TOTAL).increment(1);
}

/// Record the start of a transparent recovery.
pub fn inc_recoveries() {
    #[cfg(feature = "metrics")]
    counter!(RECOVERIES_TOTAL).increment(1);
}

/// Record a reconnect attempt.
pub fn inc_retry_attempts() {
    #[cfg(feature = "metrics")]
    counter!(RETRY_ATTEMPTS_TOTAL).increment(1);
}
