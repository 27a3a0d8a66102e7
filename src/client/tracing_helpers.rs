//! Tracing span and event helpers for chainwire client operations.
//!
//! These helpers centralise span creation with dynamic level selection and
//! per-command timing emission, keeping the instrumentation logic out of the
//! client methods.

use std::time::Instant;

use tracing::{Level, Span};

use super::tracing_config::TracingConfig;

/// Create a tracing span at a dynamically selected level.
///
/// Each branch calls the corresponding `tracing::<level>_span!` macro, so the
/// span metadata is statically known per branch while the branch selection is
/// dynamic.
macro_rules! dynamic_span {
    ($level:expr, $name:expr $(, $($field:tt)*)?) => {
        match $level {
            Level::ERROR => tracing::error_span!($name $(, $($field)*)?),
            Level::WARN  => tracing::warn_span!($name $(, $($field)*)?),
            Level::INFO  => tracing::info_span!($name $(, $($field)*)?),
            Level::DEBUG => tracing::debug_span!($name $(, $($field)*)?),
            Level::TRACE => tracing::trace_span!($name $(, $($field)*)?),
        }
    };
}

/// Create a span for the `connect` operation.
#[expect(
    clippy::cognitive_complexity,
    reason = "complexity from dynamic_span! macro expansion"
)]
pub(crate) fn connect_span(config: &TracingConfig, url: &str) -> Span {
    dynamic_span!(
        config.connect_level,
        "client.connect",
        url = url,
        result = tracing::field::Empty
    )
}

/// Create a span for the `call` operation.
///
/// The `result` field is recorded when the call settles.
#[expect(
    clippy::cognitive_complexity,
    reason = "complexity from dynamic_span! macro expansion"
)]
pub(crate) fn call_span(config: &TracingConfig, method: &str) -> Span {
    dynamic_span!(
        config.call_level,
        "client.call",
        method = method,
        result = tracing::field::Empty
    )
}

/// Create a span for the `close` operation.
#[expect(
    clippy::cognitive_complexity,
    reason = "complexity from dynamic_span! macro expansion"
)]
pub(crate) fn close_span(config: &TracingConfig) -> Span {
    dynamic_span!(config.close_level, "client.close")
}

/// Create a span for the `reconnect` operation.
#[expect(
    clippy::cognitive_complexity,
    reason = "complexity from dynamic_span! macro expansion"
)]
pub(crate) fn reconnect_span(config: &TracingConfig) -> Span {
    dynamic_span!(config.reconnect_level, "client.reconnect")
}

/// Record elapsed time if timing was enabled for this operation.
///
/// `start` is `None` when timing is disabled.
pub(crate) fn emit_timing_event(start: Option<Instant>) {
    if let Some(start) = start {
        let elapsed_us = start.elapsed().as_micros();
        tracing::debug!(elapsed_us = elapsed_us, "operation.timing");
    }
}

/// Record the outcome of an operation on its span.
pub(crate) fn record_result<T, E>(span: &Span, result: &Result<T, E>) {
    span.record("result", if result.is_ok() { "ok" } else { "err" });
}
