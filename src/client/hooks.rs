//! Client connection lifecycle hooks.
//!
//! Hooks fire at connection boundaries: when a connection becomes usable,
//! when it closes, and when the engine reports an error that no caller is
//! waiting for. Each invocation runs on its own task, so a hook may call back
//! into the [`Client`](super::Client) without stalling the engine.

use std::{future::Future, pin::Pin, sync::Arc};

use crate::{error::ClientError, transport::CloseInfo};

/// A boxed future that is `Send` with a specified lifetime.
///
/// This type alias reduces verbosity in handler type signatures.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Handler invoked when a connection opens.
///
/// Fires after an explicit `connect` or `reconnect`, and after a scheduled
/// retry succeeds. Transparent recovery does not fire it.
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
///
/// use chainwire::client::OpenHandler;
///
/// let on_open: OpenHandler = Arc::new(|| Box::pin(async { println!("connected") }));
/// ```
pub type OpenHandler = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// Handler invoked when a connection closes.
///
/// Receives the close code and reason. Transparent recovery does not fire it
/// unless recovery fails.
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
///
/// use chainwire::client::CloseHandler;
///
/// let on_close: CloseHandler = Arc::new(|info| {
///     Box::pin(async move {
///         println!("closed: {info}");
///     })
/// });
/// ```
pub type CloseHandler = Arc<dyn Fn(CloseInfo) -> BoxFuture<'static, ()> + Send + Sync>;

/// Handler invoked for errors not owned by a pending call.
///
/// Receives protocol violations, transport failures, failed reconnect
/// attempts, and the terminal error emitted once retries are exhausted.
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
///
/// use chainwire::client::ErrorHandler;
///
/// let on_error: ErrorHandler = Arc::new(|err| {
///     Box::pin(async move {
///         eprintln!("client error: {err}");
///     })
/// });
/// ```
pub type ErrorHandler = Arc<dyn Fn(ClientError) -> BoxFuture<'static, ()> + Send + Sync>;

/// Configuration for client lifecycle hooks.
///
/// Built by [`ClientBuilder`](super::ClientBuilder) and owned by the engine.
#[expect(
    clippy::struct_field_names,
    reason = "on_ prefix is idiomatic for callback fields"
)]
#[derive(Clone, Default)]
pub(crate) struct LifecycleHooks {
    pub(crate) on_open: Option<OpenHandler>,
    pub(crate) on_close: Option<CloseHandler>,
    pub(crate) on_error: Option<ErrorHandler>,
}

impl LifecycleHooks {
    pub(crate) fn emit_open(&self) {
        if let Some(handler) = &self.on_open {
            tokio::spawn(handler());
        }
    }

    pub(crate) fn emit_close(&self, info: CloseInfo) {
        if let Some(handler) = &self.on_close {
            tokio::spawn(handler(info));
        }
    }

    pub(crate) fn emit_error(&self, error: ClientError) {
        if let Some(handler) = &self.on_error {
            tokio::spawn(handler(error));
        }
    }
}
