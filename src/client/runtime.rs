//! Client handle implementation.

use std::{fmt, sync::Arc, time::Duration};

use serde_json::Value;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::Instrument;

use super::{
    ClientBuilder,
    tracing_config::TracingConfig,
    tracing_helpers::{
        call_span,
        close_span,
        connect_span,
        emit_timing_event,
        reconnect_span,
        record_result,
    },
};
use crate::{
    api::ApiName,
    engine::{Command, ConnectionStatus, EngineHandle},
    error::ClientError,
    options::ConnectionOptions,
    registry::ApiExecutor,
    request::Request,
};

/// Handle to a connection engine.
///
/// Clones share one engine. Every operation is a message to the engine task,
/// so handles may be used from any number of tasks at once.
///
/// # Examples
///
/// ```no_run
/// use chainwire::{ApiName, Client, ConnectionOptions};
/// use serde_json::json;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), chainwire::ClientError> {
/// let client = Client::new();
/// client
///     .connect("wss://node.example.com/ws", ConnectionOptions::default())
///     .await?;
/// let props = client
///     .api(ApiName::Database)
///     .exec("get_dynamic_global_properties", vec![])
///     .await?;
/// println!("{props}");
/// client.close().await?;
/// # let _ = json!(null);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    commands: mpsc::UnboundedSender<Command>,
    status: watch::Receiver<ConnectionStatus>,
    tracing_config: Arc<TracingConfig>,
}

impl Client {
    pub(crate) fn from_engine(engine: EngineHandle, tracing_config: TracingConfig) -> Self {
        Self {
            commands: engine.commands,
            status: engine.status,
            tracing_config: Arc::new(tracing_config),
        }
    }

    /// Create a client using the websocket transport and no hooks.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    #[must_use]
    pub fn new() -> Self { ClientBuilder::new().build() }

    /// Start configuring a client.
    #[must_use]
    pub fn builder() -> ClientBuilder { ClientBuilder::new() }

    /// Open a connection to `url` and obtain API identifiers.
    ///
    /// Resolves once every requested API has been resolved. `url` must use
    /// the `ws` or `wss` scheme.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidOption`] if the url or options are
    /// invalid, [`ClientError::AlreadyConnected`] if the engine is not
    /// disconnected, and a transport or capability error if the link cannot
    /// be opened or the handshake is rejected.
    pub async fn connect(
        &self,
        url: impl Into<String>,
        options: ConnectionOptions,
    ) -> Result<(), ClientError> {
        let url = url.into();
        let span = connect_span(&self.tracing_config, &url);
        let start = self.tracing_config.connect_timing.then(std::time::Instant::now);
        let result = self
            .request(|reply| Command::Connect {
                url,
                options,
                reply,
            })
            .instrument(span.clone())
            .await;
        record_result(&span, &result);
        span.in_scope(|| emit_timing_event(start));
        result
    }

    /// Run `request` and wait for its reply.
    ///
    /// `timeout` overrides the connection's default soft timeout. A call
    /// issued while the engine is silently recovering is queued and sent
    /// once the connection is back.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the API is not granted, the node replies
    /// with an error, the call times out, or the connection closes first.
    pub async fn call(
        &self,
        request: Request,
        timeout: Option<Duration>,
    ) -> Result<Value, ClientError> {
        let span = call_span(&self.tracing_config, request.method());
        let start = self.tracing_config.call_timing.then(std::time::Instant::now);
        let result = self
            .request(|reply| Command::Call {
                request,
                timeout,
                reply,
            })
            .instrument(span.clone())
            .await;
        record_result(&span, &result);
        span.in_scope(|| emit_timing_event(start));
        result
    }

    /// Close the connection.
    ///
    /// Resolves once the close completes. Pending calls are rejected with
    /// [`ClientError::ConnectionClosed`] and no reconnect is scheduled. When
    /// a reconnect is scheduled or in progress, it is cancelled instead.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotConnected`] when there is nothing to close.
    pub async fn close(&self) -> Result<(), ClientError> {
        let span = close_span(&self.tracing_config);
        let start = self.tracing_config.close_timing.then(std::time::Instant::now);
        let result = self
            .request(|reply| Command::Close { reply })
            .instrument(span.clone())
            .await;
        span.in_scope(|| emit_timing_event(start));
        result
    }

    /// Close the connection, if open, and connect again with the last url
    /// and options.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotConnected`] if `connect` was never called,
    /// [`ClientError::AlreadyConnected`] while a connection attempt is in
    /// progress, or the error that failed the new connection.
    pub async fn reconnect(&self) -> Result<(), ClientError> {
        let span = reconnect_span(&self.tracing_config);
        let start = self
            .tracing_config
            .reconnect_timing
            .then(std::time::Instant::now);
        let result = self
            .request(|reply| Command::Reconnect { reply })
            .instrument(span.clone())
            .await;
        span.in_scope(|| emit_timing_event(start));
        result
    }

    /// Executor for one of the logical APIs.
    #[must_use]
    pub fn api(&self, api: ApiName) -> ApiExecutor { ApiExecutor::new(self.clone(), api) }

    /// Numeric id granted for `api` on the current connection.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::EngineStopped`] if the engine has stopped.
    pub async fn api_id(&self, api: ApiName) -> Result<Option<u32>, ClientError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::ApiId { api, reply })
            .map_err(|_| ClientError::EngineStopped)?;
        rx.await.map_err(|_| ClientError::EngineStopped)
    }

    /// Current connection status.
    #[must_use]
    pub fn status(&self) -> ConnectionStatus { *self.status.borrow() }

    /// Receiver that observes every status change.
    #[must_use]
    pub fn watch_status(&self) -> watch::Receiver<ConnectionStatus> { self.status.clone() }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<Result<T, ClientError>>) -> Command,
    ) -> Result<T, ClientError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(command(reply))
            .map_err(|_| ClientError::EngineStopped)?;
        rx.await.map_err(|_| ClientError::EngineStopped)?
    }
}

impl Default for Client {
    fn default() -> Self { Self::new() }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("status", &*self.status.borrow())
            .finish_non_exhaustive()
    }
}
