//! Core client builder type.

use std::sync::Arc;

use crate::{
    client::{Client, hooks::LifecycleHooks, tracing_config::TracingConfig},
    engine,
    transport::{Transport, WebSocketTransport},
};

/// Builder for [`Client`].
///
/// # Examples
///
/// ```no_run
/// use chainwire::{Client, transport::WebSocketTransport};
///
/// # #[tokio::main]
/// # async fn main() {
/// let client = Client::builder()
///     .transport(WebSocketTransport)
///     .on_open(|| async { println!("connected") })
///     .build();
/// # let _ = client;
/// # }
/// ```
pub struct ClientBuilder {
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) lifecycle_hooks: LifecycleHooks,
    pub(crate) tracing_config: TracingConfig,
}

impl ClientBuilder {
    /// Create a builder using the websocket transport.
    #[must_use]
    pub fn new() -> Self {
        Self {
            transport: Arc::new(WebSocketTransport),
            lifecycle_hooks: LifecycleHooks::default(),
            tracing_config: TracingConfig::default(),
        }
    }

    /// Use `transport` to open links.
    #[must_use]
    pub fn transport<T: Transport>(mut self, transport: T) -> Self {
        self.transport = Arc::new(transport);
        self
    }

    /// Spawn the connection engine and return a handle to it.
    ///
    /// The engine starts disconnected; call [`Client::connect`] to open a
    /// connection.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    #[must_use]
    pub fn build(self) -> Client {
        let engine = engine::spawn(self.transport, self.lifecycle_hooks);
        Client::from_engine(engine, self.tracing_config)
    }
}

impl Default for ClientBuilder {
    fn default() -> Self { Self::new() }
}
