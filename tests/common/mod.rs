//! Shared harness for the client integration tests.
#![allow(dead_code, reason = "each test binary uses a different subset")]

use chainwire::{ApiName, Client, ClientError, CloseInfo, ConnectionOptions};
use chainwire_testing::{MockNode, mock_node};
use tokio::sync::mpsc;

pub const URL: &str = "ws://node.test";

/// Lifecycle hook invocation observed by a test.
#[derive(Debug)]
pub enum HookEvent {
    Open,
    Close(CloseInfo),
    Error(ClientError),
}

/// A client wired to a mock node with every hook recorded.
pub struct Harness {
    pub client: Client,
    pub node: MockNode,
    hooks: mpsc::UnboundedReceiver<HookEvent>,
}

impl Harness {
    /// Build a client against a fresh mock node without connecting.
    pub fn new() -> Self {
        let (transport, node) = mock_node();
        let (tx, hooks) = mpsc::unbounded_channel();
        let (open_tx, close_tx, error_tx) = (tx.clone(), tx.clone(), tx);
        let client = Client::builder()
            .transport(transport)
            .on_open(move || {
                let tx = open_tx.clone();
                async move {
                    let _ = tx.send(HookEvent::Open);
                }
            })
            .on_close(move |info| {
                let tx = close_tx.clone();
                async move {
                    let _ = tx.send(HookEvent::Close(info));
                }
            })
            .on_error(move |err| {
                let tx = error_tx.clone();
                async move {
                    let _ = tx.send(HookEvent::Error(err));
                }
            })
            .build();
        Self {
            client,
            node,
            hooks,
        }
    }

    /// Build and connect with `options`, consuming the open hook.
    pub async fn connected(options: ConnectionOptions) -> Self {
        let mut harness = Self::new();
        harness
            .client
            .connect(URL, options)
            .await
            .expect("mock node accepts the connection");
        assert!(matches!(harness.next_hook().await, HookEvent::Open));
        harness
    }

    /// Connected harness requesting only the database API.
    pub async fn database_only() -> Self {
        Self::connected(ConnectionOptions::default().apis([ApiName::Database])).await
    }

    /// Wait for the next hook invocation.
    pub async fn next_hook(&mut self) -> HookEvent {
        tokio::time::timeout(chainwire_testing::mock_node::DEFAULT_WAIT, self.hooks.recv())
            .await
            .expect("timed out waiting for a hook")
            .expect("hook channel closed")
    }

    /// Wait for the next error hook, skipping other hooks.
    pub async fn next_error(&mut self) -> ClientError {
        loop {
            if let HookEvent::Error(err) = self.next_hook().await {
                return err;
            }
        }
    }

    /// Hook invocations already delivered, after letting spawned tasks run.
    pub async fn drain_hooks(&mut self) -> Vec<HookEvent> {
        settle().await;
        let mut events = Vec::new();
        while let Ok(event) = self.hooks.try_recv() {
            events.push(event);
        }
        events
    }
}

/// Yield until the engine and any hook tasks have caught up.
pub async fn settle() {
    for _ in 0..50 {
        tokio::task::yield_now().await;
    }
}
