//! In-memory node speaking the chainwire wire protocol.
//!
//! Every link opened through [`MockTransport`] is backed by channels. Frames
//! the client sends are decoded and surfaced to the test as [`NodeEvent`]s,
//! except handshake calls and keepalive probes, which the node answers on its
//! own unless configured otherwise.

use std::{
    collections::HashMap,
    io,
    sync::{
        Arc,
        Mutex,
        MutexGuard,
        PoisonError,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use chainwire::{
    ApiName,
    CloseInfo,
    ClientError,
    META_API_ID,
    transport::{Link, Transport, TransportEvent},
};
use serde_json::{Value, json};
use tokio::sync::mpsc;
use url::Url;

/// How long [`MockNode`] waits for client activity before failing the test.
pub const DEFAULT_WAIT: Duration = Duration::from_secs(600);

/// Id the mock grants to `api` unless told otherwise.
#[must_use]
pub fn default_api_id(api: ApiName) -> u32 {
    let position = ApiName::ALL
        .iter()
        .position(|candidate| *candidate == api)
        .unwrap_or_default();
    u32::try_from(position).unwrap_or(u32::MAX) + 2
}

/// Answer given to a handshake call.
#[derive(Clone, Debug, PartialEq)]
pub enum HandshakeReply {
    /// Reply with a numeric id.
    Grant(u32),
    /// Reply with `null`.
    Deny,
    /// Reply with an `error` member.
    Reject(Value),
    /// Forward the call to the test instead of answering it.
    Manual,
}

/// A call frame sent by the client.
#[derive(Clone, Debug, PartialEq)]
pub struct SentCall {
    /// Link the frame was written to, counted from 1.
    pub link: usize,
    /// Wire id.
    pub id: u64,
    /// Numeric API id.
    pub api_id: u64,
    /// Method name.
    pub method: String,
    /// Method params.
    pub params: Vec<Value>,
}

/// Client activity observed by the node.
#[derive(Clone, Debug, PartialEq)]
pub enum NodeEvent {
    /// A link was opened.
    Opened(usize),
    /// An open was refused.
    Refused(usize),
    /// A call frame arrived.
    Call(SentCall),
    /// A frame that is not a call arrived.
    Raw(String),
    /// The client started a close handshake on a link.
    ClientClosed(usize),
}

struct Config {
    handshake: HashMap<String, HandshakeReply>,
    answer_probes: bool,
    echo_close: bool,
    refuse_opens: usize,
}

impl Default for Config {
    fn default() -> Self {
        let handshake = ApiName::ALL
            .into_iter()
            .filter(|api| !api.is_meta())
            .map(|api| {
                (
                    api.as_str().to_owned(),
                    HandshakeReply::Grant(default_api_id(api)),
                )
            })
            .collect();
        Self {
            handshake,
            answer_probes: true,
            echo_close: true,
            refuse_opens: 0,
        }
    }
}

struct Shared {
    config: Mutex<Config>,
    current: Mutex<Option<mpsc::UnboundedSender<TransportEvent>>>,
    opens: AtomicUsize,
    events: mpsc::UnboundedSender<NodeEvent>,
}

impl Shared {
    fn config(&self) -> MutexGuard<'_, Config> {
        self.config.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn current(&self) -> MutexGuard<'_, Option<mpsc::UnboundedSender<TransportEvent>>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Create a transport and the node controlling it.
#[must_use]
pub fn mock_node() -> (MockTransport, MockNode) {
    let (events, rx) = mpsc::unbounded_channel();
    let shared = Arc::new(Shared {
        config: Mutex::new(Config::default()),
        current: Mutex::new(None),
        opens: AtomicUsize::new(0),
        events,
    });
    (
        MockTransport {
            shared: Arc::clone(&shared),
        },
        MockNode { shared, events: rx },
    )
}

/// Transport whose links are played by a [`MockNode`].
#[derive(Clone)]
pub struct MockTransport {
    shared: Arc<Shared>,
}

#[async_trait]
impl Transport for MockTransport {
    async fn open(&self, _url: &Url) -> Result<Box<dyn Link>, ClientError> {
        let link = self.shared.opens.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let mut config = self.shared.config();
            if config.refuse_opens > 0 {
                config.refuse_opens -= 1;
                let _ = self.shared.events.send(NodeEvent::Refused(link));
                return Err(ClientError::transport(io::Error::new(
                    io::ErrorKind::ConnectionRefused,
                    "mock node refused the connection",
                )));
            }
        }
        let (inbound, events) = mpsc::unbounded_channel();
        *self.shared.current() = Some(inbound.clone());
        let _ = self.shared.events.send(NodeEvent::Opened(link));
        Ok(Box::new(MockLink {
            link,
            shared: Arc::clone(&self.shared),
            inbound,
            events,
            closed: false,
        }))
    }
}

struct MockLink {
    link: usize,
    shared: Arc<Shared>,
    inbound: mpsc::UnboundedSender<TransportEvent>,
    events: mpsc::UnboundedReceiver<TransportEvent>,
    closed: bool,
}

impl MockLink {
    fn auto_reply(&self, call: &SentCall) -> Option<Value> {
        if call.api_id != u64::from(META_API_ID) {
            return None;
        }
        let config = self.shared.config();
        if call.method == "login" {
            return config
                .answer_probes
                .then(|| json!({"id": call.id, "jsonrpc": "2.0", "result": true}));
        }
        match config.handshake.get(&call.method)? {
            HandshakeReply::Grant(api_id) => {
                Some(json!({"id": call.id, "jsonrpc": "2.0", "result": api_id}))
            }
            HandshakeReply::Deny => Some(json!({"id": call.id, "jsonrpc": "2.0", "result": null})),
            HandshakeReply::Reject(error) => {
                Some(json!({"id": call.id, "jsonrpc": "2.0", "error": error}))
            }
            HandshakeReply::Manual => None,
        }
    }
}

#[async_trait]
impl Link for MockLink {
    async fn send(&mut self, text: String) -> Result<(), ClientError> {
        if self.closed {
            return Err(ClientError::transport(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "mock link is closed",
            )));
        }
        let Some(call) = parse_call(self.link, &text) else {
            let _ = self.shared.events.send(NodeEvent::Raw(text));
            return Ok(());
        };
        if let Some(reply) = self.auto_reply(&call) {
            let _ = self.inbound.send(TransportEvent::Message(reply.to_string()));
        } else {
            let _ = self.shared.events.send(NodeEvent::Call(call));
        }
        Ok(())
    }

    async fn recv(&mut self) -> Option<TransportEvent> {
        if self.closed {
            return None;
        }
        let event = self.events.recv().await?;
        if matches!(event, TransportEvent::Closed(_)) {
            self.closed = true;
        }
        Some(event)
    }

    async fn close(&mut self) -> Result<(), ClientError> {
        let _ = self.shared.events.send(NodeEvent::ClientClosed(self.link));
        if self.shared.config().echo_close {
            let _ = self.inbound.send(TransportEvent::Closed(CloseInfo::normal()));
        }
        Ok(())
    }
}

fn parse_call(link: usize, text: &str) -> Option<SentCall> {
    let value: Value = serde_json::from_str(text).ok()?;
    if value.get("method")?.as_str()? != "call" {
        return None;
    }
    let id = value.get("id")?.as_u64()?;
    let params = value.get("params")?.as_array()?;
    let [api_id, method, method_params] = params.as_slice() else {
        return None;
    };
    Some(SentCall {
        link,
        id,
        api_id: api_id.as_u64()?,
        method: method.as_str()?.to_owned(),
        params: method_params.as_array()?.clone(),
    })
}

/// Test-side control of the mock node.
pub struct MockNode {
    shared: Arc<Shared>,
    events: mpsc::UnboundedReceiver<NodeEvent>,
}

impl MockNode {
    /// Number of opens attempted so far, refused ones included.
    #[must_use]
    pub fn opens(&self) -> usize { self.shared.opens.load(Ordering::SeqCst) }

    /// Set how the node answers the handshake for `api`.
    pub fn handshake(&self, api: ApiName, reply: HandshakeReply) {
        self.shared
            .config()
            .handshake
            .insert(api.as_str().to_owned(), reply);
    }

    /// Answer keepalive probes automatically (the default) or forward them.
    pub fn answer_probes(&self, enabled: bool) { self.shared.config().answer_probes = enabled; }

    /// Acknowledge client close handshakes (the default) or ignore them.
    pub fn echo_close(&self, enabled: bool) { self.shared.config().echo_close = enabled; }

    /// Refuse the next `count` opens.
    pub fn refuse_opens(&self, count: usize) { self.shared.config().refuse_opens = count; }

    /// Deliver `event` on the most recently opened link.
    ///
    /// # Panics
    ///
    /// Panics if no link was ever opened.
    pub fn push(&self, event: TransportEvent) {
        let current = self.shared.current();
        let link = current.as_ref().expect("no link has been opened");
        let _ = link.send(event);
    }

    /// Send a text frame verbatim.
    pub fn send_raw(&self, text: impl Into<String>) { self.push(TransportEvent::Message(text.into())); }

    /// Reply to call `id` with `result`.
    pub fn reply(&self, id: u64, result: Value) {
        self.send_raw(json!({"id": id, "jsonrpc": "2.0", "result": result}).to_string());
    }

    /// Reply to call `id` with an `error` member.
    pub fn reply_error(&self, id: u64, error: Value) {
        self.send_raw(json!({"id": id, "jsonrpc": "2.0", "error": error}).to_string());
    }

    /// Push a notice to `subscriber`.
    pub fn notice(&self, subscriber: u64, payload: Value) {
        self.send_raw(json!({"method": "notice", "params": [subscriber, payload]}).to_string());
    }

    /// Close the current link with `code`.
    pub fn close(&self, code: u16, reason: &str) {
        self.push(TransportEvent::Closed(CloseInfo::new(code, reason)));
    }

    /// Drop the current link without a close handshake.
    pub fn drop_connection(&self) { self.push(TransportEvent::Closed(CloseInfo::abnormal("connection reset"))); }

    /// Wait for the next client activity.
    ///
    /// # Panics
    ///
    /// Panics if nothing happens within [`DEFAULT_WAIT`] or the transport
    /// was dropped.
    pub async fn next_event(&mut self) -> NodeEvent {
        tokio::time::timeout(DEFAULT_WAIT, self.events.recv())
            .await
            .expect("timed out waiting for client activity")
            .expect("transport dropped")
    }

    /// Wait for the next call frame, skipping other events.
    pub async fn next_call(&mut self) -> SentCall {
        loop {
            if let NodeEvent::Call(call) = self.next_event().await {
                return call;
            }
        }
    }

    /// Wait for the next call to `method`, skipping other events.
    pub async fn next_call_to(&mut self, method: &str) -> SentCall {
        loop {
            let call = self.next_call().await;
            if call.method == method {
                return call;
            }
        }
    }

    /// Wait until a link is opened and return its number.
    pub async fn next_open(&mut self) -> usize {
        loop {
            if let NodeEvent::Opened(link) = self.next_event().await {
                return link;
            }
        }
    }

    /// Return the next event if one is already queued.
    pub fn try_next_event(&mut self) -> Option<NodeEvent> { self.events.try_recv().ok() }
}
