//! Connection engine actor.
//!
//! A single task owns the link, the id allocator, the call and subscriber
//! tables, the API registry and every timer. Client handles talk to it over a
//! command channel and observe its state through a `watch` channel, so no
//! state is shared between tasks.
//!
//! The run loop waits on a `tokio::select!` over link output, commands, the
//! pending open, call timers, the keepalive deadline, the retry schedule and
//! the close deadline. Handlers never await; frames they produce are queued
//! in an outbox that is flushed once the handler returns.

mod calls;
mod command;
mod dispatch;
mod event;
mod ids;
mod keepalive;
mod lifecycle;
mod polling;
mod retry;
mod state;
mod subscribers;
mod timers;

use std::{collections::VecDeque, sync::Arc, time::Duration};

pub(crate) use command::Command;
use event::Event;
use futures::future::BoxFuture;
pub use state::{ConnectionState, ConnectionStatus};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use self::{
    calls::{CallTable, Responder},
    ids::IdAllocator,
    keepalive::Keepalive,
    retry::RetryState,
    state::{Closing, OpenPurpose, Session},
    subscribers::SubscriberTable,
    timers::CallTimers,
};
use crate::{
    client::hooks::LifecycleHooks,
    error::ClientError,
    metrics,
    options::DEFAULT_CONNECTION_TIMEOUT,
    registry::ApiRegistry,
    request::Request,
    transport::{Link, Transport},
};

type OpenFuture = BoxFuture<'static, Result<Box<dyn Link>, ClientError>>;

/// Work queued for the link by a handler.
#[derive(Debug)]
enum Outbound {
    Frame(String),
    Close,
}

/// A call waiting for recovery to finish.
#[derive(Debug)]
struct Parked {
    request: Request,
    responder: Responder,
    timeout: Duration,
}

/// Channel ends handed to [`crate::Client`] when an engine is spawned.
pub(crate) struct EngineHandle {
    pub(crate) commands: mpsc::UnboundedSender<Command>,
    pub(crate) status: watch::Receiver<ConnectionStatus>,
}

/// Spawn an engine on the current runtime.
pub(crate) fn spawn(transport: Arc<dyn Transport>, hooks: LifecycleHooks) -> EngineHandle {
    let (commands, command_rx) = mpsc::unbounded_channel();
    let (status_tx, status) = watch::channel(ConnectionStatus::default());
    let engine = Engine::new(transport, command_rx, status_tx, hooks);
    tokio::spawn(engine.run());
    EngineHandle { commands, status }
}

pub(crate) struct Engine {
    transport: Arc<dyn Transport>,
    commands: mpsc::UnboundedReceiver<Command>,
    status: watch::Sender<ConnectionStatus>,
    hooks: LifecycleHooks,
    state: ConnectionState,
    recovering: bool,
    session: Option<Session>,
    link: Option<Box<dyn Link>>,
    /// Links dropped by the engine that still owe the node a close frame.
    retired: Vec<Box<dyn Link>>,
    opening: Option<OpenFuture>,
    purpose: Option<OpenPurpose>,
    awaiting_handshake: usize,
    ids: IdAllocator,
    calls: CallTable,
    subscribers: SubscriberTable,
    registry: ApiRegistry,
    timers: CallTimers,
    keepalive: Keepalive,
    retry: RetryState,
    backlog: Vec<Parked>,
    resubscribe: Vec<Request>,
    closing: Option<Closing>,
    outbox: VecDeque<Outbound>,
}

impl Engine {
    fn new(
        transport: Arc<dyn Transport>,
        commands: mpsc::UnboundedReceiver<Command>,
        status: watch::Sender<ConnectionStatus>,
        hooks: LifecycleHooks,
    ) -> Self {
        Self {
            transport,
            commands,
            status,
            hooks,
            state: ConnectionState::Disconnected,
            recovering: false,
            session: None,
            link: None,
            retired: Vec::new(),
            opening: None,
            purpose: None,
            awaiting_handshake: 0,
            ids: IdAllocator::new(),
            calls: CallTable::default(),
            subscribers: SubscriberTable::default(),
            registry: ApiRegistry::default(),
            timers: CallTimers::default(),
            keepalive: Keepalive::new(),
            retry: RetryState::default(),
            backlog: Vec::new(),
            resubscribe: Vec::new(),
            closing: None,
            outbox: VecDeque::new(),
        }
    }

    /// Drive the engine until every client handle is dropped.
    pub(crate) async fn run(mut self) {
        loop {
            match self.next_event().await {
                Event::Command(None) => break,
                Event::Command(Some(command)) => self.handle_command(command),
                Event::Link(event) => self.on_transport_event(event),
                Event::Opened(result) => self.on_opened(result),
                Event::Timer(expired) => self.on_timer(expired),
                Event::Keepalive => self.on_idle(),
                Event::Retry => self.on_retry_due(),
                Event::CloseDeadline => self.on_close_deadline(),
            }
            self.flush().await;
        }
        self.shutdown().await;
    }

    /// Write queued frames to the link.
    ///
    /// Write failures are reported but otherwise left to the link, which
    /// surfaces the broken socket as a closure on its next `recv`.
    async fn flush(&mut self) {
        let debug_frames = self.debug_frames();
        while let Some(outbound) = self.outbox.pop_front() {
            let Some(link) = self.link.as_mut() else {
                self.outbox.clear();
                return;
            };
            let result = match outbound {
                Outbound::Frame(text) => {
                    if debug_frames {
                        debug!(frame = %text, "sending frame");
                    }
                    metrics::inc_frames(metrics::Direction::Outbound);
                    self.keepalive.touch();
                    link.send(text).await
                }
                Outbound::Close => link.close().await,
            };
            if let Err(error) = result {
                warn!(%error, "failed to write to transport");
                self.hooks.emit_error(error);
            }
        }
        for mut link in self.retired.drain(..) {
            if let Err(error) = link.close().await {
                debug!(%error, "failed to close released link");
            }
        }
    }

    async fn shutdown(&mut self) {
        info!("all client handles dropped; stopping engine");
        self.retry.reset();
        self.opening = None;
        self.purpose = None;
        self.reject_pending(&ClientError::EngineStopped);
        self.reject_backlog(&ClientError::EngineStopped);
        if let Some(mut link) = self.link.take() {
            if let Err(error) = link.close().await {
                debug!(%error, "close during shutdown failed");
            }
        }
        self.set_state(ConnectionState::Disconnected);
    }

    fn debug_frames(&self) -> bool { self.session.as_ref().is_some_and(|s| s.options.debug) }

    /// Default timeout for calls on the current session.
    fn default_timeout(&self) -> Duration {
        self.session
            .as_ref()
            .map_or(DEFAULT_CONNECTION_TIMEOUT, |s| s.options.connection_timeout)
    }

    fn set_state(&mut self, state: ConnectionState) {
        self.state = state;
        self.publish();
    }

    fn publish(&self) {
        self.status.send_replace(ConnectionStatus {
            state: self.state,
            recovering: self.recovering,
        });
    }

    /// Reject every pending call and forget every subscriber.
    fn reject_pending(&mut self, error: &ClientError) {
        self.timers.clear();
        self.subscribers.clear();
        for (_, call) in self.calls.drain() {
            call.responder.reject(error.clone());
        }
        metrics::set_pending_calls(0);
    }

    fn reject_backlog(&mut self, error: &ClientError) {
        self.resubscribe.clear();
        for parked in self.backlog.drain(..) {
            parked.responder.reject(error.clone());
        }
    }
}
