//! Command handling, request dispatch and inbound frame routing.

use std::{
    panic::{AssertUnwindSafe, catch_unwind},
    time::Duration,
};

use serde_json::Value;
use tracing::{debug, trace, warn};

use super::{
    Engine,
    Outbound,
    Parked,
    calls::{PendingCall, Responder},
    command::Command,
    state::{ConnectionState, Reply},
    timers::{Expired, Stage},
};
use crate::{
    error::{ClientError, ProtocolError},
    metrics::{self, CallOutcome},
    panic::format_panic,
    request::{ApiTarget, Request},
    transport::{CloseInfo, TransportEvent},
    wire::{self, InboundFrame},
};

impl Engine {
    pub(super) fn handle_command(&mut self, command: Command) {
        match command {
            Command::Connect {
                url,
                options,
                reply,
            } => self.connect(&url, &options, reply),
            Command::Call {
                request,
                timeout,
                reply,
            } => self.call(request, timeout, reply),
            Command::Close { reply } => self.close(reply),
            Command::Reconnect { reply } => self.reconnect(reply),
            Command::ApiId { api, reply } => {
                let _ = reply.send(self.registry.id(api));
            }
        }
    }

    fn call(&mut self, request: Request, timeout: Option<Duration>, reply: Reply<Value>) {
        let timeout = timeout.unwrap_or_else(|| self.default_timeout());
        if self.recovering {
            trace!(method = request.method(), "parking call until recovery completes");
            self.backlog.push(Parked {
                request,
                responder: Responder::Caller(reply),
                timeout,
            });
            return;
        }
        if self.state != ConnectionState::Open {
            let _ = reply.send(Err(ClientError::NotConnected));
            return;
        }
        self.dispatch(request, timeout, Responder::Caller(reply));
    }

    /// Allocate an id for `request`, register it and queue its frame.
    ///
    /// Named APIs are resolved against the registry first; an API the
    /// connection was not granted fails the responder without sending.
    pub(super) fn dispatch(&mut self, request: Request, timeout: Duration, responder: Responder) {
        let api_id = match request.api() {
            ApiTarget::Id(id) => id,
            ApiTarget::Named(api) => match self.registry.resolve(api) {
                Ok(id) => id,
                Err(error) => {
                    self.settle(responder, Err(error));
                    return;
                }
            },
        };
        let id = self.ids.allocate();
        debug_assert!(!self.calls.contains(id) && !self.subscribers.contains(id));
        let frame = match wire::encode_call(id, api_id, &request) {
            Ok(frame) => frame,
            Err(error) => {
                self.settle(responder, Err(error.into()));
                return;
            }
        };
        if request.is_subscription() {
            self.subscribers.insert(id, request.clone());
        }
        let timer = self.timers.start(id, timeout);
        self.calls.insert(id, PendingCall {
            request,
            responder,
            timeout,
            timer,
        });
        metrics::set_pending_calls(self.calls.len());
        self.outbox.push_back(Outbound::Frame(frame));
    }

    /// Deliver the outcome of a call to whoever is waiting for it.
    pub(super) fn settle(&mut self, responder: Responder, outcome: Result<Value, ClientError>) {
        match responder {
            Responder::Caller(reply) => {
                metrics::record_call(CallOutcome::of(&outcome));
                // The caller may have stopped waiting.
                let _ = reply.send(outcome);
            }
            Responder::Handshake(api) => self.on_handshake_reply(api, outcome),
            Responder::Keepalive => self.on_probe_reply(outcome),
            Responder::Rearm => {
                if let Err(error) = outcome {
                    warn!(%error, "failed to restore subscription after recovery");
                    self.hooks.emit_error(error);
                }
            }
        }
    }

    pub(super) fn on_transport_event(&mut self, event: Option<TransportEvent>) {
        match event {
            Some(TransportEvent::Message(text)) => self.on_frame(&text),
            Some(TransportEvent::Error(detail)) => {
                warn!(%detail, "transport reported an error");
                self.hooks
                    .emit_error(ClientError::transport(std::io::Error::other(detail)));
            }
            Some(TransportEvent::Closed(info)) => self.on_closed(info),
            None => self.on_closed(CloseInfo::abnormal("link ended without a close event")),
        }
    }

    fn on_frame(&mut self, text: &str) {
        self.keepalive.touch();
        metrics::inc_frames(metrics::Direction::Inbound);
        if self.debug_frames() {
            debug!(frame = %text, "received frame");
        }
        match wire::decode_frame(text) {
            Ok(InboundFrame::Reply { id, outcome }) => self.on_reply(id, outcome),
            Ok(InboundFrame::Notice {
                subscriber,
                payload,
            }) => self.on_notice(subscriber, payload),
            Err(error) => self.report_protocol(error),
        }
    }

    fn on_reply(&mut self, id: u64, outcome: Result<Value, Value>) {
        let Some(call) = self.calls.remove(id) else {
            self.report_protocol(ProtocolError::UnexpectedResponseId(id));
            return;
        };
        self.timers.cancel(&call.timer);
        metrics::set_pending_calls(self.calls.len());
        if call.request.is_subscription() {
            if outcome.is_ok() {
                self.subscribers.arm(id);
            } else {
                self.subscribers.remove(id);
            }
        }
        self.settle(call.responder, outcome.map_err(ClientError::Remote));
    }

    fn on_notice(&mut self, subscriber: u64, payload: Value) {
        let handler = match self.subscribers.handler(subscriber) {
            Ok(handler) => handler,
            Err(error) => {
                self.report_protocol(error);
                return;
            }
        };
        if let Err(panic) = catch_unwind(AssertUnwindSafe(|| handler(payload))) {
            warn!(
                subscriber,
                panic = %format_panic(panic),
                "notice handler panicked"
            );
        }
    }

    /// Protocol violations are reported and the frame dropped; the
    /// connection stays up.
    fn report_protocol(&self, error: ProtocolError) {
        warn!(%error, "dropping inbound frame");
        metrics::inc_protocol_errors();
        self.hooks.emit_error(ClientError::Protocol(error));
    }

    pub(super) fn on_timer(&mut self, expired: Expired) {
        let Expired { id, stage } = expired;
        match stage {
            Stage::Soft => {
                if let Some(call) = self.calls.get_mut(id) {
                    trace!(id, "soft timeout elapsed; entering grace period");
                    call.timer = self.timers.grace(id);
                }
            }
            Stage::Grace => {
                let Some(call) = self.calls.remove(id) else {
                    return;
                };
                metrics::set_pending_calls(self.calls.len());
                if call.request.is_subscription() {
                    self.subscribers.remove(id);
                }
                debug!(id, method = call.request.method(), "call timed out");
                let error = ClientError::Timeout {
                    id,
                    method: call.request.method().to_owned(),
                    timeout: call.timeout,
                };
                self.settle(call.responder, Err(error));
            }
        }
    }
}
