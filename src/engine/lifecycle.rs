//! Open, handshake, closure, recovery and retry handling.

use std::{io, mem, sync::Arc};

use serde_json::Value;
use tracing::{debug, error, info, warn};

use super::{
    Engine,
    Outbound,
    Parked,
    calls::Responder,
    state::{Closing, ConnectionState, OpenPurpose, Reply, Session},
};
use crate::{
    api::{ApiName, META_API_ID},
    error::ClientError,
    metrics,
    options::{ConnectionOptions, parse_url},
    request::Request,
    transport::{CloseInfo, Link, NORMAL_CLOSURE},
};

impl Engine {
    pub(super) fn connect(&mut self, url: &str, options: &ConnectionOptions, reply: Reply<()>) {
        if self.state != ConnectionState::Disconnected {
            let _ = reply.send(Err(ClientError::AlreadyConnected));
            return;
        }
        let session = match parse_url(url).and_then(|url| {
            Ok(Session {
                url,
                options: options.validate()?,
            })
        }) {
            Ok(session) => session,
            Err(error) => {
                let _ = reply.send(Err(error.into()));
                return;
            }
        };
        self.retry.reset();
        self.session = Some(session);
        self.begin_open(OpenPurpose::Connect(reply));
    }

    pub(super) fn close(&mut self, reply: Reply<()>) {
        if self.state == ConnectionState::Open {
            info!("closing connection");
            self.begin_close(Some(reply), None);
        } else if self.recovering || matches!(self.purpose, Some(OpenPurpose::Retry)) {
            self.abandon_open();
            let _ = reply.send(Ok(()));
        } else if self.retry.cancel() {
            info!("cancelled scheduled reconnect");
            let _ = reply.send(Ok(()));
        } else {
            let _ = reply.send(Err(ClientError::NotConnected));
        }
    }

    pub(super) fn reconnect(&mut self, reply: Reply<()>) {
        if self.session.is_none() {
            let _ = reply.send(Err(ClientError::NotConnected));
            return;
        }
        match self.state {
            ConnectionState::Open => {
                info!("reconnecting");
                self.begin_close(None, Some(reply));
            }
            ConnectionState::Disconnected => {
                self.retry.reset();
                self.begin_open(OpenPurpose::Connect(reply));
            }
            ConnectionState::Connecting | ConnectionState::Handshaking | ConnectionState::Closing => {
                let _ = reply.send(Err(ClientError::AlreadyConnected));
            }
        }
    }

    fn begin_close(&mut self, reply: Option<Reply<()>>, reopen: Option<Reply<()>>) {
        let limit = self.default_timeout();
        self.keepalive.disarm();
        self.outbox.push_back(Outbound::Close);
        self.closing = Some(Closing::new(reply, reopen, limit));
        self.set_state(ConnectionState::Closing);
    }

    /// Give up on a recovery or retry that has not completed yet.
    fn abandon_open(&mut self) {
        let was_recovering = mem::take(&mut self.recovering);
        info!(was_recovering, "close requested while reopening; abandoning attempt");
        self.opening = None;
        self.purpose = None;
        self.awaiting_handshake = 0;
        self.release_link(true);
        self.reject_pending(&ClientError::ConnectionClosed);
        self.reject_backlog(&ClientError::ConnectionClosed);
        self.registry.clear();
        self.retry.reset();
        self.set_state(ConnectionState::Disconnected);
        if was_recovering {
            self.hooks.emit_close(CloseInfo::normal());
        }
    }

    /// Start opening a link for the stored session.
    pub(super) fn begin_open(&mut self, purpose: OpenPurpose) {
        let Some(session) = self.session.as_ref() else {
            if let OpenPurpose::Connect(reply) = purpose {
                let _ = reply.send(Err(ClientError::NotConnected));
            }
            return;
        };
        let transport = Arc::clone(&self.transport);
        let url = session.url.clone();
        let limit = session.options.connection_timeout;
        info!(url = %url, ?purpose, "opening connection");
        self.opening = Some(Box::pin(async move {
            match tokio::time::timeout(limit, transport.open(&url)).await {
                Ok(result) => result,
                Err(_) => Err(ClientError::transport(io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("opening {url} timed out after {limit:?}"),
                ))),
            }
        }));
        self.purpose = Some(purpose);
        self.set_state(ConnectionState::Connecting);
    }

    pub(super) fn on_opened(&mut self, result: Result<Box<dyn Link>, ClientError>) {
        self.opening = None;
        let Some(purpose) = self.purpose.take() else {
            return;
        };
        match result {
            Ok(link) => {
                self.link = Some(link);
                if !matches!(purpose, OpenPurpose::Recover) {
                    self.ids.reset();
                }
                self.registry.clear();
                self.purpose = Some(purpose);
                self.start_handshake();
            }
            Err(error) => {
                warn!(%error, "failed to open connection");
                self.set_state(ConnectionState::Disconnected);
                self.open_failed(purpose, error);
            }
        }
    }

    fn open_failed(&mut self, purpose: OpenPurpose, error: ClientError) {
        match purpose {
            OpenPurpose::Connect(reply) => {
                let _ = reply.send(Err(error));
            }
            OpenPurpose::Retry => {
                self.hooks.emit_error(error);
                self.schedule_retry();
            }
            OpenPurpose::Recover => self.recovery_failed(&error),
        }
    }

    /// Ask the node for the id of every requested API.
    fn start_handshake(&mut self) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        let apis = session.options.apis.clone();
        let limit = session.options.connection_timeout;
        self.set_state(ConnectionState::Handshaking);
        self.awaiting_handshake = apis.len();
        if apis.is_empty() {
            self.handshake_complete();
            return;
        }
        for api in apis {
            self.dispatch(
                Request::call(META_API_ID, api.as_str(), Vec::new()),
                limit,
                Responder::Handshake(api),
            );
        }
    }

    /// Record one handshake reply.
    ///
    /// `null` means the node does not grant the API; any other non-integer
    /// result, or an error reply, aborts the connection attempt.
    pub(super) fn on_handshake_reply(&mut self, api: ApiName, outcome: Result<Value, ClientError>) {
        if self.state != ConnectionState::Handshaking {
            return;
        }
        let id = match outcome {
            Ok(Value::Null) => {
                warn!(api = %api, "api not granted by node");
                None
            }
            Ok(value) => {
                if let Some(id) = value.as_u64().and_then(|id| u32::try_from(id).ok()) {
                    Some(id)
                } else {
                    self.abort_handshake(ClientError::HandshakeRejected {
                        api,
                        detail: format!("expected an integer api id, got {value}"),
                    });
                    return;
                }
            }
            Err(ClientError::Remote(detail)) => {
                self.abort_handshake(ClientError::HandshakeRejected {
                    api,
                    detail: detail.to_string(),
                });
                return;
            }
            Err(error) => {
                self.abort_handshake(error);
                return;
            }
        };
        debug!(api = %api, id = ?id, "api registered");
        self.registry.register(api, id);
        self.awaiting_handshake = self.awaiting_handshake.saturating_sub(1);
        if self.awaiting_handshake == 0 {
            self.handshake_complete();
        }
    }

    fn abort_handshake(&mut self, error: ClientError) {
        warn!(%error, "handshake failed; closing transport");
        self.awaiting_handshake = 0;
        self.release_link(true);
        self.reject_pending(&ClientError::ConnectionClosed);
        self.registry.clear();
        self.set_state(ConnectionState::Disconnected);
        if let Some(purpose) = self.purpose.take() {
            self.open_failed(purpose, error);
        }
    }

    fn handshake_complete(&mut self) {
        let Some(ping_delay) = self.session.as_ref().map(|s| s.options.ping_delay) else {
            return;
        };
        let purpose = self.purpose.take();
        if matches!(purpose, Some(OpenPurpose::Recover)) {
            self.recovering = false;
        }
        self.set_state(ConnectionState::Open);
        self.keepalive.arm(ping_delay);
        match purpose {
            Some(OpenPurpose::Connect(reply)) => {
                info!("connection open");
                self.retry.reset();
                self.hooks.emit_open();
                let _ = reply.send(Ok(()));
            }
            Some(OpenPurpose::Retry) => {
                info!(attempts = self.retry.attempts(), "reconnected");
                self.retry.reset();
                self.hooks.emit_open();
            }
            Some(OpenPurpose::Recover) => self.replay(),
            None => {}
        }
    }

    /// Handle the end of the current link.
    pub(super) fn on_closed(&mut self, info: CloseInfo) {
        self.release_link(false);
        let closing = self.closing.take();
        match self.state {
            ConnectionState::Handshaking => self.abort_handshake(ClientError::ConnectionClosed),
            ConnectionState::Open if closing.is_none() && info.is_abnormal() => {
                self.start_recovery(&info);
            }
            _ => self.finish_close(info, closing),
        }
    }

    pub(super) fn on_close_deadline(&mut self) {
        warn!("node did not complete the close handshake in time");
        self.on_closed(CloseInfo::new(NORMAL_CLOSURE, "close handshake timed out"));
    }

    fn finish_close(&mut self, info: CloseInfo, closing: Option<Closing>) {
        let requested = closing.is_some();
        self.set_state(ConnectionState::Disconnected);
        self.reject_pending(&ClientError::ConnectionClosed);
        self.registry.clear();
        info!(%info, requested, "connection closed");
        self.hooks.emit_close(info);
        match closing {
            Some(Closing { reply, reopen, .. }) => {
                if let Some(reply) = reply {
                    let _ = reply.send(Ok(()));
                }
                if let Some(reply) = reopen {
                    self.retry.reset();
                    self.begin_open(OpenPurpose::Connect(reply));
                }
            }
            None => self.schedule_retry(),
        }
    }

    /// Park pending work and silently reopen.
    fn start_recovery(&mut self, info: &CloseInfo) {
        warn!(%info, pending = self.calls.len(), "abnormal closure; recovering");
        metrics::inc_recoveries();
        self.recovering = true;
        self.timers.clear();
        for (_, call) in self.calls.drain() {
            if call.responder.is_replayable() {
                self.backlog.push(Parked {
                    request: call.request,
                    responder: call.responder,
                    timeout: call.timeout,
                });
            }
        }
        metrics::set_pending_calls(0);
        self.resubscribe = self.subscribers.drain_armed();
        self.begin_open(OpenPurpose::Recover);
    }

    /// Re-arm subscriptions and resend parked calls under fresh ids.
    fn replay(&mut self) {
        let resubscribe = mem::take(&mut self.resubscribe);
        let backlog = mem::take(&mut self.backlog);
        info!(
            calls = backlog.len(),
            subscriptions = resubscribe.len(),
            "connection recovered; replaying"
        );
        let limit = self.default_timeout();
        for request in resubscribe {
            self.dispatch(request, limit, Responder::Rearm);
        }
        for Parked {
            request,
            responder,
            timeout,
        } in backlog
        {
            self.dispatch(request, timeout, responder);
        }
    }

    /// Recovery could not reopen: fall back to an unrequested normal close.
    fn recovery_failed(&mut self, error: &ClientError) {
        warn!(%error, "recovery failed");
        self.recovering = false;
        self.reject_backlog(&ClientError::ConnectionClosed);
        self.registry.clear();
        self.set_state(ConnectionState::Disconnected);
        self.hooks.emit_close(CloseInfo::abnormal(error.to_string()));
        self.schedule_retry();
    }

    fn schedule_retry(&mut self) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        let max_retries = session.options.max_retries;
        let delay = session.options.connection_timeout;
        if self.retry.can_retry(max_retries) {
            info!(
                attempt = self.retry.attempts() + 1,
                max_retries,
                ?delay,
                "scheduling reconnect"
            );
            self.retry.schedule(delay);
        } else {
            let error = ClientError::RetriesExhausted {
                attempts: self.retry.attempts(),
            };
            error!(%error, "not reconnecting");
            self.hooks.emit_error(error);
        }
    }

    pub(super) fn on_retry_due(&mut self) {
        let attempt = self.retry.begin_attempt();
        metrics::inc_retry_attempts();
        info!(attempt, "reconnect attempt");
        self.begin_open(OpenPurpose::Retry);
    }

    /// Detach the current link. A graceful release sends a close frame on
    /// the next flush.
    pub(super) fn release_link(&mut self, graceful: bool) {
        self.outbox.clear();
        self.keepalive.disarm();
        if let Some(link) = self.link.take() {
            if graceful {
                self.retired.push(link);
            }
        }
    }
}
