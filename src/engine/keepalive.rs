//! Idle-connection keepalive.
//!
//! Every frame sent or received pushes the deadline back by the ping delay.
//! When it passes, the engine issues a cheap `login` call on the meta API; a
//! failed probe means the socket is dead and is treated as an abnormal
//! closure.

use std::{pin::Pin, time::Duration};

use serde_json::Value;
use tokio::time::{Instant, Sleep, sleep};
use tracing::{debug, trace, warn};

use super::{Engine, calls::Responder, state::ConnectionState};
use crate::{
    api::META_API_ID,
    error::ClientError,
    request::Request,
    transport::CloseInfo,
};

/// Method used to probe the node.
pub(super) const PROBE_METHOD: &str = "login";

/// Build the probe request.
pub(super) fn probe() -> Request {
    Request::call(
        META_API_ID,
        PROBE_METHOD,
        vec![Value::from(""), Value::from("")],
    )
}

/// Idle deadline for the open connection.
pub(super) struct Keepalive {
    delay: Duration,
    deadline: Pin<Box<Sleep>>,
    armed: bool,
    in_flight: bool,
}

impl Keepalive {
    pub(super) fn new() -> Self {
        Self {
            delay: Duration::ZERO,
            deadline: Box::pin(sleep(Duration::ZERO)),
            armed: false,
            in_flight: false,
        }
    }

    /// Start watching for idleness with the given delay.
    pub(super) fn arm(&mut self, delay: Duration) {
        self.delay = delay;
        self.armed = true;
        self.in_flight = false;
        self.touch();
    }

    pub(super) fn disarm(&mut self) {
        self.armed = false;
        self.in_flight = false;
    }

    pub(super) fn is_armed(&self) -> bool { self.armed }

    /// Record traffic on the connection.
    pub(super) fn touch(&mut self) {
        if self.armed {
            self.deadline.as_mut().reset(Instant::now() + self.delay);
        }
    }

    /// Mark a probe as outstanding. Returns `false` if one already is.
    pub(super) fn start_probe(&mut self) -> bool { !std::mem::replace(&mut self.in_flight, true) }

    pub(super) fn finish_probe(&mut self) { self.in_flight = false; }

    /// Wait for the idle deadline.
    pub(super) async fn idle(&mut self) { self.deadline.as_mut().await; }
}

impl Engine {
    pub(super) fn on_idle(&mut self) {
        self.keepalive.touch();
        if self.state != ConnectionState::Open || !self.keepalive.start_probe() {
            return;
        }
        let Some(limit) = self.session.as_ref().map(|s| s.options.ping_timeout) else {
            return;
        };
        debug!(?limit, "connection idle; probing node");
        self.dispatch(probe(), limit, Responder::Keepalive);
    }

    /// Any answer proves the socket is alive, including an error reply.
    pub(super) fn on_probe_reply(&mut self, outcome: Result<Value, ClientError>) {
        self.keepalive.finish_probe();
        match outcome {
            Ok(_) | Err(ClientError::Remote(_)) => trace!("keepalive answered"),
            Err(error) => {
                if self.state != ConnectionState::Open {
                    return;
                }
                warn!(%error, "keepalive failed; dropping connection");
                self.release_link(false);
                self.on_closed(CloseInfo::abnormal("keepalive failed"));
            }
        }
    }
}
