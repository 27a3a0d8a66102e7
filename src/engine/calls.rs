//! Table of calls awaiting a reply.

use std::{collections::HashMap, time::Duration};

use serde_json::Value;
use tokio::sync::oneshot;
use tokio_util::time::delay_queue;

use crate::{api::ApiName, error::ClientError, request::Request};

/// Where the outcome of a call is delivered.
#[derive(Debug)]
pub(crate) enum Responder {
    /// A caller awaiting the result.
    Caller(oneshot::Sender<Result<Value, ClientError>>),
    /// The handshake call for an API.
    Handshake(ApiName),
    /// An idle-connection keepalive probe.
    Keepalive,
    /// Re-registration of an armed subscription after recovery.
    Rearm,
}

impl Responder {
    /// Whether the call survives an abnormal closure and is replayed.
    ///
    /// Handshake and keepalive calls belong to the connection that issued
    /// them.
    pub(crate) fn is_replayable(&self) -> bool { matches!(self, Self::Caller(_) | Self::Rearm) }

    /// Deliver `error` if this responder has a caller waiting.
    pub(crate) fn reject(self, error: ClientError) {
        if let Self::Caller(reply) = self {
            let _ = reply.send(Err(error));
        }
    }
}

/// A call that has been written and awaits its reply.
#[derive(Debug)]
pub(crate) struct PendingCall {
    pub(crate) request: Request,
    pub(crate) responder: Responder,
    pub(crate) timeout: Duration,
    pub(crate) timer: delay_queue::Key,
}

/// Pending calls keyed by wire id.
#[derive(Debug, Default)]
pub(crate) struct CallTable {
    calls: HashMap<u64, PendingCall>,
}

impl CallTable {
    pub(crate) fn insert(&mut self, id: u64, call: PendingCall) {
        let previous = self.calls.insert(id, call);
        debug_assert!(previous.is_none(), "wire id {id} reused while pending");
    }

    pub(crate) fn remove(&mut self, id: u64) -> Option<PendingCall> { self.calls.remove(&id) }

    pub(crate) fn get_mut(&mut self, id: u64) -> Option<&mut PendingCall> { self.calls.get_mut(&id) }

    pub(crate) fn contains(&self, id: u64) -> bool { self.calls.contains_key(&id) }

    pub(crate) fn len(&self) -> usize { self.calls.len() }

    pub(crate) fn is_empty(&self) -> bool { self.calls.is_empty() }

    /// Remove every call, oldest first.
    pub(crate) fn drain(&mut self) -> Vec<(u64, PendingCall)> {
        let mut calls: Vec<_> = self.calls.drain().collect();
        calls.sort_unstable_by_key(|(id, _)| *id);
        calls
    }
}
