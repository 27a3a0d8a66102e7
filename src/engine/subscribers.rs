//! Table of notice subscribers.

use std::collections::HashMap;

use crate::{
    error::ProtocolError,
    request::{NoticeHandler, Request},
};

#[derive(Debug)]
struct Subscriber {
    request: Request,
    armed: bool,
}

/// Subscribers keyed by the id of the call that registered them.
///
/// A subscriber is created unarmed when its subscribing call is written and
/// armed by that call's first successful reply. Notices for unarmed
/// subscribers are protocol violations.
#[derive(Debug, Default)]
pub(crate) struct SubscriberTable {
    entries: HashMap<u64, Subscriber>,
}

impl SubscriberTable {
    pub(crate) fn insert(&mut self, id: u64, request: Request) {
        debug_assert!(request.is_subscription());
        self.entries.insert(id, Subscriber {
            request,
            armed: false,
        });
    }

    /// Arm the subscriber registered by call `id`, if any.
    pub(crate) fn arm(&mut self, id: u64) {
        if let Some(entry) = self.entries.get_mut(&id) {
            entry.armed = true;
        }
    }

    pub(crate) fn remove(&mut self, id: u64) { self.entries.remove(&id); }

    pub(crate) fn contains(&self, id: u64) -> bool { self.entries.contains_key(&id) }

    pub(crate) fn clear(&mut self) { self.entries.clear(); }

    /// Handler for a notice addressed to `id`.
    ///
    /// # Errors
    ///
    /// Fails when no subscriber has that id or it is not yet armed.
    pub(crate) fn handler(&self, id: u64) -> Result<NoticeHandler, ProtocolError> {
        let entry = self
            .entries
            .get(&id)
            .ok_or(ProtocolError::UnknownSubscriber(id))?;
        if !entry.armed {
            return Err(ProtocolError::UnarmedSubscriber(id));
        }
        entry
            .request
            .handler()
            .cloned()
            .ok_or(ProtocolError::UnknownSubscriber(id))
    }

    /// Remove every subscriber and return the armed ones' requests, oldest
    /// first.
    pub(crate) fn drain_armed(&mut self) -> Vec<Request> {
        let mut armed: Vec<_> = self
            .entries
            .drain()
            .filter(|(_, entry)| entry.armed)
            .collect();
        armed.sort_unstable_by_key(|(id, _)| *id);
        armed.into_iter().map(|(_, entry)| entry.request).collect()
    }
}
