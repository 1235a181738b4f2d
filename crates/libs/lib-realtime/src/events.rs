//! # Listener Registry
//!
//! Listeners are registered per event name with set semantics: the same
//! `Arc` registered twice is stored once, and `off` removes it by pointer.
//! Dispatch snapshots the set and calls each listener outside the lock, so
//! listeners may subscribe, unsubscribe or emit from inside a callback.
//! A panicking listener is logged and skipped.

use lib_core::PendingMessage;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::error;

use crate::manager::ConnectionState;

/// What listeners receive.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    /// `connectionStateChanged`
    StateChanged(ConnectionState),
    /// Any event name received from, or reported by, the transport.
    Remote { event: String, data: Value },
    /// `pendingMessageDropped`
    PendingDropped(PendingMessage),
}

pub type Listener = Arc<dyn Fn(&ChatEvent) + Send + Sync>;

/// Wrap a closure as a [`Listener`]. Keep the returned `Arc` to unsubscribe.
pub fn listener<F>(f: F) -> Listener
where
    F: Fn(&ChatEvent) + Send + Sync + 'static,
{
    Arc::new(f)
}

#[derive(Default)]
pub struct ListenerRegistry {
    listeners: RwLock<HashMap<String, Vec<Listener>>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` when this listener was already registered for `event`.
    pub fn on(&self, event: &str, listener: Listener) -> bool {
        let mut listeners = self.listeners.write();
        let set = listeners.entry(event.to_string()).or_default();
        if set.iter().any(|l| Arc::ptr_eq(l, &listener)) {
            return false;
        }
        set.push(listener);
        true
    }

    /// Returns `false` when the listener was not registered for `event`.
    pub fn off(&self, event: &str, listener: &Listener) -> bool {
        let mut listeners = self.listeners.write();
        let Some(set) = listeners.get_mut(event) else {
            return false;
        };

        let before = set.len();
        set.retain(|l| !Arc::ptr_eq(l, listener));
        let removed = set.len() != before;

        if set.is_empty() {
            listeners.remove(event);
        }
        removed
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners.read().get(event).map_or(0, Vec::len)
    }

    /// Call every listener of `event`. Returns how many ran to completion.
    pub fn dispatch(&self, event: &str, payload: &ChatEvent) -> usize {
        let snapshot: Vec<Listener> = match self.listeners.read().get(event) {
            Some(set) => set.clone(),
            None => return 0,
        };

        let mut delivered = 0;
        for listener in snapshot {
            match catch_unwind(AssertUnwindSafe(|| listener(payload))) {
                Ok(()) => delivered += 1,
                Err(_) => error!(event, "Listener panicked, continuing with the rest"),
            }
        }
        delivered
    }

    pub fn clear(&self) {
        self.listeners.write().clear();
    }
}
