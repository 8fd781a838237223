//! Copy-on-write notification listener registry (spec §5: "Listener
//! registries are copy-on-write: adding/removing a listener takes a
//! snapshot lock; notification iterates the snapshot").
//!
//! Registration/unregistration can happen from an I/O thread accepting
//! or dropping a connection while the engine thread is mid-notify;
//! readers always iterate a fixed `Arc<Vec<_>>` snapshot taken before
//! the pass started, so a connection that joins mid-notify simply
//! isn't in that pass.

use crate::protocol::Packet;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::Arc;
use uuid::Uuid;

pub type Listener = Arc<dyn Fn(&Packet) + Send + Sync>;

#[derive(Default)]
pub struct ListenerRegistry {
    listeners: DashMap<Uuid, Listener>,
    snapshot: RwLock<Arc<Vec<Listener>>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, listener: Listener) -> Uuid {
        let id = Uuid::new_v4();
        self.listeners.insert(id, listener);
        self.refresh_snapshot();
        id
    }

    pub fn unregister(&self, id: Uuid) {
        self.listeners.remove(&id);
        self.refresh_snapshot();
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    fn refresh_snapshot(&self) {
        let snap: Vec<Listener> = self.listeners.iter().map(|e| e.value().clone()).collect();
        *self.snapshot.write() = Arc::new(snap);
    }

    /// Notify every listener present in the snapshot at the moment
    /// this call started.
    pub fn notify(&self, packet: &Packet) {
        let snapshot = self.snapshot.read().clone();
        tracing::trace!(listeners = snapshot.len(), "notifying listeners");
        for listener in snapshot.iter() {
            listener(packet);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn sample() -> Packet {
        Packet::Notification { source: "engine".into(), level: "info".into(), message: "tick".into() }
    }

    #[test]
    fn registered_listeners_are_notified() {
        let registry = ListenerRegistry::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        registry.register(Arc::new(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        }));
        registry.notify(&sample());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unregistered_listener_stops_receiving() {
        let registry = ListenerRegistry::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        let id = registry.register(Arc::new(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        }));
        registry.unregister(id);
        registry.notify(&sample());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn listener_registered_mid_notify_is_not_seen_until_next_pass() {
        let registry = Arc::new(ListenerRegistry::new());
        let late_calls = Arc::new(AtomicUsize::new(0));

        let r = registry.clone();
        let lc = late_calls.clone();
        registry.register(Arc::new(move |_| {
            let lc = lc.clone();
            r.register(Arc::new(move |_| {
                lc.fetch_add(1, Ordering::SeqCst);
            }));
        }));

        registry.notify(&sample());
        assert_eq!(late_calls.load(Ordering::SeqCst), 0);
        assert_eq!(registry.len(), 2);

        registry.notify(&sample());
        assert_eq!(late_calls.load(Ordering::SeqCst), 1);
    }
}
