//! Registry of connection-state listeners.

use std::sync::{
    Arc, Mutex, PoisonError,
    atomic::{AtomicU64, Ordering},
};

use crate::ConnectionState;

/// Callback invoked with every new state.
pub type Listener = Arc<dyn Fn(ConnectionState) + Send + Sync>;

/// Handle returned by registration, used to remove the listener again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Ordered set of listeners.
///
/// Notification runs on a snapshot taken outside the lock, so a listener may
/// add or remove listeners (itself included) without deadlocking; such
/// changes apply from the next notification on.
#[derive(Default)]
pub(crate) struct ListenerRegistry {
    next_id: AtomicU64,
    listeners: Mutex<Vec<(ListenerId, Listener)>>,
}

impl ListenerRegistry {
    pub(crate) fn add(&self, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().push((id, listener));
        id
    }

    /// Returns whether the listener was registered.
    pub(crate) fn remove(&self, id: ListenerId) -> bool {
        let mut listeners = self.lock();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    pub(crate) fn clear(&self) {
        self.lock().clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    pub(crate) fn notify(&self, state: ConnectionState) {
        let snapshot: Vec<Listener> = self
            .lock()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in snapshot {
            listener(state);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(ListenerId, Listener)>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    #[test]
    fn listeners_run_in_registration_order() {
        let registry = ListenerRegistry::default();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for tag in 0..3 {
            let seen = Arc::clone(&seen);
            registry.add(Arc::new(move |_| seen.lock().unwrap().push(tag)));
        }

        registry.notify(ConnectionState::Connecting);
        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn removed_listener_is_not_called() {
        let registry = ListenerRegistry::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let id = registry.add(Arc::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        assert!(registry.remove(id));
        assert!(!registry.remove(id));
        registry.notify(ConnectionState::Connected);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn listener_may_register_during_notification() {
        let registry = Arc::new(ListenerRegistry::default());
        let inner = Arc::clone(&registry);
        registry.add(Arc::new(move |_| {
            inner.add(Arc::new(|_| {}));
        }));

        registry.notify(ConnectionState::Connecting);
        assert_eq!(registry.len(), 2);
    }
}
