//! Ordered state-change listeners.
//!
//! Listeners run synchronously, in registration order, with no lock held, so
//! a listener may subscribe, unsubscribe (itself or others) or call back into
//! the supervisor while being notified.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tracing::trace;

use crate::state::ProcessState;

type Listener = Arc<dyn Fn(ProcessState) + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: AtomicU64,
    entries: Mutex<Vec<(u64, Listener)>>,
}

impl Registry {
    fn entries(&self) -> MutexGuard<'_, Vec<(u64, Listener)>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn contains(&self, id: u64) -> bool {
        self.entries().iter().any(|(entry_id, _)| *entry_id == id)
    }

    fn remove(&self, id: u64) -> bool {
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|(entry_id, _)| *entry_id != id);
        entries.len() != before
    }
}

/// Ordered list of state-change listeners.
#[derive(Clone, Default)]
pub struct StateSubscribers {
    registry: Arc<Registry>,
}

impl StateSubscribers {
    /// Create an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener` after every existing one.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(ProcessState) + Send + Sync + 'static,
    {
        let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed);
        self.registry.entries().push((id, Arc::new(listener)));
        Subscription {
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Deliver `state` to every listener in registration order.
    ///
    /// Iterates a snapshot; a listener removed during delivery is skipped
    /// if it has not been reached yet. Listeners added during delivery first
    /// hear the next notification.
    pub fn notify(&self, state: ProcessState) {
        let snapshot: Vec<(u64, Listener)> = self.registry.entries().clone();
        trace!(%state, listeners = snapshot.len(), "Notifying state listeners");

        for (id, listener) in snapshot {
            if self.registry.contains(id) {
                listener(state);
            }
        }
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.registry.entries().len()
    }

    /// Whether no listener is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for StateSubscribers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateSubscribers")
            .field("len", &self.len())
            .finish()
    }
}

/// Token returned by [`StateSubscribers::subscribe`].
///
/// Dropping the token does not unsubscribe; call [`Subscription::unsubscribe`].
#[derive(Debug, Clone)]
#[must_use = "keep the subscription to be able to unsubscribe"]
pub struct Subscription {
    id: u64,
    registry: Weak<Registry>,
}

impl Subscription {
    /// Remove the listener. Idempotent; safe to call from inside any listener.
    ///
    /// Returns `true` if the listener was still registered.
    pub fn unsubscribe(&self) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|registry| registry.remove(self.id))
    }

    /// Whether the listener is still registered.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|registry| registry.contains(self.id))
    }
}
