use super::models::Identity;
use crate::core::Subscription;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Callback invoked with the current identity on every session change.
pub type SessionListener = Arc<dyn Fn(Option<&Identity>) + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    current: Option<Identity>,
    listeners: BTreeMap<u64, SessionListener>,
}

/// Current identity plus the listeners waiting on it.
///
/// Listeners are called outside the lock, so a callback may register or
/// release other listeners.
#[derive(Clone, Default)]
pub(crate) struct SessionListeners {
    inner: Arc<Mutex<Registry>>,
}

impl SessionListeners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<Identity> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .current
            .clone()
    }

    /// Registers `listener` and immediately calls it with the current identity.
    pub fn subscribe(&self, listener: SessionListener) -> Subscription {
        let (id, current) = {
            let mut registry = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            let id = registry.next_id;
            registry.next_id += 1;
            registry.listeners.insert(id, listener.clone());
            (id, registry.current.clone())
        };

        listener(current.as_ref());

        let registry = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(registry) = registry.upgrade() {
                registry
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .listeners
                    .remove(&id);
            }
        })
    }

    /// Replaces the current identity and notifies every listener.
    pub fn publish(&self, identity: Option<Identity>) {
        let listeners: Vec<SessionListener> = {
            let mut registry = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            registry.current = identity.clone();
            registry.listeners.values().cloned().collect()
        };

        for listener in listeners {
            listener(identity.as_ref());
        }
    }

    /// Publishes `None` if someone was signed in. Returns whether anything changed.
    pub fn clear(&self) -> bool {
        if self.current().is_none() {
            return false;
        }
        self.publish(None);
        true
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .listeners
            .len()
    }
}
