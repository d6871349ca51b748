use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, PoisonError, RwLock};

use log::error;

use crate::event::{Event, Listener, ListenerId};

/// Listeners for one event type, called in registration order.
pub struct ListenerSet<E: Event> {
    listeners: RwLock<Vec<(ListenerId, Listener<E>)>>,
}

impl<E: Event> Default for ListenerSet<E> {
    fn default() -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
        }
    }
}

impl<E: Event> fmt::Debug for ListenerSet<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerSet")
            .field("listeners", &self.len())
            .finish()
    }
}

impl<E: Event> ListenerSet<E> {
    pub fn add(&self, id: ListenerId, listener: Listener<E>) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, listener));
    }

    pub fn remove(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write().unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        listeners.len() != before
    }

    /// Calls every listener with `event`.
    ///
    /// The list is snapshotted first, so listeners may register or remove
    /// listeners. A failing or panicking listener is logged and skipped.
    pub fn fire(&self, event: &E) {
        let snapshot: Vec<(ListenerId, Listener<E>)> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(id, listener)| (*id, Arc::clone(listener)))
            .collect();

        for (id, listener) in snapshot {
            match panic::catch_unwind(AssertUnwindSafe(|| listener(event))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!("Listener {} failed while handling {}: {}", id, event.name(), e),
                Err(_) => error!("Listener {} panicked while handling {}", id, event.name()),
            }
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
