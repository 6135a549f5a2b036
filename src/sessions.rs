//! Session Tracking
//!
//! Holds the current authenticated session and notifies subscribers on
//! every transition. Listeners run synchronously inside `set`; reloading
//! the mirror in response happens elsewhere, as a reaction.

use std::sync::{Arc, Mutex, Weak};

use crate::domain::Session;

type Listener = Arc<dyn Fn(Option<&Session>) + Send + Sync>;

struct HubInner {
    current: Option<Session>,
    listeners: Vec<(u64, Listener)>,
    next_id: u64,
}

/// Shared session state with change notification
pub struct SessionHub {
    inner: Mutex<HubInner>,
}

impl SessionHub {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(HubInner {
                current: None,
                listeners: Vec::new(),
                next_id: 0,
            }),
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HubInner> {
        self.inner.lock().expect("session hub lock poisoned")
    }

    /// The currently active session, if any
    pub fn current(&self) -> Option<Session> {
        self.lock().current.clone()
    }

    /// Record a session transition and fire all listeners synchronously.
    ///
    /// Setting the same session again is not a transition and fires
    /// nothing.
    pub fn set(&self, next: Option<Session>) {
        let to_fire: Vec<Listener> = {
            let mut inner = self.lock();
            if inner.current == next {
                return;
            }
            inner.current = next.clone();
            inner.listeners.iter().map(|(_, l)| Arc::clone(l)).collect()
        };
        match &next {
            Some(session) => log::info!("session transition: user {}", session.user_id),
            None => log::info!("session transition: signed out"),
        }
        // Listeners run outside the lock so they may read the hub
        for listener in to_fire {
            listener(next.as_ref());
        }
    }

    /// Register `listener` for future transitions; dropping the returned
    /// subscription (or calling `unsubscribe`) removes it
    pub fn subscribe(
        self: &Arc<Self>,
        listener: impl Fn(Option<&Session>) + Send + Sync + 'static,
    ) -> Subscription {
        let id = {
            let mut inner = self.lock();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.listeners.push((id, Arc::new(listener)));
            id
        };
        Subscription {
            hub: Arc::downgrade(self),
            id,
        }
    }

    fn remove_listener(&self, id: u64) {
        self.lock().listeners.retain(|(lid, _)| *lid != id);
    }
}

/// Handle to a registered session listener
pub struct Subscription {
    hub: Weak<SessionHub>,
    id: u64,
}

impl Subscription {
    /// Stop receiving transitions
    pub fn unsubscribe(self) {
        // Drop impl does the removal
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.remove_listener(self.id);
        }
    }
}
