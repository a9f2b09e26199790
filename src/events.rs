//! In-process publish/subscribe bus used to push events to GraphQL
//! subscriptions.
//!
//! Every call to [`EventBus::subscribe`] registers a new, independent
//! listener. A published payload is cloned into each listener that is
//! registered on that topic at the time of publishing. There is no buffering
//! for listeners that do not exist yet and no replay: a listener only ever
//! sees events published while it was registered.

use std::{
    collections::HashMap,
    pin::Pin,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    task::{self, Poll},
};

use futures::Stream;
use tokio::sync::mpsc;

use crate::prelude::*;


/// A named channel on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Topic {
    BookCreated,
}

type ListenerId = u64;

struct Registry<T> {
    next_id: ListenerId,
    listeners: HashMap<Topic, Vec<(ListenerId, mpsc::UnboundedSender<T>)>>,
}

pub(crate) struct EventBus<T> {
    registry: Arc<Mutex<Registry<T>>>,
}

impl<T: Clone + Send + 'static> EventBus<T> {
    pub(crate) fn new() -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry {
                next_id: 0,
                listeners: HashMap::new(),
            })),
        }
    }

    /// Delivers `payload` to all listeners currently registered on `topic`
    /// and returns how many were reached. Never blocks.
    pub(crate) fn publish(&self, topic: Topic, payload: T) -> usize {
        let mut registry = lock(&self.registry);
        let Some(listeners) = registry.listeners.get_mut(&topic) else {
            trace!(?topic, "Published event without any listeners");
            return 0;
        };

        // A failed send means the receiving half is gone without having
        // deregistered yet. We just drop those.
        listeners.retain(|(_, tx)| tx.send(payload.clone()).is_ok());
        let delivered = listeners.len();
        trace!(?topic, delivered, "Published event");
        delivered
    }

    /// Registers a new listener on `topic`. The listener is registered right
    /// away, not on first poll, and is deregistered when dropped.
    pub(crate) fn subscribe(&self, topic: Topic) -> Listener<T> {
        let (tx, rx) = mpsc::unbounded_channel();

        let mut registry = lock(&self.registry);
        let id = registry.next_id;
        registry.next_id += 1;
        registry.listeners.entry(topic).or_default().push((id, tx));
        debug!(?topic, listener = id, "Registered event listener");

        Listener {
            id,
            topic,
            rx,
            registry: Arc::clone(&self.registry),
        }
    }

    /// Number of listeners currently registered on `topic`.
    pub(crate) fn listener_count(&self, topic: Topic) -> usize {
        lock(&self.registry).listeners.get(&topic).map_or(0, Vec::len)
    }
}

impl<T> Clone for EventBus<T> {
    fn clone(&self) -> Self {
        Self { registry: Arc::clone(&self.registry) }
    }
}

/// The registry only contains plain collections, so a panic while holding
/// the lock cannot leave it in a state that is unsafe to continue with.
fn lock<T>(registry: &Mutex<Registry<T>>) -> MutexGuard<'_, Registry<T>> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}


/// A single registration on the bus, yielding payloads in publish order.
///
/// The stream only ends if the bus itself is gone. Dropping it removes the
/// registration.
pub(crate) struct Listener<T> {
    id: ListenerId,
    topic: Topic,
    rx: mpsc::UnboundedReceiver<T>,
    registry: Arc<Mutex<Registry<T>>>,
}

impl<T> Stream for Listener<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut task::Context<'_>) -> Poll<Option<T>> {
        self.rx.poll_recv(cx)
    }
}

impl<T> Drop for Listener<T> {
    fn drop(&mut self) {
        let mut registry = lock(&self.registry);
        if let Some(listeners) = registry.listeners.get_mut(&self.topic) {
            listeners.retain(|(id, _)| *id != self.id);
            if listeners.is_empty() {
                registry.listeners.remove(&self.topic);
            }
        }
        debug!(topic = ?self.topic, listener = self.id, "Deregistered event listener");
    }
}
