//! Snapshot subscribers.
//!
//! Engines hand snapshots over in two steps. [`Listeners::enqueue`] runs while
//! the engine state is locked, which fixes the delivery order to the mutation
//! order. [`Listeners::flush`] runs after the engine lock is released and calls
//! the listeners, so a listener may read from or act on the engine that
//! notified it.

use crate::lock;
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, Weak};

type Listener<S> = Arc<dyn Fn(&S) + Send + Sync>;

struct ListenerSet<S> {
    next_id: u64,
    entries: Vec<(u64, Listener<S>)>,
}

struct Outbox<S> {
    queue: VecDeque<S>,
    flushing: bool,
}

/// Registry of callbacks that receive every published snapshot.
pub(crate) struct Listeners<S> {
    inner: Arc<Mutex<ListenerSet<S>>>,
    outbox: Mutex<Outbox<S>>,
}

/// Clears the `flushing` flag even if a listener panics.
struct FlushGuard<'a, S> {
    outbox: &'a Mutex<Outbox<S>>,
}

impl<S> Drop for FlushGuard<'_, S> {
    fn drop(&mut self) {
        lock(self.outbox).flushing = false;
    }
}

impl<S: 'static> Listeners<S> {
    pub(crate) fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(ListenerSet {
                next_id: 0,
                entries: Vec::new(),
            })),
            outbox: Mutex::new(Outbox {
                queue: VecDeque::new(),
                flushing: false,
            }),
        }
    }

    pub(crate) fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&S) + Send + Sync + 'static,
    {
        let id = {
            let mut set = lock(&self.inner);
            let id = set.next_id;
            set.next_id += 1;
            set.entries.push((id, Arc::new(listener)));
            id
        };

        let registry: Weak<Mutex<ListenerSet<S>>> = Arc::downgrade(&self.inner);
        Subscription {
            unsubscribe: Some(Box::new(move || {
                if let Some(registry) = registry.upgrade() {
                    lock(&registry).entries.retain(|(entry, _)| *entry != id);
                }
            })),
        }
    }

    /// Queues `snapshot` for the next [`Listeners::flush`].
    pub(crate) fn enqueue(&self, snapshot: S) {
        lock(&self.outbox).queue.push_back(snapshot);
    }

    /// Delivers queued snapshots in the order they were queued.
    ///
    /// Only one caller delivers at a time. A flush that finds another one in
    /// progress returns at once and leaves its snapshots to that caller, which
    /// also covers a listener whose callback queues more snapshots. No lock is
    /// held while a listener runs.
    pub(crate) fn flush(&self) {
        {
            let mut outbox = lock(&self.outbox);
            if outbox.flushing {
                return;
            }
            outbox.flushing = true;
        }
        let _guard = FlushGuard {
            outbox: &self.outbox,
        };

        loop {
            let Some(snapshot) = lock(&self.outbox).queue.pop_front() else {
                break;
            };
            let listeners: Vec<Listener<S>> = lock(&self.inner)
                .entries
                .iter()
                .map(|(_, listener)| Arc::clone(listener))
                .collect();
            for listener in listeners {
                listener(&snapshot);
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        lock(&self.inner).entries.len()
    }
}

/// Handle returned by `subscribe`.
///
/// Dropping the handle keeps the listener registered; call
/// [`Subscription::unsubscribe`] to remove it.
pub struct Subscription {
    unsubscribe: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn unsubscribe(mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notify_and_unsubscribe() {
        let listeners: Listeners<u32> = Listeners::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&seen);
        let subscription = listeners.subscribe(move |value| sink.lock().unwrap().push(*value));
        listeners.enqueue(1);
        listeners.flush();
        subscription.unsubscribe();
        listeners.enqueue(2);
        listeners.flush();

        assert_eq!(*seen.lock().unwrap(), vec![1]);
        assert_eq!(listeners.len(), 0);
    }

    #[test]
    fn test_flush_keeps_queue_order() {
        let listeners: Listeners<u32> = Listeners::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _subscription = listeners.subscribe(move |value| sink.lock().unwrap().push(*value));

        listeners.enqueue(1);
        listeners.enqueue(2);
        listeners.enqueue(3);
        listeners.flush();
        listeners.flush();

        assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_snapshot_queued_by_listener_is_delivered_after_it() {
        let listeners: Arc<Listeners<u32>> = Arc::new(Listeners::new());
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&seen);
        let registry = Arc::downgrade(&listeners);
        let _subscription = listeners.subscribe(move |value| {
            sink.lock().unwrap().push(*value);
            if *value == 1 {
                if let Some(registry) = registry.upgrade() {
                    registry.enqueue(2);
                    registry.flush();
                    sink.lock().unwrap().push(10);
                }
            }
        });

        listeners.enqueue(1);
        listeners.flush();

        assert_eq!(*seen.lock().unwrap(), vec![1, 10, 2]);
    }

    #[test]
    fn test_unsubscribe_after_registry_dropped() {
        let listeners: Listeners<u32> = Listeners::new();
        let subscription = listeners.subscribe(|_| {});
        drop(listeners);
        subscription.unsubscribe();
    }
}
