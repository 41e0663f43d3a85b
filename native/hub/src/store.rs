use std::{
    cmp::Ordering,
    sync::atomic::{AtomicU64, Ordering as AtomicOrdering},
};

use tokio::sync::watch;
use tracing::{debug, trace};

/// Ordering kept by a [`Store`] after every update.
pub trait Sorted {
    fn order(&self, other: &Self) -> Ordering;
}

/// Issue number of a fetch. Responses are applied only in issue order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

impl Ticket {
    pub fn get(&self) -> u64 {
        self.0
    }
}

/// Published state of a [`Store`].
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<T> {
    /// Ticket of the last applied response, 0 before the first one
    pub revision: u64,
    pub items: Vec<T>,
}

impl<T> Default for Snapshot<T> {
    fn default() -> Self {
        Self { revision: 0, items: Vec::new() }
    }
}

impl<T> Snapshot<T> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }
}

/// Observable, sorted container for one polled resource.
///
/// [`Store::apply`] is the only way to mutate the contents. Subscribers are
/// notified only when the items actually change.
#[derive(Debug)]
pub struct Store<T> {
    name: &'static str,
    next_ticket: AtomicU64,
    watch_tx: watch::Sender<Snapshot<T>>,
}

impl<T> Store<T>
where
    T: Sorted + Clone + PartialEq,
{
    pub fn new(name: &'static str) -> Self {
        Self { name, next_ticket: AtomicU64::new(1), watch_tx: watch::Sender::new(Snapshot::default()) }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Reserve the ticket for a fetch that is about to be issued.
    pub fn begin(&self) -> Ticket {
        Ticket(self.next_ticket.fetch_add(1, AtomicOrdering::Relaxed))
    }

    /// Replace the contents with `items` unless a newer response was already
    /// applied. Returns whether the response was accepted.
    pub fn apply(&self, ticket: Ticket, mut items: Vec<T>) -> bool {
        items.sort_by(T::order);

        let mut accepted = false;
        self.watch_tx.send_if_modified(|snapshot| {
            if ticket.0 <= snapshot.revision {
                debug!(
                    store = self.name,
                    ticket = ticket.0,
                    revision = snapshot.revision,
                    "Dropping stale response"
                );
                return false;
            }
            accepted = true;
            snapshot.revision = ticket.0;

            if snapshot.items == items {
                trace!(store = self.name, "Contents unchanged, not notifying");
                return false;
            }
            debug!(store = self.name, count = items.len(), "Contents changed");
            snapshot.items = items;
            true
        });
        accepted
    }

    /// Create a receiver for content changes
    pub fn subscribe(&self) -> watch::Receiver<Snapshot<T>> {
        self.watch_tx.subscribe()
    }

    pub fn snapshot(&self) -> Snapshot<T> {
        self.watch_tx.borrow().clone()
    }

    /// Run `f` against the current snapshot without cloning it.
    pub fn read<R>(&self, f: impl FnOnce(&Snapshot<T>) -> R) -> R {
        f(&self.watch_tx.borrow())
    }
}
