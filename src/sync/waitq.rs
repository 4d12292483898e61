//! Object wait queues
//!
//! Blocked threads are chained through their wait links in the thread table.
//! FIFO queues append; priority queues insert behind every waiter of equal or
//! more urgent priority, so equal priorities stay in arrival order.

use crate::scheduler::{Chain, LinkStore, Priority, ThreadId};

use super::attr::Discipline;

/// Link storage that also knows each waiter's current priority.
pub trait WaitOrder: LinkStore {
    fn wait_priority(&self, id: ThreadId) -> Priority;
}

#[derive(Clone, Copy, Debug)]
pub struct WaitQueue {
    discipline: Discipline,
    chain: Chain,
}

impl WaitQueue {
    pub const fn new(discipline: Discipline) -> Self {
        Self {
            discipline,
            chain: Chain::new(),
        }
    }

    #[inline]
    pub fn discipline(&self) -> Discipline {
        self.discipline
    }

    pub fn enqueue<S: WaitOrder + ?Sized>(&mut self, store: &mut S, id: ThreadId) {
        match self.discipline {
            Discipline::Fifo => self.chain.push_back(store, id),
            Discipline::Priority => {
                let priority = store.wait_priority(id);
                let mut after = None;
                for waiter in self.chain.iter(store) {
                    if store.wait_priority(waiter) > priority {
                        break;
                    }
                    after = Some(waiter);
                }
                self.chain.insert_after(store, after, id);
            }
        }
    }

    pub fn extract<S: WaitOrder + ?Sized>(&mut self, store: &mut S, id: ThreadId) {
        self.chain.remove(store, id);
    }

    /// Remove and return the head waiter.
    pub fn dequeue<S: WaitOrder + ?Sized>(&mut self, store: &mut S) -> Option<ThreadId> {
        self.chain.pop_front(store)
    }

    /// Re-sort a waiter whose priority changed. It goes behind its new
    /// equals.
    pub fn requeue<S: WaitOrder + ?Sized>(&mut self, store: &mut S, id: ThreadId) {
        if self.discipline == Discipline::Priority {
            self.chain.remove(store, id);
            self.enqueue(store, id);
        }
    }

    #[inline]
    pub fn first(&self) -> Option<ThreadId> {
        self.chain.first()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.chain.len()
    }

    /// Most urgent waiter priority.
    pub fn most_urgent<S: WaitOrder + ?Sized>(&self, store: &S) -> Option<Priority> {
        match self.discipline {
            Discipline::Priority => self.first().map(|id| store.wait_priority(id)),
            Discipline::Fifo => self.iter(store).map(|id| store.wait_priority(id)).min(),
        }
    }

    pub fn iter<'a, S: WaitOrder + ?Sized>(
        &self,
        store: &'a S,
    ) -> impl Iterator<Item = ThreadId> + 'a {
        self.chain.iter(store)
    }
}
