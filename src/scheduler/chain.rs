//! Index-linked doubly linked chains
//!
//! Ready queues and wait queues both thread their members through links that
//! live in an arena indexed by [`ThreadId`]. A [`Chain`] only records head,
//! tail and length; the arena implementing [`LinkStore`] owns the links.
//! Insert, remove and splice are O(1).

use crate::error::{fatal, InternalError};

use super::types::ThreadId;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Link {
    pub prev: Option<ThreadId>,
    pub next: Option<ThreadId>,
    pub linked: bool,
}

impl Link {
    pub const fn new() -> Self {
        Self {
            prev: None,
            next: None,
            linked: false,
        }
    }
}

pub trait LinkStore {
    fn link(&self, id: ThreadId) -> &Link;
    fn link_mut(&mut self, id: ThreadId) -> &mut Link;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Chain {
    head: Option<ThreadId>,
    tail: Option<ThreadId>,
    len: u16,
}

impl Chain {
    pub const fn new() -> Self {
        Self {
            head: None,
            tail: None,
            len: 0,
        }
    }

    #[inline]
    pub fn first(&self) -> Option<ThreadId> {
        self.head
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len as usize
    }

    fn claim<S: LinkStore + ?Sized>(store: &mut S, id: ThreadId) {
        let link = store.link_mut(id);
        if link.linked {
            fatal(InternalError::AlreadyQueued { thread: id.0 });
        }
        link.linked = true;
    }

    pub fn push_back<S: LinkStore + ?Sized>(&mut self, store: &mut S, id: ThreadId) {
        self.insert_after(store, self.tail, id);
    }

    pub fn push_front<S: LinkStore + ?Sized>(&mut self, store: &mut S, id: ThreadId) {
        self.insert_after(store, None, id);
    }

    /// Insert `id` behind `after`, or at the head when `after` is `None`.
    pub fn insert_after<S: LinkStore + ?Sized>(
        &mut self,
        store: &mut S,
        after: Option<ThreadId>,
        id: ThreadId,
    ) {
        Self::claim(store, id);

        let next = match after {
            Some(prev) => store.link(prev).next,
            None => self.head,
        };

        {
            let link = store.link_mut(id);
            link.prev = after;
            link.next = next;
        }

        match after {
            Some(prev) => store.link_mut(prev).next = Some(id),
            None => self.head = Some(id),
        }
        match next {
            Some(next) => store.link_mut(next).prev = Some(id),
            None => self.tail = Some(id),
        }
        self.len += 1;
    }

    pub fn remove<S: LinkStore + ?Sized>(&mut self, store: &mut S, id: ThreadId) {
        let link = *store.link(id);
        if !link.linked || self.len == 0 {
            fatal(InternalError::NotInQueue { thread: id.0 });
        }

        match link.prev {
            Some(prev) => store.link_mut(prev).next = link.next,
            None => {
                if self.head != Some(id) {
                    fatal(InternalError::NotInQueue { thread: id.0 });
                }
                self.head = link.next;
            }
        }
        match link.next {
            Some(next) => store.link_mut(next).prev = link.prev,
            None => self.tail = link.prev,
        }

        *store.link_mut(id) = Link::new();
        self.len -= 1;
    }

    pub fn pop_front<S: LinkStore + ?Sized>(&mut self, store: &mut S) -> Option<ThreadId> {
        let head = self.head?;
        self.remove(store, head);
        Some(head)
    }

    #[inline]
    pub fn next<S: LinkStore + ?Sized>(&self, store: &S, id: ThreadId) -> Option<ThreadId> {
        store.link(id).next
    }

    pub fn iter<'a, S: LinkStore + ?Sized>(&self, store: &'a S) -> ChainIter<'a, S> {
        ChainIter {
            store,
            cursor: self.head,
        }
    }
}

pub struct ChainIter<'a, S: LinkStore + ?Sized> {
    store: &'a S,
    cursor: Option<ThreadId>,
}

impl<S: LinkStore + ?Sized> Iterator for ChainIter<'_, S> {
    type Item = ThreadId;

    fn next(&mut self) -> Option<ThreadId> {
        let current = self.cursor?;
        self.cursor = self.store.link(current).next;
        Some(current)
    }
}
