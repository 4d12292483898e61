//! Priority aggregation
//!
//! A thread's effective priority is the most urgent of its base priority and
//! every contribution held for it by a resource: the most urgent waiter of a
//! priority-inheritance mutex it owns, the ceiling of a ceiling or MrsP mutex
//! it owns or is acquiring. Contributions are kept sorted so the effective
//! priority, and the resource driving it, are read from the front.

use alloc::vec::Vec;

use crate::scheduler::Priority;
use crate::sync::ObjectId;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Contribution {
    pub source: ObjectId,
    pub priority: Priority,
}

#[derive(Clone, Debug)]
pub struct PriorityAggregation {
    base: Priority,
    /// Most urgent first; equal priorities in insertion order.
    contributions: Vec<Contribution>,
}

impl PriorityAggregation {
    /// `capacity` bounds the number of resources a thread can be tied to at
    /// once, so updates never allocate.
    pub fn new(base: Priority, capacity: usize) -> Self {
        Self {
            base,
            contributions: Vec::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn base(&self) -> Priority {
        self.base
    }

    /// Replace the base priority, returning the old one. Contributions stay.
    pub fn set_base(&mut self, base: Priority) -> Priority {
        core::mem::replace(&mut self.base, base)
    }

    #[inline]
    pub fn effective(&self) -> Priority {
        match self.contributions.first() {
            Some(front) => front.priority.min(self.base),
            None => self.base,
        }
    }

    /// Resource whose contribution currently determines the effective
    /// priority, if any is more urgent than the base.
    pub fn driving(&self) -> Option<ObjectId> {
        self.contributions
            .first()
            .filter(|front| front.priority < self.base)
            .map(|front| front.source)
    }

    pub fn get(&self, source: ObjectId) -> Option<Priority> {
        self.contributions
            .iter()
            .find(|entry| entry.source == source)
            .map(|entry| entry.priority)
    }

    /// Insert or move the contribution of `source`.
    pub fn set(&mut self, source: ObjectId, priority: Priority) {
        if self.get(source) == Some(priority) {
            return;
        }
        self.remove(source);
        let position = self
            .contributions
            .iter()
            .position(|entry| entry.priority > priority)
            .unwrap_or(self.contributions.len());
        self.contributions
            .insert(position, Contribution { source, priority });
    }

    pub fn remove(&mut self, source: ObjectId) -> Option<Priority> {
        let position = self
            .contributions
            .iter()
            .position(|entry| entry.source == source)?;
        Some(self.contributions.remove(position).priority)
    }

    pub fn is_boosted(&self) -> bool {
        self.effective() < self.base
    }

    pub fn len(&self) -> usize {
        self.contributions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contributions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Contribution> {
        self.contributions.iter()
    }
}
