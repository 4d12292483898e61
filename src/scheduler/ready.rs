//! Ready-queue array
//!
//! One FIFO chain per priority level, backed by a [`PriorityBitmap`]. The
//! bitmap bit of a level is set exactly while its chain is non-empty.

use alloc::vec::Vec;

use crate::error::{fatal, InternalError};

use super::bitmap::PriorityBitmap;
use super::chain::Chain;
use super::node::NodeArena;
use super::types::{Priority, ThreadId};

pub struct ReadyQueues {
    bitmap: PriorityBitmap,
    queues: Vec<Chain>,
}

impl ReadyQueues {
    /// Queues for priorities `0..=max_priority`.
    pub fn new(max_priority: Priority) -> Self {
        let mut queues = Vec::with_capacity(max_priority as usize + 1);
        queues.resize(max_priority as usize + 1, Chain::new());
        Self {
            bitmap: PriorityBitmap::new(),
            queues,
        }
    }

    /// Append the node at the tail of the queue for its priority.
    pub fn enqueue(&mut self, nodes: &mut NodeArena, id: ThreadId) {
        let priority = self.admit(nodes, id);
        let queue = &mut self.queues[priority as usize];
        queue.push_back(nodes, id);
        self.bitmap.add(priority);
    }

    /// Prepend the node: it keeps its place in front of equal-priority
    /// threads that became ready while it was away.
    pub fn enqueue_first(&mut self, nodes: &mut NodeArena, id: ThreadId) {
        let priority = self.admit(nodes, id);
        let queue = &mut self.queues[priority as usize];
        queue.push_front(nodes, id);
        self.bitmap.add(priority);
    }

    fn admit(&self, nodes: &mut NodeArena, id: ThreadId) -> Priority {
        let node = nodes.get_mut(id);
        if node.ready {
            fatal(InternalError::AlreadyQueued { thread: id.0 });
        }
        if node.priority as usize >= self.queues.len() {
            fatal(InternalError::ThreadStateCorrupted { thread: id.0 });
        }
        node.ready = true;
        node.priority
    }

    pub fn extract(&mut self, nodes: &mut NodeArena, id: ThreadId) {
        let node = nodes.get_mut(id);
        if !node.ready {
            fatal(InternalError::NotInQueue { thread: id.0 });
        }
        node.ready = false;
        let priority = node.priority;

        let queue = &mut self.queues[priority as usize];
        queue.remove(nodes, id);
        if queue.is_empty() {
            self.bitmap.remove(priority);
        }
    }

    /// Most urgent ready priority. Fatal if nothing is ready.
    #[inline]
    pub fn highest(&self) -> Priority {
        self.bitmap.highest()
    }

    /// Head of the most urgent non-empty queue.
    pub fn first(&self) -> ThreadId {
        let priority = self.highest();
        match self.queues[priority as usize].first() {
            Some(id) => id,
            None => fatal(InternalError::BitmapQueueMismatch { priority }),
        }
    }

    #[inline]
    pub fn queue(&self, priority: Priority) -> &Chain {
        &self.queues[priority as usize]
    }

    #[inline]
    pub fn bitmap(&self) -> &PriorityBitmap {
        &self.bitmap
    }

    pub fn is_empty(&self) -> bool {
        self.bitmap.is_empty()
    }

    /// Every ready node, most urgent level first, FIFO inside a level.
    pub fn iter<'a>(&'a self, nodes: &'a NodeArena) -> impl Iterator<Item = ThreadId> + 'a {
        self.bitmap
            .iter()
            .flat_map(move |priority| self.queues[priority as usize].iter(nodes))
    }

    /// Bitmap bit `p` set exactly when queue `p` is non-empty.
    pub fn is_consistent(&self) -> bool {
        self.queues
            .iter()
            .enumerate()
            .all(|(priority, queue)| self.bitmap.contains(priority as Priority) != queue.is_empty())
    }
}
