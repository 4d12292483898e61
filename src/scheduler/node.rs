//! Scheduler nodes
//!
//! Every scheduler instance owns one node slot per thread slot. The slot on a
//! thread's home instance is its home node. Slots on other instances form the
//! fixed per-thread pool that MrsP borrows while the thread owns a resource
//! that threads of that instance are waiting for.

use crate::sync::ObjectId;

use super::chain::{Link, LinkStore};
use super::types::{Priority, ThreadId};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeRole {
    /// Slot not in use on this instance.
    Unused,
    /// The thread's home node.
    Home,
    /// Borrowed on behalf of the MrsP object whose waiter lives here.
    Borrowed(ObjectId),
}

#[derive(Clone, Copy, Debug)]
pub struct SchedulerNode {
    pub owner: ThreadId,
    pub role: NodeRole,
    /// Effective priority of the thread on this instance.
    pub priority: Priority,
    /// Set while the node sits in a ready queue.
    pub ready: bool,
    pub link: Link,
}

impl SchedulerNode {
    pub const fn unused(owner: ThreadId, priority: Priority) -> Self {
        Self {
            owner,
            role: NodeRole::Unused,
            priority,
            ready: false,
            link: Link::new(),
        }
    }

    #[inline]
    pub fn is_home(&self) -> bool {
        self.role == NodeRole::Home
    }

    #[inline]
    pub fn in_use(&self) -> bool {
        self.role != NodeRole::Unused
    }
}

/// Node arena of one scheduler instance, indexed by thread id.
pub struct NodeArena {
    nodes: alloc::vec::Vec<SchedulerNode>,
}

impl NodeArena {
    pub fn new(slots: usize, idle_priority: Priority) -> Self {
        let nodes = (0..slots)
            .map(|index| SchedulerNode::unused(ThreadId(index as u16), idle_priority))
            .collect();
        Self { nodes }
    }

    #[inline]
    pub fn get(&self, id: ThreadId) -> &SchedulerNode {
        &self.nodes[id.index()]
    }

    #[inline]
    pub fn get_mut(&mut self, id: ThreadId) -> &mut SchedulerNode {
        &mut self.nodes[id.index()]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SchedulerNode> {
        self.nodes.iter().filter(|node| node.in_use())
    }
}

impl LinkStore for NodeArena {
    #[inline]
    fn link(&self, id: ThreadId) -> &Link {
        &self.nodes[id.index()].link
    }

    #[inline]
    fn link_mut(&mut self, id: ThreadId) -> &mut Link {
        &mut self.nodes[id.index()].link
    }
}
