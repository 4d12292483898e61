//! Scheduler instance state and heir selection
//!
//! A [`SchedulerContext`] is one scheduling domain: the ready queues, the node
//! arena and one [`ProcessorSlot`] per owned processor. With one processor the
//! selection rule is the classic one: the head of the most urgent queue
//! replaces the executing thread only if it is strictly more urgent, or the
//! executing thread yielded, blocked or was forced off. With `k` processors
//! the executing threads keep their processors unless `k` ready threads are
//! strictly more urgent.
//!
//! A thread is heir on at most one processor system-wide. Selection skips
//! nodes whose thread is already placed on a processor of another instance;
//! the kernel repeats selection over all instances until nothing changes.

use alloc::string::String;
use alloc::vec::Vec;

use crate::error::{fatal, InternalError};
use crate::sync::ObjectId;

use super::node::{NodeArena, NodeRole, SchedulerNode};
use super::ready::ReadyQueues;
use super::types::{
    Placement, Priority, ProcessorId, ProcessorMask, SchedulerId, ThreadId, MAX_PROCESSORS,
};

/// Where each thread is currently heir. Implemented by the thread table.
pub trait Placements {
    fn placed_on(&self, thread: ThreadId) -> Option<ProcessorId>;
    fn set_placed(&mut self, thread: ThreadId, cpu: Option<ProcessorId>);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProcessorSlot {
    pub cpu: ProcessorId,
    pub executing: Option<ThreadId>,
    pub heir: Option<ThreadId>,
    pub dispatch_necessary: bool,
    /// The executing thread yielded or was forced off; it does not win ties.
    pub reselect: bool,
}

impl ProcessorSlot {
    const fn new(cpu: ProcessorId) -> Self {
        Self {
            cpu,
            executing: None,
            heir: None,
            dispatch_necessary: false,
            reselect: false,
        }
    }
}

pub struct SchedulerContext {
    id: SchedulerId,
    name: String,
    processors: ProcessorMask,
    ready: ReadyQueues,
    nodes: NodeArena,
    slots: Vec<ProcessorSlot>,
}

impl SchedulerContext {
    pub fn new(
        id: SchedulerId,
        name: String,
        processors: ProcessorMask,
        max_priority: Priority,
        thread_slots: usize,
    ) -> Self {
        Self {
            id,
            name,
            processors,
            ready: ReadyQueues::new(max_priority),
            nodes: NodeArena::new(thread_slots, max_priority),
            slots: processors.iter().map(ProcessorSlot::new).collect(),
        }
    }

    #[inline]
    pub fn id(&self) -> SchedulerId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn processors(&self) -> ProcessorMask {
        self.processors
    }

    pub fn slots(&self) -> &[ProcessorSlot] {
        &self.slots
    }

    pub fn slot(&self, cpu: ProcessorId) -> Option<&ProcessorSlot> {
        self.slots.iter().find(|slot| slot.cpu == cpu)
    }

    fn slot_mut(&mut self, cpu: ProcessorId) -> Option<&mut ProcessorSlot> {
        self.slots.iter_mut().find(|slot| slot.cpu == cpu)
    }

    #[inline]
    pub fn ready(&self) -> &ReadyQueues {
        &self.ready
    }

    #[inline]
    pub fn node(&self, id: ThreadId) -> &SchedulerNode {
        self.nodes.get(id)
    }

    pub fn nodes(&self) -> &NodeArena {
        &self.nodes
    }

    // ========================================================================
    // Ready-queue operations
    // ========================================================================

    pub fn enqueue(&mut self, id: ThreadId) {
        self.ready.enqueue(&mut self.nodes, id);
    }

    pub fn enqueue_first(&mut self, id: ThreadId) {
        self.ready.enqueue_first(&mut self.nodes, id);
    }

    pub fn extract(&mut self, id: ThreadId) {
        self.ready.extract(&mut self.nodes, id);
    }

    /// Ready nodes in selection order.
    pub fn ready_threads(&self) -> impl Iterator<Item = ThreadId> + '_ {
        self.ready.iter(&self.nodes)
    }

    // ========================================================================
    // Node lifecycle
    // ========================================================================

    /// Bind the slot of `id` as its home node.
    pub fn attach_home(&mut self, id: ThreadId, priority: Priority) {
        let node = self.nodes.get_mut(id);
        if node.in_use() {
            fatal(InternalError::ThreadStateCorrupted { thread: id.0 });
        }
        node.role = NodeRole::Home;
        node.priority = priority;
    }

    /// Bind the slot of `id` as a node borrowed on behalf of `object`.
    pub fn attach_borrowed(&mut self, id: ThreadId, object: ObjectId, priority: Priority) {
        let node = self.nodes.get_mut(id);
        if node.in_use() {
            fatal(InternalError::ThreadStateCorrupted { thread: id.0 });
        }
        node.role = NodeRole::Borrowed(object);
        node.priority = priority;
    }

    /// Release the slot of `id`, extracting it first if it is ready.
    pub fn detach(&mut self, id: ThreadId) {
        if self.nodes.get(id).ready {
            self.extract(id);
        }
        let node = self.nodes.get_mut(id);
        node.role = NodeRole::Unused;
    }

    /// Move a node to `priority`. A ready node changes queues; `placement`
    /// picks the end of the new queue it lands on.
    pub fn set_node_priority(&mut self, id: ThreadId, priority: Priority, placement: Placement) {
        let node = self.nodes.get(id);
        if node.priority == priority {
            return;
        }
        if !node.ready {
            self.nodes.get_mut(id).priority = priority;
            return;
        }

        self.extract(id);
        self.nodes.get_mut(id).priority = priority;
        match placement {
            Placement::Tail => self.enqueue(id),
            Placement::Head => self.enqueue_first(id),
        }
    }

    pub fn retag_borrowed(&mut self, id: ThreadId, object: ObjectId) {
        let node = self.nodes.get_mut(id);
        if let NodeRole::Borrowed(_) = node.role {
            node.role = NodeRole::Borrowed(object);
        }
    }

    // ========================================================================
    // Dispatch decision
    // ========================================================================

    /// Let the executing thread on `cpu` lose ties at the next selection.
    pub fn request_reselect(&mut self, cpu: ProcessorId) {
        if let Some(slot) = self.slot_mut(cpu) {
            slot.reselect = true;
        }
    }

    /// Choose the heir of every processor of this instance. Returns `true` if
    /// any heir changed.
    pub fn select_heirs(&mut self, placements: &mut dyn Placements) -> bool {
        let wanted = self.slots.len();
        let mut chosen: [Option<ThreadId>; MAX_PROCESSORS] = [None; MAX_PROCESSORS];
        let mut count = 0;

        let slots = &self.slots;
        let is_incumbent = |thread: ThreadId| {
            slots
                .iter()
                .any(|slot| slot.heir == Some(thread) && !slot.reselect)
        };

        'levels: for priority in self.ready.bitmap().iter() {
            let queue = self.ready.queue(priority);
            if queue.is_empty() {
                fatal(InternalError::BitmapQueueMismatch { priority });
            }
            // Incumbents first: ties never preempt.
            for incumbents in [true, false] {
                for thread in queue.iter(&self.nodes) {
                    if count == wanted {
                        break 'levels;
                    }
                    if is_incumbent(thread) != incumbents {
                        continue;
                    }
                    if let Some(cpu) = placements.placed_on(thread) {
                        if !self.processors.contains(cpu) {
                            continue;
                        }
                    }
                    chosen[count] = Some(thread);
                    count += 1;
                }
            }
        }

        let chosen = &chosen[..count];
        let mut assigned = [false; MAX_PROCESSORS];
        let mut keep = [false; MAX_PROCESSORS];
        for (index, slot) in self.slots.iter().enumerate() {
            let Some(heir) = slot.heir else { continue };
            if let Some(position) = chosen.iter().position(|c| *c == Some(heir)) {
                assigned[position] = true;
                keep[index] = true;
            }
        }

        let mut changed = false;
        let mut next = 0;
        for (index, slot) in self.slots.iter_mut().enumerate() {
            slot.reselect = false;
            if keep[index] {
                continue;
            }
            while next < count && assigned[next] {
                next += 1;
            }
            let Some(new_heir) = chosen.get(next).copied().flatten() else {
                fatal(InternalError::NoHeir {
                    processor: slot.cpu.0,
                });
            };
            assigned[next] = true;

            if let Some(old) = slot.heir {
                if placements.placed_on(old) == Some(slot.cpu) {
                    placements.set_placed(old, None);
                }
            }
            placements.set_placed(new_heir, Some(slot.cpu));
            slot.heir = Some(new_heir);
            slot.dispatch_necessary = slot.executing != slot.heir;
            changed = true;
        }

        changed
    }

    /// Complete a pending switch on `cpu`: returns `(previous, heir)`.
    pub fn take_dispatch(&mut self, cpu: ProcessorId) -> Option<(Option<ThreadId>, ThreadId)> {
        let slot = self.slot_mut(cpu)?;
        if !slot.dispatch_necessary {
            return None;
        }
        slot.dispatch_necessary = false;
        let heir = slot.heir?;
        let previous = slot.executing.replace(heir);
        Some((previous, heir))
    }
}
