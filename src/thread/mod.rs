//! Thread control blocks
//!
//! The scheduler only sees threads through their scheduler nodes; this table
//! holds the rest: lifecycle state, home instance, priority aggregation, the
//! wait-queue link and the record of an ongoing wait.

mod priority;

use alloc::string::String;
use alloc::vec::Vec;

use crate::error::{fatal, InternalError, KernelError, KernelResult};
use crate::scheduler::{
    Link, LinkStore, Placements, Priority, ProcessorId, ProcessorMask, SchedulerId, ThreadId,
};
use crate::sync::{ObjectId, WaitOrder};

pub use priority::{Contribution, PriorityAggregation};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThreadState {
    /// Created, not started.
    Dormant,
    Ready,
    Executing,
    BlockedOnObject,
    BlockedOnTime,
    Suspended,
    /// Exited; the slot is freed by `delete_thread`.
    Zombie,
}

impl ThreadState {
    /// Ready and executing threads have their nodes in ready queues.
    #[inline]
    pub fn is_ready(self) -> bool {
        matches!(self, ThreadState::Ready | ThreadState::Executing)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ThreadState::Dormant => "dormant",
            ThreadState::Ready => "ready",
            ThreadState::Executing => "executing",
            ThreadState::BlockedOnObject => "blocked-on-object",
            ThreadState::BlockedOnTime => "blocked-on-time",
            ThreadState::Suspended => "suspended",
            ThreadState::Zombie => "zombie",
        }
    }
}

/// Final status of a blocking operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaitResult {
    /// Still blocked.
    Pending,
    /// Resource obtained, or sleep completed.
    Ok,
    Timeout,
    /// Object deleted while waiting.
    Deleted,
    /// Wait flushed.
    Unsatisfied,
    /// Remote node reported another error.
    Failed(KernelError),
}

impl WaitResult {
    pub fn into_result(self) -> KernelResult<()> {
        match self {
            WaitResult::Ok => Ok(()),
            WaitResult::Pending => Err(KernelError::IncorrectState),
            WaitResult::Timeout => Err(KernelError::Timeout),
            WaitResult::Deleted => Err(KernelError::Deleted),
            WaitResult::Unsatisfied => Err(KernelError::Unsatisfied),
            WaitResult::Failed(error) => Err(error),
        }
    }
}

impl From<KernelResult<()>> for WaitResult {
    fn from(result: KernelResult<()>) -> Self {
        match result {
            Ok(()) => WaitResult::Ok,
            Err(KernelError::Timeout) => WaitResult::Timeout,
            Err(KernelError::Deleted) => WaitResult::Deleted,
            Err(KernelError::Unsatisfied) => WaitResult::Unsatisfied,
            Err(error) => WaitResult::Failed(error),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct WaitInfo {
    pub object: Option<ObjectId>,
    /// Waiting for a response from another node.
    pub remote: bool,
    /// Tick at which the wait times out.
    pub deadline: Option<u64>,
    pub result: WaitResult,
}

impl WaitInfo {
    const fn idle() -> Self {
        Self {
            object: None,
            remote: false,
            deadline: None,
            result: WaitResult::Ok,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ThreadControl {
    pub id: ThreadId,
    pub name: String,
    pub state: ThreadState,
    pub home: SchedulerId,
    pub affinity: ProcessorMask,
    pub priority: PriorityAggregation,
    pub wait: WaitInfo,
    /// Processor this thread is heir on.
    pub cpu: Option<ProcessorId>,
    /// Mutexes currently owned.
    pub owned: u32,
    pub idle: bool,
}

impl ThreadControl {
    pub fn new(
        id: ThreadId,
        name: &str,
        home: SchedulerId,
        affinity: ProcessorMask,
        priority: Priority,
        contribution_capacity: usize,
    ) -> Self {
        Self {
            id,
            name: String::from(name),
            state: ThreadState::Dormant,
            home,
            affinity,
            priority: PriorityAggregation::new(priority, contribution_capacity),
            wait: WaitInfo::idle(),
            cpu: None,
            owned: 0,
            idle: false,
        }
    }

    #[inline]
    pub fn effective_priority(&self) -> Priority {
        self.priority.effective()
    }

    pub fn begin_wait(&mut self, object: Option<ObjectId>, remote: bool, deadline: Option<u64>) {
        self.wait = WaitInfo {
            object,
            remote,
            deadline,
            result: WaitResult::Pending,
        };
    }

    pub fn end_wait(&mut self, result: WaitResult) {
        self.wait = WaitInfo {
            result,
            ..WaitInfo::idle()
        };
    }
}

pub struct ThreadTable {
    slots: Vec<Option<ThreadControl>>,
    /// Wait-queue links, parallel to `slots`.
    wait_links: Vec<Link>,
}

impl ThreadTable {
    pub fn new(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        let mut wait_links = Vec::with_capacity(capacity);
        wait_links.resize(capacity, Link::new());
        Self { slots, wait_links }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Claim the first free slot.
    pub fn allocate(
        &mut self,
        build: impl FnOnce(ThreadId) -> ThreadControl,
    ) -> KernelResult<ThreadId> {
        let index = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(KernelError::TooMany)?;
        let id = ThreadId(index as u16);
        self.slots[index] = Some(build(id));
        self.wait_links[index] = Link::new();
        Ok(id)
    }

    pub fn free(&mut self, id: ThreadId) -> KernelResult<ThreadControl> {
        self.slots
            .get_mut(id.index())
            .and_then(Option::take)
            .ok_or(KernelError::InvalidId)
    }

    pub fn get(&self, id: ThreadId) -> KernelResult<&ThreadControl> {
        self.slots
            .get(id.index())
            .and_then(Option::as_ref)
            .ok_or(KernelError::InvalidId)
    }

    pub fn get_mut(&mut self, id: ThreadId) -> KernelResult<&mut ThreadControl> {
        self.slots
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or(KernelError::InvalidId)
    }

    /// Lookup of a thread the kernel already holds a reference to.
    pub fn control(&self, id: ThreadId) -> &ThreadControl {
        match self.slots.get(id.index()).and_then(Option::as_ref) {
            Some(control) => control,
            None => fatal(InternalError::ThreadStateCorrupted { thread: id.0 }),
        }
    }

    pub fn control_mut(&mut self, id: ThreadId) -> &mut ThreadControl {
        match self.slots.get_mut(id.index()).and_then(Option::as_mut) {
            Some(control) => control,
            None => fatal(InternalError::ThreadStateCorrupted { thread: id.0 }),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &ThreadControl> {
        self.slots.iter().flatten()
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LinkStore for ThreadTable {
    #[inline]
    fn link(&self, id: ThreadId) -> &Link {
        &self.wait_links[id.index()]
    }

    #[inline]
    fn link_mut(&mut self, id: ThreadId) -> &mut Link {
        &mut self.wait_links[id.index()]
    }
}

impl WaitOrder for ThreadTable {
    #[inline]
    fn wait_priority(&self, id: ThreadId) -> Priority {
        self.control(id).effective_priority()
    }
}

impl Placements for ThreadTable {
    fn placed_on(&self, thread: ThreadId) -> Option<ProcessorId> {
        self.slots
            .get(thread.index())
            .and_then(Option::as_ref)
            .and_then(|control| control.cpu)
    }

    fn set_placed(&mut self, thread: ThreadId, cpu: Option<ProcessorId>) {
        if let Some(control) = self.slots.get_mut(thread.index()).and_then(Option::as_mut) {
            control.cpu = cpu;
        }
    }
}
