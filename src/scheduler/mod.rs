//! Scheduler subsystem
//!
//! Fixed-priority preemptive scheduling with FIFO order inside a priority
//! level. Lower priority value = more urgent.
//!
//! ## Scheduler instances
//!
//! Each [`SchedulerContext`] owns a disjoint set of processors, its own ready
//! queues and one node slot per thread. A thread's home node lives on its
//! home instance; MrsP may additionally place borrowed nodes of a resource
//! owner on the instances of its waiters.
//!
//! ## Lock Hierarchy
//!
//! To avoid deadlocks, locks must be acquired in this order:
//! 1. Object table (every directive that touches a synchronization object)
//! 2. Thread table
//! 3. One scheduler instance at a time, never two nested
//! 4. `ProcessorStats` atomics
//!
//! ## Module Organization
//!
//! - `types`: identifiers, priorities, processor masks
//! - `bitmap`: two-level priority bitmap
//! - `chain`: index-linked doubly linked chains
//! - `ready`: ready-queue array kept in sync with the bitmap
//! - `node`: scheduler nodes and the per-instance node arena
//! - `context`: scheduler instance state and heir selection
//! - `stats`: per-processor statistics

mod bitmap;
mod chain;
mod context;
mod node;
mod ready;
mod stats;
mod types;

pub use bitmap::PriorityBitmap;
pub use chain::{Chain, Link, LinkStore};
pub use context::{Placements, ProcessorSlot, SchedulerContext};
pub use node::{NodeArena, NodeRole, SchedulerNode};
pub use ready::ReadyQueues;
pub use stats::{ProcessorStats, ProcessorStatsSnapshot};
pub use types::{
    Placement, Priority, ProcessorId, ProcessorMask, SchedulerId, ThreadId, MAX_PROCESSORS,
    PRIORITY_HIGHEST, PRIORITY_LEVELS_MAX,
};
