//! Synchronization objects
//!
//! One tagged object type covers counting and simple binary semaphores,
//! recursive mutexes without protocol, with priority inheritance, with
//! priority ceiling, and MrsP mutexes. The variant is resolved from the
//! creation attributes once and never changes.
//!
//! - `attr`: attribute set and the resolution table
//! - `object`: object handles, per-variant state, the object table
//! - `waitq`: FIFO and priority wait queues

mod attr;
mod object;
mod waitq;

pub use attr::{resolve, AttributeSet, Discipline, Resolved, Variant};
pub use object::{MutexState, ObjectId, ObjectKind, ObjectTable, SyncObject};
pub use waitq::{WaitOrder, WaitQueue};

/// How long an acquire may block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaitPolicy {
    /// Fail with `Unsatisfied` instead of blocking.
    NoWait,
    Forever,
    /// Block for at most this many clock ticks. Zero waits forever.
    Ticks(u32),
}

impl WaitPolicy {
    #[inline]
    pub fn may_block(self) -> bool {
        self != WaitPolicy::NoWait
    }

    /// Tick at which a wait started at `now` times out.
    pub fn deadline(self, now: u64) -> Option<u64> {
        match self {
            WaitPolicy::Ticks(ticks) if ticks > 0 => Some(now + u64::from(ticks)),
            _ => None,
        }
    }
}
