//! Hooks into the board support package
//!
//! [`CpuPort`] performs what the core decides: the context switch on a
//! processor and the inter-processor interrupt that makes another processor
//! run its dispatcher. [`RemoteTransport`] carries requests for objects that
//! live on other nodes. Both are called with every kernel lock released.

use crate::scheduler::{ProcessorId, ThreadId};
use crate::sync::{ObjectId, WaitPolicy};

pub trait CpuPort: Send + Sync {
    /// Switch `cpu` from `from` (`None` at boot) to `to`.
    fn context_switch(&self, cpu: ProcessorId, from: Option<ThreadId>, to: ThreadId);

    /// Interrupt `cpu` so it picks up a new heir.
    fn send_ipi(&self, cpu: ProcessorId);
}

/// Port that does nothing, for hosted use where the caller inspects the
/// kernel state directly.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullPort;

impl CpuPort for NullPort {
    fn context_switch(&self, _cpu: ProcessorId, _from: Option<ThreadId>, _to: ThreadId) {}

    fn send_ipi(&self, _cpu: ProcessorId) {}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RemoteRequest {
    /// A global object was created here.
    Announce { id: ObjectId },
    /// A global object was deleted here.
    Withdraw { id: ObjectId },
    Acquire {
        id: ObjectId,
        thread: ThreadId,
        wait: WaitPolicy,
    },
    Release { id: ObjectId, thread: ThreadId },
    /// The local proxy of `thread` timed out; drop it from the remote queue.
    Extract { id: ObjectId, thread: ThreadId },
}

pub trait RemoteTransport: Send + Sync {
    fn send(&self, node: u8, request: RemoteRequest);

    fn broadcast(&self, request: RemoteRequest);
}
