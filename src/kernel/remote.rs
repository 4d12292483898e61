//! Objects on other nodes
//!
//! An id whose node is not ours is forwarded through the transport. The
//! caller blocks as a proxy waiter until the owning node answers through
//! [`Kernel::remote_response`]; a release is sent without waiting.

use crate::error::{KernelError, KernelResult};
use crate::port::RemoteRequest;
use crate::scheduler::{ProcessorId, ThreadId};
use crate::sync::{ObjectId, WaitPolicy};
use crate::thread::ThreadState;

use super::{AcquireOutcome, Kernel};

impl Kernel {
    pub(super) fn remote_acquire(
        &self,
        cpu: ProcessorId,
        id: ObjectId,
        wait: WaitPolicy,
    ) -> KernelResult<AcquireOutcome> {
        let transport = self.transport.as_ref().ok_or(KernelError::InvalidId)?;

        let mut guard = self.lock();
        let caller = guard.caller(cpu)?;
        let deadline = wait.deadline(self.ticks());
        guard.make_unready(caller);
        let control = guard.threads.control_mut(caller);
        control.state = ThreadState::BlockedOnObject;
        control.begin_wait(Some(id), true, deadline);
        crate::ktrace!("{} waits for remote {}", caller, id);
        guard.finish(Some(cpu));

        transport.send(
            id.node(),
            RemoteRequest::Acquire {
                id,
                thread: caller,
                wait,
            },
        );
        Ok(AcquireOutcome::Blocked)
    }

    pub(super) fn remote_release(&self, cpu: ProcessorId, id: ObjectId) -> KernelResult<()> {
        let transport = self.transport.as_ref().ok_or(KernelError::InvalidId)?;
        let caller = self.lock().executing(cpu)?;
        transport.send(id.node(), RemoteRequest::Release { id, thread: caller });
        Ok(())
    }

    /// Deliver the owning node's answer to a remote acquire of `thread`.
    pub fn remote_response(&self, thread: ThreadId, result: KernelResult<()>) -> KernelResult<()> {
        let mut guard = self.lock();
        let control = guard.threads.get(thread)?;
        if control.state != ThreadState::BlockedOnObject || !control.wait.remote {
            return Err(KernelError::IncorrectState);
        }
        guard.wake(thread, result.into());
        guard.finish(None);
        Ok(())
    }
}
