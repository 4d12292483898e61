//! Clock tick, sleeps and timed waits

use alloc::vec::Vec;
use core::sync::atomic::Ordering;

use crate::error::{fatal, InternalError, KernelResult};
use crate::port::RemoteRequest;
use crate::scheduler::{Placement, ProcessorId, ThreadId};
use crate::sync::{ObjectId, Variant};
use crate::thread::{ThreadState, WaitResult};

use super::{Guard, Kernel};

impl Kernel {
    /// Advance the clock by one tick and expire every sleep and timed wait
    /// whose deadline has passed.
    pub fn clock_tick(&self) {
        let now = self.ticks.fetch_add(1, Ordering::AcqRel) + 1;
        crate::logger::set_uptime_ticks(now);

        let mut guard = self.lock();
        for (index, owner) in self.owners.iter().enumerate() {
            let cpu = ProcessorId(index as u16);
            let executing = guard
                .scheduler(*owner)
                .slot(cpu)
                .and_then(|slot| slot.executing);
            if executing.map_or(false, |thread| guard.threads.control(thread).idle) {
                self.stats[index].record_idle_tick();
            }
        }

        let mut extractions = Vec::new();
        for index in 0..guard.threads.capacity() {
            let thread = ThreadId(index as u16);
            let Ok(control) = guard.threads.get(thread) else {
                continue;
            };
            if !control.wait.deadline.map_or(false, |deadline| deadline <= now) {
                continue;
            }
            if let Some(extraction) = guard.expire(thread) {
                extractions.push(extraction);
            }
        }
        guard.finish(None);

        if let Some(transport) = &self.transport {
            for (id, thread) in extractions {
                transport.send(id.node(), RemoteRequest::Extract { id, thread });
            }
        }
    }

    /// Block the thread executing on `cpu` for `ticks` clock ticks. Zero
    /// ticks yields instead.
    pub fn wake_after(&self, cpu: ProcessorId, ticks: u32) -> KernelResult<()> {
        if ticks == 0 {
            return self.yield_processor(cpu);
        }

        let mut guard = self.lock();
        let caller = guard.caller(cpu)?;
        let deadline = self.ticks() + u64::from(ticks);
        guard.make_unready(caller);
        let control = guard.threads.control_mut(caller);
        control.state = ThreadState::BlockedOnTime;
        control.begin_wait(None, false, Some(deadline));
        crate::ktrace!("{} sleeps until tick {}", caller, deadline);
        guard.finish(Some(cpu));
        Ok(())
    }
}

impl Guard<'_> {
    /// End the wait of `thread` on timeout. Returns the extraction request
    /// owed to another node for a remote wait.
    fn expire(&mut self, thread: ThreadId) -> Option<(ObjectId, ThreadId)> {
        let control = self.threads.control(thread);
        match (control.state, control.wait.object, control.wait.remote) {
            (ThreadState::BlockedOnTime, _, _) => {
                self.wake(thread, WaitResult::Ok);
                None
            }
            (ThreadState::BlockedOnObject, Some(id), true) => {
                self.wake(thread, WaitResult::Timeout);
                Some((id, thread))
            }
            (ThreadState::BlockedOnObject, Some(id), false) => {
                self.cancel_wait(thread, id, WaitResult::Timeout);
                None
            }
            _ => None,
        }
    }

    /// Take `thread` out of the wait queue of `id` and undo whatever its
    /// waiting did to the owner.
    pub(super) fn cancel_wait(&mut self, thread: ThreadId, id: ObjectId, result: WaitResult) {
        let (variant, owner) = match self.objects.get_mut(id) {
            Ok(object) => {
                object.waiters.extract(&mut *self.threads, thread);
                (object.variant(), object.owner())
            }
            Err(_) => fatal(InternalError::ThreadStateCorrupted { thread: thread.0 }),
        };
        self.wake(thread, result);

        match variant {
            Variant::MutexInherit => self.refresh_inheritance(id, Placement::Head),
            Variant::Mrsp => {
                self.lower(thread, id);
                if let Some(owner) = owner {
                    self.refresh_borrowed(owner);
                }
            }
            _ => {}
        }
        crate::ktrace!("{}: wait of {} cancelled ({:?})", id, thread, result);
    }
}
