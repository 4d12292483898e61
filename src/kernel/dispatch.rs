//! Ready-set transitions and context switches

use alloc::vec::Vec;

use spin::MutexGuard;

use crate::error::{fatal, InternalError, KernelError, KernelResult};
use crate::scheduler::{
    Placement, ProcessorId, ProcessorMask, SchedulerContext, SchedulerId, ThreadId, MAX_PROCESSORS,
};
use crate::sync::{ObjectId, WaitPolicy};
use crate::thread::{ThreadControl, ThreadState, WaitResult};

use super::{Guard, Kernel};

type Switch = (ProcessorId, Option<ThreadId>, ThreadId);

impl<'k> Guard<'k> {
    #[inline]
    pub(super) fn scheduler(&self, id: SchedulerId) -> MutexGuard<'k, SchedulerContext> {
        self.kernel.schedulers[id.index()].lock()
    }

    /// Thread executing on `cpu`.
    pub(super) fn executing(&self, cpu: ProcessorId) -> KernelResult<ThreadId> {
        let owner = self
            .kernel
            .scheduler_of(cpu)
            .ok_or(KernelError::InvalidId)?;
        self.scheduler(owner)
            .slot(cpu)
            .and_then(|slot| slot.executing)
            .ok_or(KernelError::IncorrectState)
    }

    /// Thread executing on `cpu`, which must not be an idle thread.
    pub(super) fn caller(&self, cpu: ProcessorId) -> KernelResult<ThreadId> {
        let thread = self.executing(cpu)?;
        if self.threads.control(thread).idle {
            return Err(KernelError::IncorrectState);
        }
        Ok(thread)
    }

    /// Put every in-use node of `thread` into its ready queue. The home node
    /// goes to the `placement` end, borrowed nodes to the head.
    pub(super) fn make_ready(&mut self, thread: ThreadId, placement: Placement) {
        let home = self.threads.control(thread).home;
        for (index, scheduler) in self.kernel.schedulers.iter().enumerate() {
            let mut context = scheduler.lock();
            let node = context.node(thread);
            if !node.in_use() || node.ready {
                continue;
            }
            if index == home.index() && placement == Placement::Tail {
                context.enqueue(thread);
            } else {
                context.enqueue_first(thread);
            }
        }
    }

    /// Take every node of `thread` out of the ready queues.
    pub(super) fn make_unready(&mut self, thread: ThreadId) {
        for scheduler in &self.kernel.schedulers {
            let mut context = scheduler.lock();
            if context.node(thread).ready {
                context.extract(thread);
            }
        }
    }

    /// Block `thread` on the wait queue of a local object.
    pub(super) fn block_on(
        &mut self,
        thread: ThreadId,
        id: ObjectId,
        wait: WaitPolicy,
    ) -> KernelResult<()> {
        let deadline = wait.deadline(self.kernel.ticks());
        self.objects.get(id)?;

        self.make_unready(thread);
        let control = self.threads.control_mut(thread);
        control.state = ThreadState::BlockedOnObject;
        control.begin_wait(Some(id), false, deadline);

        let object = self.objects.get_mut(id)?;
        object.waiters.enqueue(&mut *self.threads, thread);
        crate::ktrace!("{} blocks on {}", thread, id);
        Ok(())
    }

    /// Make a thread that has already left its wait queue ready again.
    pub(super) fn wake(&mut self, thread: ThreadId, result: WaitResult) {
        let control = self.threads.control_mut(thread);
        control.end_wait(result);
        control.state = ThreadState::Ready;
        self.make_ready(thread, Placement::Tail);
        crate::ktrace!("{} wakes: {:?}", thread, result);
    }

    /// Run heir selection on every instance until no heir changes.
    fn select_all(&mut self) {
        let rounds = self.kernel.schedulers.len() * 2 + 1;
        for _ in 0..rounds {
            let mut changed = false;
            for scheduler in &self.kernel.schedulers {
                changed |= scheduler.lock().select_heirs(&mut *self.threads);
            }
            if !changed {
                return;
            }
        }
    }

    /// Complete the directive: select heirs, perform the switches, then drop
    /// every lock and notify the port. `caller` is the processor that issued
    /// the directive and needs no IPI.
    pub(super) fn finish(mut self, caller: Option<ProcessorId>) {
        self.select_all();

        let mut switches: [Option<Switch>; MAX_PROCESSORS] = [None; MAX_PROCESSORS];
        let mut count = 0;
        for (index, owner) in self.kernel.owners.iter().enumerate() {
            let cpu = ProcessorId(index as u16);
            if let Some((from, to)) = self.scheduler(*owner).take_dispatch(cpu) {
                switches[count] = Some((cpu, from, to));
                count += 1;
            }
        }

        for (cpu, from, _) in switches[..count].iter().flatten() {
            let Some(from) = from else { continue };
            let voluntary = {
                let control = self.threads.control_mut(*from);
                let preempted = control.state == ThreadState::Executing;
                if preempted && control.cpu.is_none() {
                    control.state = ThreadState::Ready;
                }
                !preempted || self.yielded == Some(*cpu)
            };
            self.kernel.stats[cpu.index()].record_context_switch(voluntary);
        }
        for (_, _, to) in switches[..count].iter().flatten() {
            self.threads.control_mut(*to).state = ThreadState::Executing;
        }

        let kernel = self.kernel;
        drop(self);

        for (cpu, from, to) in switches[..count].iter().flatten() {
            // Boot switches have no previous thread and no one to interrupt.
            if from.is_some() && Some(*cpu) != caller {
                kernel.stats[cpu.index()].record_ipi();
                kernel.port.send_ipi(*cpu);
            }
            crate::kdebug!("{}: switch {:?} -> {}", cpu, from, to);
            kernel.port.context_switch(*cpu, *from, *to);
        }
    }
}

impl Kernel {
    /// Create one idle thread per processor at the least urgent priority and
    /// make it the first thread executing there.
    pub(super) fn start_idle_threads(&self) -> Vec<ThreadId> {
        let mut idle = Vec::with_capacity(self.owners.len());
        let mut guard = self.lock();
        let priority = self.config.idle_priority();
        let capacity = self.config.max_objects;

        for (index, owner) in self.owners.iter().enumerate() {
            let cpu = ProcessorId(index as u16);
            let affinity = ProcessorMask::single(cpu);
            let name = alloc::format!("IDLE{}", index);
            let allocated = guard.threads.allocate(|id| {
                let mut control =
                    ThreadControl::new(id, &name, *owner, affinity, priority, capacity);
                control.idle = true;
                control.state = ThreadState::Ready;
                control
            });
            let Ok(thread) = allocated else {
                fatal(InternalError::ThreadStateCorrupted {
                    thread: index as u16,
                });
            };
            let mut context = guard.scheduler(*owner);
            context.attach_home(thread, priority);
            context.enqueue(thread);
            drop(context);
            idle.push(thread);
        }

        guard.finish(None);
        idle
    }
}
