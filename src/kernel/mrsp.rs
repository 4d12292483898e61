//! Multiprocessor resource sharing protocol
//!
//! An MrsP object has one ceiling per scheduler instance. Acquiring raises
//! the caller to the ceiling of its home instance. A contended acquire spins
//! with every lock dropped, then parks in FIFO order. While a thread of
//! instance `S` is parked, the owner borrows its node on `S` at the ceiling
//! of `S` so the waiter's processor can run the owner in its place.

use crate::error::{KernelError, KernelResult};
use crate::scheduler::{NodeRole, Placement, Priority, ProcessorId, ThreadId};
use crate::sync::{ObjectId, ObjectKind, WaitPolicy};
use crate::thread::WaitResult;

use super::{AcquireOutcome, Guard, Kernel};

impl Kernel {
    pub(super) fn mrsp_acquire<'k>(
        &'k self,
        mut guard: Guard<'k>,
        cpu: ProcessorId,
        caller: ThreadId,
        id: ObjectId,
        wait: WaitPolicy,
    ) -> KernelResult<AcquireOutcome> {
        let mut raised = false;
        let mut attempts = 0;

        loop {
            let (owner, ceiling) = match guard.mrsp_state(caller, id) {
                Ok(state) => state,
                Err(error) => {
                    if raised {
                        guard.lower(caller, id);
                        guard.finish(Some(cpu));
                    }
                    return Err(error);
                }
            };
            if owner == Some(caller) {
                return Err(KernelError::Unsatisfied);
            }

            if !raised {
                if guard.threads.control(caller).effective_priority() < ceiling {
                    return Err(KernelError::InvalidPriority);
                }
                if guard.set_contribution(caller, id, Some(ceiling)) {
                    guard.priority_changed(caller, Placement::Tail);
                }
                raised = true;
            }

            let Some(owner) = owner else {
                if let Ok(object) = guard.objects.get_mut(id) {
                    if let ObjectKind::Mrsp { owner, .. } = &mut object.kind {
                        *owner = Some(caller);
                    }
                }
                guard.threads.control_mut(caller).owned += 1;
                guard.refresh_borrowed(caller);
                crate::ktrace!("{}: {} owns at {}", id, caller, ceiling);
                guard.finish(Some(cpu));
                return Ok(AcquireOutcome::Acquired);
            };

            if !wait.may_block() {
                guard.lower(caller, id);
                guard.finish(Some(cpu));
                return Err(KernelError::Unsatisfied);
            }

            if attempts < self.config.mrsp_spin_limit {
                attempts += 1;
                drop(guard);
                core::hint::spin_loop();
                guard = self.lock();
                continue;
            }

            if guard.would_deadlock(caller, owner) {
                guard.lower(caller, id);
                guard.finish(Some(cpu));
                return Err(KernelError::Deadlock);
            }

            guard.block_on(caller, id, wait)?;
            guard.refresh_borrowed(owner);
            crate::ktrace!("{}: {} parks after {} attempts", id, caller, attempts);
            guard.finish(Some(cpu));
            return Ok(AcquireOutcome::Blocked);
        }
    }
}

impl Guard<'_> {
    /// Owner of an MrsP object and its ceiling on the home instance of
    /// `thread`.
    fn mrsp_state(
        &self,
        thread: ThreadId,
        id: ObjectId,
    ) -> KernelResult<(Option<ThreadId>, Priority)> {
        let object = self.objects.get(id)?;
        let home = self.threads.control(thread).home;
        match &object.kind {
            ObjectKind::Mrsp { owner, ceilings } => {
                let ceiling = ceilings
                    .get(home.index())
                    .copied()
                    .ok_or(KernelError::InvalidId)?;
                Ok((*owner, ceiling))
            }
            _ => Err(KernelError::NotDefined),
        }
    }

    /// Drop the contribution `id` makes to `thread`.
    pub(super) fn lower(&mut self, thread: ThreadId, id: ObjectId) {
        if self.set_contribution(thread, id, None) {
            self.priority_changed(thread, Placement::Head);
        }
    }

    pub(super) fn mrsp_release(&mut self, caller: ThreadId, id: ObjectId) -> KernelResult<()> {
        let object = self.objects.get_mut(id)?;
        let ObjectKind::Mrsp { owner, .. } = &mut object.kind else {
            return Err(KernelError::NotDefined);
        };
        if *owner != Some(caller) {
            return Err(KernelError::NotOwner);
        }
        let next = object.waiters.dequeue(&mut *self.threads);
        if let ObjectKind::Mrsp { owner, .. } = &mut object.kind {
            *owner = next;
        }

        let control = self.threads.control_mut(caller);
        control.owned = control.owned.saturating_sub(1);
        self.lower(caller, id);
        self.refresh_borrowed(caller);

        if let Some(next) = next {
            // The new owner keeps the ceiling it was raised to while parked.
            self.threads.control_mut(next).owned += 1;
            self.wake(next, WaitResult::Ok);
            self.refresh_borrowed(next);
            crate::ktrace!("{}: handed from {} to {}", id, caller, next);
        }
        Ok(())
    }

    /// Bring the borrowed nodes of `owner` in line with the MrsP objects it
    /// owns: one node per foreign instance with a parked waiter, at the most
    /// urgent ceiling among those objects on that instance.
    pub(super) fn refresh_borrowed(&mut self, owner: ThreadId) {
        let kernel = self.kernel;
        let control = self.threads.control(owner);
        let home = control.home;
        let ready = control.state.is_ready();

        for (index, scheduler) in kernel.schedulers.iter().enumerate() {
            if index == home.index() {
                continue;
            }

            let mut required: Option<(Priority, ObjectId)> = None;
            for object in self.objects.iter() {
                let ObjectKind::Mrsp {
                    owner: Some(holder),
                    ceilings,
                } = &object.kind
                else {
                    continue;
                };
                if *holder != owner {
                    continue;
                }
                let helped = object
                    .waiters
                    .iter(&*self.threads)
                    .any(|waiter| self.threads.control(waiter).home.index() == index);
                let Some(ceiling) = ceilings.get(index).copied() else {
                    continue;
                };
                if helped && required.map_or(true, |(most, _)| ceiling < most) {
                    required = Some((ceiling, object.id));
                }
            }

            let mut context = scheduler.lock();
            let (role, queued) = {
                let node = context.node(owner);
                (node.role, node.ready)
            };
            match (required, role) {
                (None, NodeRole::Borrowed(_)) => context.detach(owner),
                (Some((priority, object)), NodeRole::Unused) => {
                    context.attach_borrowed(owner, object, priority);
                    if ready {
                        context.enqueue_first(owner);
                    }
                }
                (Some((priority, object)), NodeRole::Borrowed(_)) => {
                    context.retag_borrowed(owner, object);
                    context.set_node_priority(owner, priority, Placement::Head);
                    if ready && !queued {
                        context.enqueue_first(owner);
                    }
                }
                _ => {}
            }
        }
    }
}
