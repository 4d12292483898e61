//! Semaphore and mutex directives

use alloc::vec;

use crate::error::{fatal, InternalError, KernelError, KernelResult};
use crate::port::RemoteRequest;
use crate::scheduler::{Placement, Priority, ProcessorId, SchedulerId, ThreadId};
use crate::sync::{
    resolve, AttributeSet, Discipline, MutexState, ObjectId, ObjectKind, SyncObject, Variant,
    WaitPolicy,
};
use crate::thread::WaitResult;

use super::{AcquireOutcome, Guard, Kernel};

/// Ceiling an MrsP object starts with on instances other than the creator's.
const MRSP_DEFAULT_CEILING: Priority = 1;

impl Kernel {
    /// Create a semaphore or mutex. A binary variant created with count 0 is
    /// owned by the thread executing on `cpu`. `ceiling` is ignored by the
    /// variants without one.
    pub fn create_semaphore(
        &self,
        cpu: ProcessorId,
        attributes: AttributeSet,
        count: u32,
        ceiling: Priority,
    ) -> KernelResult<ObjectId> {
        let resolved = resolve(attributes, count)?;
        let variant = resolved.variant;
        if variant.has_ceiling() {
            self.check_priority(ceiling)?;
        }

        let mut guard = self.lock();
        let creator = guard.executing(cpu)?;
        let control = guard.threads.control(creator);
        let home = control.home;
        let owned = variant.has_owner() && count == 0;
        if owned {
            if control.idle {
                return Err(KernelError::IncorrectState);
            }
            if variant.has_ceiling() && control.effective_priority() < ceiling {
                return Err(KernelError::InvalidPriority);
            }
        }

        let mutex = if owned {
            MutexState::owned_by(creator)
        } else {
            MutexState::unlocked()
        };
        let kind = match variant {
            Variant::Counting => ObjectKind::Counting { count },
            Variant::SimpleBinary => ObjectKind::SimpleBinary { count },
            Variant::MutexNoProtocol => ObjectKind::Mutex(mutex),
            Variant::MutexInherit => ObjectKind::InheritMutex(mutex),
            Variant::MutexCeiling => ObjectKind::CeilingMutex {
                mutex,
                scheduler: home,
                ceiling,
            },
            Variant::Mrsp => {
                let mut ceilings = vec![MRSP_DEFAULT_CEILING; self.schedulers.len()];
                ceilings[home.index()] = ceiling;
                ObjectKind::Mrsp {
                    owner: mutex.owner,
                    ceilings,
                }
            }
        };

        // MrsP waiters always park in FIFO order.
        let discipline = match variant {
            Variant::Mrsp => Discipline::Fifo,
            _ => resolved.discipline,
        };
        let id = guard
            .objects
            .allocate(|id| SyncObject::new(id, discipline, resolved.global, kind))?;

        if owned {
            guard.threads.control_mut(creator).owned += 1;
            if variant.has_ceiling() && guard.set_contribution(creator, id, Some(ceiling)) {
                guard.priority_changed(creator, Placement::Tail);
            }
        }
        crate::kdebug!(
            "create {} ({}, count {}) by {}",
            id,
            variant.as_str(),
            count,
            creator
        );
        guard.finish(Some(cpu));

        if resolved.global {
            if let Some(transport) = &self.transport {
                transport.broadcast(RemoteRequest::Announce { id });
            }
        }
        Ok(id)
    }

    /// Obtain a unit or ownership for the thread executing on `cpu`.
    pub fn acquire(
        &self,
        cpu: ProcessorId,
        id: ObjectId,
        wait: WaitPolicy,
    ) -> KernelResult<AcquireOutcome> {
        if self.is_remote(id) {
            return self.remote_acquire(cpu, id, wait);
        }

        let mut guard = self.lock();
        let caller = guard.caller(cpu)?;
        if guard.objects.get(id)?.variant() == Variant::Mrsp {
            return self.mrsp_acquire(guard, cpu, caller, id, wait);
        }

        let outcome = guard.seize(caller, id, wait)?;
        guard.finish(Some(cpu));
        Ok(outcome)
    }

    /// Return a unit, or give up one level of ownership.
    ///
    /// Semaphores may be released from any context, including the idle
    /// thread standing in for an interrupt handler.
    pub fn release(&self, cpu: ProcessorId, id: ObjectId) -> KernelResult<()> {
        if self.is_remote(id) {
            return self.remote_release(cpu, id);
        }

        let mut guard = self.lock();
        let caller = guard.executing(cpu)?;
        if guard.objects.get(id)?.variant() == Variant::Mrsp {
            guard.mrsp_release(caller, id)?;
        } else {
            guard.surrender(caller, id)?;
        }
        guard.finish(Some(cpu));
        Ok(())
    }

    /// Remove an object. Waiters of a semaphore wake with `Deleted`; an
    /// owned mutex cannot be deleted.
    pub fn delete(&self, id: ObjectId) -> KernelResult<()> {
        if self.is_remote(id) {
            return Err(KernelError::IllegalOnRemoteObject);
        }

        let mut guard = self.lock();
        if guard.objects.get(id)?.owner().is_some() {
            return Err(KernelError::ResourceInUse);
        }
        let mut object = guard.objects.free(id)?;
        while let Some(waiter) = object.waiters.dequeue(&mut *guard.threads) {
            guard.wake(waiter, WaitResult::Deleted);
        }
        crate::kdebug!("delete {}", id);
        guard.finish(None);

        if object.global {
            if let Some(transport) = &self.transport {
                transport.broadcast(RemoteRequest::Withdraw { id });
            }
        }
        Ok(())
    }

    /// Wake every waiter with `Unsatisfied` without changing the count or
    /// the owner.
    pub fn flush(&self, id: ObjectId) -> KernelResult<()> {
        if self.is_remote(id) {
            return Err(KernelError::IllegalOnRemoteObject);
        }

        let mut guard = self.lock();
        let variant = guard.objects.get(id)?.variant();
        if variant == Variant::Mrsp {
            return Err(KernelError::NotDefined);
        }
        loop {
            let object = guard.objects.get_mut(id)?;
            let Some(waiter) = object.waiters.dequeue(&mut *guard.threads) else {
                break;
            };
            guard.wake(waiter, WaitResult::Unsatisfied);
        }
        if variant == Variant::MutexInherit {
            guard.refresh_inheritance(id, Placement::Head);
        }
        guard.finish(None);
        Ok(())
    }

    pub fn get_ceiling(&self, id: ObjectId, scheduler: SchedulerId) -> KernelResult<Priority> {
        self.check_scheduler(scheduler)?;
        if self.is_remote(id) {
            return Err(KernelError::IllegalOnRemoteObject);
        }
        self.objects
            .lock()
            .get(id)?
            .ceiling(scheduler)
            .ok_or(KernelError::NotDefined)
    }

    /// Change the ceiling of `id` on `scheduler`, returning the old one. The
    /// owner, and parked MrsP waiters, move to the new ceiling at once.
    pub fn set_ceiling(
        &self,
        id: ObjectId,
        scheduler: SchedulerId,
        ceiling: Priority,
    ) -> KernelResult<Priority> {
        self.check_scheduler(scheduler)?;
        if self.is_remote(id) {
            return Err(KernelError::IllegalOnRemoteObject);
        }

        let mut guard = self.lock();
        let object = guard.objects.get_mut(id)?;
        let old = object.ceiling(scheduler).ok_or(KernelError::NotDefined)?;
        self.check_priority(ceiling)?;

        match &mut object.kind {
            ObjectKind::CeilingMutex { ceiling: slot, .. } => *slot = ceiling,
            ObjectKind::Mrsp { ceilings, .. } => ceilings[scheduler.index()] = ceiling,
            _ => return Err(KernelError::NotDefined),
        }
        let owner = object.owner();
        let variant = object.variant();
        let placement = if ceiling < old {
            Placement::Tail
        } else {
            Placement::Head
        };

        if let Some(owner) = owner {
            if guard.threads.control(owner).home == scheduler
                && guard.set_contribution(owner, id, Some(ceiling))
            {
                guard.priority_changed(owner, placement);
            }
        }
        if variant == Variant::Mrsp {
            let mut index = 0;
            while let Some(waiter) = guard.nth_waiter(id, index) {
                index += 1;
                if guard.threads.control(waiter).home == scheduler
                    && guard.set_contribution(waiter, id, Some(ceiling))
                {
                    guard.priority_changed(waiter, placement);
                }
            }
            if let Some(owner) = owner {
                guard.refresh_borrowed(owner);
            }
        }
        crate::kdebug!("{}: ceiling on {} {} -> {}", id, scheduler, old, ceiling);
        guard.finish(None);
        Ok(old)
    }
}

impl Guard<'_> {
    /// Acquire a local semaphore or non-MrsP mutex for `caller`, blocking it
    /// if the object is unavailable and `wait` allows.
    fn seize(
        &mut self,
        caller: ThreadId,
        id: ObjectId,
        wait: WaitPolicy,
    ) -> KernelResult<AcquireOutcome> {
        let control = self.threads.control(caller);
        let home = control.home;
        let priority = control.effective_priority();

        let object = self.objects.get_mut(id)?;
        let variant = object.variant();
        let ceiling = match &object.kind {
            ObjectKind::CeilingMutex {
                scheduler, ceiling, ..
            } => {
                if *scheduler != home {
                    return Err(KernelError::NotDefined);
                }
                Some(*ceiling)
            }
            _ => None,
        };

        match &mut object.kind {
            ObjectKind::Counting { count } | ObjectKind::SimpleBinary { count } => {
                if *count > 0 {
                    *count -= 1;
                    return Ok(AcquireOutcome::Acquired);
                }
            }
            ObjectKind::Mutex(mutex)
            | ObjectKind::InheritMutex(mutex)
            | ObjectKind::CeilingMutex { mutex, .. } => match mutex.owner {
                None => {
                    if ceiling.map_or(false, |ceiling| priority < ceiling) {
                        return Err(KernelError::InvalidPriority);
                    }
                    *mutex = MutexState::owned_by(caller);
                    self.threads.control_mut(caller).owned += 1;
                    if ceiling.is_some() && self.set_contribution(caller, id, ceiling) {
                        self.priority_changed(caller, Placement::Tail);
                    }
                    return Ok(AcquireOutcome::Acquired);
                }
                Some(owner) if owner == caller => {
                    mutex.nesting = mutex
                        .nesting
                        .checked_add(1)
                        .ok_or(KernelError::Unsatisfied)?;
                    return Ok(AcquireOutcome::Acquired);
                }
                Some(_) => {}
            },
            // MrsP objects go through `mrsp_acquire`.
            ObjectKind::Mrsp { .. } => return Err(KernelError::NotDefined),
        }

        let owner = object.owner();
        if !wait.may_block() {
            return Err(KernelError::Unsatisfied);
        }
        if let Some(owner) = owner {
            if self.would_deadlock(caller, owner) {
                crate::kwarn!("{}: {} would deadlock on {}", id, caller, owner);
                return Err(KernelError::Deadlock);
            }
        }

        self.block_on(caller, id, wait)?;
        if variant == Variant::MutexInherit {
            self.refresh_inheritance(id, Placement::Tail);
        }
        Ok(AcquireOutcome::Blocked)
    }

    /// Release a local semaphore or non-MrsP mutex on behalf of `caller`.
    fn surrender(&mut self, caller: ThreadId, id: ObjectId) -> KernelResult<()> {
        let object = self.objects.get_mut(id)?;
        let variant = object.variant();
        let waiting = !object.waiters.is_empty();

        match &mut object.kind {
            ObjectKind::Counting { count } => {
                if !waiting {
                    *count = count.checked_add(1).ok_or(KernelError::Unsatisfied)?;
                    return Ok(());
                }
            }
            ObjectKind::SimpleBinary { count } => {
                if !waiting {
                    *count = 1;
                    return Ok(());
                }
            }
            ObjectKind::Mutex(mutex)
            | ObjectKind::InheritMutex(mutex)
            | ObjectKind::CeilingMutex { mutex, .. } => {
                if mutex.owner != Some(caller) {
                    return Err(KernelError::NotOwner);
                }
                if mutex.nesting == 0 {
                    fatal(InternalError::NestingUnderflow);
                }
                mutex.nesting -= 1;
                if mutex.nesting > 0 {
                    return Ok(());
                }
                *mutex = MutexState::unlocked();
            }
            ObjectKind::Mrsp { .. } => return Err(KernelError::NotDefined),
        }

        if variant.has_owner() {
            let control = self.threads.control_mut(caller);
            control.owned = control.owned.saturating_sub(1);
            if self.set_contribution(caller, id, None) {
                self.priority_changed(caller, Placement::Head);
            }
        }

        let object = self.objects.get_mut(id)?;
        let Some(next) = object.waiters.dequeue(&mut *self.threads) else {
            return Ok(());
        };
        if !variant.has_owner() {
            self.wake(next, WaitResult::Ok);
            return Ok(());
        }

        let required = match &mut object.kind {
            ObjectKind::Mutex(mutex) => {
                *mutex = MutexState::owned_by(next);
                None
            }
            ObjectKind::InheritMutex(mutex) => {
                *mutex = MutexState::owned_by(next);
                object.waiters.most_urgent(&*self.threads)
            }
            ObjectKind::CeilingMutex { mutex, ceiling, .. } => {
                *mutex = MutexState::owned_by(next);
                Some(*ceiling)
            }
            _ => fatal(InternalError::ThreadStateCorrupted { thread: next.0 }),
        };
        self.threads.control_mut(next).owned += 1;
        self.wake(next, WaitResult::Ok);
        if required.is_some() && self.set_contribution(next, id, required) {
            self.priority_changed(next, Placement::Tail);
        }
        crate::ktrace!("{}: handed from {} to {}", id, caller, next);
        Ok(())
    }

    /// Waiter at `index` in queue order.
    pub(super) fn nth_waiter(&self, id: ObjectId, index: usize) -> Option<ThreadId> {
        let object = self.objects.get(id).ok()?;
        object.waiters.iter(&*self.threads).nth(index)
    }
}
