//! Thread lifecycle, priorities and affinity

use crate::error::{KernelError, KernelResult};
use crate::scheduler::{Placement, Priority, ProcessorId, ProcessorMask, SchedulerId, ThreadId};
use crate::thread::{ThreadControl, ThreadState};

use super::{Guard, Kernel};

impl Kernel {
    /// Create a dormant thread homed on `scheduler`.
    pub fn create_thread(
        &self,
        name: &str,
        priority: Priority,
        scheduler: SchedulerId,
    ) -> KernelResult<ThreadId> {
        self.check_priority(priority)?;
        self.check_scheduler(scheduler)?;
        let affinity = self.config.schedulers[scheduler.index()].processors;

        let mut guard = self.lock();
        let capacity = self.config.max_objects;
        let thread = guard.threads.allocate(|id| {
            ThreadControl::new(id, name, scheduler, affinity, priority, capacity)
        })?;
        guard.scheduler(scheduler).attach_home(thread, priority);
        crate::kdebug!("create {} '{}' at {} on {}", thread, name, priority, scheduler);
        Ok(thread)
    }

    /// Make a dormant thread ready.
    pub fn start_thread(&self, thread: ThreadId) -> KernelResult<()> {
        let mut guard = self.lock();
        if guard.threads.get(thread)?.state != ThreadState::Dormant {
            return Err(KernelError::IncorrectState);
        }
        guard.threads.control_mut(thread).state = ThreadState::Ready;
        guard.make_ready(thread, Placement::Tail);
        guard.finish(None);
        Ok(())
    }

    pub fn suspend(&self, thread: ThreadId) -> KernelResult<()> {
        let mut guard = self.lock();
        let control = guard.threads.get(thread)?;
        if control.idle || !control.state.is_ready() {
            return Err(KernelError::IncorrectState);
        }
        guard.make_unready(thread);
        guard.threads.control_mut(thread).state = ThreadState::Suspended;
        guard.finish(None);
        Ok(())
    }

    pub fn resume(&self, thread: ThreadId) -> KernelResult<()> {
        let mut guard = self.lock();
        if guard.threads.get(thread)?.state != ThreadState::Suspended {
            return Err(KernelError::IncorrectState);
        }
        guard.threads.control_mut(thread).state = ThreadState::Ready;
        guard.make_ready(thread, Placement::Tail);
        guard.finish(None);
        Ok(())
    }

    /// Move the thread executing on `cpu` behind its equals.
    pub fn yield_processor(&self, cpu: ProcessorId) -> KernelResult<()> {
        let mut guard = self.lock();
        let caller = guard.caller(cpu)?;
        let owner = self.scheduler_of(cpu).ok_or(KernelError::InvalidId)?;
        {
            let mut context = guard.scheduler(owner);
            if context.node(caller).ready {
                context.extract(caller);
                context.enqueue(caller);
            }
            context.request_reselect(cpu);
        }
        guard.yielded = Some(cpu);
        guard.finish(Some(cpu));
        Ok(())
    }

    /// Terminate the thread executing on `cpu`. It must not own a mutex.
    pub fn exit(&self, cpu: ProcessorId) -> KernelResult<()> {
        let mut guard = self.lock();
        let caller = guard.caller(cpu)?;
        if guard.threads.control(caller).owned > 0 {
            return Err(KernelError::ResourceInUse);
        }
        guard.make_unready(caller);
        guard.threads.control_mut(caller).state = ThreadState::Zombie;
        crate::kdebug!("{} exits", caller);
        guard.finish(Some(cpu));
        Ok(())
    }

    /// Free the slot of a dormant or exited thread.
    pub fn delete_thread(&self, thread: ThreadId) -> KernelResult<()> {
        let mut guard = self.lock();
        let control = guard.threads.get(thread)?;
        if control.idle || !matches!(control.state, ThreadState::Dormant | ThreadState::Zombie) {
            return Err(KernelError::IncorrectState);
        }
        for scheduler in &self.schedulers {
            let mut context = scheduler.lock();
            if context.node(thread).in_use() {
                context.detach(thread);
            }
        }
        guard.threads.free(thread)?;
        Ok(())
    }

    /// Replace the base priority, returning the old one. Boosts held through
    /// resources stay in effect.
    pub fn set_thread_priority(
        &self,
        thread: ThreadId,
        priority: Priority,
    ) -> KernelResult<Priority> {
        self.check_priority(priority)?;
        let mut guard = self.lock();
        if guard.threads.get(thread)?.idle {
            return Err(KernelError::IncorrectState);
        }
        let old = guard.threads.control_mut(thread).priority.set_base(priority);
        guard.priority_changed(thread, Placement::Tail);
        guard.finish(None);
        Ok(old)
    }

    /// Move `thread` to another scheduler instance at base `priority`.
    pub fn set_scheduler(
        &self,
        thread: ThreadId,
        scheduler: SchedulerId,
        priority: Priority,
    ) -> KernelResult<()> {
        self.check_scheduler(scheduler)?;
        self.check_priority(priority)?;
        let affinity = self.config.schedulers[scheduler.index()].processors;

        let mut guard = self.lock();
        guard.check_migratable(thread)?;
        guard.migrate(thread, scheduler, affinity, Some(priority));
        guard.finish(None);
        Ok(())
    }

    pub fn get_affinity(&self, thread: ThreadId) -> KernelResult<ProcessorMask> {
        Ok(self.threads.lock().get(thread)?.affinity)
    }

    /// Restrict `thread` to `affinity`. A set that does not cover the
    /// processors of the home instance moves the thread to the first
    /// instance it does cover.
    pub fn set_affinity(&self, thread: ThreadId, affinity: ProcessorMask) -> KernelResult<()> {
        if affinity.is_empty() || !affinity.is_subset_of(self.config.processors()) {
            return Err(KernelError::InvalidCpuSet);
        }

        let mut guard = self.lock();
        let home = guard.threads.get(thread)?.home;
        if guard.threads.control(thread).idle {
            return Err(KernelError::IncorrectState);
        }
        let covers = |index: usize| {
            self.config.schedulers[index]
                .processors
                .is_subset_of(affinity)
        };
        if covers(home.index()) {
            guard.threads.control_mut(thread).affinity = affinity;
            return Ok(());
        }

        let target = (0..self.config.schedulers.len())
            .find(|index| covers(*index))
            .ok_or(KernelError::InvalidNumber)?;
        guard.check_migratable(thread)?;
        guard.migrate(thread, SchedulerId(target as u16), affinity, None);
        guard.finish(None);
        Ok(())
    }
}

impl Guard<'_> {
    fn check_migratable(&self, thread: ThreadId) -> KernelResult<()> {
        let control = self.threads.get(thread)?;
        if control.idle {
            return Err(KernelError::IncorrectState);
        }
        if control.owned > 0 || control.state == ThreadState::BlockedOnObject {
            return Err(KernelError::ResourceInUse);
        }
        Ok(())
    }

    /// Re-home a thread that owns nothing, so it has no borrowed nodes.
    fn migrate(
        &mut self,
        thread: ThreadId,
        scheduler: SchedulerId,
        affinity: ProcessorMask,
        priority: Option<Priority>,
    ) {
        let was_ready = self.threads.control(thread).state.is_ready();
        self.make_unready(thread);

        let control = self.threads.control_mut(thread);
        let old = control.home;
        control.home = scheduler;
        control.affinity = affinity;
        if let Some(priority) = priority {
            control.priority.set_base(priority);
        }
        let effective = control.effective_priority();

        self.scheduler(old).detach(thread);
        self.scheduler(scheduler).attach_home(thread, effective);
        if was_ready {
            self.make_ready(thread, Placement::Tail);
        }
        crate::kdebug!("{} moves from {} to {}", thread, old, scheduler);
    }
}
