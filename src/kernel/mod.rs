//! Directive surface
//!
//! [`Kernel`] owns every table the core needs, sized from the
//! [`KernelConfig`] at construction. Directives name the calling processor;
//! the thread executing there is the caller.
//!
//! ## Locking
//!
//! A directive locks the object table, then the thread table, and holds both
//! until its effects on the ready queues are complete. Scheduler instances
//! are locked one at a time underneath. Port hooks run after every lock is
//! dropped.
//!
//! ## Module Organization
//!
//! - `dispatch`: ready/unready transitions, heir selection, context switches
//! - `inherit`: priority propagation and deadlock detection
//! - `sem`: semaphore creation, acquire, release, delete, flush, ceilings
//! - `mrsp`: MrsP acquire and release with helping
//! - `thread_ops`: thread lifecycle, priorities, affinity
//! - `timeout`: clock tick, sleeps, timed waits
//! - `remote`: objects on other nodes

mod dispatch;
mod inherit;
mod mrsp;
mod remote;
mod sem;
mod thread_ops;
mod timeout;

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicU64, Ordering};

use spin::{Mutex, MutexGuard};

use crate::config::KernelConfig;
use crate::error::{ConfigError, KernelError, KernelResult};
use crate::port::{CpuPort, RemoteTransport};
use crate::scheduler::{
    NodeRole, Priority, ProcessorId, ProcessorStats, ProcessorStatsSnapshot, SchedulerContext,
    SchedulerId, ThreadId,
};
use crate::sync::{ObjectId, ObjectTable, Variant};
use crate::thread::{ThreadState, ThreadTable, WaitResult};

/// Immediate result of an acquire that did not fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// The caller holds the resource.
    Acquired,
    /// The caller is blocked; its final status appears in
    /// [`Kernel::wait_result`] once it is ready again.
    Blocked,
}

pub struct Kernel {
    config: KernelConfig,
    port: Box<dyn CpuPort>,
    transport: Option<Box<dyn RemoteTransport>>,
    objects: Mutex<ObjectTable>,
    threads: Mutex<ThreadTable>,
    schedulers: Vec<Mutex<SchedulerContext>>,
    stats: Vec<ProcessorStats>,
    /// Scheduler instance owning each processor.
    owners: Vec<SchedulerId>,
    /// Idle thread created for each processor.
    idle: Vec<ThreadId>,
    ticks: AtomicU64,
}

/// Object and thread tables locked for one directive, in lock order.
struct Guard<'k> {
    kernel: &'k Kernel,
    objects: MutexGuard<'k, ObjectTable>,
    threads: MutexGuard<'k, ThreadTable>,
    /// Processor whose executing thread yielded in this directive.
    yielded: Option<ProcessorId>,
}

impl Kernel {
    pub fn new(config: KernelConfig, port: Box<dyn CpuPort>) -> Result<Self, ConfigError> {
        config.validate()?;

        let schedulers = config
            .schedulers
            .iter()
            .enumerate()
            .map(|(index, scheduler)| {
                Mutex::new(SchedulerContext::new(
                    SchedulerId(index as u16),
                    scheduler.name.clone(),
                    scheduler.processors,
                    config.max_priority,
                    config.max_threads,
                ))
            })
            .collect();

        let mut owners = Vec::with_capacity(config.processor_count);
        for index in 0..config.processor_count {
            let cpu = ProcessorId(index as u16);
            let owner = config
                .scheduler_of(cpu)
                .ok_or(ConfigError::ProcessorUnassigned { processor: cpu.0 })?;
            owners.push(SchedulerId(owner as u16));
        }

        let stats = (0..config.processor_count)
            .map(|index| ProcessorStats::new(ProcessorId(index as u16)))
            .collect();

        let mut kernel = Self {
            objects: Mutex::new(ObjectTable::new(config.node, config.max_objects)),
            threads: Mutex::new(ThreadTable::new(config.max_threads)),
            schedulers,
            stats,
            owners,
            idle: Vec::new(),
            ticks: AtomicU64::new(0),
            port,
            transport: None,
            config,
        };
        kernel.idle = kernel.start_idle_threads();

        crate::kinfo!(
            "rtcore: node {}, {} processor(s), {} scheduler instance(s), priorities 1..{}",
            kernel.config.node,
            kernel.config.processor_count,
            kernel.schedulers.len(),
            kernel.config.max_priority - 1
        );
        Ok(kernel)
    }

    /// Attach the inter-node transport used for global and remote objects.
    pub fn with_transport(mut self, transport: Box<dyn RemoteTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    fn lock(&self) -> Guard<'_> {
        let objects = self.objects.lock();
        let threads = self.threads.lock();
        Guard {
            kernel: self,
            objects,
            threads,
            yielded: None,
        }
    }

    #[inline]
    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    pub fn processor_count(&self) -> usize {
        self.owners.len()
    }

    pub fn scheduler_count(&self) -> usize {
        self.schedulers.len()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Acquire)
    }

    fn check_priority(&self, priority: Priority) -> KernelResult<()> {
        if self.config.is_valid_priority(priority) {
            Ok(())
        } else {
            Err(KernelError::InvalidPriority)
        }
    }

    fn check_scheduler(&self, scheduler: SchedulerId) -> KernelResult<()> {
        if scheduler.index() < self.schedulers.len() {
            Ok(())
        } else {
            Err(KernelError::InvalidId)
        }
    }

    fn is_remote(&self, id: ObjectId) -> bool {
        id.node() != self.config.node
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    /// Scheduler instance owning `cpu`.
    pub fn scheduler_of(&self, cpu: ProcessorId) -> Option<SchedulerId> {
        self.owners.get(cpu.index()).copied()
    }

    pub fn executing(&self, cpu: ProcessorId) -> Option<ThreadId> {
        let owner = self.scheduler_of(cpu)?;
        let context = self.schedulers[owner.index()].lock();
        context.slot(cpu).and_then(|slot| slot.executing)
    }

    pub fn idle_thread(&self, cpu: ProcessorId) -> Option<ThreadId> {
        self.idle.get(cpu.index()).copied()
    }

    pub fn stats(&self, cpu: ProcessorId) -> Option<ProcessorStatsSnapshot> {
        self.stats.get(cpu.index()).map(ProcessorStats::snapshot)
    }

    /// Most urgent ready priority of an instance.
    pub fn highest_ready(&self, scheduler: SchedulerId) -> KernelResult<Priority> {
        self.check_scheduler(scheduler)?;
        Ok(self.schedulers[scheduler.index()].lock().ready().highest())
    }

    /// Ready threads of an instance in selection order.
    pub fn ready_threads(&self, scheduler: SchedulerId) -> KernelResult<Vec<ThreadId>> {
        self.check_scheduler(scheduler)?;
        Ok(self.schedulers[scheduler.index()]
            .lock()
            .ready_threads()
            .collect())
    }

    /// Bitmap agrees with the ready queues on every instance.
    pub fn ready_queues_consistent(&self) -> bool {
        self.schedulers
            .iter()
            .all(|scheduler| scheduler.lock().ready().is_consistent())
    }

    /// Priority and owning object of a node `thread` borrowed on `scheduler`.
    pub fn borrowed_node(
        &self,
        thread: ThreadId,
        scheduler: SchedulerId,
    ) -> KernelResult<Option<(Priority, ObjectId)>> {
        self.check_scheduler(scheduler)?;
        self.threads.lock().get(thread)?;
        let context = self.schedulers[scheduler.index()].lock();
        let node = context.node(thread);
        Ok(match node.role {
            NodeRole::Borrowed(object) => Some((node.priority, object)),
            _ => None,
        })
    }

    pub fn thread_state(&self, thread: ThreadId) -> KernelResult<ThreadState> {
        Ok(self.threads.lock().get(thread)?.state)
    }

    /// Final status of the last blocking operation of `thread`.
    pub fn wait_result(&self, thread: ThreadId) -> KernelResult<WaitResult> {
        Ok(self.threads.lock().get(thread)?.wait.result)
    }

    /// Effective priority, boosts included.
    pub fn thread_priority(&self, thread: ThreadId) -> KernelResult<Priority> {
        Ok(self.threads.lock().get(thread)?.effective_priority())
    }

    pub fn base_priority(&self, thread: ThreadId) -> KernelResult<Priority> {
        Ok(self.threads.lock().get(thread)?.priority.base())
    }

    /// Object whose protocol currently determines the thread's priority.
    pub fn driving_resource(&self, thread: ThreadId) -> KernelResult<Option<ObjectId>> {
        Ok(self.threads.lock().get(thread)?.priority.driving())
    }

    pub fn thread_scheduler(&self, thread: ThreadId) -> KernelResult<SchedulerId> {
        Ok(self.threads.lock().get(thread)?.home)
    }

    /// Processor `thread` is executing on.
    pub fn thread_processor(&self, thread: ThreadId) -> KernelResult<Option<ProcessorId>> {
        Ok(self.threads.lock().get(thread)?.cpu)
    }

    pub fn object_variant(&self, id: ObjectId) -> KernelResult<Variant> {
        Ok(self.objects.lock().get(id)?.variant())
    }

    pub fn object_owner(&self, id: ObjectId) -> KernelResult<Option<ThreadId>> {
        Ok(self.objects.lock().get(id)?.owner())
    }

    /// Available units; 1 for an unlocked mutex, 0 for a locked one.
    pub fn object_count(&self, id: ObjectId) -> KernelResult<u32> {
        Ok(self.objects.lock().get(id)?.count())
    }

    /// Waiters in queue order.
    pub fn waiters(&self, id: ObjectId) -> KernelResult<Vec<ThreadId>> {
        let objects = self.objects.lock();
        let threads = self.threads.lock();
        let object = objects.get(id)?;
        Ok(object.waiters.iter(&*threads).collect())
    }

    pub fn live_objects(&self) -> usize {
        self.objects.lock().len()
    }
}
