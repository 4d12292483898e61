//! Hardware-level mocks
//!
//! The core never touches hardware itself: context switches and IPIs go
//! through a [`CpuPort`], inter-node traffic through a [`RemoteTransport`].
//! These mocks record every call so tests can check what the core asked the
//! hardware to do.

use std::sync::Arc;

use spin::Mutex;

use nexa_rtcore::port::{CpuPort, RemoteRequest, RemoteTransport};
use nexa_rtcore::{
    Kernel, KernelConfig, Priority, ProcessorId, ProcessorMask, SchedulerId, ThreadId,
};

/// One context switch performed through the port.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Switch {
    pub cpu: ProcessorId,
    pub from: Option<ThreadId>,
    pub to: ThreadId,
}

#[derive(Default)]
pub struct PortLog {
    switches: Mutex<Vec<Switch>>,
    ipis: Mutex<Vec<ProcessorId>>,
}

impl PortLog {
    pub fn switches(&self) -> Vec<Switch> {
        self.switches.lock().clone()
    }

    pub fn ipis(&self) -> Vec<ProcessorId> {
        self.ipis.lock().clone()
    }

    pub fn clear(&self) {
        self.switches.lock().clear();
        self.ipis.lock().clear();
    }
}

/// CPU port that records instead of switching.
pub struct RecordingPort(pub Arc<PortLog>);

impl CpuPort for RecordingPort {
    fn context_switch(&self, cpu: ProcessorId, from: Option<ThreadId>, to: ThreadId) {
        self.0.switches.lock().push(Switch { cpu, from, to });
    }

    fn send_ipi(&self, cpu: ProcessorId) {
        self.0.ipis.lock().push(cpu);
    }
}

/// Request sent through the transport, with its destination (`None` for a
/// broadcast).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Sent {
    pub node: Option<u8>,
    pub request: RemoteRequest,
}

#[derive(Default)]
pub struct TransportLog {
    sent: Mutex<Vec<Sent>>,
}

impl TransportLog {
    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().clone()
    }

    pub fn last(&self) -> Option<Sent> {
        self.sent.lock().last().copied()
    }
}

pub struct RecordingTransport(pub Arc<TransportLog>);

impl RemoteTransport for RecordingTransport {
    fn send(&self, node: u8, request: RemoteRequest) {
        self.0.sent.lock().push(Sent {
            node: Some(node),
            request,
        });
    }

    fn broadcast(&self, request: RemoteRequest) {
        self.0.sent.lock().push(Sent {
            node: None,
            request,
        });
    }
}

// ===========================================================================
// Test harness
// ===========================================================================

pub const CPU0: ProcessorId = ProcessorId(0);
pub const CPU1: ProcessorId = ProcessorId(1);
pub const SCHED0: SchedulerId = SchedulerId(0);
pub const SCHED1: SchedulerId = SchedulerId(1);

/// Kernel plus the logs of its mocks.
pub struct Harness {
    pub kernel: Kernel,
    pub port: Arc<PortLog>,
    pub transport: Arc<TransportLog>,
}

impl Harness {
    pub fn new(config: KernelConfig) -> Self {
        let port = Arc::new(PortLog::default());
        let transport = Arc::new(TransportLog::default());
        let kernel = Kernel::new(config, Box::new(RecordingPort(port.clone())))
            .expect("valid configuration")
            .with_transport(Box::new(RecordingTransport(transport.clone())));
        Self {
            kernel,
            port,
            transport,
        }
    }

    /// One processor, one scheduler instance.
    pub fn uniprocessor() -> Self {
        Self::new(KernelConfig::default())
    }

    /// Two processors, each owned by its own scheduler instance.
    pub fn partitioned() -> Self {
        Self::new(KernelConfig::partitioned(
            2,
            &[ProcessorMask::single(CPU0), ProcessorMask::single(CPU1)],
        ))
    }

    /// Two processors owned by one scheduler instance.
    pub fn global() -> Self {
        Self::new(KernelConfig::global(2))
    }

    /// Create and start a thread on `scheduler`.
    pub fn spawn(&self, name: &str, priority: Priority, scheduler: SchedulerId) -> ThreadId {
        let thread = self
            .kernel
            .create_thread(name, priority, scheduler)
            .expect("thread slot");
        self.kernel.start_thread(thread).expect("dormant thread");
        thread
    }

    pub fn executing(&self, cpu: ProcessorId) -> Option<ThreadId> {
        self.kernel.executing(cpu)
    }

    pub fn priority(&self, thread: ThreadId) -> Priority {
        self.kernel.thread_priority(thread).expect("live thread")
    }

    /// Advance the clock by `ticks`.
    pub fn tick(&self, ticks: u32) {
        for _ in 0..ticks {
            self.kernel.clock_tick();
        }
    }
}
