//! Per-processor dispatch statistics
//!
//! Updated with relaxed atomics outside the scheduler locks.

use core::sync::atomic::{AtomicU64, Ordering};

use super::types::ProcessorId;

#[derive(Debug)]
pub struct ProcessorStats {
    pub cpu: ProcessorId,
    /// Context switches on this processor
    pub context_switches: AtomicU64,
    /// Switches away from a thread that blocked, yielded or exited
    pub voluntary_switches: AtomicU64,
    /// Switches away from a thread that was still ready
    pub preemptions: AtomicU64,
    /// IPIs sent to this processor
    pub ipis: AtomicU64,
    /// Clock ticks spent in the idle thread
    pub idle_ticks: AtomicU64,
}

impl ProcessorStats {
    pub const fn new(cpu: ProcessorId) -> Self {
        Self {
            cpu,
            context_switches: AtomicU64::new(0),
            voluntary_switches: AtomicU64::new(0),
            preemptions: AtomicU64::new(0),
            ipis: AtomicU64::new(0),
            idle_ticks: AtomicU64::new(0),
        }
    }

    /// Record a context switch
    pub fn record_context_switch(&self, voluntary: bool) {
        self.context_switches.fetch_add(1, Ordering::Relaxed);
        if voluntary {
            self.voluntary_switches.fetch_add(1, Ordering::Relaxed);
        } else {
            self.preemptions.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_ipi(&self) {
        self.ipis.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_idle_tick(&self) {
        self.idle_ticks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ProcessorStatsSnapshot {
        ProcessorStatsSnapshot {
            cpu: self.cpu,
            context_switches: self.context_switches.load(Ordering::Relaxed),
            voluntary_switches: self.voluntary_switches.load(Ordering::Relaxed),
            preemptions: self.preemptions.load(Ordering::Relaxed),
            ipis: self.ipis.load(Ordering::Relaxed),
            idle_ticks: self.idle_ticks.load(Ordering::Relaxed),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProcessorStatsSnapshot {
    pub cpu: ProcessorId,
    pub context_switches: u64,
    pub voluntary_switches: u64,
    pub preemptions: u64,
    pub ipis: u64,
    pub idle_ticks: u64,
}
