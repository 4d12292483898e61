//! Scheduler type definitions
//!
//! Identifiers, priorities and processor masks shared by the scheduler,
//! thread and synchronization modules.

use core::fmt;

/// Thread priority. Lower value = more urgent.
pub type Priority = u8;

/// Most urgent sentinel. Never assigned to a schedulable thread.
pub const PRIORITY_HIGHEST: Priority = 0;

/// Upper bound for `KernelConfig::max_priority`.
pub const PRIORITY_LEVELS_MAX: usize = 256;

/// Maximum number of processors (width of [`ProcessorMask`]).
pub const MAX_PROCESSORS: usize = 64;

/// Index of a thread control block in the thread table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ThreadId(pub u16);

impl ThreadId {
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProcessorId(pub u16);

impl ProcessorId {
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ProcessorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cpu{}", self.0)
    }
}

/// Index of a scheduler instance (one scheduling domain).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SchedulerId(pub u16);

impl SchedulerId {
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SchedulerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sched{}", self.0)
    }
}

/// Set of processors, one bit per processor index.
#[derive(Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct ProcessorMask(pub u64);

impl ProcessorMask {
    pub const EMPTY: ProcessorMask = ProcessorMask(0);

    /// Mask of the first `count` processors.
    pub const fn first(count: usize) -> Self {
        if count >= MAX_PROCESSORS {
            ProcessorMask(u64::MAX)
        } else {
            ProcessorMask((1u64 << count) - 1)
        }
    }

    pub const fn single(cpu: ProcessorId) -> Self {
        ProcessorMask(1u64 << cpu.0)
    }

    #[inline]
    pub const fn contains(self, cpu: ProcessorId) -> bool {
        (cpu.0 as usize) < MAX_PROCESSORS && self.0 & (1u64 << cpu.0) != 0
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_subset_of(self, other: ProcessorMask) -> bool {
        self.0 & !other.0 == 0
    }

    #[inline]
    pub const fn intersects(self, other: ProcessorMask) -> bool {
        self.0 & other.0 != 0
    }

    pub fn insert(&mut self, cpu: ProcessorId) {
        self.0 |= 1u64 << cpu.0;
    }

    pub const fn count(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Iterate processors in ascending index order.
    pub fn iter(self) -> impl Iterator<Item = ProcessorId> {
        let mut bits = self.0;
        core::iter::from_fn(move || {
            if bits == 0 {
                return None;
            }
            let cpu = bits.trailing_zeros() as u16;
            bits &= bits - 1;
            Some(ProcessorId(cpu))
        })
    }
}

impl fmt::Debug for ProcessorMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProcessorMask({:#x})", self.0)
    }
}

/// Where a node goes inside its new ready queue after a priority change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Placement {
    /// Behind every thread already ready at that priority.
    Tail,
    /// In front of them; the thread keeps its place among equals.
    Head,
}
