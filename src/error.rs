//! Error taxonomy
//!
//! - [`KernelError`]: every recoverable outcome a directive reports to its
//!   caller (configuration errors, usage errors, timing outcomes).
//! - [`InternalError`]: scheduler invariant violations. These are never
//!   returned; [`fatal`] logs them and halts.
//! - [`ConfigError`]: rejected [`crate::KernelConfig`] values.

use core::fmt;

/// Result type of every directive.
pub type KernelResult<T> = Result<T, KernelError>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rejected at creation time, nothing was registered.
    Configuration,
    /// Rejected at use time, object state unchanged.
    Usage,
    /// Normal outcome of a blocking operation.
    Timing,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KernelError {
    /// Attribute combination names no object variant, or the operation is
    /// not defined for this variant / scheduler.
    NotDefined,
    /// Initial count out of range for the class.
    InvalidNumber,
    /// Priority or ceiling not valid, or ceiling violated by the caller.
    InvalidPriority,
    /// No free object or thread slot.
    TooMany,
    /// Handle does not name a live object or thread.
    InvalidId,
    /// Release by a thread that does not own the mutex.
    NotOwner,
    /// Object still owned, or thread still owns mutexes.
    ResourceInUse,
    /// Resource unavailable and the caller did not wait, counter overflow,
    /// recursive MrsP acquire, or wait flushed.
    Unsatisfied,
    /// Blocking would close a cycle of mutex owners.
    Deadlock,
    /// Processor set is empty or names a processor that does not exist.
    InvalidCpuSet,
    /// Thread is not in a state that allows the operation.
    IncorrectState,
    /// Timed wait expired.
    Timeout,
    /// Object deleted while the caller was waiting on it.
    Deleted,
    /// Operation not allowed on an object of another node.
    IllegalOnRemoteObject,
}

impl KernelError {
    pub const fn as_str(self) -> &'static str {
        match self {
            KernelError::NotDefined => "not defined",
            KernelError::InvalidNumber => "invalid number",
            KernelError::InvalidPriority => "invalid priority",
            KernelError::TooMany => "too many",
            KernelError::InvalidId => "invalid id",
            KernelError::NotOwner => "not owner of resource",
            KernelError::ResourceInUse => "resource in use",
            KernelError::Unsatisfied => "unsatisfied",
            KernelError::Deadlock => "deadlock",
            KernelError::InvalidCpuSet => "invalid processor set",
            KernelError::IncorrectState => "incorrect state",
            KernelError::Timeout => "timeout",
            KernelError::Deleted => "object was deleted",
            KernelError::IllegalOnRemoteObject => "illegal on remote object",
        }
    }

    pub const fn kind(self) -> ErrorKind {
        match self {
            KernelError::NotDefined
            | KernelError::InvalidNumber
            | KernelError::InvalidPriority
            | KernelError::TooMany => ErrorKind::Configuration,
            KernelError::Timeout | KernelError::Deleted => ErrorKind::Timing,
            KernelError::InvalidId
            | KernelError::NotOwner
            | KernelError::ResourceInUse
            | KernelError::Unsatisfied
            | KernelError::Deadlock
            | KernelError::InvalidCpuSet
            | KernelError::IncorrectState
            | KernelError::IllegalOnRemoteObject => ErrorKind::Usage,
        }
    }
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scheduler state corruption. Continuing could drop or duplicate a thread.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InternalError {
    /// `highest()` on an empty priority bitmap.
    EmptyBitmap,
    /// Bitmap bit set for a priority whose ready queue is empty.
    BitmapQueueMismatch { priority: u8 },
    /// Node extracted from a queue that does not contain it.
    NotInQueue { thread: u16 },
    /// Node inserted while already linked in a queue.
    AlreadyQueued { thread: u16 },
    /// Mutex nesting counter would drop below zero.
    NestingUnderflow,
    /// A processor has no heir candidate at all.
    NoHeir { processor: u16 },
    /// Thread table and scheduler disagree about a thread.
    ThreadStateCorrupted { thread: u16 },
}

impl InternalError {
    pub const fn as_str(&self) -> &'static str {
        match self {
            InternalError::EmptyBitmap => "priority bitmap empty",
            InternalError::BitmapQueueMismatch { .. } => "bitmap and ready queue disagree",
            InternalError::NotInQueue { .. } => "node not in queue",
            InternalError::AlreadyQueued { .. } => "node already queued",
            InternalError::NestingUnderflow => "mutex nesting underflow",
            InternalError::NoHeir { .. } => "no heir for processor",
            InternalError::ThreadStateCorrupted { .. } => "thread state corrupted",
        }
    }
}

impl fmt::Display for InternalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InternalError::BitmapQueueMismatch { priority } => {
                write!(f, "{} (priority {})", self.as_str(), priority)
            }
            InternalError::NotInQueue { thread }
            | InternalError::AlreadyQueued { thread }
            | InternalError::ThreadStateCorrupted { thread } => {
                write!(f, "{} (thread {})", self.as_str(), thread)
            }
            InternalError::NoHeir { processor } => {
                write!(f, "{} (cpu {})", self.as_str(), processor)
            }
            _ => f.write_str(self.as_str()),
        }
    }
}

/// Halt on a scheduler invariant violation.
#[cold]
#[track_caller]
pub fn fatal(error: InternalError) -> ! {
    crate::kfatal!("rtcore internal error: {}", error);
    panic!("rtcore internal error: {}", error)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// `max_priority` must leave room for one schedulable level between the
    /// two sentinels.
    PriorityRange,
    /// Zero threads, or not enough thread slots for the idle threads.
    ThreadCount,
    ObjectCount,
    /// Zero processors or more than the mask width.
    ProcessorCount,
    /// No scheduler instance, or an instance without processors.
    EmptyScheduler,
    /// A processor is owned by two instances.
    ProcessorShared { processor: u16 },
    /// A processor is owned by no instance.
    ProcessorUnassigned { processor: u16 },
    /// A scheduler names a processor that does not exist.
    ProcessorMissing { processor: u16 },
    /// Multiprocessor layout requested without the `smp` feature.
    SmpDisabled,
    /// Node number 0 is reserved.
    InvalidNode,
    /// Malformed `key=value` token.
    Malformed,
}

impl ConfigError {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ConfigError::PriorityRange => "max priority out of range",
            ConfigError::ThreadCount => "invalid thread count",
            ConfigError::ObjectCount => "invalid object count",
            ConfigError::ProcessorCount => "invalid processor count",
            ConfigError::EmptyScheduler => "scheduler without processors",
            ConfigError::ProcessorShared { .. } => "processor owned by two schedulers",
            ConfigError::ProcessorUnassigned { .. } => "processor owned by no scheduler",
            ConfigError::ProcessorMissing { .. } => "scheduler names missing processor",
            ConfigError::SmpDisabled => "multiprocessor configuration without smp support",
            ConfigError::InvalidNode => "invalid node number",
            ConfigError::Malformed => "malformed configuration token",
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ProcessorShared { processor }
            | ConfigError::ProcessorUnassigned { processor }
            | ConfigError::ProcessorMissing { processor } => {
                write!(f, "{} (cpu {})", self.as_str(), processor)
            }
            _ => f.write_str(self.as_str()),
        }
    }
}
