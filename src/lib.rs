//! NexaOS real-time core
//!
//! Fixed-priority preemptive scheduling and the synchronization objects whose
//! blocking and unblocking feed it:
//!
//! - counting and simple binary semaphores
//! - recursive mutexes without protocol, with priority inheritance, and with
//!   priority ceiling
//! - MrsP mutexes (per-scheduler ceilings with cross-processor helping)
//!
//! Everything hangs off a [`Kernel`] value built from a [`KernelConfig`].
//! Board support code supplies the [`port::CpuPort`] that performs the actual
//! context switches, and optionally a [`port::RemoteTransport`] for objects
//! living on other nodes.

#![no_std]

extern crate alloc;

pub mod config;
pub mod error;
pub mod kernel;
pub mod logger;
pub mod port;
pub mod scheduler;
pub mod sync;
pub mod thread;

pub use config::{KernelConfig, SchedulerConfig};
pub use error::{fatal, ConfigError, ErrorKind, InternalError, KernelError, KernelResult};
pub use kernel::{AcquireOutcome, Kernel};
pub use scheduler::{Priority, ProcessorId, ProcessorMask, SchedulerId, ThreadId};
pub use sync::{AttributeSet, ObjectId, Variant, WaitPolicy};
pub use thread::{ThreadState, WaitResult};

#[macro_export]
macro_rules! klog {
    ($level:expr, $($arg:tt)*) => {{
        let level = $level;
        if $crate::logger::enabled(level) {
            $crate::logger::log(level, format_args!($($arg)*));
        }
    }};
}

#[macro_export]
macro_rules! kfatal {
    ($($arg:tt)*) => {{
        $crate::klog!($crate::logger::LogLevel::FATAL, $($arg)*);
    }};
}

#[macro_export]
macro_rules! kerror {
    ($($arg:tt)*) => {{
        $crate::klog!($crate::logger::LogLevel::ERROR, $($arg)*);
    }};
}

#[macro_export]
macro_rules! kwarn {
    ($($arg:tt)*) => {{
        $crate::klog!($crate::logger::LogLevel::WARN, $($arg)*);
    }};
}

#[macro_export]
macro_rules! kinfo {
    ($($arg:tt)*) => {{
        $crate::klog!($crate::logger::LogLevel::INFO, $($arg)*);
    }};
}

#[macro_export]
macro_rules! kdebug {
    ($($arg:tt)*) => {{
        $crate::klog!($crate::logger::LogLevel::DEBUG, $($arg)*);
    }};
}

#[macro_export]
macro_rules! ktrace {
    ($($arg:tt)*) => {{
        $crate::klog!($crate::logger::LogLevel::TRACE, $($arg)*);
    }};
}
