//! NexaOS Real-Time Core Test Suite
//!
//! Host-side tests for the scheduling and synchronization core. The core is
//! `no_std`, but links into a std test binary unchanged; the CPU port and the
//! inter-node transport are replaced by the recording mocks in [`mock`].
//!
//! # Layout
//! - `scheduler`: priority bitmap, ready queues, heir selection, dispatch
//! - `sync`: attribute resolution, semaphores, mutexes and their protocols
//! - `kernel`: thread directives, timeouts, affinity, remote objects
//! - `thread`: priority aggregation
//! - `logger`, `config`: ambient infrastructure

pub mod mock;

#[cfg(test)]
mod kernel;
#[cfg(test)]
mod logger;
#[cfg(test)]
mod scheduler;
#[cfg(test)]
mod thread;
