//! Kernel Directive Test Suite
//!
//! - Thread lifecycle and priority directives
//! - Clock tick, sleeps and timed waits
//! - Scheduler migration and affinity
//! - Remote and global objects

mod threads;
