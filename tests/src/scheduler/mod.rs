//! Scheduler Test Suite
//!
//! - Priority bitmap invariants and iteration order
//! - Ready queues: FIFO stability, head insertion, bitmap consistency
//! - Heir selection and dispatch on one and several processors

mod bitmap;
