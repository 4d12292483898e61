//! Thread Table Test Suite
//!
//! - Priority aggregation: base priority plus resource contributions

mod priority;
