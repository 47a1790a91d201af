//! Scheduler layer for the runner
//!
//! Drives a submitted job through its status lifecycle until it reaches a
//! terminal state.

pub mod poller;

pub use poller::{StatusPoller, TickOutcome};
