//! Core domain types
//!
//! This module contains the domain structures shared by the adapters (which
//! produce raw provider data), the runner (which advances jobs) and the CLI
//! (which renders events and outcomes).

pub mod event;
pub mod job;
pub mod outcome;
pub mod provider;
