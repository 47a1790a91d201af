//! Data Transfer Objects
//!
//! Values built once by the configuration layer (the CLI) and handed to the
//! runner and adapters. The runner treats them as opaque.

pub mod job;
