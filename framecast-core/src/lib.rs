//! Framecast Core
//!
//! Core types and abstractions for the Framecast image-to-video job client.
//!
//! This crate contains:
//! - Domain types: the Job lifecycle, failure taxonomy, progress events and outcomes
//! - DTOs: the request handed from the configuration layer to the runner
//! - Status normalization: per-provider status vocabularies mapped onto one canonical model

pub mod domain;
pub mod dto;
pub mod status;

pub use domain::job::{FailureKind, Job, JobError, JobState, JobTransitionError, ResultLocator};
pub use domain::provider::ProviderKind;
pub use status::{CanonicalState, normalize};
