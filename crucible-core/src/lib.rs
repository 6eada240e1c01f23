//! Core types for the Crucible sandboxed code-execution service.
//!
//! Defines the fundamental domain types: language profiles, the static
//! language registry, and the execution request/result pair exchanged
//! with the executor.

#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]

pub mod execution;
pub mod language;

pub use execution::{ExecutionRequest, ExecutionResult, EXIT_CODE_UNSET};
pub use language::{LanguageProfile, LanguageRegistry};
