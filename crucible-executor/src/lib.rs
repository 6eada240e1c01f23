//! Disposable-container execution of untrusted code submissions.
//!
//! Given source text and a declared language, stages the submission in
//! an ephemeral workspace, runs it in an isolated container under fixed
//! resource and time ceilings, captures its output and exit status, and
//! tears every provisioned resource down on every exit path.

#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]

pub mod backend;
pub mod collector;
pub mod config;
pub mod docker;
pub mod error;
pub mod fake;
pub mod handle;
pub mod runner;
pub mod sandbox;
pub mod workspace;

pub use backend::{SandboxOutput, SandboxRuntime};
pub use config::ExecutorConfig;
pub use docker::DockerRuntime;
pub use error::ExecutorError;
pub use fake::{FakeProgram, FakeRuntime};
pub use handle::SandboxHandle;
pub use runner::SubmissionRunner;
pub use sandbox::{SandboxOrchestrator, WaitOutcome};
pub use workspace::Workspace;
