//! Error types for the executor crate.

use std::path::PathBuf;

/// Errors that can occur while orchestrating a sandboxed execution.
///
/// None of these escape [`SubmissionRunner::execute`]; the coordinator
/// converts every variant into a populated `ExecutionResult` before
/// returning to the caller.
///
/// [`SubmissionRunner::execute`]: crate::SubmissionRunner::execute
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ExecutorError {
    /// The container runtime daemon is unreachable or misconfigured.
    #[error("container runtime unavailable: {reason}")]
    RuntimeUnavailable { reason: String },

    /// The staging file could not be created or written.
    #[error("workspace provisioning failed at {path}: {reason}")]
    WorkspaceProvision { path: PathBuf, reason: String },

    /// The sandbox could not be created from the language image.
    #[error("sandbox provisioning failed for image {image}: {reason}")]
    SandboxProvision { image: String, reason: String },

    /// A runtime operation on a provisioned sandbox failed.
    #[error("sandbox runtime failure for {sandbox_id}: {reason}")]
    SandboxRuntime { sandbox_id: String, reason: String },

    /// The sandbox log stream could not be fetched.
    #[error("output collection failed for {sandbox_id}: {reason}")]
    OutputCollection { sandbox_id: String, reason: String },

    /// Underlying I/O error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
