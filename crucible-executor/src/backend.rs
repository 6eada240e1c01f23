//! Container runtime abstraction trait.
//!
//! Allows swapping between a local Docker daemon and a deterministic
//! in-process fake without changing the orchestration logic.

use async_trait::async_trait;

use crucible_core::LanguageProfile;

use crate::{ExecutorError, SandboxHandle, Workspace};

/// Demultiplexed output captured from a sandbox.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[non_exhaustive]
pub struct SandboxOutput {
    /// Text written to standard output.
    pub stdout: String,

    /// Text written to standard error.
    pub stderr: String,
}

/// Container runtime abstraction.
///
/// Implementations must be `Send + Sync` to allow use across async
/// tasks. Each method performs exactly one runtime operation; deadlines
/// and teardown ordering are owned by the orchestrator, not the runtime.
#[async_trait]
pub trait SandboxRuntime: Send + Sync {
    /// Create an execution unit from the profile's image.
    ///
    /// The workspace file is bind-mounted read-only at the in-unit entry
    /// path, the working directory is fixed, network access is disabled,
    /// the configured memory ceiling and CPU weight are applied, and
    /// stdout/stderr capture is enabled.
    ///
    /// # Errors
    /// Returns [`ExecutorError::SandboxProvision`] if the unit cannot be
    /// created.
    async fn create(
        &self,
        profile: &LanguageProfile,
        workspace: &Workspace,
    ) -> Result<SandboxHandle, ExecutorError>;

    /// Start a created unit.
    ///
    /// # Errors
    /// Returns [`ExecutorError::SandboxRuntime`] if the unit cannot be
    /// started.
    async fn start(&self, handle: &SandboxHandle) -> Result<(), ExecutorError>;

    /// Block until the unit exits and return its exit code.
    ///
    /// Carries no internal deadline; the orchestrator wraps this call in
    /// its timeout.
    ///
    /// # Cancel Safety
    /// Must be cancel safe: the orchestrator drops this future when the
    /// deadline expires and then issues [`kill`](Self::kill).
    ///
    /// # Errors
    /// Returns [`ExecutorError::SandboxRuntime`] if the wait itself
    /// fails.
    async fn wait(&self, handle: &SandboxHandle) -> Result<i64, ExecutorError>;

    /// Forcibly terminate a running unit.
    ///
    /// # Errors
    /// Returns [`ExecutorError::SandboxRuntime`] if the kill fails.
    async fn kill(&self, handle: &SandboxHandle) -> Result<(), ExecutorError>;

    /// Forcibly remove the unit and all its resources.
    ///
    /// Must be idempotent: removing an already-removed unit is not an
    /// error.
    ///
    /// # Errors
    /// Returns [`ExecutorError::SandboxRuntime`] if the removal fails.
    async fn remove(&self, handle: &SandboxHandle) -> Result<(), ExecutorError>;

    /// Fetch the unit's log stream, demultiplexed by origin.
    ///
    /// Only called after the wait (or kill) has resolved, never
    /// concurrently with [`remove`](Self::remove).
    ///
    /// # Errors
    /// Returns [`ExecutorError::OutputCollection`] if the stream cannot
    /// be fetched.
    async fn output(&self, handle: &SandboxHandle) -> Result<SandboxOutput, ExecutorError>;

    /// Verify the runtime is reachable and ready.
    ///
    /// # Errors
    /// Returns [`ExecutorError::RuntimeUnavailable`] if the environment
    /// is not ready.
    async fn health_check(&self) -> Result<(), ExecutorError>;
}
