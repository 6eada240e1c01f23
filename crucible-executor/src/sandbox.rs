//! Sandbox lifecycle orchestration.
//!
//! Drives one sandbox through `Created → Running → {Completed, TimedOut,
//! Failed} → Removed` on top of a [`SandboxRuntime`].

use std::time::Duration;

use crucible_core::LanguageProfile;

use crate::backend::SandboxRuntime;
use crate::{ExecutorError, SandboxHandle, Workspace};

/// Outcome of waiting for a sandbox to finish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The submission ran to completion with this exit code.
    Completed(i64),

    /// The deadline expired; the sandbox has been forcibly killed.
    TimedOut,
}

/// Lifecycle operations for a single sandbox.
pub struct SandboxOrchestrator<'r, R: SandboxRuntime> {
    runtime: &'r R,
}

impl<'r, R: SandboxRuntime> SandboxOrchestrator<'r, R> {
    /// Create an orchestrator over the given runtime.
    #[must_use]
    pub fn new(runtime: &'r R) -> Self {
        Self { runtime }
    }

    /// Provision a sandbox bound to the given workspace.
    ///
    /// # Errors
    /// Propagates [`SandboxRuntime::create`] failures.
    pub async fn provision(
        &self,
        profile: &LanguageProfile,
        workspace: &Workspace,
    ) -> Result<SandboxHandle, ExecutorError> {
        let handle = self.runtime.create(profile, workspace).await?;
        tracing::info!(
            sandbox_id = %handle.short_id(),
            image = %handle.image,
            "sandbox provisioned"
        );
        Ok(handle)
    }

    /// Transition the sandbox from `Created` to `Running`.
    ///
    /// # Errors
    /// Propagates [`SandboxRuntime::start`] failures.
    pub async fn start(&self, handle: &SandboxHandle) -> Result<(), ExecutorError> {
        self.runtime.start(handle).await?;
        tracing::debug!(sandbox_id = %handle.short_id(), "sandbox started");
        Ok(())
    }

    /// Block until the sandbox exits or `timeout` expires.
    ///
    /// On expiry the sandbox is forcibly killed — no cooperative signal
    /// is attempted first — and [`WaitOutcome::TimedOut`] is reported.
    /// A failed kill is logged and swallowed; the forced removal in
    /// [`destroy`](Self::destroy) is the backstop.
    ///
    /// # Errors
    /// Propagates runtime failures from the wait itself.
    pub async fn await_completion(
        &self,
        handle: &SandboxHandle,
        timeout: Duration,
    ) -> Result<WaitOutcome, ExecutorError> {
        match tokio::time::timeout(timeout, self.runtime.wait(handle)).await {
            Ok(Ok(exit_code)) => {
                tracing::info!(
                    sandbox_id = %handle.short_id(),
                    exit_code,
                    "sandbox completed"
                );
                Ok(WaitOutcome::Completed(exit_code))
            }
            Ok(Err(e)) => Err(e),
            Err(_elapsed) => {
                tracing::warn!(
                    sandbox_id = %handle.short_id(),
                    timeout_secs = timeout.as_secs(),
                    "deadline expired, killing sandbox"
                );
                if let Err(e) = self.runtime.kill(handle).await {
                    tracing::warn!(
                        sandbox_id = %handle.short_id(),
                        error = %e,
                        "failed to kill timed-out sandbox"
                    );
                }
                Ok(WaitOutcome::TimedOut)
            }
        }
    }

    /// Forcibly remove the sandbox and all its resources.
    ///
    /// Idempotent and best-effort: failures are logged, never
    /// propagated. Always invoked as the final sandbox step of every
    /// execution.
    pub async fn destroy(&self, handle: &SandboxHandle) {
        match self.runtime.remove(handle).await {
            Ok(()) => tracing::debug!(sandbox_id = %handle.short_id(), "sandbox removed"),
            Err(e) => {
                tracing::warn!(
                    sandbox_id = %handle.short_id(),
                    error = %e,
                    "failed to remove sandbox"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::fake::{FakeProgram, FakeRuntime};

    use super::*;

    fn test_profile() -> LanguageProfile {
        LanguageProfile::new("test-image:latest", "script.py")
    }

    async fn staged(source: &str) -> Workspace {
        let dir = std::env::temp_dir().join(format!("crucible-orch-test-{}", uuid::Uuid::new_v4()));
        Workspace::create(&dir, source, &test_profile())
            .await
            .expect("staging must succeed")
    }

    #[tokio::test]
    async fn provision_propagates_create_failure() {
        let runtime = FakeRuntime::new().failing_create();
        let orchestrator = SandboxOrchestrator::new(&runtime);
        let workspace = staged("x").await;

        let result = orchestrator.provision(&test_profile(), &workspace).await;
        assert!(
            matches!(result, Err(ExecutorError::SandboxProvision { .. })),
            "provision must surface the runtime create failure"
        );
        workspace.release().await;
    }

    #[tokio::test(start_paused = true)]
    async fn await_completion_times_out_and_kills() {
        let source = "while true: pass";
        let runtime = FakeRuntime::new().with_program(
            source,
            FakeProgram::new("", "", 0).with_delay(Duration::from_secs(600)),
        );
        let orchestrator = SandboxOrchestrator::new(&runtime);
        let workspace = staged(source).await;

        let handle = orchestrator
            .provision(&test_profile(), &workspace)
            .await
            .expect("provision must succeed");
        orchestrator.start(&handle).await.expect("start must succeed");

        let outcome = orchestrator
            .await_completion(&handle, Duration::from_secs(2))
            .await
            .expect("await_completion must not error on timeout");
        assert_eq!(outcome, WaitOutcome::TimedOut);
        assert!(
            runtime.killed_ids().contains(&handle.id),
            "expiry must force-kill the sandbox"
        );

        orchestrator.destroy(&handle).await;
        workspace.release().await;
    }

    #[tokio::test]
    async fn await_completion_returns_exit_code_on_natural_exit() {
        let source = "exit(3)";
        let runtime = FakeRuntime::new().with_program(source, FakeProgram::new("", "", 3));
        let orchestrator = SandboxOrchestrator::new(&runtime);
        let workspace = staged(source).await;

        let handle = orchestrator
            .provision(&test_profile(), &workspace)
            .await
            .expect("provision must succeed");
        orchestrator.start(&handle).await.expect("start must succeed");

        let outcome = orchestrator
            .await_completion(&handle, Duration::from_secs(5))
            .await
            .expect("await_completion must succeed");
        assert_eq!(outcome, WaitOutcome::Completed(3));
        assert!(runtime.killed_ids().is_empty(), "natural exit must not kill");

        orchestrator.destroy(&handle).await;
        workspace.release().await;
    }

    #[tokio::test]
    async fn destroy_is_idempotent_and_swallows_failures() {
        let runtime = FakeRuntime::new();
        let orchestrator = SandboxOrchestrator::new(&runtime);
        let workspace = staged("x").await;

        let handle = orchestrator
            .provision(&test_profile(), &workspace)
            .await
            .expect("provision must succeed");

        orchestrator.destroy(&handle).await;
        assert!(runtime.live_sandboxes().is_empty());

        // Destroying again must not panic or error.
        orchestrator.destroy(&handle).await;
        workspace.release().await;
    }
}
