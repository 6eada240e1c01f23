//! Submission coordinator — the single public entry point.
//!
//! Sequences workspace staging, sandbox provisioning, the deadline wait,
//! output collection and unconditional teardown for one submission, and
//! converts every failure into a populated [`ExecutionResult`].

use std::time::Instant;

use crucible_core::{ExecutionRequest, ExecutionResult, LanguageRegistry, EXIT_CODE_UNSET};

use crate::backend::SandboxRuntime;
use crate::sandbox::{SandboxOrchestrator, WaitOutcome};
use crate::workspace::{ensure_staging_dir, Workspace};
use crate::{collector, ExecutorConfig, ExecutorError, SandboxHandle};

/// Coordinates the full lifecycle of one sandboxed execution.
///
/// Holds only read-only shared state (the registry and configuration);
/// `execute` calls are independent and may run concurrently, one per
/// worker task.
pub struct SubmissionRunner<R: SandboxRuntime> {
    runtime: R,
    registry: LanguageRegistry,
    config: ExecutorConfig,
}

impl<R: SandboxRuntime> SubmissionRunner<R> {
    /// Create a runner over the given runtime, registry and config.
    #[must_use]
    pub fn new(runtime: R, registry: LanguageRegistry, config: ExecutorConfig) -> Self {
        Self {
            runtime,
            registry,
            config,
        }
    }

    /// The underlying runtime.
    #[must_use]
    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    /// Verify the staging directory and container runtime are usable.
    ///
    /// Intended to be called once at process startup so a bad staging
    /// path or unreachable daemon is reported before the first request.
    ///
    /// # Errors
    /// Returns [`ExecutorError::WorkspaceProvision`] or
    /// [`ExecutorError::RuntimeUnavailable`] if the environment is not
    /// ready.
    pub async fn ensure_ready(&self) -> Result<(), ExecutorError> {
        ensure_staging_dir(&self.config.staging_dir).await?;
        self.runtime.health_check().await
    }

    /// Execute one submission and report the outcome.
    ///
    /// Never returns an error: every failure reachable from the
    /// orchestration steps is converted into a populated result with
    /// `exit_code` at the sentinel. Teardown of the workspace and the
    /// sandbox runs on every exit path.
    pub async fn execute(&self, request: &ExecutionRequest) -> ExecutionResult {
        let started = Instant::now();

        if request.source.trim().is_empty() || request.language.trim().is_empty() {
            return ExecutionResult::rejected("Source code and language must be provided.");
        }

        let Some(profile) = self.registry.lookup(&request.language) else {
            tracing::warn!(language = %request.language, "unsupported language requested");
            return ExecutionResult::rejected(format!(
                "Unsupported language: {}",
                request.language
            ));
        };

        let mut result = ExecutionResult::new();

        let workspace =
            match Workspace::create(&self.config.staging_dir, &request.source, profile).await {
                Ok(workspace) => workspace,
                Err(e) => {
                    tracing::error!(error = %e, "workspace provisioning failed");
                    result.error = format!("Server error: could not stage submission: {e}");
                    return result;
                }
            };

        let orchestrator = SandboxOrchestrator::new(&self.runtime);
        match orchestrator.provision(profile, &workspace).await {
            Ok(handle) => {
                self.run_in_sandbox(&orchestrator, &handle, &mut result).await;
                // Teardown runs on every path that provisioned, in fixed
                // order: destroy the sandbox, then release the workspace.
                orchestrator.destroy(&handle).await;
            }
            Err(e) => {
                tracing::error!(error = %e, "sandbox provisioning failed");
                result.error = format!("Server error: could not provision sandbox: {e}");
            }
        }
        workspace.release().await;

        tracing::info!(
            language = %request.language,
            exit_code = result.exit_code,
            timeout = result.timeout,
            elapsed_ms = started.elapsed().as_millis(),
            "execution finished"
        );
        result
    }

    /// Start, await and collect within an already-provisioned sandbox.
    ///
    /// Collection runs whenever the wait resolved — completed or timed
    /// out — and strictly before the caller destroys the sandbox.
    async fn run_in_sandbox(
        &self,
        orchestrator: &SandboxOrchestrator<'_, R>,
        handle: &SandboxHandle,
        result: &mut ExecutionResult,
    ) {
        let outcome = match self.start_and_wait(orchestrator, handle).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(
                    sandbox_id = %handle.short_id(),
                    error = %e,
                    "sandbox execution failed"
                );
                result.error = format!("Server error: {e}");
                result.exit_code = EXIT_CODE_UNSET;
                return;
            }
        };

        let timed_out = match outcome {
            WaitOutcome::Completed(exit_code) => {
                result.exit_code = exit_code;
                false
            }
            WaitOutcome::TimedOut => {
                result.timeout = true;
                result.exit_code = EXIT_CODE_UNSET;
                result.error = timeout_message(self.config.timeout_secs);
                true
            }
        };

        let output = collector::collect(&self.runtime, handle).await;
        result.output = output.stdout.trim().to_owned();
        merge_stderr(result, timed_out, &output.stderr);
    }

    async fn start_and_wait(
        &self,
        orchestrator: &SandboxOrchestrator<'_, R>,
        handle: &SandboxHandle,
    ) -> Result<WaitOutcome, ExecutorError> {
        orchestrator.start(handle).await?;
        orchestrator
            .await_completion(handle, self.config.timeout())
            .await
    }
}

/// The fixed explanatory message for a timed-out execution.
fn timeout_message(timeout_secs: u64) -> String {
    format!("Execution timed out after {timeout_secs} seconds.")
}

/// Merge collected stderr into the result's error field.
///
/// After a timeout the timeout message must survive: non-empty stderr is
/// appended as supplementary context. Otherwise the trimmed stderr
/// becomes the error text.
fn merge_stderr(result: &mut ExecutionResult, timed_out: bool, stderr: &str) {
    let stderr = stderr.trim();
    if timed_out {
        if !stderr.is_empty() {
            result.error = format!(
                "{}\nPartial stderr before timeout:\n{stderr}",
                result.error
            );
        }
    } else {
        result.error = stderr.to_owned();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_keeps_timeout_message_and_appends_stderr() {
        let mut result = ExecutionResult::new();
        result.timeout = true;
        result.error = timeout_message(2);

        merge_stderr(&mut result, true, "  boom\n");
        assert!(result.error.starts_with("Execution timed out after 2 seconds."));
        assert!(result.error.contains("Partial stderr before timeout:"));
        assert!(result.error.ends_with("boom"));
    }

    #[test]
    fn merge_leaves_timeout_message_alone_for_empty_stderr() {
        let mut result = ExecutionResult::new();
        result.error = timeout_message(2);

        merge_stderr(&mut result, true, "   \n");
        assert_eq!(result.error, "Execution timed out after 2 seconds.");
    }

    #[test]
    fn merge_replaces_error_with_trimmed_stderr_when_not_timed_out() {
        let mut result = ExecutionResult::new();
        merge_stderr(&mut result, false, "\nTraceback: oops\n\n");
        assert_eq!(result.error, "Traceback: oops");
    }

    proptest::proptest! {
        #[test]
        fn proptest_timeout_message_always_survives_merge(
            stderr in "\\PC{0,200}",
        ) {
            let mut result = ExecutionResult::new();
            let message = timeout_message(15);
            result.error = message.clone();

            merge_stderr(&mut result, true, &stderr);
            proptest::prop_assert!(
                result.error.starts_with(&message),
                "timeout message must stay the error prefix"
            );
            let trimmed = stderr.trim();
            if !trimmed.is_empty() {
                proptest::prop_assert!(
                    result.error.contains(trimmed),
                    "non-empty stderr must be appended as context"
                );
            }
        }
    }
}
