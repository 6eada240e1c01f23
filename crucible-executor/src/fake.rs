//! Deterministic in-process sandbox runtime.
//!
//! Maps program source text to a fixed `(stdout, stderr, exit_code,
//! delay)` tuple and records every lifecycle transition, so tests can
//! assert behavior and prove that nothing leaks — without a container
//! daemon.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crucible_core::LanguageProfile;

use crate::backend::{SandboxOutput, SandboxRuntime};
use crate::{ExecutorError, SandboxHandle, Workspace};

/// Canned behavior for one program text.
#[derive(Debug, Clone)]
pub struct FakeProgram {
    /// Text the program writes to standard output.
    pub stdout: String,

    /// Text the program writes to standard error.
    pub stderr: String,

    /// Exit code on natural completion.
    pub exit_code: i64,

    /// Simulated run time before exiting.
    pub delay: Duration,
}

impl FakeProgram {
    /// A program that writes the given streams and exits immediately.
    #[must_use]
    pub fn new(stdout: impl Into<String>, stderr: impl Into<String>, exit_code: i64) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
            exit_code,
            delay: Duration::ZERO,
        }
    }

    /// Set the simulated run time.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl Default for FakeProgram {
    fn default() -> Self {
        Self::new("", "", 0)
    }
}

#[derive(Debug)]
struct Instance {
    program: FakeProgram,
    started: bool,
}

#[derive(Debug, Default)]
struct FakeState {
    live: HashMap<String, Instance>,
    removed: Vec<String>,
    killed: Vec<String>,
    provisioned_total: usize,
}

/// Deterministic sandbox runtime for tests.
///
/// `create` reads the staged workspace file (exercising the same staging
/// path the real runtime mounts) and looks the source text up in the
/// program table; unknown text runs as an empty program that exits 0.
/// The configured streams are reported even after a kill, modeling
/// output flushed before termination.
#[derive(Debug, Default)]
pub struct FakeRuntime {
    programs: HashMap<String, FakeProgram>,
    state: Mutex<FakeState>,
    fail_create: bool,
    fail_start: bool,
    fail_wait: bool,
    fail_output: bool,
}

impl FakeRuntime {
    /// An empty runtime: every source runs as the default program.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register canned behavior for an exact source text.
    #[must_use]
    pub fn with_program(mut self, source: impl Into<String>, program: FakeProgram) -> Self {
        self.programs.insert(source.into(), program);
        self
    }

    /// Make `create` fail, simulating an image or daemon problem.
    #[must_use]
    pub fn failing_create(mut self) -> Self {
        self.fail_create = true;
        self
    }

    /// Make `start` fail after a successful create.
    #[must_use]
    pub fn failing_start(mut self) -> Self {
        self.fail_start = true;
        self
    }

    /// Make `wait` fail, simulating a runtime error mid-execution.
    #[must_use]
    pub fn failing_wait(mut self) -> Self {
        self.fail_wait = true;
        self
    }

    /// Make `output` fail, simulating a broken log transport.
    #[must_use]
    pub fn failing_output(mut self) -> Self {
        self.fail_output = true;
        self
    }

    /// Ids of sandboxes provisioned and not yet removed.
    #[must_use]
    pub fn live_sandboxes(&self) -> Vec<String> {
        self.lock().live.keys().cloned().collect()
    }

    /// Ids of sandboxes that were forcibly killed.
    #[must_use]
    pub fn killed_ids(&self) -> Vec<String> {
        self.lock().killed.clone()
    }

    /// Ids of sandboxes that were removed.
    #[must_use]
    pub fn removed_ids(&self) -> Vec<String> {
        self.lock().removed.clone()
    }

    /// Total number of sandboxes ever provisioned.
    #[must_use]
    pub fn provisioned_count(&self) -> usize {
        self.lock().provisioned_total
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn instance_program(&self, id: &str) -> Result<FakeProgram, ExecutorError> {
        self.lock()
            .live
            .get(id)
            .map(|instance| instance.program.clone())
            .ok_or_else(|| ExecutorError::SandboxRuntime {
                sandbox_id: id.to_owned(),
                reason: "no such sandbox".to_owned(),
            })
    }
}

#[async_trait]
impl SandboxRuntime for FakeRuntime {
    async fn create(
        &self,
        profile: &LanguageProfile,
        workspace: &Workspace,
    ) -> Result<SandboxHandle, ExecutorError> {
        if self.fail_create {
            return Err(ExecutorError::SandboxProvision {
                image: profile.image.clone(),
                reason: "injected create failure".to_owned(),
            });
        }

        let source = tokio::fs::read_to_string(workspace.path())
            .await
            .map_err(|e| ExecutorError::SandboxProvision {
                image: profile.image.clone(),
                reason: format!("cannot read staged workspace: {e}"),
            })?;
        let program = self.programs.get(&source).cloned().unwrap_or_default();

        let id = format!("fake-{}", Uuid::new_v4());
        let mut state = self.lock();
        state.provisioned_total += 1;
        state.live.insert(
            id.clone(),
            Instance {
                program,
                started: false,
            },
        );
        Ok(SandboxHandle::new(id, profile.image.clone()))
    }

    async fn start(&self, handle: &SandboxHandle) -> Result<(), ExecutorError> {
        if self.fail_start {
            return Err(ExecutorError::SandboxRuntime {
                sandbox_id: handle.id.clone(),
                reason: "injected start failure".to_owned(),
            });
        }
        let mut state = self.lock();
        match state.live.get_mut(&handle.id) {
            Some(instance) => {
                instance.started = true;
                Ok(())
            }
            None => Err(ExecutorError::SandboxRuntime {
                sandbox_id: handle.id.clone(),
                reason: "no such sandbox".to_owned(),
            }),
        }
    }

    async fn wait(&self, handle: &SandboxHandle) -> Result<i64, ExecutorError> {
        if self.fail_wait {
            return Err(ExecutorError::SandboxRuntime {
                sandbox_id: handle.id.clone(),
                reason: "injected wait failure".to_owned(),
            });
        }
        let program = self.instance_program(&handle.id)?;
        tokio::time::sleep(program.delay).await;
        Ok(program.exit_code)
    }

    async fn kill(&self, handle: &SandboxHandle) -> Result<(), ExecutorError> {
        let mut state = self.lock();
        if !state.live.contains_key(&handle.id) {
            return Err(ExecutorError::SandboxRuntime {
                sandbox_id: handle.id.clone(),
                reason: "no such sandbox".to_owned(),
            });
        }
        state.killed.push(handle.id.clone());
        Ok(())
    }

    async fn remove(&self, handle: &SandboxHandle) -> Result<(), ExecutorError> {
        let mut state = self.lock();
        if state.live.remove(&handle.id).is_some() {
            state.removed.push(handle.id.clone());
        }
        // Removing an already-removed sandbox is a no-op.
        Ok(())
    }

    async fn output(&self, handle: &SandboxHandle) -> Result<SandboxOutput, ExecutorError> {
        if self.fail_output {
            return Err(ExecutorError::OutputCollection {
                sandbox_id: handle.id.clone(),
                reason: "injected output failure".to_owned(),
            });
        }
        let program = self.instance_program(&handle.id)?;
        Ok(SandboxOutput {
            stdout: program.stdout,
            stderr: program.stderr,
        })
    }

    async fn health_check(&self) -> Result<(), ExecutorError> {
        Ok(())
    }
}
