//! Docker container runtime.
//!
//! Talks to the local Docker daemon through the `bollard` Engine API
//! client. One container per submission, removed after every execution.

use async_trait::async_trait;
use bollard::container::{
    Config, CreateContainerOptions, KillContainerOptions, LogOutput, LogsOptions,
    RemoveContainerOptions, StartContainerOptions, WaitContainerOptions,
};
use bollard::models::HostConfig;
use bollard::Docker;
use futures_util::StreamExt;
use uuid::Uuid;

use crucible_core::LanguageProfile;

use crate::backend::{SandboxOutput, SandboxRuntime};
use crate::{ExecutorConfig, ExecutorError, SandboxHandle, Workspace};

/// Fixed working directory inside every sandbox. Entry files are
/// mounted under this path, e.g. `/app/script.py`.
const SANDBOX_WORKDIR: &str = "/app";

/// Sandbox runtime backed by the Docker Engine API.
#[derive(Debug, Clone)]
pub struct DockerRuntime {
    docker: Docker,
    memory_limit_bytes: i64,
    cpu_shares: i64,
}

impl DockerRuntime {
    /// Connect to the daemon over the platform's local socket
    /// (`/var/run/docker.sock` on Unix).
    ///
    /// # Errors
    /// Returns [`ExecutorError::RuntimeUnavailable`] if the client
    /// cannot be constructed.
    pub fn connect(config: &ExecutorConfig) -> Result<Self, ExecutorError> {
        let docker = Docker::connect_with_local_defaults().map_err(|e| {
            ExecutorError::RuntimeUnavailable {
                reason: e.to_string(),
            }
        })?;
        Ok(Self {
            docker,
            memory_limit_bytes: config.memory_limit_bytes,
            cpu_shares: config.cpu_shares,
        })
    }

    fn entry_path(entry_file: &str) -> String {
        format!("{SANDBOX_WORKDIR}/{entry_file}")
    }
}

#[async_trait]
impl SandboxRuntime for DockerRuntime {
    async fn create(
        &self,
        profile: &LanguageProfile,
        workspace: &Workspace,
    ) -> Result<SandboxHandle, ExecutorError> {
        // The host side of the bind is the path as seen by the Docker
        // daemon; staging-dir path equivalence is an operational
        // precondition.
        let bind = format!(
            "{}:{}:ro",
            workspace.path().display(),
            Self::entry_path(workspace.entry_file())
        );

        let host_config = HostConfig {
            binds: Some(vec![bind]),
            memory: Some(self.memory_limit_bytes),
            cpu_shares: Some(self.cpu_shares),
            ..Default::default()
        };

        let container_config = Config {
            image: Some(profile.image.clone()),
            working_dir: Some(SANDBOX_WORKDIR.to_owned()),
            network_disabled: Some(true),
            attach_stdout: Some(true),
            attach_stderr: Some(true),
            host_config: Some(host_config),
            ..Default::default()
        };

        let name = format!("crucible-{}", Uuid::new_v4());
        let options = CreateContainerOptions {
            name: name.as_str(),
            platform: None,
        };

        let response = self
            .docker
            .create_container(Some(options), container_config)
            .await
            .map_err(|e| ExecutorError::SandboxProvision {
                image: profile.image.clone(),
                reason: e.to_string(),
            })?;

        Ok(SandboxHandle::new(response.id, profile.image.clone()))
    }

    async fn start(&self, handle: &SandboxHandle) -> Result<(), ExecutorError> {
        self.docker
            .start_container(&handle.id, None::<StartContainerOptions<String>>)
            .await
            .map_err(|e| ExecutorError::SandboxRuntime {
                sandbox_id: handle.id.clone(),
                reason: format!("start failed: {e}"),
            })
    }

    async fn wait(&self, handle: &SandboxHandle) -> Result<i64, ExecutorError> {
        let options = WaitContainerOptions {
            condition: "not-running",
        };
        let mut stream = self.docker.wait_container(&handle.id, Some(options));

        match stream.next().await {
            Some(Ok(response)) => Ok(response.status_code),
            // bollard surfaces a non-zero exit status as this error.
            Some(Err(bollard::errors::Error::DockerContainerWaitError { code, .. })) => Ok(code),
            Some(Err(e)) => Err(ExecutorError::SandboxRuntime {
                sandbox_id: handle.id.clone(),
                reason: format!("wait failed: {e}"),
            }),
            None => Err(ExecutorError::SandboxRuntime {
                sandbox_id: handle.id.clone(),
                reason: "wait stream ended without a status".to_owned(),
            }),
        }
    }

    async fn kill(&self, handle: &SandboxHandle) -> Result<(), ExecutorError> {
        self.docker
            .kill_container(&handle.id, None::<KillContainerOptions<String>>)
            .await
            .map_err(|e| ExecutorError::SandboxRuntime {
                sandbox_id: handle.id.clone(),
                reason: format!("kill failed: {e}"),
            })
    }

    async fn remove(&self, handle: &SandboxHandle) -> Result<(), ExecutorError> {
        let options = RemoveContainerOptions {
            force: true,
            ..Default::default()
        };
        match self.docker.remove_container(&handle.id, Some(options)).await {
            Ok(()) => Ok(()),
            // Already gone counts as removed.
            Err(bollard::errors::Error::DockerResponseServerError {
                status_code: 404, ..
            }) => Ok(()),
            Err(e) => Err(ExecutorError::SandboxRuntime {
                sandbox_id: handle.id.clone(),
                reason: format!("remove failed: {e}"),
            }),
        }
    }

    async fn output(&self, handle: &SandboxHandle) -> Result<SandboxOutput, ExecutorError> {
        let options = LogsOptions::<String> {
            stdout: true,
            stderr: true,
            follow: false,
            timestamps: false,
            ..Default::default()
        };

        let mut stream = self.docker.logs(&handle.id, Some(options));
        let mut output = SandboxOutput::default();
        let mut collected_any = false;

        while let Some(item) = stream.next().await {
            match item {
                Ok(LogOutput::StdOut { message } | LogOutput::Console { message }) => {
                    output.stdout.push_str(&String::from_utf8_lossy(&message));
                    collected_any = true;
                }
                Ok(LogOutput::StdErr { message }) => {
                    output.stderr.push_str(&String::from_utf8_lossy(&message));
                    collected_any = true;
                }
                Ok(LogOutput::StdIn { .. }) => {}
                Err(e) if collected_any => {
                    // Keep what we have; the collector reports partial
                    // output rather than losing it.
                    tracing::warn!(
                        sandbox_id = %handle.short_id(),
                        error = %e,
                        "log stream broke mid-collection, returning partial output"
                    );
                    break;
                }
                Err(e) => {
                    return Err(ExecutorError::OutputCollection {
                        sandbox_id: handle.id.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        Ok(output)
    }

    async fn health_check(&self) -> Result<(), ExecutorError> {
        self.docker
            .ping()
            .await
            .map(|_| ())
            .map_err(|e| ExecutorError::RuntimeUnavailable {
                reason: format!("daemon ping failed: {e}"),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_path_joins_workdir_and_entry_file() {
        assert_eq!(DockerRuntime::entry_path("script.py"), "/app/script.py");
        assert_eq!(DockerRuntime::entry_path("Main.java"), "/app/Main.java");
    }
}
