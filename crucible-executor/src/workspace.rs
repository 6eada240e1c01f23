//! Ephemeral staging workspaces for submitted source text.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crucible_core::LanguageProfile;

use crate::ExecutorError;

/// A staging file holding exactly one submission's source for the
/// duration of one execution.
///
/// The file is exclusively owned by that execution and must be released
/// at its end regardless of outcome. Dropping a `Workspace` does NOT
/// delete the file; call [`release`](Self::release) explicitly.
#[derive(Debug)]
pub struct Workspace {
    path: PathBuf,
    entry_file: String,
}

impl Workspace {
    /// Stage `source` in a uniquely named file under `staging_dir`.
    ///
    /// The file name embeds a fresh UUID so concurrent executions never
    /// collide, and creation uses create-new semantics so a collision
    /// surfaces as an error instead of clobbering another submission.
    /// Source text is written as UTF-8.
    ///
    /// # Errors
    /// Returns [`ExecutorError::WorkspaceProvision`] if the staging
    /// directory or the file cannot be created or written.
    pub async fn create(
        staging_dir: &Path,
        source: &str,
        profile: &LanguageProfile,
    ) -> Result<Self, ExecutorError> {
        ensure_staging_dir(staging_dir).await?;

        let file_name = format!("sub_{}_{}", Uuid::new_v4(), profile.entry_file);
        let path = staging_dir.join(file_name);

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| ExecutorError::WorkspaceProvision {
                path: path.clone(),
                reason: e.to_string(),
            })?;

        if let Err(e) = file.write_all(source.as_bytes()).await {
            discard_partial(&path).await;
            return Err(ExecutorError::WorkspaceProvision {
                path,
                reason: format!("write failed: {e}"),
            });
        }
        if let Err(e) = file.flush().await {
            discard_partial(&path).await;
            return Err(ExecutorError::WorkspaceProvision {
                path,
                reason: format!("flush failed: {e}"),
            });
        }

        tracing::debug!(path = %path.display(), bytes = source.len(), "workspace staged");

        Ok(Self {
            path,
            entry_file: profile.entry_file.clone(),
        })
    }

    /// Host path of the staged file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name the sandbox expects the submission under.
    #[must_use]
    pub fn entry_file(&self) -> &str {
        &self.entry_file
    }

    /// Delete the staging file.
    ///
    /// Idempotent and best-effort: an already-deleted file is not an
    /// error, and any other failure is logged and swallowed so the rest
    /// of the cleanup still runs.
    pub async fn release(&self) {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => tracing::debug!(path = %self.path.display(), "workspace released"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to release workspace");
            }
        }
    }
}

/// Best-effort removal of a partially staged file.
///
/// Used when creation succeeded but writing the source did not: the
/// `Workspace` value never reaches the caller in that case, so nobody
/// else can release the file. Failures are logged and swallowed.
async fn discard_partial(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => tracing::debug!(path = %path.display(), "partial workspace file discarded"),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to discard partial workspace file");
        }
    }
}

/// Create the staging directory if it is missing.
///
/// Called once at coordinator construction so a bad path is reported at
/// startup, and again before each staging in case the directory was
/// removed since.
///
/// # Errors
/// Returns [`ExecutorError::WorkspaceProvision`] if the directory cannot
/// be created.
pub async fn ensure_staging_dir(staging_dir: &Path) -> Result<(), ExecutorError> {
    tokio::fs::create_dir_all(staging_dir)
        .await
        .map_err(|e| ExecutorError::WorkspaceProvision {
            path: staging_dir.to_path_buf(),
            reason: format!("cannot create staging directory: {e}"),
        })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    fn test_profile() -> LanguageProfile {
        LanguageProfile::new("test-image:latest", "script.py")
    }

    fn scratch_dir() -> PathBuf {
        std::env::temp_dir().join(format!("crucible-ws-test-{}", Uuid::new_v4()))
    }

    #[tokio::test]
    async fn create_stages_source_verbatim() {
        let dir = scratch_dir();
        let workspace = Workspace::create(&dir, "print('hello')\n", &test_profile())
            .await
            .expect("create must succeed");

        let staged = tokio::fs::read_to_string(workspace.path())
            .await
            .expect("staged file must be readable");
        assert_eq!(staged, "print('hello')\n");
        assert_eq!(workspace.entry_file(), "script.py");
        assert!(
            workspace.path().starts_with(&dir),
            "staged file must live under the staging dir"
        );

        workspace.release().await;
        let _ = tokio::fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn create_builds_missing_staging_dir() {
        let dir = scratch_dir().join("nested").join("deeper");
        let workspace = Workspace::create(&dir, "x", &test_profile())
            .await
            .expect("create must build the staging directory");
        assert!(workspace.path().exists());
        workspace.release().await;
    }

    #[tokio::test]
    async fn concurrent_creates_never_collide() {
        let dir = scratch_dir();
        let mut tasks = tokio::task::JoinSet::new();
        for i in 0..16 {
            let dir = dir.clone();
            tasks.spawn(async move {
                let workspace = Workspace::create(&dir, &format!("payload {i}"), &test_profile())
                    .await
                    .expect("concurrent create must succeed");
                workspace.path().to_path_buf()
            });
        }

        let mut paths = BTreeSet::new();
        while let Some(joined) = tasks.join_next().await {
            let path = joined.expect("task must not panic");
            assert!(paths.insert(path), "workspace paths must be unique");
        }
        assert_eq!(paths.len(), 16);

        let _ = tokio::fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn discard_partial_removes_file_left_by_failed_write() {
        let dir = scratch_dir();
        tokio::fs::create_dir_all(&dir)
            .await
            .expect("staging dir must be creatable");
        let path = dir.join(format!("sub_{}_script.py", Uuid::new_v4()));
        tokio::fs::write(&path, "half a submi")
            .await
            .expect("partial file must be writable");

        discard_partial(&path).await;
        assert!(!path.exists(), "discard must delete the partial file");

        // Discarding an already-gone path must be a quiet no-op.
        discard_partial(&path).await;
        assert!(!path.exists());

        let _ = tokio::fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn release_is_idempotent() {
        let dir = scratch_dir();
        let workspace = Workspace::create(&dir, "x", &test_profile())
            .await
            .expect("create must succeed");
        let path = workspace.path().to_path_buf();

        workspace.release().await;
        assert!(!path.exists(), "release must delete the staged file");

        // Second release of the same workspace must be a quiet no-op.
        workspace.release().await;
        assert!(!path.exists());

        let _ = tokio::fs::remove_dir_all(&dir).await;
    }
}
