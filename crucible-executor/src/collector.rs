//! Output collection.
//!
//! Fetches a finished sandbox's demultiplexed streams and converts any
//! transport failure into an in-band marker instead of an error.

use crate::backend::{SandboxOutput, SandboxRuntime};
use crate::SandboxHandle;

/// Marker prefix appended to stderr when the log transport fails.
pub const COLLECTOR_ERROR_MARKER: &str = "[executor error:";

/// Retrieve the sandbox's output.
///
/// Runs strictly after the wait (or kill) has resolved and never
/// concurrently with destroy. A transport failure is logged and reported
/// in-band: whatever was accumulated is returned with a collector-error
/// marker appended to stderr. This never fails past the coordinator
/// boundary.
pub async fn collect<R: SandboxRuntime>(runtime: &R, handle: &SandboxHandle) -> SandboxOutput {
    match runtime.output(handle).await {
        Ok(output) => {
            tracing::debug!(
                sandbox_id = %handle.short_id(),
                stdout_bytes = output.stdout.len(),
                stderr_bytes = output.stderr.len(),
                "output collected"
            );
            output
        }
        Err(e) => {
            tracing::warn!(
                sandbox_id = %handle.short_id(),
                error = %e,
                "output collection failed"
            );
            SandboxOutput {
                stdout: String::new(),
                stderr: format!("\n{COLLECTOR_ERROR_MARKER} failed to retrieve sandbox output: {e}]"),
            }
        }
    }
}
