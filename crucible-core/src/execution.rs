//! Execution request and result types.

use serde::{Deserialize, Serialize};

/// Exit code reported when the submission did not run to completion.
pub const EXIT_CODE_UNSET: i64 = -1;

/// One code-execution request: untrusted source text plus the declared
/// language identifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[non_exhaustive]
pub struct ExecutionRequest {
    /// The submitted source text, verbatim.
    pub source: String,

    /// Declared language identifier, resolved against the registry.
    pub language: String,
}

impl ExecutionRequest {
    /// Create a request from source text and a language identifier.
    #[must_use]
    pub fn new(source: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            language: language.into(),
        }
    }
}

/// The outcome of one sandboxed execution.
///
/// Every failure mode is reported through this type; the executor never
/// propagates an error past its public boundary. `exit_code` stays at
/// [`EXIT_CODE_UNSET`] unless the submission ran to completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[non_exhaustive]
pub struct ExecutionResult {
    /// Trimmed standard output captured from the sandbox.
    pub output: String,

    /// Trimmed standard error, or a descriptive failure message.
    pub error: String,

    /// Exit code of the submission, or [`EXIT_CODE_UNSET`].
    pub exit_code: i64,

    /// Whether the execution was forcibly terminated at the deadline.
    pub timeout: bool,
}

impl ExecutionResult {
    /// An empty result with the exit-code sentinel set.
    #[must_use]
    pub fn new() -> Self {
        Self {
            output: String::new(),
            error: String::new(),
            exit_code: EXIT_CODE_UNSET,
            timeout: false,
        }
    }

    /// A result rejecting the request before any provisioning happened.
    #[must_use]
    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            ..Self::new()
        }
    }
}

impl Default for ExecutionResult {
    fn default() -> Self {
        Self::new()
    }
}
