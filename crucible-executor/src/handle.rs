//! Sandbox handle — identifies one provisioned execution unit.

use chrono::{DateTime, Utc};

/// A handle to a provisioned sandbox.
///
/// The id is opaque and assigned by the container runtime. Dropping a
/// handle does NOT tear the sandbox down; teardown happens through
/// [`SandboxOrchestrator::destroy`].
///
/// [`SandboxOrchestrator::destroy`]: crate::SandboxOrchestrator::destroy
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct SandboxHandle {
    /// Runtime-assigned container id.
    pub id: String,

    /// Image the sandbox was created from.
    pub image: String,

    /// When the sandbox was provisioned.
    pub created_at: DateTime<Utc>,
}

impl SandboxHandle {
    /// Create a handle for a freshly provisioned sandbox.
    #[must_use]
    pub fn new(id: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            image: image.into(),
            created_at: Utc::now(),
        }
    }

    /// Short prefix of the id, for log fields.
    #[must_use]
    pub fn short_id(&self) -> &str {
        let end = self
            .id
            .char_indices()
            .nth(12)
            .map_or(self.id.len(), |(i, _)| i);
        &self.id[..end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_id_truncates_long_ids() {
        let handle = SandboxHandle::new("0123456789abcdef0123456789abcdef", "img:latest");
        assert_eq!(handle.short_id(), "0123456789ab");
    }

    #[test]
    fn short_id_keeps_short_ids_whole() {
        let handle = SandboxHandle::new("fake-1", "img:latest");
        assert_eq!(handle.short_id(), "fake-1");
    }
}
