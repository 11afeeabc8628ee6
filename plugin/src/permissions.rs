// Host permission gateway
//
// Permission state belongs to the host OS, not to this layer or the
// engine; the bridge only relays queries through this seam.

use async_trait::async_trait;

use meshbridge_core::error::PlatformError;
use meshbridge_core::types::{Capability, PermissionState, PermissionStatus};

/// Host OS collaborator for capability grants.
#[async_trait]
pub trait PermissionGateway: Send + Sync {
    /// Report current grant states without prompting the user.
    async fn check(&self) -> PermissionStatus;

    /// Prompt for the listed capabilities. A gateway that cannot reach
    /// its prompt surface (e.g. the system settings screen) reports a
    /// platform error, never an engine failure.
    async fn request(&self, capabilities: &[Capability])
        -> Result<PermissionStatus, PlatformError>;
}

/// Fixed-answer gateway for hosts without a permission UX — tests, the
/// CLI, and headless embedding.
#[derive(Debug, Clone)]
pub struct StaticPermissions {
    status: PermissionStatus,
}

impl StaticPermissions {
    pub fn granted() -> Self {
        Self {
            status: PermissionStatus {
                bluetooth: PermissionState::Granted,
                location: Some(PermissionState::Granted),
            },
        }
    }

    pub fn with_status(status: PermissionStatus) -> Self {
        Self { status }
    }
}

#[async_trait]
impl PermissionGateway for StaticPermissions {
    async fn check(&self) -> PermissionStatus {
        self.status.clone()
    }

    async fn request(
        &self,
        capabilities: &[Capability],
    ) -> Result<PermissionStatus, PlatformError> {
        tracing::debug!(?capabilities, "static permission gateway prompted");
        Ok(self.status.clone())
    }
}
