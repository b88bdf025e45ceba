//! Health check response.

use serde::Serialize;
use utoipa::ToSchema;

/// Storage availability reported by `/healthcheck`.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// Storage reachable.
    Ok,
    /// No reachable storage; chat operations answer 503.
    Degraded,
}

/// Health response returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Current storage availability.
    pub status: HealthStatus,
}

impl HealthResponse {
    /// Map the degraded flag of the shared state.
    pub fn from_degraded(degraded: bool) -> Self {
        let status = if degraded {
            HealthStatus::Degraded
        } else {
            HealthStatus::Ok
        };
        Self { status }
    }
}
