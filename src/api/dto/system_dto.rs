//! DTOs for system endpoints.

use std::collections::BTreeMap;

use serde::Serialize;
use utoipa::ToSchema;

/// Response body for `GET /health`.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Always `"OK"` while the process serves requests.
    pub status: String,
    /// Server time (RFC 3339).
    pub timestamp: String,
    /// Crate version.
    pub version: String,
    /// Registered connections per topic (`*` for the all-topics feed).
    pub websocket_connections: BTreeMap<String, usize>,
    /// Sum over all topics.
    pub total_connections: usize,
}

/// Response body for `GET /`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ServiceInfo {
    /// Banner.
    pub message: String,
    /// Endpoint paths keyed by purpose.
    pub endpoints: BTreeMap<String, String>,
}
