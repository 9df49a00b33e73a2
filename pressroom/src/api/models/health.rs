use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Health check response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// "healthy", or "degraded" when no templates are loaded
    pub status: String,
    pub templates_loaded: usize,
    pub artifacts_stored: usize,
}

/// Service identification returned at the root path
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    pub service: String,
    pub version: String,
    pub docs_url: String,
    pub templates: Vec<String>,
}
