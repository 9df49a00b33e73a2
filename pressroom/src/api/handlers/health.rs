use crate::AppState;
use crate::api::models::health::{HealthResponse, ServiceInfo};
use axum::{Json, extract::State};

#[utoipa::path(
    get,
    path = "/healthz",
    tag = "health",
    summary = "Health check",
    description = "Reports degraded (still 200) when no templates are loaded, since the service can list \
                   and serve existing artifacts but cannot generate new ones.",
    responses(
        (status = 200, description = "Service health", body = HealthResponse)
    )
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let templates_loaded = state.templates.len();
    let status = if templates_loaded > 0 { "healthy" } else { "degraded" };

    Json(HealthResponse {
        status: status.to_string(),
        templates_loaded,
        artifacts_stored: state.store.len(),
    })
}

#[utoipa::path(
    get,
    path = "/",
    tag = "health",
    summary = "Service info",
    responses(
        (status = 200, description = "Service identification", body = ServiceInfo)
    )
)]
pub async fn home(State(state): State<AppState>) -> Json<ServiceInfo> {
    Json(ServiceInfo {
        service: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        docs_url: "/docs".to_string(),
        templates: state.templates.names().into_iter().map(String::from).collect(),
    })
}
