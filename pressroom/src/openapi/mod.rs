//! OpenAPI documentation configuration.
//!
//! The interactive reference is served at `/docs`, backed by the JSON spec
//! at `/api-docs/openapi.json`.

use crate::api;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Pressroom API",
        description = "On-demand document generation: render declarative templates into PDF artifacts, \
                       then list, download, and delete them until retention evicts them."
    ),
    servers(
        (url = "/api/v1", description = "Document API")
    ),
    paths(
        api::handlers::documents::generate_document,
        api::handlers::documents::generate_sample,
        api::handlers::documents::list_documents,
        api::handlers::documents::get_document,
        api::handlers::documents::download_document,
        api::handlers::documents::delete_document,
    ),
    components(
        schemas(
            api::models::documents::GenerateDocumentRequest,
            api::models::documents::ArtifactResponse,
            api::models::documents::DocumentListResponse,
            api::models::documents::DeleteDocumentResponse,
            api::models::health::HealthResponse,
            api::models::health::ServiceInfo,
            crate::errors::ErrorBody,
        )
    ),
    tags(
        (name = "documents", description = "Generate and manage rendered documents"),
        (name = "health", description = "Liveness and service information")
    )
)]
pub struct ApiDoc;
