use crate::AppState;
use crate::api::models::documents::{
    ArtifactResponse, DeleteDocumentResponse, DocumentListResponse, GenerateDocumentRequest, ListDocumentsQuery,
};
use crate::errors::{Error, Result};
use crate::render::{self, GenerationRequest};
use crate::store::StorageError;
use crate::types::ArtifactId;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use serde_json::{Value, json};
use std::collections::HashMap;

/// Template rendered by the sample endpoint.
const SAMPLE_TEMPLATE: &str = "fee-challan";

fn sample_params() -> HashMap<String, Value> {
    HashMap::from([
        ("challan_no".to_string(), json!("22")),
        ("student_name".to_string(), json!("Adeel Ahmed")),
        ("roll_number".to_string(), json!("232201010")),
        ("class_name".to_string(), json!("BSCS-5-A")),
        ("expiry_date".to_string(), json!("2025-05-20")),
    ])
}

/// Parse a path segment as an artifact id; a malformed id is a validation
/// fault, not a missing artifact.
fn parse_artifact_id(raw: &str) -> Result<ArtifactId> {
    raw.parse().map_err(|_| Error::Validation {
        message: format!("'{raw}' is not a valid document id"),
    })
}

/// Maximum accepted length for a caller-supplied download filename.
const MAX_FILENAME_LEN: usize = 255;

/// Check a caller-supplied download filename before any work happens.
///
/// The filename ends up inside a quoted `Content-Disposition` header value,
/// so control characters or quotes would make every later download of the
/// artifact fail; path separators are rejected to keep the name a plain
/// file name.
fn validate_filename(name: &str) -> Result<()> {
    if name.is_empty() || name.len() > MAX_FILENAME_LEN {
        return Err(Error::Validation {
            message: format!("filename must be between 1 and {MAX_FILENAME_LEN} characters"),
        });
    }
    if name.chars().any(|ch| ch.is_control() || matches!(ch, '"' | '/' | '\\')) {
        return Err(Error::Validation {
            message: "filename must not contain control characters, quotes, or path separators".to_string(),
        });
    }
    Ok(())
}

fn not_found(id: ArtifactId, error: StorageError) -> Error {
    match error {
        StorageError::NotFound => Error::NotFound { id },
        other => other.into(),
    }
}

#[utoipa::path(
    post,
    path = "/documents",
    tag = "documents",
    summary = "Generate document",
    description = "Render a template with the supplied parameters and persist the result as a new artifact. \
                   Every request produces a distinct artifact, even for identical inputs.",
    request_body = GenerateDocumentRequest,
    responses(
        (status = 201, description = "Document generated", body = ArtifactResponse),
        (status = 400, description = "Invalid parameters"),
        (status = 404, description = "Unknown template"),
        (status = 422, description = "Render failure"),
        (status = 503, description = "Storage unavailable")
    )
)]
pub async fn generate_document(
    State(state): State<AppState>,
    Json(body): Json<GenerateDocumentRequest>,
) -> Result<(StatusCode, Json<ArtifactResponse>)> {
    let template = state
        .templates
        .resolve(&body.template)
        .ok_or_else(|| Error::TemplateNotFound {
            template: body.template.clone(),
        })?;

    if let Some(filename) = &body.filename {
        validate_filename(filename)?;
    }

    let request = GenerationRequest::new(body.template, body.params, body.timestamp);
    tracing::info!(
        request_id = %request.id,
        template = %request.template,
        "Generation request accepted"
    );

    template.validate_request(&request.params)?;
    let bytes = render::render_document(template, &request)?;

    let filename = body
        .filename
        .unwrap_or_else(|| format!("{}-{}.pdf", request.template, crate::types::abbrev_uuid(&request.id)));
    let artifact = state.store.store(request.id, &request.template, filename, &bytes).await?;

    tracing::info!(
        request_id = %request.id,
        artifact_id = %artifact.id,
        size_bytes = artifact.size_bytes,
        "Document generated"
    );
    Ok((StatusCode::CREATED, Json(ArtifactResponse::from_artifact(&artifact))))
}

#[utoipa::path(
    get,
    path = "/documents/sample",
    tag = "documents",
    summary = "Generate sample document",
    description = "Render the fee challan template with predefined data and return the PDF directly. \
                   The artifact is persisted like any other generation.",
    responses(
        (status = 200, description = "Sample PDF bytes", content_type = "application/pdf"),
        (status = 404, description = "Sample template not deployed"),
        (status = 503, description = "Storage unavailable")
    )
)]
pub async fn generate_sample(State(state): State<AppState>) -> Result<Response> {
    let template = state.templates.resolve(SAMPLE_TEMPLATE).ok_or_else(|| Error::TemplateNotFound {
        template: SAMPLE_TEMPLATE.to_string(),
    })?;

    let request = GenerationRequest::new(SAMPLE_TEMPLATE.to_string(), sample_params(), None);
    template.validate_request(&request.params)?;
    let bytes = render::render_document(template, &request)?;

    let artifact = state
        .store
        .store(request.id, SAMPLE_TEMPLATE, "sample.pdf".to_string(), &bytes)
        .await?;
    tracing::info!(
        request_id = %request.id,
        artifact_id = %artifact.id,
        "Sample document generated"
    );

    let headers = [
        (header::CONTENT_TYPE, "application/pdf".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", artifact.filename),
        ),
    ];
    Ok((headers, Bytes::from(bytes)).into_response())
}

#[utoipa::path(
    get,
    path = "/documents",
    tag = "documents",
    summary = "List documents",
    params(ListDocumentsQuery),
    responses(
        (status = 200, description = "Stored documents, newest first", body = DocumentListResponse)
    )
)]
pub async fn list_documents(
    State(state): State<AppState>,
    Query(query): Query<ListDocumentsQuery>,
) -> Result<Json<DocumentListResponse>> {
    let limit = query.limit.unwrap_or(100).max(1);
    let all = state.store.list();
    let has_more = all.len() > limit;

    let data = all.iter().take(limit).map(ArtifactResponse::from_artifact).collect();
    Ok(Json(DocumentListResponse {
        object: "list".to_string(),
        data,
        has_more,
    }))
}

#[utoipa::path(
    get,
    path = "/documents/{id}",
    tag = "documents",
    summary = "Get document metadata",
    params(("id" = String, Path, description = "Artifact id")),
    responses(
        (status = 200, description = "Document metadata", body = ArtifactResponse),
        (status = 400, description = "Malformed id"),
        (status = 404, description = "Unknown or evicted document")
    )
)]
pub async fn get_document(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<ArtifactResponse>> {
    let id = parse_artifact_id(&id)?;
    let artifact = state.store.get(&id).map_err(|e| not_found(id, e))?;
    Ok(Json(ArtifactResponse::from_artifact(&artifact)))
}

#[utoipa::path(
    get,
    path = "/documents/{id}/content",
    tag = "documents",
    summary = "Download document",
    params(("id" = String, Path, description = "Artifact id")),
    responses(
        (status = 200, description = "PDF bytes", content_type = "application/pdf"),
        (status = 400, description = "Malformed id"),
        (status = 404, description = "Unknown or evicted document")
    )
)]
pub async fn download_document(State(state): State<AppState>, Path(id): Path<String>) -> Result<Response> {
    let id = parse_artifact_id(&id)?;
    let (artifact, bytes) = state.store.read(&id).await.map_err(|e| not_found(id, e))?;

    tracing::debug!(artifact_id = %id, size_bytes = bytes.len(), "Serving document content");
    let headers = [
        (header::CONTENT_TYPE, "application/pdf".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", artifact.filename),
        ),
    ];
    Ok((headers, Bytes::from(bytes)).into_response())
}

#[utoipa::path(
    delete,
    path = "/documents/{id}",
    tag = "documents",
    summary = "Delete document",
    params(("id" = String, Path, description = "Artifact id")),
    responses(
        (status = 200, description = "Document deleted", body = DeleteDocumentResponse),
        (status = 400, description = "Malformed id"),
        (status = 404, description = "Unknown or already deleted document")
    )
)]
pub async fn delete_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteDocumentResponse>> {
    let id = parse_artifact_id(&id)?;
    state.store.delete(&id).await.map_err(|e| not_found(id, e))?;

    tracing::info!(artifact_id = %id, "Document deleted");
    Ok(Json(DeleteDocumentResponse {
        id,
        object: "document".to_string(),
        deleted: true,
    }))
}
