use crate::store::Artifact;
use crate::types::ArtifactId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use utoipa::{IntoParams, ToSchema};

/// Body of a document generation request
#[derive(Debug, Deserialize, ToSchema)]
pub struct GenerateDocumentRequest {
    /// Name of the template to render
    pub template: String,

    /// Template parameters; scalar JSON values keyed by parameter name
    #[serde(default)]
    #[schema(value_type = Object)]
    pub params: HashMap<String, Value>,

    /// Download filename override; defaults to `{template}-{id}.pdf`
    pub filename: Option<String>,

    /// Override for the request timestamp consulted by `timestamp` fields.
    /// Defaults to intake time.
    pub timestamp: Option<DateTime<Utc>>,
}

/// Metadata for one stored document artifact
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ArtifactResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: ArtifactId,
    pub object: String, // Always "document"
    pub template: String,
    pub filename: String,
    pub bytes: u64,
    pub created_at: i64, // Unix timestamp
    pub download_url: String,
}

impl ArtifactResponse {
    pub fn from_artifact(artifact: &Artifact) -> Self {
        Self {
            id: artifact.id,
            object: "document".to_string(),
            template: artifact.template.clone(),
            filename: artifact.filename.clone(),
            bytes: artifact.size_bytes,
            created_at: artifact.created_at.timestamp(),
            download_url: format!("/api/v1/documents/{}/content", artifact.id),
        }
    }
}

/// Query parameters for listing documents
#[derive(Debug, Deserialize, IntoParams)]
pub struct ListDocumentsQuery {
    /// Maximum number of documents to return, newest first
    #[param(default = 100, minimum = 1)]
    pub limit: Option<usize>,
}

/// Response for document list
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DocumentListResponse {
    pub object: String, // Always "list"
    pub data: Vec<ArtifactResponse>,
    pub has_more: bool,
}

/// Response for document deletion
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeleteDocumentResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: ArtifactId,
    pub object: String, // Always "document"
    pub deleted: bool,
}
