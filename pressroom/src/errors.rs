//! Service-wide error type and its HTTP mapping.
//!
//! Every component-internal fault is translated into one [`Error`] variant
//! before it crosses into a request handler. Responses carry a machine-readable
//! kind plus a human-readable message and never expose storage paths or source
//! chains to the caller.

use crate::store::StorageError;
use crate::types::ArtifactId;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum Error {
    /// Malformed or incomplete generation request
    #[error("{message}")]
    Validation { message: String },

    /// The layout referenced by the request does not exist
    #[error("template '{template}' not found")]
    TemplateNotFound { template: String },

    /// Rendering completed but produced no usable content, or an internal
    /// rendering fault occurred
    #[error("render failed: {reason}")]
    Render { reason: String },

    /// Write, rename, or retrieval fault at the filesystem boundary
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Retrieval of an artifact identifier that does not exist or was evicted
    #[error("document {id} not found")]
    NotFound { id: ArtifactId },

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Wire shape of every error response.
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Validation { .. } => StatusCode::BAD_REQUEST,
            Error::TemplateNotFound { .. } => StatusCode::NOT_FOUND,
            Error::Render { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Error::Storage(storage_err) => match storage_err {
                StorageError::NotFound => StatusCode::NOT_FOUND,
                // Transient from the caller's perspective: the write path
                // already performed its single retry before surfacing this.
                StorageError::EmptyArtifact | StorageError::Io(_) => StatusCode::SERVICE_UNAVAILABLE,
            },
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable error kind for the response payload.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Validation { .. } => "validation_error",
            Error::TemplateNotFound { .. } => "template_not_found",
            Error::Render { .. } => "render_failure",
            Error::Storage(StorageError::NotFound) => "not_found",
            Error::Storage(_) => "storage_error",
            Error::NotFound { .. } => "not_found",
            Error::Other(_) => "internal_error",
        }
    }

    /// Returns a user-safe error message, without leaking internal implementation details
    pub fn user_message(&self) -> String {
        match self {
            Error::Validation { message } => message.clone(),
            Error::TemplateNotFound { template } => {
                format!("template '{template}' not found")
            }
            Error::Render { reason } => format!("document rendering failed: {reason}"),
            Error::Storage(StorageError::NotFound) => "document not found".to_string(),
            Error::Storage(_) => "temporary storage failure, please retry".to_string(),
            Error::NotFound { id } => format!("document {id} not found"),
            Error::Other(_) => "internal server error".to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // Log full error details for debugging - different log levels based on severity
        match &self {
            Error::Storage(StorageError::NotFound) => {
                tracing::debug!("Client error: {}", self);
            }
            Error::Storage(_) | Error::Other(_) => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::Render { .. } => {
                tracing::error!("Render error: {}", self);
            }
            Error::TemplateNotFound { .. } => {
                // A template missing from the registry usually means a broken deployment
                tracing::warn!("Template resolution error: {}", self);
            }
            Error::Validation { .. } | Error::NotFound { .. } => {
                tracing::debug!("Client error: {}", self);
            }
        }

        let status = self.status_code();
        let body = json!({
            "error": self.kind(),
            "message": self.user_message(),
        });

        (status, Json(body)).into_response()
    }
}

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;
