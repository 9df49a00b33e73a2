//! API layer for HTTP request handling and data models.
//!
//! - **[`handlers`]**: Axum route handlers for all endpoints
//! - **[`models`]**: Request/response data structures
//!
//! # API Structure
//!
//! - **Documents** (`/api/v1/documents/*`): generate, list, inspect,
//!   download, and delete rendered documents
//! - **Health** (`/healthz`) and service info (`/`)
//!
//! All endpoints carry OpenAPI annotations via `utoipa`; interactive
//! documentation is served at `/docs`.

pub mod handlers;
pub mod models;
