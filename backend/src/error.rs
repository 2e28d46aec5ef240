//! Error taxonomy for the materialization pipeline and the services around it.
//!
//! Pipeline errors never retry or roll back. Whatever was written before a
//! failure stays on disk, and the HTTP layer turns the error into a generic
//! response after logging the underlying message.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Invalid or corrupt ZIP: {0}")]
    Archive(#[from] zip::result::ZipError),
    #[error("Failed to open archive {path}: {source}")]
    Open { path: PathBuf, source: io::Error },
    #[error("Archive entry escapes the destination: {0}")]
    UnsafeEntry(String),
    #[error("Archive entry {name} exceeds {limit} bytes")]
    EntryTooLarge { name: String, limit: u64 },
    #[error("Failed to write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CustomizationError {
    #[error("A business name is required to customize a template")]
    MissingBusinessName,
}

#[derive(Debug, Error)]
pub enum MaterializationError {
    #[error("Namespace '{0}' does not normalize to a usable directory name")]
    InvalidNamespace(String),
    #[error("File path escapes the namespace root: {0}")]
    UnsafePath(String),
    #[error("Failed to write {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
}

/// Any failure of a pipeline entry point.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
    #[error(transparent)]
    Customization(#[from] CustomizationError),
    #[error(transparent)]
    Materialization(#[from] MaterializationError),
    #[error("Failed to read template tree {path}: {source}")]
    TemplateTree { path: PathBuf, source: io::Error },
}

impl PipelineError {
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Extraction(_) => "extraction",
            PipelineError::Customization(_) => "customization",
            PipelineError::Materialization(_) => "materialization",
            PipelineError::TemplateTree { .. } => "materialization",
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("Corrupt record: {0}")]
    Corrupt(String),
    #[error("Conflict: {0}")]
    Conflict(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(error: serde_json::Error) -> Self {
        StoreError::Corrupt(error.to_string())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: &'static str, value: String },
}

/// Errors surfaced by HTTP handlers.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error(transparent)]
    Store(StoreError),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for ServiceError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Conflict(msg) => ServiceError::Conflict(msg),
            other => ServiceError::Store(other),
        }
    }
}

impl From<actix_multipart::MultipartError> for ServiceError {
    fn from(error: actix_multipart::MultipartError) -> Self {
        ServiceError::BadRequest(error.to_string())
    }
}

impl From<tokio::task::JoinError> for ServiceError {
    fn from(error: tokio::task::JoinError) -> Self {
        ServiceError::Internal(format!("Task join error: {}", error))
    }
}

impl ServiceError {
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::BadRequest(_) => "bad_request",
            ServiceError::NotFound(_) => "not_found",
            ServiceError::Conflict(_) => "conflict",
            ServiceError::Pipeline(e) => e.kind(),
            ServiceError::Store(_) => "store",
            ServiceError::Io(_) => "io",
            ServiceError::Internal(_) => "internal",
        }
    }
}

impl ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Conflict(_) => StatusCode::CONFLICT,
            ServiceError::Pipeline(PipelineError::Customization(_)) => StatusCode::BAD_REQUEST,
            ServiceError::Pipeline(PipelineError::Extraction(
                ExtractionError::Archive(_)
                | ExtractionError::UnsafeEntry(_)
                | ExtractionError::EntryTooLarge { .. },
            )) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        // Client errors carry their message; server-side failures stay generic.
        let message = if self.status_code().is_client_error() {
            self.to_string()
        } else {
            "The operation failed".to_string()
        };
        HttpResponse::build(self.status_code())
            .json(serde_json::json!({ "error": message, "kind": self.kind() }))
    }
}

#[derive(Debug, Error)]
pub enum DeployError {
    #[error("{0} is not configured")]
    MissingToken(&'static str),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{service} responded with {status}: {body}")]
    Remote {
        service: &'static str,
        status: u16,
        body: String,
    },
    #[error("Failed to read {path}: {source}")]
    Tree { path: PathBuf, source: io::Error },
}
