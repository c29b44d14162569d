//! Error types for thread-dl
//!
//! This module provides the error taxonomy for the library:
//! - Fatal thread document errors ([`MetadataFetchError`]) that abort a run
//! - Recoverable per-file errors ([`FileOperationError`]) that are retried once
//! - HTTP status code mapping for the API layer
//! - Structured error responses with machine-readable error codes

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use utoipa::ToSchema;

use crate::types::ThreadId;

/// Result type alias for thread-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for thread-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "download.chunk_size")
        key: Option<String>,
    },

    /// Thread identifier is empty or contains non-digit characters
    #[error("invalid thread id {0:?}: must contain only digits")]
    InvalidThreadId(String),

    /// Fetching or persisting the thread document failed (fatal for a run)
    #[error("thread document error: {0}")]
    MetadataFetch(#[from] MetadataFetchError),

    /// A single file could not be fetched or written (recoverable)
    #[error("file error: {0}")]
    FileOperation(#[from] FileOperationError),

    /// A run for this thread is already in progress
    #[error("thread {0} is already being downloaded")]
    AlreadyRunning(ThreadId),

    /// Requested resource not found
    #[error("not found: {0}")]
    NotFound(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Errors raised while retrieving the thread document.
///
/// Any of these ends the run with status `failed`; none are retried.
#[derive(Debug, Error)]
pub enum MetadataFetchError {
    /// Transport-level failure (DNS, connect, timeout, body read)
    #[error("request to {url} failed: {source}")]
    Request {
        /// Endpoint that was requested
        url: String,
        /// Underlying transport error
        #[source]
        source: reqwest::Error,
    },

    /// Server answered with a non-success status
    #[error("{url} returned HTTP {status}")]
    Status {
        /// Endpoint that was requested
        url: String,
        /// HTTP status code
        status: u16,
    },

    /// Writing the raw document to disk failed
    #[error("failed to save thread document to {path}: {source}")]
    Persist {
        /// Destination of the raw document
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The body is not a valid thread document
    #[error("malformed thread document: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Errors for a single file reference.
///
/// These never escape the orchestrator; they are recorded as failures and
/// retried once.
#[derive(Debug, Error)]
pub enum FileOperationError {
    /// Transport-level failure while requesting or streaming the file
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("HTTP {status}")]
    Status {
        /// HTTP status code
        status: u16,
    },

    /// Creating the directory or writing the file failed
    #[error("write to {path} failed: {source}")]
    Io {
        /// Destination path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Any other failure reported by a file source
    #[error("{0}")]
    Other(String),
}

/// API error response format
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "already_running",
///     "message": "thread 123456 is already being downloaded",
///     "details": { "thread_id": "123456" }
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "not_found", "invalid_thread_id")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request
            Error::Config { .. } => 400,
            Error::InvalidThreadId(_) => 400,

            // 404 Not Found
            Error::NotFound(_) => 404,

            // 409 Conflict
            Error::AlreadyRunning(_) => 409,

            // 500 Internal Server Error
            Error::Io(_) => 500,
            Error::Serialization(_) => 500,
            Error::ApiServerError(_) => 500,
            Error::Other(_) => 500,

            // 502 Bad Gateway - upstream board errors
            Error::MetadataFetch(_) => 502,
            Error::FileOperation(_) => 502,
            Error::Network(_) => 502,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::InvalidThreadId(_) => "invalid_thread_id",
            Error::MetadataFetch(e) => match e {
                MetadataFetchError::Request { .. } => "metadata_request_failed",
                MetadataFetchError::Status { .. } => "metadata_bad_status",
                MetadataFetchError::Persist { .. } => "metadata_persist_failed",
                MetadataFetchError::Parse(_) => "metadata_malformed",
            },
            Error::FileOperation(_) => "file_operation_failed",
            Error::AlreadyRunning(_) => "already_running",
            Error::NotFound(_) => "not_found",
            Error::Io(_) => "io_error",
            Error::Network(_) => "network_error",
            Error::Serialization(_) => "serialization_error",
            Error::ApiServerError(_) => "api_server_error",
            Error::Other(_) => "internal_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        let details = match &error {
            Error::AlreadyRunning(thread_id) => Some(serde_json::json!({
                "thread_id": thread_id,
            })),
            Error::Config { key: Some(key), .. } => Some(serde_json::json!({
                "key": key,
            })),
            Error::MetadataFetch(MetadataFetchError::Status { url, status }) => {
                Some(serde_json::json!({
                    "url": url,
                    "upstream_status": status,
                }))
            }
            _ => None,
        };

        ApiError {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        }
    }
}
