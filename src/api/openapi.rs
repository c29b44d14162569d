//! OpenAPI documentation and schema generation
//!
//! This module defines the OpenAPI specification for the thread-dl REST API
//! using utoipa for compile-time spec generation.

use utoipa::OpenApi;

/// OpenAPI documentation for the thread-dl REST API
///
/// The spec can be accessed via:
/// - `/openapi.json` - JSON format OpenAPI specification
/// - `/swagger-ui` - Interactive Swagger UI documentation (if enabled)
#[derive(OpenApi)]
#[openapi(
    info(
        title = "thread-dl REST API",
        version = "0.1.0",
        description = "Start thread downloads and follow their progress",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:8001", description = "Local development server")
    ),
    paths(
        // Downloads
        crate::api::routes::start_download,
        crate::api::routes::get_download_status,

        // System
        crate::api::routes::root,
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
        crate::api::routes::event_stream,
    ),
    components(schemas(
        // Core types from types.rs
        crate::types::ThreadId,
        crate::types::FileReference,
        crate::types::MediaKind,
        crate::types::DownloadStats,
        crate::types::FailureRecord,
        crate::types::RunStatus,
        crate::types::RunResult,
        crate::types::RunState,
        crate::types::ProgressUpdate,

        // Config types from config.rs
        crate::config::Config,
        crate::config::DownloadConfig,
        crate::config::SourceConfig,
        crate::config::ServerIntegrationConfig,
        crate::config::ApiConfig,

        // Registry types
        crate::registry::RunSnapshot,
        crate::registry::RunTicket,

        // API request/response types from routes
        crate::api::routes::DownloadResponse,
        crate::api::routes::StatusResponse,

        // Error types from error.rs
        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "downloads", description = "Thread downloads - Start runs and query their status"),
        (name = "system", description = "System endpoints - Service info, health checks, OpenAPI spec, events"),
    )
)]
pub struct ApiDoc;
