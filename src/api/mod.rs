//! REST API server module
//!
//! Exposes the trigger and status surface for thread downloads: start a run,
//! poll its state, or follow every update as server-sent events.

use crate::{Result, RunRegistry, ThreadDownloader};
use axum::{
    Router,
    http::HeaderValue,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod error_response;
pub mod openapi;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use state::AppState;

/// Create the API router with all route definitions
///
/// # Routes
///
/// ## Downloads
/// - `POST /download/:thread_id` - Start downloading a thread
/// - `GET /status/:thread_id` - Get the state of a thread's download
///
/// ## System
/// - `GET /` - Service information
/// - `GET /health` - Health check
/// - `GET /openapi.json` - OpenAPI specification
/// - `GET /swagger-ui` - Interactive Swagger UI documentation (if enabled)
/// - `GET /events` - Server-sent events stream
pub fn create_router(downloader: ThreadDownloader, registry: RunRegistry) -> Router {
    let state = AppState::new(downloader, registry);
    let config = state.config.clone();

    let router = Router::new()
        // Downloads
        .route("/download/:thread_id", post(routes::start_download))
        .route("/status/:thread_id", get(routes::get_download_status))
        // System
        .route("/", get(routes::root))
        .route("/health", get(routes::health_check))
        .route("/openapi.json", get(routes::openapi_spec))
        .route("/events", get(routes::event_stream));

    // Swagger UI serves its own copy of the document under a separate path
    let router = if config.server.api.swagger_ui {
        router.merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
    } else {
        router
    };

    let router = router.with_state(state).layer(TraceLayer::new_for_http());

    // Apply CORS middleware if enabled in config
    if config.server.api.cors_enabled {
        let cors = build_cors_layer(&config.server.api.cors_origins);
        router.layer(cors)
    } else {
        router
    }
}

/// Build a CORS layer based on configured origins
///
/// `"*"` or an empty list allows any origin.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_any = origins.iter().any(|o| o == "*");

    if allow_any || origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Start the API server on the configured bind address.
///
/// Serves until `shutdown` resolves, then stops accepting connections and
/// lets in-flight requests finish. Runs already started keep going in the
/// background of the runtime.
///
/// # Example
///
/// ```no_run
/// use thread_dl::{Config, RunRegistry, ThreadDownloader};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let downloader = ThreadDownloader::new(Config::default())?;
///
/// thread_dl::api::start_api_server(downloader, RunRegistry::new(), async {
///     tokio::signal::ctrl_c().await.ok();
/// })
/// .await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_api_server(
    downloader: ThreadDownloader,
    registry: RunRegistry,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let bind_address = downloader.config().server.api.bind_address;

    tracing::info!(address = %bind_address, "Starting API server");

    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)?;

    serve(listener, downloader, registry, shutdown).await
}

/// Serve the API on an already bound listener
pub async fn serve(
    listener: TcpListener,
    downloader: ThreadDownloader,
    registry: RunRegistry,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let app = create_router(downloader, registry);

    if let Ok(address) = listener.local_addr() {
        tracing::info!(address = %address, "API server listening");
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| crate::error::Error::ApiServerError(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
