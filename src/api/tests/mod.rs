use super::*;
use crate::downloader::test_helpers::{MockFileSource, mount_thread, test_config, thread_document};
use crate::types::ThreadId;
use crate::{Config, RunRegistry, ThreadDownloader};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;
use tower::ServiceExt;
use wiremock::MockServer;


/// Downloader backed by an in-memory file source, its registry, and the
/// tempdir holding the download folder (which must be kept alive)
fn create_test_app(
    server: &MockServer,
    source: MockFileSource,
) -> (ThreadDownloader, RunRegistry, tempfile::TempDir) {
    let temp_dir = tempdir().unwrap();
    let config = test_config(server, &temp_dir);
    let downloader = ThreadDownloader::with_file_source(config, Arc::new(source)).unwrap();
    (downloader, RunRegistry::new(), temp_dir)
}

fn app_with_config(config: Config) -> Router {
    let downloader =
        ThreadDownloader::with_file_source(config, Arc::new(MockFileSource::new())).unwrap();
    create_router(downloader, RunRegistry::new())
}

async fn json_body(response: Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn wait_terminal(registry: &RunRegistry, thread_id: &str) {
    let thread_id = ThreadId::parse(thread_id).unwrap();
    for _ in 0..500 {
        if registry
            .status(&thread_id)
            .is_some_and(|s| s.state.is_terminal())
        {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("run of {} did not finish", thread_id);
}

#[tokio::test]
async fn test_serve_stops_on_shutdown_signal() {
    let server = MockServer::start().await;
    let (downloader, registry, _temp_dir) = create_test_app(&server, MockFileSource::new());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();

    let handle = tokio::spawn(serve(listener, downloader, registry, async move {
        stop_rx.await.ok();
    }));

    let response = reqwest::get(format!("http://{}/health", address))
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    stop_tx.send(()).unwrap();
    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_cors_enabled() {
    let server = MockServer::start().await;
    let temp_dir = tempdir().unwrap();
    let mut config = test_config(&server, &temp_dir);
    config.server.api.cors_enabled = true;
    config.server.api.cors_origins = vec!["*".to_string()];

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app_with_config(config).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .unwrap(),
        "*"
    );
}

#[tokio::test]
async fn test_cors_specific_origin() {
    let server = MockServer::start().await;
    let temp_dir = tempdir().unwrap();
    let mut config = test_config(&server, &temp_dir);
    config.server.api.cors_origins = vec!["http://allowed.example".to_string()];

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://allowed.example")
        .body(Body::empty())
        .unwrap();
    let response = app_with_config(config).oneshot(request).await.unwrap();

    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .unwrap(),
        "http://allowed.example"
    );
}

#[tokio::test]
async fn test_cors_disabled() {
    let server = MockServer::start().await;
    let temp_dir = tempdir().unwrap();
    let mut config = test_config(&server, &temp_dir);
    config.server.api.cors_enabled = false;

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app_with_config(config).oneshot(request).await.unwrap();

    assert!(
        response
            .headers()
            .get("access-control-allow-origin")
            .is_none()
    );
}

#[tokio::test]
async fn test_swagger_ui_can_be_disabled() {
    let server = MockServer::start().await;
    let temp_dir = tempdir().unwrap();
    let mut config = test_config(&server, &temp_dir);
    config.server.api.swagger_ui = false;

    let response = app_with_config(config)
        .oneshot(get("/swagger-ui/"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
