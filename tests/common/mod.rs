//! Common test utilities for thread-dl integration tests

use std::path::Path;

use tempfile::TempDir;
use thread_dl::Config;
use walkdir::WalkDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Config pointing at the mock board and a download folder inside `temp_dir`
pub fn config_for(server: &MockServer, temp_dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.source.base_url = server.uri();
    config.download.download_dir = temp_dir.path().join("downloads");
    config
}

/// Serve `body` at `url_path` and expect exactly `times` requests
pub async fn mount_file(server: &MockServer, url_path: &str, body: &[u8], times: u64) {
    Mock::given(method("GET"))
        .and(path(url_path))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
        .expect(times)
        .mount(server)
        .await;
}

/// Serve the thread document for `thread_id` on board `b`
pub async fn mount_document(server: &MockServer, thread_id: &str, document: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/b/res/{}.json", thread_id)))
        .respond_with(ResponseTemplate::new(200).set_body_string(document))
        .expect(1)
        .mount(server)
        .await;
}

/// Number of regular files below `root`, recursively
pub fn count_files(root: &Path) -> usize {
    WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .count()
}
