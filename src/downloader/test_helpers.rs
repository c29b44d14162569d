//! Shared test helpers for creating ThreadDownloader instances in tests.

use crate::config::Config;
use crate::downloader::{FileSource, ThreadDownloader};
use crate::error::FileOperationError;
use crate::types::ProgressUpdate;
use bytes::Bytes;
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::tempdir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// In-memory file source with scripted failures and an in-flight gauge.
#[derive(Default)]
pub(crate) struct MockFileSource {
    bodies: HashMap<String, Bytes>,
    failures_left: Mutex<HashMap<String, usize>>,
    delay: Duration,
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
    calls: Mutex<Vec<String>>,
}

impl MockFileSource {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Serve `body` for URLs ending with `suffix`
    pub(crate) fn with_body(mut self, suffix: &str, body: impl Into<Bytes>) -> Self {
        self.bodies.insert(suffix.to_string(), body.into());
        self
    }

    /// Fail the first `times` opens of URLs ending with `suffix`
    pub(crate) fn failing(self, suffix: &str, times: usize) -> Self {
        self.failures_left
            .lock()
            .unwrap()
            .insert(suffix.to_string(), times);
        self
    }

    /// Hold each body for `delay` before its bytes arrive, so concurrent calls overlap
    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Operations between `open` and dropping the returned body
    pub(crate) fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn calls_for(&self, suffix: &str) -> usize {
        self.calls()
            .iter()
            .filter(|url| url.ends_with(suffix))
            .count()
    }

    fn should_fail(&self, url: &str) -> bool {
        let mut failures = self.failures_left.lock().unwrap();
        for (suffix, left) in failures.iter_mut() {
            if url.ends_with(suffix.as_str()) && *left > 0 {
                *left -= 1;
                return true;
            }
        }
        false
    }
}

#[async_trait::async_trait]
impl FileSource for MockFileSource {
    async fn open(&self, url: &str) -> Result<crate::downloader::ByteStream, FileOperationError> {
        self.calls.lock().unwrap().push(url.to_string());

        let gauge = InFlight::enter(&self.in_flight, &self.peak);

        if self.should_fail(url) {
            return Err(FileOperationError::Status { status: 503 });
        }

        let body = self
            .bodies
            .iter()
            .find(|(suffix, _)| url.ends_with(suffix.as_str()))
            .map(|(_, body)| body.clone())
            .unwrap_or_else(|| Bytes::from_static(b"data"));

        let delay = self.delay;
        let stream = futures::stream::once(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            Ok::<_, FileOperationError>(body)
        })
        // The gauge lives as long as the stream, which the caller keeps until its write is done
        .map(move |chunk| {
            let _held = &gauge;
            chunk
        });

        Ok(stream.boxed())
    }
}

/// Counts one operation in flight until dropped
struct InFlight {
    count: Arc<AtomicUsize>,
}

impl InFlight {
    fn enter(count: &Arc<AtomicUsize>, peak: &AtomicUsize) -> Self {
        let now = count.fetch_add(1, Ordering::SeqCst) + 1;
        peak.fetch_max(now, Ordering::SeqCst);
        Self {
            count: Arc::clone(count),
        }
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.count.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Serve `document` as the JSON of `thread_id` on board `b`
pub(crate) async fn mount_thread(server: &MockServer, thread_id: &str, document: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/b/res/{}.json", thread_id)))
        .respond_with(ResponseTemplate::new(200).set_body_string(document))
        .mount(server)
        .await;
}

/// Config pointing at the mock server and a fresh download directory
pub(crate) fn test_config(server: &MockServer, temp_dir: &tempfile::TempDir) -> Config {
    let mut config = Config::default();
    config.source.base_url = server.uri();
    config.download.download_dir = temp_dir.path().join("downloads");
    config
}

/// Helper to create a test ThreadDownloader backed by `source`.
/// Returns the downloader and the tempdir (which must be kept alive).
pub(crate) fn create_test_downloader(
    server: &MockServer,
    source: Arc<MockFileSource>,
) -> (ThreadDownloader, tempfile::TempDir) {
    let temp_dir = tempdir().unwrap();
    let config = test_config(server, &temp_dir);
    let downloader = ThreadDownloader::with_file_source(config, source).unwrap();
    (downloader, temp_dir)
}

/// Collect every update currently buffered in `rx`
pub(crate) fn drain(rx: &mut tokio::sync::mpsc::UnboundedReceiver<ProgressUpdate>) -> Vec<ProgressUpdate> {
    let mut updates = Vec::new();
    while let Ok(update) = rx.try_recv() {
        updates.push(update);
    }
    updates
}

/// Thread document with one post per `(path, thumbnail)` pair
pub(crate) fn thread_document(files: &[(&str, Option<&str>)]) -> String {
    let posts: Vec<serde_json::Value> = files
        .iter()
        .enumerate()
        .map(|(i, (path, thumb))| {
            let mut file = serde_json::json!({ "path": path });
            if let Some(thumb) = thumb {
                file["thumbnail"] = serde_json::json!(thumb);
            }
            serde_json::json!({ "num": i + 1, "files": [file] })
        })
        .collect();
    serde_json::json!({ "threads": [{ "posts": posts }] }).to_string()
}
