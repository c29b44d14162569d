//! Thread download pipeline split into focused submodules.
//!
//! The `ThreadDownloader` drives one run end to end:
//! - [`source`] - Per-file transport seam and its HTTP implementation
//! - [`orchestrator`] - Bounded-concurrency fetch/write with one retry pass
//! - [`progress`] - Progress sinks and milestone arithmetic
//!
//! Thread document retrieval and reference extraction live in [`crate::thread`].

mod orchestrator;
mod progress;
mod source;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use orchestrator::DownloadOrchestrator;
pub use progress::{
    EMPTY_THREAD_MILESTONE, FILES_BASE, FILES_SPAN, FnReporter, JSON_MILESTONE, NoopReporter,
    ProgressReporter, files_progress,
};
pub use source::{ByteStream, FileSource, HttpFileSource};

use std::sync::Arc;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::thread::{FileReferenceExtractor, MetadataFetcher};
use crate::types::{ProgressUpdate, RunResult, ThreadId};
use crate::utils::{THUMB_DIR_NAME, thread_dir};
use progress::Tee;

/// Capacity of the progress broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Main downloader instance (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct ThreadDownloader {
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Thread document fetcher sharing the HTTP client
    pub(crate) metadata: MetadataFetcher,
    /// Fetch/write engine; its limiter is shared by every run of this instance
    pub(crate) orchestrator: Arc<DownloadOrchestrator>,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: tokio::sync::broadcast::Sender<ProgressUpdate>,
}

impl ThreadDownloader {
    /// Create a downloader fetching files over HTTP.
    ///
    /// The configuration is validated and one HTTP client is built for both
    /// the thread document and the attachments.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let client = build_client(&config)?;
        let file_source = HttpFileSource::new(client.clone(), config.source.user_agent.clone());
        Ok(Self::assemble(config, client, Arc::new(file_source)))
    }

    /// Create a downloader that fetches attachments through a custom source.
    ///
    /// The thread document is still fetched over HTTP.
    pub fn with_file_source(config: Config, file_source: Arc<dyn FileSource>) -> Result<Self> {
        config.validate()?;
        let client = build_client(&config)?;
        Ok(Self::assemble(config, client, file_source))
    }

    fn assemble(config: Config, client: reqwest::Client, file_source: Arc<dyn FileSource>) -> Self {
        let (event_tx, _rx) = tokio::sync::broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let metadata = MetadataFetcher::new(client, config.source.clone());
        let orchestrator = Arc::new(DownloadOrchestrator::new(file_source, &config.download));

        Self {
            config: Arc::new(config),
            metadata,
            orchestrator,
            event_tx,
        }
    }

    /// Subscribe to progress updates of every run.
    ///
    /// Each subscriber receives all updates independently. A subscriber that
    /// falls behind by more than the channel capacity misses the oldest ones.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<ProgressUpdate> {
        self.event_tx.subscribe()
    }

    /// Get the configuration in use
    pub fn config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Download one thread into `<download_dir>/<thread_id>/`.
    ///
    /// Never returns an error: a failed thread document fetch produces a
    /// `failed` result, and per-file failures end up in the result's error
    /// list of a `completed` run. Every update is pushed to `reporter` and to
    /// the broadcast channel.
    pub async fn download_thread(
        &self,
        thread_id: &ThreadId,
        reporter: &dyn ProgressReporter,
    ) -> RunResult {
        let run = RunResult::start(thread_id.clone());
        let sink = Tee {
            first: reporter,
            second: &self.event_tx,
        };

        let run_dir = thread_dir(self.config.download_dir(), thread_id);
        let prepared = async {
            tokio::fs::create_dir_all(&run_dir).await?;
            tokio::fs::create_dir_all(run_dir.join(THUMB_DIR_NAME)).await
        };
        if let Err(e) = prepared.await {
            let error = Error::Io(e).to_string();
            tracing::error!(
                thread_id = %thread_id,
                path = %run_dir.display(),
                error = %error,
                "Failed to create thread folder"
            );
            sink.report(ProgressUpdate::Failed {
                thread_id: thread_id.clone(),
                error: error.clone(),
            });
            return run.fail(error);
        }

        sink.report(ProgressUpdate::DownloadingJson {
            thread_id: thread_id.clone(),
            progress: JSON_MILESTONE,
        });

        let posts = match self.metadata.fetch(thread_id, &run_dir).await {
            Ok(posts) => posts,
            Err(e) => {
                let error = Error::from(e).to_string();
                tracing::error!(thread_id = %thread_id, error = %error, "Thread download failed");
                sink.report(ProgressUpdate::Failed {
                    thread_id: thread_id.clone(),
                    error: error.clone(),
                });
                return run.fail(error);
            }
        };

        let references = FileReferenceExtractor::new(&self.config.source, &run_dir).extract(&posts);
        let found = orchestrator::count_originals(&references);
        tracing::info!(
            thread_id = %thread_id,
            posts = posts.len(),
            photos = found.photos,
            videos = found.videos,
            other = found.other,
            "Found files in thread"
        );

        self.orchestrator.run(run, references, &sink).await
    }
}

fn build_client(config: &Config) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(config.source.request_timeout)
        .build()
        .map_err(Error::Network)
}
