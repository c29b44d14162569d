//! Bounded-concurrency fetch/write engine with one retry pass.

use std::sync::Arc;

use futures::StreamExt;
use futures::stream::FuturesUnordered;
use tokio::io::AsyncWriteExt;
use tokio::sync::Semaphore;

use super::progress::{FILES_BASE, ProgressReporter, ProgressTracker, files_progress};
use super::source::FileSource;
use crate::config::{DownloadConfig, MAX_CONCURRENT_FETCHES};
use crate::error::FileOperationError;
use crate::types::{
    DownloadStats, FailureRecord, FileReference, MediaKind, ProgressUpdate, RunResult, ThreadId,
};

/// Downloads a list of file references into place.
///
/// At most `max_concurrent_fetches` fetch-and-write operations are in flight at
/// any time, across both passes, and never more than eight. Completions are funneled into a single
/// aggregation loop, which is the only writer of the stats.
pub struct DownloadOrchestrator {
    source: Arc<dyn FileSource>,
    limiter: Arc<Semaphore>,
    max_concurrent: usize,
    chunk_size: usize,
    progress_batch_size: usize,
}

/// Per-run bookkeeping owned by the aggregation loop
struct PassState<'a> {
    thread_id: &'a ThreadId,
    reporter: &'a dyn ProgressReporter,
    tracker: ProgressTracker,
    total_files: u64,
    stats: DownloadStats,
}

impl PassState<'_> {
    fn report_files(&mut self) {
        let progress = self
            .tracker
            .advance(files_progress(self.stats.total, self.total_files));
        self.reporter.report(ProgressUpdate::DownloadingFiles {
            thread_id: self.thread_id.clone(),
            progress,
            total_files: self.total_files,
            downloaded: self.stats.total,
            stats: self.stats,
        });
    }
}

impl DownloadOrchestrator {
    /// Create an orchestrator fetching through `source`
    pub fn new(source: Arc<dyn FileSource>, settings: &DownloadConfig) -> Self {
        let max_concurrent = settings
            .max_concurrent_fetches
            .clamp(1, MAX_CONCURRENT_FETCHES);
        Self {
            source,
            limiter: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
            chunk_size: settings.chunk_size.max(1),
            progress_batch_size: settings.progress_batch_size.max(1),
        }
    }

    /// Download every reference, retry failures once, and finish the run.
    ///
    /// Per-file errors never abort the run: references that fail both attempts
    /// end up in the result's error list and the run is still `completed`.
    pub async fn run(
        &self,
        run: RunResult,
        references: Vec<FileReference>,
        reporter: &dyn ProgressReporter,
    ) -> RunResult {
        let thread_id = run.thread_id().clone();
        let total_files = references.iter().filter(|r| r.is_original).count() as u64;

        let mut state = PassState {
            thread_id: &thread_id,
            reporter,
            tracker: ProgressTracker::default(),
            total_files,
            stats: DownloadStats::default(),
        };

        let initial = if total_files == 0 {
            files_progress(0, 0)
        } else {
            FILES_BASE
        };
        reporter.report(ProgressUpdate::DownloadingFiles {
            thread_id: thread_id.clone(),
            progress: state.tracker.advance(initial),
            total_files,
            downloaded: 0,
            stats: DownloadStats::default(),
        });

        tracing::info!(
            thread_id = %thread_id,
            references = references.len(),
            total_files,
            max_concurrent = self.max_concurrent,
            "Starting file downloads"
        );

        let failures = self.run_pass(references, 1, &mut state).await;

        let errors = if failures.is_empty() {
            Vec::new()
        } else {
            tracing::warn!(
                thread_id = %thread_id,
                count = failures.len(),
                "Retrying failed downloads"
            );
            let before_retry = state.stats.total;
            let retry: Vec<FileReference> = failures.into_iter().map(|f| f.reference).collect();
            let still_failed = self.run_pass(retry, 2, &mut state).await;
            if state.stats.total != before_retry {
                state.report_files();
            }
            still_failed
        };

        for failure in &errors {
            tracing::error!(
                thread_id = %thread_id,
                url = %failure.reference.source_url,
                path = %failure.reference.destination_path.display(),
                error = %failure.error,
                "Still failed after retry"
            );
        }

        let stats = state.stats;
        tracing::info!(
            thread_id = %thread_id,
            photos = stats.photos,
            videos = stats.videos,
            other = stats.other,
            failed = errors.len(),
            "Download completed"
        );

        reporter.report(ProgressUpdate::Completed {
            thread_id,
            stats,
            errors: errors.clone(),
        });

        run.complete(stats, errors)
    }

    /// Run one pass over `references` and return the ones that failed.
    ///
    /// Returns only after every operation of the pass has finished.
    async fn run_pass(
        &self,
        references: Vec<FileReference>,
        attempt: u8,
        state: &mut PassState<'_>,
    ) -> Vec<FailureRecord> {
        let mut in_flight: FuturesUnordered<_> = references
            .into_iter()
            .map(|reference| async move {
                let outcome = self.fetch_and_write(&reference).await;
                (reference, outcome)
            })
            .collect();

        let mut failures = Vec::new();
        let mut finished = 0usize;

        while let Some((reference, outcome)) = in_flight.next().await {
            finished += 1;

            match outcome {
                Ok(()) => {
                    tracing::debug!(
                        path = %reference.destination_path.display(),
                        attempt,
                        "Downloaded"
                    );
                    if reference.is_original {
                        state
                            .stats
                            .record(MediaKind::classify(&reference.destination_path));
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        url = %reference.source_url,
                        attempt,
                        error = %e,
                        "Failed to download"
                    );
                    failures.push(FailureRecord {
                        reference,
                        attempt,
                        error: e.to_string(),
                    });
                }
            }

            // Progress is only recomputed per batch of the first pass; the
            // retry pass reports once when it is done.
            if attempt == 1 && (finished % self.progress_batch_size == 0 || in_flight.is_empty()) {
                state.report_files();
            }
        }

        failures
    }

    /// Fetch one reference and stream it to its destination while holding a
    /// limiter slot.
    async fn fetch_and_write(&self, reference: &FileReference) -> Result<(), FileOperationError> {
        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|_| FileOperationError::Other("download limiter closed".to_string()))?;

        let mut body = self.source.open(&reference.source_url).await?;

        let path = reference.destination_path.as_path();
        let io_error = |source: std::io::Error| FileOperationError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            // create_dir_all tolerates directories created concurrently by other operations
            tokio::fs::create_dir_all(parent).await.map_err(io_error)?;
        }

        let mut file = tokio::fs::File::create(path).await.map_err(io_error)?;
        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            for piece in chunk.chunks(self.chunk_size) {
                file.write_all(piece).await.map_err(io_error)?;
            }
        }
        file.flush().await.map_err(io_error)?;

        Ok(())
    }
}

/// Count references by media kind, for the summary logged before downloading
pub(crate) fn count_originals(references: &[FileReference]) -> DownloadStats {
    let mut counts = DownloadStats::default();
    for reference in references.iter().filter(|r| r.is_original) {
        counts.record(MediaKind::classify(&reference.destination_path));
    }
    counts
}
