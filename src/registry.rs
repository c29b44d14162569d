//! Per-thread run tracking for the trigger layer.
//!
//! The registry is an explicit value owned by whoever starts runs (the API
//! state, or a test). It keeps the latest [`RunSnapshot`] of every thread that
//! was started through it and refuses a second concurrent run of the same thread.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::downloader::{ProgressReporter, ThreadDownloader};
use crate::error::{Error, Result};
use crate::types::{DownloadStats, ProgressUpdate, RunResult, RunState, RunStatus, ThreadId};

/// Latest known state of a thread's run
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct RunSnapshot {
    /// Identifier of the run this snapshot belongs to
    pub run_id: String,
    /// Thread being downloaded
    pub thread_id: ThreadId,
    /// Current state
    pub state: RunState,
    /// Progress percentage (0-100), never decreasing within a run
    pub progress: u8,
    /// Original files referenced by the thread, once known
    pub total_files: Option<u64>,
    /// Original files written so far
    pub downloaded: u64,
    /// Counters so far
    pub stats: DownloadStats,
    /// Final result, present once the run is terminal
    pub result: Option<RunResult>,
    /// Fatal error text for failed runs
    pub error: Option<String>,
    /// When the run was accepted
    pub started_at: DateTime<Utc>,
    /// When the snapshot last changed
    pub updated_at: DateTime<Utc>,
}

impl RunSnapshot {
    fn queued(run_id: String, thread_id: ThreadId, now: DateTime<Utc>) -> Self {
        Self {
            run_id,
            thread_id,
            state: RunState::Queued,
            progress: 0,
            total_files: None,
            downloaded: 0,
            stats: DownloadStats::default(),
            result: None,
            error: None,
            started_at: now,
            updated_at: now,
        }
    }

    /// Apply a non-terminal update; terminal updates are left to [`Self::finish`]
    fn apply(&mut self, update: &ProgressUpdate) {
        match update {
            ProgressUpdate::DownloadingJson { progress, .. } => {
                self.state = RunState::DownloadingJson;
                self.progress = self.progress.max(*progress);
            }
            ProgressUpdate::DownloadingFiles {
                progress,
                total_files,
                downloaded,
                stats,
                ..
            } => {
                self.state = RunState::DownloadingFiles;
                self.progress = self.progress.max(*progress);
                self.total_files = Some(*total_files);
                self.downloaded = *downloaded;
                self.stats = *stats;
            }
            ProgressUpdate::Completed { .. } | ProgressUpdate::Failed { .. } => return,
        }
        self.updated_at = Utc::now();
    }

    /// Record the terminal result together with the terminal state
    fn finish(&mut self, result: RunResult) {
        match result.status() {
            RunStatus::Failed => {
                self.state = RunState::Failed;
                self.error = result.error().map(str::to_string);
            }
            RunStatus::Completed | RunStatus::Processing => {
                self.state = RunState::Completed;
                self.progress = 100;
            }
        }
        self.stats = result.stats();
        self.downloaded = result.stats().total;
        self.result = Some(result);
        self.updated_at = Utc::now();
    }
}

/// Handle returned when a run is accepted
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct RunTicket {
    /// Identifier of the new run
    pub run_id: String,
    /// Thread being downloaded
    pub thread_id: ThreadId,
    /// When the run was accepted
    pub started_at: DateTime<Utc>,
}

type Runs = Arc<RwLock<HashMap<ThreadId, RunSnapshot>>>;

/// Store of run snapshots keyed by thread (cloneable - shares the same map)
#[derive(Clone, Default)]
pub struct RunRegistry {
    runs: Runs,
}

impl RunRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Start downloading `thread_id` in the background.
    ///
    /// Returns [`Error::AlreadyRunning`] if a run of the same thread has not
    /// reached a terminal state yet. A finished thread can be started again;
    /// its snapshot is replaced.
    pub fn start(&self, thread_id: ThreadId, downloader: &ThreadDownloader) -> Result<RunTicket> {
        let now = Utc::now();
        let run_id = format!("{}-{}", thread_id, now.format("%Y%m%d%H%M%S%3f"));

        {
            let mut runs = self.runs.write().unwrap_or_else(PoisonError::into_inner);
            if let Some(existing) = runs.get(&thread_id)
                && !existing.state.is_terminal()
            {
                return Err(Error::AlreadyRunning(thread_id));
            }
            runs.insert(
                thread_id.clone(),
                RunSnapshot::queued(run_id.clone(), thread_id.clone(), now),
            );
        }

        tracing::info!(thread_id = %thread_id, run_id = %run_id, "Run accepted");

        let reporter = SnapshotReporter {
            runs: Arc::clone(&self.runs),
            thread_id: thread_id.clone(),
            run_id: run_id.clone(),
        };
        let downloader = downloader.clone();
        let id = thread_id.clone();

        tokio::spawn(async move {
            let run = {
                let reporter = reporter.clone();
                tokio::spawn(async move { downloader.download_thread(&id, &reporter).await })
            };

            let result = match run.await {
                Ok(result) => result,
                Err(e) => {
                    tracing::error!(
                        thread_id = %reporter.thread_id,
                        error = %e,
                        "Run task aborted"
                    );
                    RunResult::start(reporter.thread_id.clone()).fail(format!("run aborted: {}", e))
                }
            };
            reporter.finish(result);
        });

        Ok(RunTicket {
            run_id,
            thread_id,
            started_at: now,
        })
    }

    /// Latest snapshot of a thread started through this registry
    pub fn status(&self, thread_id: &ThreadId) -> Option<RunSnapshot> {
        self.runs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(thread_id)
            .cloned()
    }

    /// Whether a run of `thread_id` is queued or downloading
    pub fn is_active(&self, thread_id: &ThreadId) -> bool {
        self.status(thread_id)
            .is_some_and(|snapshot| !snapshot.state.is_terminal())
    }

    /// Number of threads tracked
    pub fn len(&self) -> usize {
        self.runs.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether no thread has been started yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Writes updates of one run into its snapshot.
///
/// Updates carrying another run id are ignored, so a replaced run cannot
/// overwrite its successor.
#[derive(Clone)]
struct SnapshotReporter {
    runs: Runs,
    thread_id: ThreadId,
    run_id: String,
}

impl SnapshotReporter {
    fn with_snapshot(&self, f: impl FnOnce(&mut RunSnapshot)) {
        let mut runs = self.runs.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(snapshot) = runs.get_mut(&self.thread_id)
            && snapshot.run_id == self.run_id
        {
            f(snapshot);
        }
    }

    fn finish(&self, result: RunResult) {
        tracing::debug!(
            thread_id = %self.thread_id,
            run_id = %self.run_id,
            status = ?result.status(),
            "Run finished"
        );
        self.with_snapshot(|snapshot| snapshot.finish(result));
    }
}

impl ProgressReporter for SnapshotReporter {
    fn report(&self, update: ProgressUpdate) {
        self.with_snapshot(|snapshot| snapshot.apply(&update));
    }
}
