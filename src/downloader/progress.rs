//! Progress sinks and milestone arithmetic.

use std::sync::Arc;

use crate::types::ProgressUpdate;

/// Progress reported once the thread document fetch starts
pub const JSON_MILESTONE: u8 = 5;

/// Progress reported when file downloads start
pub const FILES_BASE: u8 = 10;

/// Percentage points spread across file downloads
pub const FILES_SPAN: u8 = 85;

/// Progress used for file downloads when the thread has no originals
pub const EMPTY_THREAD_MILESTONE: u8 = FILES_BASE + FILES_SPAN;

/// Sink for run state updates.
///
/// `report` is called from the orchestrator's aggregation loop and must not
/// block: implementations either drop, buffer, or take a short lock.
pub trait ProgressReporter: Send + Sync {
    /// Accept a state update
    fn report(&self, update: ProgressUpdate);
}

/// Reporter that discards every update
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn report(&self, _update: ProgressUpdate) {}
}

/// Reporter backed by a closure
pub struct FnReporter<F>(pub F);

impl<F> ProgressReporter for FnReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    fn report(&self, update: ProgressUpdate) {
        (self.0)(update)
    }
}

impl ProgressReporter for tokio::sync::broadcast::Sender<ProgressUpdate> {
    fn report(&self, update: ProgressUpdate) {
        // send() returns Err if there are no receivers, which is fine - we just drop the update
        self.send(update).ok();
    }
}

impl ProgressReporter for tokio::sync::mpsc::UnboundedSender<ProgressUpdate> {
    fn report(&self, update: ProgressUpdate) {
        self.send(update).ok();
    }
}

impl<R: ProgressReporter + ?Sized> ProgressReporter for Arc<R> {
    fn report(&self, update: ProgressUpdate) {
        (**self).report(update)
    }
}

/// Forwards every update to two reporters
pub(crate) struct Tee<'a> {
    pub(crate) first: &'a dyn ProgressReporter,
    pub(crate) second: &'a dyn ProgressReporter,
}

impl ProgressReporter for Tee<'_> {
    fn report(&self, update: ProgressUpdate) {
        self.first.report(update.clone());
        self.second.report(update);
    }
}

/// Percentage for `downloaded` of `total_files` originals written.
///
/// `floor(FILES_BASE + downloaded / total_files * FILES_SPAN)`, capped at the
/// top of the span. An empty thread is reported at the top of the span.
pub fn files_progress(downloaded: u64, total_files: u64) -> u8 {
    if total_files == 0 {
        return EMPTY_THREAD_MILESTONE;
    }
    let span = downloaded.min(total_files) * u64::from(FILES_SPAN) / total_files;
    FILES_BASE + span as u8
}

/// Keeps reported percentages from going backwards
#[derive(Debug, Default)]
pub(crate) struct ProgressTracker {
    last: u8,
}

impl ProgressTracker {
    /// Clamp `progress` so it is never below a previously returned value
    pub(crate) fn advance(&mut self, progress: u8) -> u8 {
        self.last = self.last.max(progress.min(100));
        self.last
    }
}
