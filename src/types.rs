//! Core types for thread-dl

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use utoipa::ToSchema;

use crate::error::{Error, Result};

/// Extensions counted as photos (lowercase, leading dot)
pub const IMAGE_EXTENSIONS: [&str; 6] = [".jpg", ".jpeg", ".png", ".gif", ".bmp", ".webp"];

/// Extensions counted as videos (lowercase, leading dot)
pub const VIDEO_EXTENSIONS: [&str; 5] = [".mp4", ".webm", ".mov", ".avi", ".mkv"];

/// Identifier of a remote discussion thread
///
/// Always a non-empty string of ASCII digits, so it is safe to use as a
/// directory and file name.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct ThreadId(String);

impl ThreadId {
    /// Validate and wrap a thread identifier
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::InvalidThreadId(raw.to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    /// Get the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ThreadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for ThreadId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// One downloadable item: an original attachment or its thumbnail
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FileReference {
    /// Absolute URL to fetch
    pub source_url: String,
    /// Where the body is written
    #[schema(value_type = String)]
    pub destination_path: PathBuf,
    /// `false` for thumbnails; only originals count towards stats
    pub is_original: bool,
}

impl FileReference {
    /// Reference to an original attachment
    pub fn original(source_url: impl Into<String>, destination_path: impl Into<PathBuf>) -> Self {
        Self {
            source_url: source_url.into(),
            destination_path: destination_path.into(),
            is_original: true,
        }
    }

    /// Reference to a thumbnail
    pub fn thumbnail(source_url: impl Into<String>, destination_path: impl Into<PathBuf>) -> Self {
        Self {
            source_url: source_url.into(),
            destination_path: destination_path.into(),
            is_original: false,
        }
    }
}

/// Media category derived from a file extension
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// Image extensions
    Photo,
    /// Video extensions
    Video,
    /// Anything else, including files without an extension
    Other,
}

impl MediaKind {
    /// Classify a path by its extension, case-insensitively
    pub fn classify(path: &Path) -> Self {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return MediaKind::Other;
        };
        let dotted = format!(".{}", ext.to_ascii_lowercase());

        if IMAGE_EXTENSIONS.contains(&dotted.as_str()) {
            MediaKind::Photo
        } else if VIDEO_EXTENSIONS.contains(&dotted.as_str()) {
            MediaKind::Video
        } else {
            MediaKind::Other
        }
    }
}

/// Counters of successfully written original files
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DownloadStats {
    /// Images written
    pub photos: u64,
    /// Videos written
    pub videos: u64,
    /// Everything else written
    pub other: u64,
    /// `photos + videos + other`
    pub total: u64,
}

impl DownloadStats {
    /// Build stats from the three counters, deriving `total`
    pub fn new(photos: u64, videos: u64, other: u64) -> Self {
        Self {
            photos,
            videos,
            other,
            total: photos + videos + other,
        }
    }

    /// Count one more file of the given kind
    pub fn record(&mut self, kind: MediaKind) {
        match kind {
            MediaKind::Photo => self.photos += 1,
            MediaKind::Video => self.videos += 1,
            MediaKind::Other => self.other += 1,
        }
        self.total += 1;
    }
}

/// A reference that failed to download, with the attempt it failed on
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FailureRecord {
    /// The reference that failed
    pub reference: FileReference,
    /// 1 for the first pass, 2 for the retry pass
    pub attempt: u8,
    /// Failure description
    pub error: String,
}

/// Lifecycle status of a run result
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Run in progress
    Processing,
    /// All references attempted (some may have failed permanently)
    Completed,
    /// The thread document could not be fetched
    Failed,
}

impl RunStatus {
    /// Whether no further changes are allowed
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Failed)
    }
}

/// Outcome of one run for a single thread
///
/// Created with status `processing`; the transitions to `completed` or
/// `failed` consume the value, so a terminal result is never written again.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RunResult {
    thread_id: ThreadId,
    status: RunStatus,
    stats: DownloadStats,
    errors: Vec<FailureRecord>,
    started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl RunResult {
    /// Start a new run now
    pub fn start(thread_id: ThreadId) -> Self {
        Self {
            thread_id,
            status: RunStatus::Processing,
            stats: DownloadStats::default(),
            errors: Vec::new(),
            started_at: Utc::now(),
            completed_at: None,
            error: None,
        }
    }

    /// Finish the run successfully; permanent failures may still be present
    pub fn complete(mut self, stats: DownloadStats, errors: Vec<FailureRecord>) -> Self {
        if self.status.is_terminal() {
            return self;
        }
        self.status = RunStatus::Completed;
        self.stats = stats;
        self.errors = errors;
        self.completed_at = Some(Utc::now());
        self
    }

    /// Finish the run with a fatal error; stats are reset to zero
    pub fn fail(mut self, error: impl Into<String>) -> Self {
        if self.status.is_terminal() {
            return self;
        }
        self.status = RunStatus::Failed;
        self.stats = DownloadStats::default();
        self.error = Some(error.into());
        self.completed_at = Some(Utc::now());
        self
    }

    /// Thread this run belongs to
    pub fn thread_id(&self) -> &ThreadId {
        &self.thread_id
    }

    /// Current status
    pub fn status(&self) -> RunStatus {
        self.status
    }

    /// Success counters
    pub fn stats(&self) -> DownloadStats {
        self.stats
    }

    /// References that failed both attempts, in completion order
    pub fn errors(&self) -> &[FailureRecord] {
        &self.errors
    }

    /// When the run started
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// When the run reached a terminal status
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Fatal error text for failed runs
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

/// State exposed to the task-tracking surface
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// Accepted, not yet started
    Queued,
    /// Fetching the thread document
    DownloadingJson,
    /// Fetching attachments
    DownloadingFiles,
    /// Finished (possibly with permanent per-file errors)
    Completed,
    /// Thread document fetch failed
    Failed,
}

impl RunState {
    /// Whether the run has finished
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Completed | RunState::Failed)
    }
}

/// A discrete update pushed to a [`ProgressReporter`](crate::downloader::ProgressReporter)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProgressUpdate {
    /// Thread document fetch started
    DownloadingJson {
        /// Thread ID
        thread_id: ThreadId,
        /// Progress percentage (0-100)
        progress: u8,
    },

    /// File downloads in progress
    DownloadingFiles {
        /// Thread ID
        thread_id: ThreadId,
        /// Progress percentage (0-100)
        progress: u8,
        /// Number of original files referenced by the thread
        total_files: u64,
        /// Original files written so far
        downloaded: u64,
        /// Counters so far
        stats: DownloadStats,
    },

    /// Run finished
    Completed {
        /// Thread ID
        thread_id: ThreadId,
        /// Final counters
        stats: DownloadStats,
        /// References that failed both attempts
        errors: Vec<FailureRecord>,
    },

    /// Run aborted
    Failed {
        /// Thread ID
        thread_id: ThreadId,
        /// Fatal error text
        error: String,
    },
}

impl ProgressUpdate {
    /// Thread the update refers to
    pub fn thread_id(&self) -> &ThreadId {
        match self {
            ProgressUpdate::DownloadingJson { thread_id, .. }
            | ProgressUpdate::DownloadingFiles { thread_id, .. }
            | ProgressUpdate::Completed { thread_id, .. }
            | ProgressUpdate::Failed { thread_id, .. } => thread_id,
        }
    }

    /// Tracker state this update moves the run into
    pub fn state(&self) -> RunState {
        match self {
            ProgressUpdate::DownloadingJson { .. } => RunState::DownloadingJson,
            ProgressUpdate::DownloadingFiles { .. } => RunState::DownloadingFiles,
            ProgressUpdate::Completed { .. } => RunState::Completed,
            ProgressUpdate::Failed { .. } => RunState::Failed,
        }
    }

    /// Progress percentage carried by the update, if any
    pub fn progress(&self) -> Option<u8> {
        match self {
            ProgressUpdate::DownloadingJson { progress, .. }
            | ProgressUpdate::DownloadingFiles { progress, .. } => Some(*progress),
            ProgressUpdate::Completed { .. } => Some(100),
            ProgressUpdate::Failed { .. } => None,
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thread_id_accepts_digits_only() {
        assert_eq!(ThreadId::parse("123456").unwrap().as_str(), "123456");
        assert!(matches!(
            ThreadId::parse(""),
            Err(Error::InvalidThreadId(_))
        ));
        assert!(ThreadId::parse("12a4").is_err());
        assert!(ThreadId::parse("../1").is_err());
        assert!(ThreadId::parse(" 12").is_err());
    }

    #[test]
    fn classify_is_case_insensitive() {
        assert_eq!(MediaKind::classify(Path::new("a/b/pic.JPG")), MediaKind::Photo);
        assert_eq!(MediaKind::classify(Path::new("pic.jpeg")), MediaKind::Photo);
        assert_eq!(MediaKind::classify(Path::new("clip.WebM")), MediaKind::Video);
        assert_eq!(MediaKind::classify(Path::new("clip.mkv")), MediaKind::Video);
    }

    #[test]
    fn classify_unknown_or_missing_extension_is_other() {
        assert_eq!(MediaKind::classify(Path::new("track.mp3")), MediaKind::Other);
        assert_eq!(MediaKind::classify(Path::new("README")), MediaKind::Other);
        assert_eq!(MediaKind::classify(Path::new(".hidden")), MediaKind::Other);
    }

    #[test]
    fn stats_total_tracks_counters() {
        let mut stats = DownloadStats::default();
        stats.record(MediaKind::Photo);
        stats.record(MediaKind::Video);
        stats.record(MediaKind::Other);
        stats.record(MediaKind::Photo);

        assert_eq!(stats, DownloadStats::new(2, 1, 1));
        assert_eq!(stats.total, stats.photos + stats.videos + stats.other);
    }

    #[test]
    fn terminal_run_result_is_frozen() {
        let thread_id = ThreadId::parse("1").unwrap();
        let result = RunResult::start(thread_id.clone());
        assert_eq!(result.status(), RunStatus::Processing);
        assert!(result.completed_at().is_none());

        let completed = result.complete(DownloadStats::new(1, 0, 0), vec![]);
        let completed_at = completed.completed_at();
        assert_eq!(completed.status(), RunStatus::Completed);

        let after = completed.fail("late error");
        assert_eq!(after.status(), RunStatus::Completed);
        assert_eq!(after.stats(), DownloadStats::new(1, 0, 0));
        assert_eq!(after.error(), None);
        assert_eq!(after.completed_at(), completed_at);
    }

    #[test]
    fn failed_run_result_has_empty_stats_and_error() {
        let result = RunResult::start(ThreadId::parse("2").unwrap()).fail("HTTP 404");

        assert_eq!(result.status(), RunStatus::Failed);
        assert_eq!(result.stats(), DownloadStats::default());
        assert_eq!(result.error(), Some("HTTP 404"));
        assert!(result.errors().is_empty());
    }

    #[test]
    fn progress_update_serializes_with_status_tag() {
        let update = ProgressUpdate::DownloadingFiles {
            thread_id: ThreadId::parse("9").unwrap(),
            progress: 52,
            total_files: 10,
            downloaded: 5,
            stats: DownloadStats::new(3, 2, 0),
        };
        let json = serde_json::to_value(&update).unwrap();

        assert_eq!(json["status"], "downloading_files");
        assert_eq!(json["thread_id"], "9");
        assert_eq!(json["progress"], 52);
        assert_eq!(json["stats"]["total"], 5);
        assert_eq!(update.state(), RunState::DownloadingFiles);
    }

    #[test]
    fn run_result_serialization_skips_absent_fields() {
        let result = RunResult::start(ThreadId::parse("3").unwrap());
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["status"], "processing");
        assert!(json.get("completed_at").is_none());
        assert!(json.get("error").is_none());
    }
}
