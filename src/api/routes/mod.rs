//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`downloads`] — Starting runs and reporting their status
//! - [`system`] — Service info, health, events, OpenAPI

use serde::{Deserialize, Serialize};

use crate::types::{DownloadStats, RunResult, RunState, ThreadId};

mod downloads;
mod system;

// Re-export all handlers so `routes::function_name` continues to work
pub use downloads::*;
pub use system::*;

// ============================================================================
// Response Types (shared across handlers)
// ============================================================================

/// Response for POST /download/:thread_id
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct DownloadResponse {
    /// Identifier of the accepted run
    pub run_id: String,
    /// Thread being downloaded
    pub thread_id: ThreadId,
    /// Always "started"
    pub status: String,
    /// Human-readable confirmation
    pub message: String,
}

/// Response for GET /status/:thread_id
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct StatusResponse {
    /// Thread the status refers to
    pub thread_id: ThreadId,
    /// Current run state
    pub state: RunState,
    /// Progress percentage (0-100)
    pub progress: u8,
    /// Human-readable status text
    pub status: String,
    /// Counters of written originals
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<DownloadStats>,
    /// Original files referenced by the thread, once known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_files: Option<u64>,
    /// Original files written so far
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downloaded: Option<u64>,
    /// Final result of a finished run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<RunResult>,
    /// Fatal error text of a failed run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
