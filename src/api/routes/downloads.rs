//! Download trigger and status handlers.

use super::{DownloadResponse, StatusResponse};
use crate::api::AppState;
use crate::error::{Error, Result};
use crate::registry::RunSnapshot;
use crate::types::{RunState, ThreadId};
use crate::utils::scan_thread_dir;
use axum::{
    Json,
    extract::{Path, State},
};

/// POST /download/:thread_id - Start downloading a thread
#[utoipa::path(
    post,
    path = "/download/{thread_id}",
    tag = "downloads",
    params(
        ("thread_id" = String, Path, description = "Numeric thread identifier")
    ),
    responses(
        (status = 200, description = "Run started", body = DownloadResponse),
        (status = 400, description = "Invalid thread id", body = crate::error::ApiError),
        (status = 409, description = "Thread is already being downloaded", body = crate::error::ApiError)
    )
)]
pub async fn start_download(
    State(state): State<AppState>,
    Path(thread_id): Path<String>,
) -> Result<Json<DownloadResponse>> {
    let thread_id = ThreadId::parse(&thread_id)?;
    let ticket = state.registry.start(thread_id, &state.downloader)?;

    Ok(Json(DownloadResponse {
        message: format!("Download of thread {} started", ticket.thread_id),
        run_id: ticket.run_id,
        thread_id: ticket.thread_id,
        status: "started".to_string(),
    }))
}

/// GET /status/:thread_id - Get the status of a thread's download
///
/// Threads not started by this server are reported as completed when their
/// folder already holds the thread document.
#[utoipa::path(
    get,
    path = "/status/{thread_id}",
    tag = "downloads",
    params(
        ("thread_id" = String, Path, description = "Numeric thread identifier")
    ),
    responses(
        (status = 200, description = "Current status", body = StatusResponse),
        (status = 400, description = "Invalid thread id", body = crate::error::ApiError),
        (status = 404, description = "Thread unknown and not on disk", body = crate::error::ApiError)
    )
)]
pub async fn get_download_status(
    State(state): State<AppState>,
    Path(thread_id): Path<String>,
) -> Result<Json<StatusResponse>> {
    let thread_id = ThreadId::parse(&thread_id)?;

    if let Some(snapshot) = state.registry.status(&thread_id) {
        return Ok(Json(snapshot.into()));
    }

    let download_dir = state.config.download_dir().clone();
    let id = thread_id.clone();
    let scanned = tokio::task::spawn_blocking(move || scan_thread_dir(&download_dir, &id))
        .await
        .map_err(|e| Error::Other(format!("folder scan failed: {}", e)))?;

    match scanned {
        Some(stats) => Ok(Json(StatusResponse {
            thread_id,
            state: RunState::Completed,
            progress: 100,
            status: "already downloaded".to_string(),
            stats: Some(stats),
            total_files: Some(stats.total),
            downloaded: Some(stats.total),
            result: None,
            error: None,
        })),
        None => Err(Error::NotFound(format!("thread {}", thread_id))),
    }
}

fn status_text(state: RunState) -> &'static str {
    match state {
        RunState::Queued => "queued",
        RunState::DownloadingJson => "downloading thread document",
        RunState::DownloadingFiles => "downloading files",
        RunState::Completed => "completed",
        RunState::Failed => "failed",
    }
}

impl From<RunSnapshot> for StatusResponse {
    fn from(snapshot: RunSnapshot) -> Self {
        Self {
            thread_id: snapshot.thread_id,
            state: snapshot.state,
            progress: snapshot.progress,
            status: status_text(snapshot.state).to_string(),
            stats: Some(snapshot.stats),
            total_files: snapshot.total_files,
            downloaded: Some(snapshot.downloaded),
            result: snapshot.result,
            error: snapshot.error,
        }
    }
}
