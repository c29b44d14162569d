//! # thread-dl
//!
//! Library for archiving the attachments of imageboard threads.
//!
//! A run fetches a thread's JSON document, saves it verbatim, and downloads
//! every attachment and thumbnail it references into
//! `<download_dir>/<thread_id>/`, with at most eight transfers in flight and
//! one retry pass for failures.
//!
//! ## Quick Start
//!
//! ```no_run
//! use thread_dl::{Config, ThreadDownloader, ThreadId};
//! use thread_dl::downloader::NoopReporter;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let downloader = ThreadDownloader::new(Config::default())?;
//!
//!     // Subscribe to progress updates
//!     let mut updates = downloader.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(update) = updates.recv().await {
//!             println!("Update: {:?}", update);
//!         }
//!     });
//!
//!     let thread_id = ThreadId::parse("123456")?;
//!     let result = downloader.download_thread(&thread_id, &NoopReporter).await;
//!     println!("{:?}: {:?}", result.status(), result.stats());
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Configuration types
pub mod config;
/// Thread download pipeline
pub mod downloader;
/// Error types
pub mod error;
/// Per-thread run tracking
pub mod registry;
/// Thread document model, fetch and reference extraction
pub mod thread;
/// Core types and progress updates
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use downloader::{ProgressReporter, ThreadDownloader};
pub use error::{
    ApiError, Error, ErrorDetail, FileOperationError, MetadataFetchError, Result, ToHttpStatus,
};
pub use registry::{RunRegistry, RunSnapshot, RunTicket};
pub use types::{
    DownloadStats, FailureRecord, FileReference, MediaKind, ProgressUpdate, RunResult, RunState,
    RunStatus, ThreadId,
};

/// Helper function to serve the API until a termination signal arrives.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use thread_dl::{Config, ThreadDownloader, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let downloader = ThreadDownloader::new(Config::default())?;
///
///     // Serve with automatic signal handling
///     run_with_shutdown(downloader).await?;
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(downloader: ThreadDownloader) -> Result<()> {
    api::start_api_server(downloader, RunRegistry::new(), wait_for_signal()).await
}

#[cfg(unix)]
async fn wait_for_signal() {
    wait_for_any(register_signals()).await;
}

/// Register SIGTERM and SIGINT, keeping whichever handlers succeed.
///
/// Registration may fail in restricted environments (containers, tests).
#[cfg(unix)]
fn register_signals() -> Vec<(tokio::signal::unix::Signal, &'static str)> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut handlers = Vec::with_capacity(2);
    for (kind, name) in [
        (SignalKind::terminate(), "SIGTERM"),
        (SignalKind::interrupt(), "SIGINT"),
    ] {
        match signal(kind) {
            Ok(handler) => handlers.push((handler, name)),
            Err(e) => {
                tracing::warn!(signal = name, error = %e, "Could not register signal handler")
            }
        }
    }
    handlers
}

#[cfg(unix)]
async fn wait_for_any(mut handlers: Vec<(tokio::signal::unix::Signal, &'static str)>) {
    match handlers.as_mut_slice() {
        [] => {
            tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
            tokio::signal::ctrl_c().await.ok();
        }
        [(only, name)] => {
            tracing::warn!(signal = *name, "Waiting for a single termination signal");
            only.recv().await;
            tracing::info!(signal = *name, "Received termination signal");
        }
        [(first, first_name), (second, second_name), ..] => {
            let name = tokio::select! {
                _ = first.recv() => *first_name,
                _ = second.recv() => *second_name,
            };
            tracing::info!(signal = name, "Received termination signal");
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
