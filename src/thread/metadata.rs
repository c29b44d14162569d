//! Thread document fetch: one GET, raw body persisted verbatim, then parsed.

use std::path::Path;

use reqwest::header::USER_AGENT;

use super::{Post, ThreadDocument};
use crate::config::SourceConfig;
use crate::error::MetadataFetchError;
use crate::types::ThreadId;

/// Retrieves the JSON document of a thread.
///
/// Every failure is fatal for the run and is not retried.
#[derive(Clone)]
pub struct MetadataFetcher {
    client: reqwest::Client,
    source: SourceConfig,
}

impl MetadataFetcher {
    /// Create a fetcher sharing the given HTTP client
    pub fn new(client: reqwest::Client, source: SourceConfig) -> Self {
        Self { client, source }
    }

    /// Fetch the thread document, save it as `<run_dir>/<thread_id>.json` and
    /// return the posts of the thread.
    ///
    /// The body is written before parsing, so a malformed document is still
    /// available on disk for inspection.
    pub async fn fetch(
        &self,
        thread_id: &ThreadId,
        run_dir: &Path,
    ) -> Result<Vec<Post>, MetadataFetchError> {
        let url = self.source.thread_url(thread_id.as_str());

        tracing::debug!(thread_id = %thread_id, url = %url, "Fetching thread document");

        let response = self
            .client
            .get(&url)
            .header(USER_AGENT, &self.source.user_agent)
            .send()
            .await
            .map_err(|source| MetadataFetchError::Request {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(MetadataFetchError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|source| MetadataFetchError::Request {
                url: url.clone(),
                source,
            })?;

        let document_path = run_dir.join(format!("{}.json", thread_id));
        let persist = async {
            tokio::fs::create_dir_all(run_dir).await?;
            tokio::fs::write(&document_path, &body).await
        };
        persist
            .await
            .map_err(|source| MetadataFetchError::Persist {
                path: document_path.clone(),
                source,
            })?;

        tracing::info!(
            thread_id = %thread_id,
            path = %document_path.display(),
            bytes = body.len(),
            "Thread document saved"
        );

        let document: ThreadDocument = serde_json::from_slice(&body)?;
        Ok(document.into_posts())
    }
}
