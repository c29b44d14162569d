//! Transport seam for per-file fetches.

use bytes::Bytes;
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use reqwest::header::USER_AGENT;

use crate::error::FileOperationError;

/// Body of a file being fetched, delivered in network-sized chunks
pub type ByteStream = BoxStream<'static, Result<Bytes, FileOperationError>>;

/// Abstraction over fetching a single file by URL, enabling testability.
#[async_trait::async_trait]
pub trait FileSource: Send + Sync {
    /// Start fetching `url`; a non-success response is an error.
    async fn open(&self, url: &str) -> Result<ByteStream, FileOperationError>;
}

/// Production [`FileSource`] issuing GET requests with the fixed header set.
#[derive(Clone)]
pub struct HttpFileSource {
    client: reqwest::Client,
    user_agent: String,
}

impl HttpFileSource {
    /// Create a source sharing the given HTTP client
    pub fn new(client: reqwest::Client, user_agent: impl Into<String>) -> Self {
        Self {
            client,
            user_agent: user_agent.into(),
        }
    }
}

#[async_trait::async_trait]
impl FileSource for HttpFileSource {
    async fn open(&self, url: &str) -> Result<ByteStream, FileOperationError> {
        let response = self
            .client
            .get(url)
            .header(USER_AGENT, &self.user_agent)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FileOperationError::Status {
                status: status.as_u16(),
            });
        }

        Ok(response
            .bytes_stream()
            .map_err(FileOperationError::Request)
            .boxed())
    }
}
