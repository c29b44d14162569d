//! Thread document retrieval and file reference extraction.
//!
//! - [`metadata`] - fetches and persists the raw thread JSON, parses posts
//! - [`extract`] - turns posts into an ordered list of [`FileReference`](crate::types::FileReference)s

mod extract;
mod metadata;

pub use extract::FileReferenceExtractor;
pub use metadata::MetadataFetcher;

use serde::{Deserialize, Serialize};

/// Top level of a thread document (`<board>/res/<id>.json`)
///
/// Only the fields needed to locate attachments are modeled; everything else
/// in the document is ignored during parsing but kept verbatim on disk.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct ThreadDocument {
    /// Thread entries; the board returns exactly one for a thread page
    #[serde(default)]
    pub threads: Vec<ThreadEntry>,
}

impl ThreadDocument {
    /// Posts of the first thread entry, in document order
    pub fn into_posts(self) -> Vec<Post> {
        self.threads
            .into_iter()
            .next()
            .map(|thread| thread.posts)
            .unwrap_or_default()
    }
}

/// One thread entry of the document
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct ThreadEntry {
    /// Posts in document order
    #[serde(default)]
    pub posts: Vec<Post>,
}

/// A single post
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct Post {
    /// Post number
    #[serde(default)]
    pub num: Option<u64>,

    /// Attached files; the board sends `null` for posts without attachments
    #[serde(default)]
    pub files: Option<Vec<PostFile>>,
}

/// A file attached to a post
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct PostFile {
    /// Site-relative path of the original, e.g. `/b/src/123/1700.webm`
    #[serde(default)]
    pub path: Option<String>,

    /// Site-relative path of the thumbnail, e.g. `/b/thumb/123/1700s.jpg`
    #[serde(default)]
    pub thumbnail: Option<String>,
}
