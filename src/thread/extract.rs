//! Post walking: one reference per original, plus one per thumbnail.

use std::path::Path;

use super::Post;
use crate::config::SourceConfig;
use crate::types::FileReference;
use crate::utils::{THUMB_DIR_NAME, file_name_from_path};

/// Builds the download list for a thread folder.
///
/// Originals land in the thread folder, thumbnails in its `thumb/` subfolder.
pub struct FileReferenceExtractor<'a> {
    source: &'a SourceConfig,
    run_dir: &'a Path,
}

impl<'a> FileReferenceExtractor<'a> {
    /// Create an extractor writing into `run_dir`
    pub fn new(source: &'a SourceConfig, run_dir: &'a Path) -> Self {
        Self { source, run_dir }
    }

    /// Walk posts in document order and emit references.
    ///
    /// A file without a usable `path` is skipped together with its thumbnail.
    pub fn extract(&self, posts: &[Post]) -> Vec<FileReference> {
        let thumb_dir = self.run_dir.join(THUMB_DIR_NAME);
        let mut references = Vec::new();

        for file in posts.iter().filter_map(|p| p.files.as_ref()).flatten() {
            let Some(path) = file.path.as_deref() else {
                continue;
            };
            let Some(name) = file_name_from_path(path) else {
                continue;
            };

            references.push(FileReference::original(
                self.source.file_url(path),
                self.run_dir.join(name),
            ));

            if let Some(thumb) = file.thumbnail.as_deref()
                && let Some(thumb_name) = file_name_from_path(thumb)
            {
                references.push(FileReference::thumbnail(
                    self.source.file_url(thumb),
                    thumb_dir.join(thumb_name),
                ));
            }
        }

        references
    }
}
