//! Utility functions for file names and on-disk thread folders

use std::path::{Path, PathBuf};

use crate::types::{DownloadStats, MediaKind, ThreadId};

/// Name of the folder that holds thumbnails inside a thread folder
pub const THUMB_DIR_NAME: &str = "thumb";

/// Final component of a site-relative path, as used for the local file name
///
/// Query strings and fragments are ignored. Returns `None` when no usable
/// name remains (empty, `.` or `..`), so such paths can be skipped.
///
/// # Examples
///
/// ```
/// use thread_dl::utils::file_name_from_path;
///
/// assert_eq!(file_name_from_path("/b/src/1/1700.webm"), Some("1700.webm"));
/// assert_eq!(file_name_from_path("/b/thumb/1/1700s.jpg?x=1"), Some("1700s.jpg"));
/// assert_eq!(file_name_from_path("/b/src/"), None);
/// ```
pub fn file_name_from_path(path: &str) -> Option<&str> {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let name = path.rsplit(['/', '\\']).next().unwrap_or_default();
    match name {
        "" | "." | ".." => None,
        name => Some(name),
    }
}

/// Folder for a thread inside the download root: `<root>/<thread_id>`
pub fn thread_dir(download_dir: &Path, thread_id: &ThreadId) -> PathBuf {
    download_dir.join(thread_id.as_str())
}

/// Path of the persisted thread document: `<root>/<thread_id>/<thread_id>.json`
pub fn thread_document_path(download_dir: &Path, thread_id: &ThreadId) -> PathBuf {
    thread_dir(download_dir, thread_id).join(format!("{}.json", thread_id))
}

/// Count the files of an already downloaded thread by extension
///
/// Only regular files directly inside the thread folder are counted; the
/// thread document and the thumbnail folder are ignored. Returns `None` when
/// the thread document does not exist.
pub fn scan_thread_dir(download_dir: &Path, thread_id: &ThreadId) -> Option<DownloadStats> {
    let document = thread_document_path(download_dir, thread_id);
    if !document.is_file() {
        return None;
    }

    let mut stats = DownloadStats::default();
    let entries = match std::fs::read_dir(thread_dir(download_dir, thread_id)) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(thread_id = %thread_id, error = %e, "Failed to read thread folder");
            return Some(stats);
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() || path == document {
            continue;
        }
        stats.record(MediaKind::classify(&path));
    }

    Some(stats)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn file_name_rejects_directory_like_paths() {
        assert_eq!(file_name_from_path(""), None);
        assert_eq!(file_name_from_path("/"), None);
        assert_eq!(file_name_from_path("/b/src/.."), None);
        assert_eq!(file_name_from_path("plain.png"), Some("plain.png"));
    }

    #[test]
    fn thread_paths_follow_layout() {
        let id = ThreadId::parse("42").unwrap();
        let root = Path::new("/data/downloads");

        assert_eq!(thread_dir(root, &id), PathBuf::from("/data/downloads/42"));
        assert_eq!(
            thread_document_path(root, &id),
            PathBuf::from("/data/downloads/42/42.json")
        );
    }

    #[test]
    fn scan_counts_media_and_skips_document_and_thumbs() {
        let temp = tempdir().unwrap();
        let id = ThreadId::parse("100").unwrap();
        let dir = thread_dir(temp.path(), &id);
        std::fs::create_dir_all(dir.join(THUMB_DIR_NAME)).unwrap();

        std::fs::write(dir.join("100.json"), "{}").unwrap();
        std::fs::write(dir.join("a.jpg"), b"x").unwrap();
        std::fs::write(dir.join("b.PNG"), b"x").unwrap();
        std::fs::write(dir.join("c.webm"), b"x").unwrap();
        std::fs::write(dir.join("d.txt"), b"x").unwrap();
        std::fs::write(dir.join(THUMB_DIR_NAME).join("as.jpg"), b"x").unwrap();

        let stats = scan_thread_dir(temp.path(), &id).unwrap();
        assert_eq!(stats, DownloadStats::new(2, 1, 1));
    }

    #[test]
    fn scan_without_document_is_none() {
        let temp = tempdir().unwrap();
        let id = ThreadId::parse("5").unwrap();
        std::fs::create_dir_all(thread_dir(temp.path(), &id)).unwrap();

        assert!(scan_thread_dir(temp.path(), &id).is_none());
    }
}
