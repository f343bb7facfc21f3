//! Errors raised by the lifecycle engine.

use std::path::PathBuf;

use thiserror::Error;

use crate::client::FetchError;
use crate::model::{BookStatus, ContentFormatError};
use crate::parser::ParseError;
use crate::repo::RepoError;

/// Errors from site operations.
///
/// Per-book variants are logged and counted by batch operations; only
/// [`ServiceError::Repo`] raised while listing books aborts a batch.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Repo(#[from] RepoError),

    /// Reading or writing a stored text file failed.
    #[error("storage error at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A stored text file does not follow the artifact format.
    #[error("malformed book file {path}: {source}")]
    ContentFormat {
        path: PathBuf,
        #[source]
        source: ContentFormatError,
    },

    /// A version string is not base-36.
    #[error("invalid version: {0:?}")]
    InvalidVersion(String),

    /// Download requested for a book that is not finished.
    #[error("book {book} is {status}, only END books can be downloaded")]
    NotDownloadable { book: String, status: BookStatus },

    /// Download requested for a book that is already stored.
    #[error("book {book} is already downloaded")]
    AlreadyDownloaded { book: String },

    /// Content requested for a book that has no stored file.
    #[error("book {book} is not downloaded")]
    NotDownloaded { book: String },

    /// Too many chapters failed; nothing was written.
    #[error("book {book}: {failed} of {total} chapters failed")]
    TooManyFailedChapters {
        book: String,
        failed: usize,
        total: usize,
    },

    /// The availability page did not contain the expected marker.
    #[error("site unavailable: {url} does not contain {marker:?}")]
    Unavailable { url: String, marker: String },

    /// Worker semaphore was closed unexpectedly.
    #[error("semaphore closed unexpectedly")]
    SemaphoreClosed,
}

impl ServiceError {
    pub(crate) fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    /// Returns true when the requested book does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Repo(err) if err.is_not_found())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_too_many_failed_chapters_message() {
        let err = ServiceError::TooManyFailedChapters {
            book: "site-1".to_string(),
            failed: 11,
            total: 100,
        };
        assert_eq!(err.to_string(), "book site-1: 11 of 100 chapters failed");
    }

    #[test]
    fn test_not_found_passthrough() {
        let err = ServiceError::from(RepoError::not_found("site", 1));
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "book not found: site-1");
        assert!(!ServiceError::SemaphoreClosed.is_not_found());
    }

    #[test]
    fn test_not_downloadable_message() {
        let err = ServiceError::NotDownloadable {
            book: "site-1".to_string(),
            status: BookStatus::InProgress,
        };
        assert!(err.to_string().contains("INPROGRESS"));
    }
}
