//! Error types for book persistence.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by a [`BookRepository`](super::BookRepository).
#[derive(Debug, Error)]
pub enum RepoError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// No record for the requested key.
    #[error("book not found: {site}-{id}{}", version.map(|v| format!(" (version {v})")).unwrap_or_default())]
    NotFound {
        site: String,
        id: i64,
        version: Option<i64>,
    },

    /// A stored row could not be turned into a record.
    #[error("invalid record: {0}")]
    InvalidRecord(String),

    /// Backup target could not be prepared.
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RepoError {
    /// Creates a not-found error for the current record of an id.
    #[must_use]
    pub fn not_found(site: &str, id: i64) -> Self {
        Self::NotFound {
            site: site.to_string(),
            id,
            version: None,
        }
    }

    /// Creates a not-found error for an exact version.
    #[must_use]
    pub fn version_not_found(site: &str, id: i64, version: i64) -> Self {
        Self::NotFound {
            site: site.to_string(),
            id,
            version: Some(version),
        }
    }

    /// Returns true for [`RepoError::NotFound`].
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlx_error_converts_to_database_error() {
        let err = RepoError::from(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, RepoError::Database(sqlx::Error::PoolTimedOut)));
        assert!(err.to_string().starts_with("database error: "));
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_not_found_message() {
        assert_eq!(RepoError::not_found("site", 42).to_string(), "book not found: site-42");
        assert_eq!(
            RepoError::version_not_found("site", 42, 7).to_string(),
            "book not found: site-42 (version 7)"
        );
        assert!(RepoError::not_found("site", 42).is_not_found());
    }
}
