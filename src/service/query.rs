//! Read-side operations used by the CLI.

use std::path::{Path, PathBuf};

use tracing::{debug, instrument};

use super::{ServiceError, SiteService};
use crate::model::{Book, Chapter, parse_chapters, parse_version};
use crate::repo::Summary;

impl SiteService {
    /// Looks up a book. An empty `version` selects the current record;
    /// otherwise it is parsed as base 36.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::InvalidVersion`] for a malformed version, or
    /// the repository's not-found error.
    pub async fn book(&self, id: i64, version: &str) -> Result<Book, ServiceError> {
        if version.is_empty() {
            return Ok(self.repo.find_book_by_id(id).await?);
        }
        let version =
            parse_version(version).ok_or_else(|| ServiceError::InvalidVersion(version.to_string()))?;
        Ok(self.repo.find_book_by_id_version(id, version).await?)
    }

    /// JSON rendering of a book.
    #[must_use]
    pub fn info(&self, book: &Book) -> String {
        book.to_json()
    }

    /// Reads the stored text of a downloaded book.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotDownloaded`] when the book is not marked
    /// downloaded or its file is missing, and [`ServiceError::Storage`] when
    /// the file cannot be inspected or read.
    pub async fn book_content(&self, book: &Book) -> Result<String, ServiceError> {
        let path = self.stored_file(book).await?;
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| ServiceError::storage(path, e))
    }

    /// Parses the stored text of a downloaded book back into chapters.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`SiteService::book_content`], or
    /// [`ServiceError::ContentFormat`] for a malformed file.
    pub async fn chapters(&self, book: &Book) -> Result<Vec<Chapter>, ServiceError> {
        let text = self.book_content(book).await?;
        parse_chapters(&text).map_err(|source| ServiceError::ContentFormat {
            path: book.storage_path(&self.config.storage_dir),
            source,
        })
    }

    async fn stored_file(&self, book: &Book) -> Result<PathBuf, ServiceError> {
        let path = book.storage_path(&self.config.storage_dir);
        let exists = book.is_downloaded
            && tokio::fs::try_exists(&path)
                .await
                .map_err(|source| ServiceError::storage(&path, source))?;
        if !exists {
            return Err(ServiceError::NotDownloaded {
                book: book.to_string(),
            });
        }
        Ok(path)
    }

    /// Searches non-error books by title or writer substring.
    ///
    /// # Errors
    ///
    /// Returns the repository error.
    pub async fn query_books(
        &self,
        title: &str,
        writer: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Book>, ServiceError> {
        Ok(self
            .repo
            .find_books_by_title_writer(title, writer, limit, offset)
            .await?)
    }

    /// Picks up to `limit` random downloaded books.
    ///
    /// # Errors
    ///
    /// Returns the repository error.
    pub async fn random_books(&self, limit: i64) -> Result<Vec<Book>, ServiceError> {
        Ok(self.repo.find_books_by_random(limit).await?)
    }

    /// Computes the site summary.
    ///
    /// # Errors
    ///
    /// Returns the repository error.
    pub async fn stats(&self) -> Result<Summary, ServiceError> {
        Ok(self.repo.stats().await?)
    }

    /// Snapshots the database into `dir`, or the configured backup
    /// directory when `dir` is `None`.
    ///
    /// # Errors
    ///
    /// Returns the repository error.
    pub async fn backup(&self, dir: Option<&Path>) -> Result<PathBuf, ServiceError> {
        let dir = dir.unwrap_or(self.config.backup_dir.as_path());
        Ok(self.repo.backup(dir).await?)
    }

    /// Fetches the availability page and checks it for the configured
    /// marker. Sites without an availability url are always available.
    ///
    /// # Errors
    ///
    /// Returns the fetch error, or [`ServiceError::Unavailable`] when the
    /// marker is missing.
    #[instrument(skip(self), fields(site = %self.name))]
    pub async fn check_availability(&self) -> Result<(), ServiceError> {
        let url = &self.config.urls.availability;
        if url.is_empty() {
            return Ok(());
        }

        let body = self.client.get_html(url).await?;
        if !body.contains(&self.config.availability_marker) {
            return Err(ServiceError::Unavailable {
                url: url.clone(),
                marker: self.config.availability_marker.clone(),
            });
        }
        debug!(url = %url, "site available");
        Ok(())
    }
}
