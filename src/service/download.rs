//! Chapter download and text storage.

use std::path::{Path, PathBuf};

use futures_util::future::join_all;
use tracing::{debug, info, instrument};
use url::Url;

use super::{BatchReport, ServiceError, SiteService};
use crate::model::{Book, BookStatus, Chapter, render_book};
use crate::parser::chapters_from_list;

/// Resolves a chapter link found on the index page at `list_url`.
///
/// Absolute links are kept. Root-relative links get `chapter_prefix`, or
/// the origin of `list_url` when no prefix is configured. Other links are
/// appended to `list_url` as a directory.
#[must_use]
pub fn resolve_chapter_url(href: &str, chapter_prefix: &str, list_url: &str) -> String {
    if href.starts_with("http") {
        return href.to_string();
    }

    if href.starts_with('/') {
        if !chapter_prefix.is_empty() {
            return format!("{}{href}", chapter_prefix.trim_end_matches('/'));
        }
        return Url::parse(list_url)
            .and_then(|base| base.join(href))
            .map_or_else(|_| href.to_string(), String::from);
    }

    if list_url.ends_with('/') {
        format!("{list_url}{href}")
    } else {
        format!("{list_url}/{href}")
    }
}

impl SiteService {
    /// Downloads every finished book that is not stored yet.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] only when listing books fails.
    #[instrument(skip(self), fields(site = %self.name))]
    pub async fn download(&self) -> Result<BatchReport, ServiceError> {
        self.run_batch(
            "download",
            self.repo.find_books_for_download(),
            self.config.max_download_concurrency,
            |service, mut book| async move { service.download_book(&mut book).await },
        )
        .await
    }

    /// Fetches all chapters of `book` and writes the text file.
    ///
    /// Chapters are fetched concurrently; the client gate bounds how many
    /// requests are in flight. Failed chapters are kept with empty content
    /// unless too many failed, in which case nothing is written.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::NotDownloadable`] unless the book is `End`
    /// - [`ServiceError::AlreadyDownloaded`] if it is stored already
    /// - [`ServiceError::TooManyFailedChapters`] past the failure limits
    /// - fetch, parse, storage or repository errors
    #[instrument(skip(self, book), fields(site = %self.name, book = %book))]
    pub async fn download_book(&self, book: &mut Book) -> Result<bool, ServiceError> {
        if book.status != BookStatus::End {
            return Err(ServiceError::NotDownloadable {
                book: book.to_string(),
                status: book.status,
            });
        }
        if book.is_downloaded {
            return Err(ServiceError::AlreadyDownloaded {
                book: book.to_string(),
            });
        }

        let list_url = self.config.urls.chapter_list_url(book.id);
        let html = self.client.get_html(&list_url).await?;
        let mut chapters = chapters_from_list(self.parser.parse_chapter_list(&html)?)?;
        for chapter in &mut chapters {
            chapter.url =
                resolve_chapter_url(&chapter.url, &self.config.urls.chapter_prefix, &list_url);
        }

        let chapters = join_all(chapters.into_iter().map(|chapter| self.fetch_chapter(chapter))).await;

        let total = chapters.len();
        let failed = chapters.iter().filter(|c| c.error.is_some()).count();
        if failed > self.config.max_failed_chapters || failed * 10 > total {
            return Err(ServiceError::TooManyFailedChapters {
                book: book.to_string(),
                failed,
                total,
            });
        }

        let path = book.storage_path(&self.config.storage_dir);
        write_atomically(&path, &render_book(book, &chapters)).await?;

        book.is_downloaded = true;
        self.repo.update_book(book).await?;
        info!(chapters = total, failed, path = %path.display(), "book downloaded");
        Ok(true)
    }

    async fn fetch_chapter(&self, mut chapter: Chapter) -> Chapter {
        let fetched = match self.client.get_html(&chapter.url).await {
            Ok(html) => self
                .parser
                .parse_chapter_content(&html)
                .map_err(ServiceError::from),
            Err(err) => Err(ServiceError::from(err)),
        };

        match fetched {
            Ok(content) => {
                content.apply_to(&mut chapter);
                chapter.optimize_content();
            }
            Err(err) => {
                debug!(index = chapter.index, url = %chapter.url, error = %err, "chapter failed");
                chapter.error = Some(err.to_string());
            }
        }
        chapter
    }
}

/// Writes `text` next to `path` and renames it into place, so a reader
/// never sees a partial file.
async fn write_atomically(path: &Path, text: &str) -> Result<(), ServiceError> {
    if let Some(dir) = path.parent() {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| ServiceError::storage(dir, e))?;
    }

    let mut partial = PathBuf::from(path);
    partial.set_extension("txt.part");
    tokio::fs::write(&partial, text)
        .await
        .map_err(|e| ServiceError::storage(&partial, e))?;
    tokio::fs::rename(&partial, path)
        .await
        .map_err(|e| ServiceError::storage(path, e))?;
    Ok(())
}
