//! Metadata refresh.

use tracing::{debug, info, instrument, warn};

use super::{BatchReport, ServiceError, SiteService};
use crate::model::{Book, BookStatus, mint_version};

impl SiteService {
    /// Refreshes the current record of every book, then validates the
    /// books that changed.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] only when listing books fails.
    #[instrument(skip(self), fields(site = %self.name))]
    pub async fn update(&self) -> Result<BatchReport, ServiceError> {
        self.run_batch(
            "update",
            self.repo.find_books_for_update(),
            self.config.max_workers,
            |service, mut book| async move {
                let changed = service.update_book(&mut book).await?;
                if changed {
                    service.validate_book(&mut book).await?;
                }
                Ok(changed)
            },
        )
        .await
    }

    /// Fetches the info page of `book` and applies what changed. Returns
    /// whether anything was written.
    ///
    /// - Title, writer or type changed on a known book: the site reused the
    ///   id, so a new version is created and `book` becomes that record.
    /// - Any other tracked field changed, or the book was in error: updated
    ///   in place as in progress.
    ///
    /// A failure is recorded on the book before being returned.
    ///
    /// # Errors
    ///
    /// Returns the fetch, parse or repository error.
    #[instrument(skip(self, book), fields(site = %self.name, book = %book))]
    pub async fn update_book(&self, book: &mut Book) -> Result<bool, ServiceError> {
        match self.try_update(book).await {
            Ok(changed) => Ok(changed),
            Err(err) => {
                self.record_failure(book, &err).await;
                Err(err)
            }
        }
    }

    /// [`SiteService::update_book`] without recording failures.
    pub(crate) async fn try_update(&self, book: &mut Book) -> Result<bool, ServiceError> {
        let url = self.config.urls.book_url(book.id);
        let html = self.client.get_html(&url).await?;
        let info = self.parser.parse_book_info(&html)?;

        if book.status != BookStatus::Error && info.is_new_book(book) {
            let mut republished = Book {
                site: book.site.clone(),
                id: book.id,
                version: mint_version(),
                status: BookStatus::InProgress,
                ..Book::default()
            };
            info.apply_to(&mut republished);
            self.repo.save_writer(&mut republished.writer).await?;
            self.repo.create_book(&mut republished).await?;
            self.repo.save_error(&republished, None).await?;

            info!(
                old_version = book.version,
                new_version = republished.version,
                title = %republished.title,
                "id reused for a new title"
            );
            *book = republished;
            return Ok(true);
        }

        if book.status == BookStatus::Error || info.is_updated_book(book) {
            info.apply_to(book);
            book.status = BookStatus::InProgress;
            book.is_downloaded = false;
            book.error = None;
            if book.writer.id.is_none() {
                self.repo.save_writer(&mut book.writer).await?;
            }
            self.repo.update_book(book).await?;
            self.repo.save_error(book, None).await?;
            debug!(update_date = %book.update_date, "book updated");
            return Ok(true);
        }

        Ok(false)
    }

    /// Marks `book` as failed. Downloaded books keep their status so the
    /// stored file stays consistent with it.
    pub(crate) async fn record_failure(&self, book: &mut Book, err: &ServiceError) {
        let message = err.to_string();
        if !book.is_downloaded {
            book.status = BookStatus::Error;
        }
        book.error = Some(message.clone());

        if let Err(e) = self.repo.update_book(book).await {
            warn!(book = %book, error = %e, "failed to persist book status");
        }
        if let Err(e) = self.repo.save_error(book, Some(&message)).await {
            warn!(book = %book, error = %e, "failed to persist book error");
        }
    }
}
