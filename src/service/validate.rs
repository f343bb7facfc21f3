//! End-of-story detection.

use chrono::{Days, Local};
use tracing::{debug, info, instrument};

use super::{BatchReport, ServiceError, SiteService};
use crate::model::{Book, BookStatus};
use crate::repo::has_end_keyword;

/// Formats the staleness cutoff: books last updated before this date are
/// considered finished.
#[must_use]
pub(crate) fn staleness_cutoff(staleness_days: u32) -> String {
    let today = Local::now().date_naive();
    today
        .checked_sub_days(Days::new(u64::from(staleness_days)))
        .unwrap_or(today)
        .format("%Y-%m-%d")
        .to_string()
}

/// True when the update chapter names an ending or the update date sorts
/// before `cutoff`.
fn is_finished(book: &Book, cutoff: &str) -> bool {
    has_end_keyword(&book.update_chapter)
        || (!book.update_date.is_empty() && book.update_date.as_str() < cutoff)
}

impl SiteService {
    /// Moves every stale or explicitly ended in-progress book to `End` in
    /// one repository sweep. Returns the number of books moved.
    ///
    /// # Errors
    ///
    /// Returns the repository error.
    #[instrument(skip(self), fields(site = %self.name))]
    pub async fn validate_end(&self) -> Result<u64, ServiceError> {
        let cutoff = staleness_cutoff(self.config.end_staleness_days);
        let moved = self.repo.update_books_status(&cutoff).await?;
        info!(moved, cutoff = %cutoff, "end sweep complete");
        Ok(moved)
    }

    /// Re-evaluates the status of every current record, in both directions.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] only when listing books fails.
    #[instrument(skip(self), fields(site = %self.name))]
    pub async fn validate(&self) -> Result<BatchReport, ServiceError> {
        self.run_batch(
            "validate",
            self.repo.find_books_for_update(),
            self.config.max_workers,
            |service, mut book| async move { service.validate_book(&mut book).await },
        )
        .await
    }

    /// Applies the end rule to one book and persists a status change.
    /// Books in error carry no trustworthy metadata and are left alone.
    ///
    /// # Errors
    ///
    /// Returns the repository error when persisting fails.
    pub async fn validate_book(&self, book: &mut Book) -> Result<bool, ServiceError> {
        let cutoff = staleness_cutoff(self.config.end_staleness_days);
        let finished = is_finished(book, &cutoff);

        let changed = match (book.status, finished) {
            (BookStatus::InProgress, true) => {
                book.status = BookStatus::End;
                book.is_downloaded = false;
                true
            }
            (BookStatus::End, false) => {
                book.status = BookStatus::InProgress;
                book.is_downloaded = false;
                true
            }
            _ => false,
        };

        if changed {
            self.repo.update_book(book).await?;
            debug!(book = %book, status = %book.status, "status changed");
        }
        Ok(changed)
    }
}
