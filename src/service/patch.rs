//! Repairs of drift between the database and the storage directory.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use tokio::sync::Semaphore;
use tracing::{debug, info, instrument};

use super::{BatchReport, BatchStats, ServiceError, SiteService, join_tasks};
use crate::model::{Book, BookStatus};

impl SiteService {
    /// Aligns `is_downloaded` with the presence of each book's text file.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] only when listing books fails.
    #[instrument(skip(self), fields(site = %self.name))]
    pub async fn patch_download_status(&self) -> Result<BatchReport, ServiceError> {
        self.run_batch(
            "patch-status",
            self.repo.find_all_books(),
            self.config.max_workers,
            |service, mut book| async move { service.check_storage(&mut book).await },
        )
        .await
    }

    /// Corrects the download flag of one book. A book counts as downloaded
    /// when it is `End` and its file exists.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Storage`] when the file cannot be inspected,
    /// or the repository error when persisting fails.
    pub async fn check_storage(&self, book: &mut Book) -> Result<bool, ServiceError> {
        let path = book.storage_path(&self.config.storage_dir);
        let exists = tokio::fs::try_exists(&path)
            .await
            .map_err(|source| ServiceError::storage(&path, source))?;
        let downloaded = exists && book.status == BookStatus::End;

        if book.is_downloaded == downloaded {
            return Ok(false);
        }

        debug!(book = %book, downloaded, path = %path.display(), "download flag corrected");
        book.is_downloaded = downloaded;
        self.repo.update_book(book).await?;
        Ok(true)
    }

    /// Explores every id up to the largest known one that has no record.
    ///
    /// # Errors
    ///
    /// Returns the repository error if the site summary cannot be read.
    #[instrument(skip(self), fields(site = %self.name))]
    pub async fn patch_missing_records(&self) -> Result<BatchReport, ServiceError> {
        let summary = self.repo.stats().await?;
        let semaphore = Arc::new(Semaphore::new(self.config.max_workers.max(1)));
        let stats = Arc::new(BatchStats::default());
        let mut handles = Vec::new();

        for id in 1..=summary.max_id {
            match self.repo.find_book_by_id(id).await {
                Ok(_) => continue,
                Err(err) if err.is_not_found() => {}
                Err(err) => return Err(err.into()),
            }

            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| ServiceError::SemaphoreClosed)?;
            if self.is_interrupted() {
                stats.interrupted.store(true, Ordering::SeqCst);
                break;
            }

            let service = self.clone();
            let stats = Arc::clone(&stats);
            handles.push(tokio::spawn(async move {
                let _permit = permit;
                let mut book = Book::new(service.name.as_ref(), id);
                let outcome = service.explore_book(&mut book, true).await.map(|()| true);
                if let Err(err) = &outcome {
                    debug!(id, error = %err, "missing record still unavailable");
                }
                stats.record(&outcome);
            }));
        }

        join_tasks("patch-missing", handles).await;

        let report = stats.report();
        info!(
            found = report.changed,
            failed = report.failed,
            "missing records patched"
        );
        Ok(report)
    }
}
