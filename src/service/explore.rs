//! Discovery of new ids.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Semaphore;
use tracing::{debug, info, instrument};

use super::{BatchReport, BatchStats, ServiceError, SiteService, join_tasks};
use crate::model::{Book, BookStatus};

/// Where an explored id comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Candidate {
    /// At or below the largest known id; only error records are retried.
    Known,
    /// Above the largest known id.
    Fresh,
}

impl SiteService {
    /// Retries failed ids after the last successful one, then probes new
    /// ids upward until `max_explore_error` consecutive ids fail.
    ///
    /// The failure counter is shared by all workers and checked after each
    /// worker permit is acquired, so with one worker exploring stops right
    /// after the last allowed failure.
    ///
    /// # Errors
    ///
    /// Returns the repository error if the site summary cannot be read.
    #[instrument(skip(self), fields(site = %self.name))]
    pub async fn explore(&self) -> Result<BatchReport, ServiceError> {
        let summary = self.repo.stats().await?;
        let max_errors = self.config.max_explore_error;
        let known = (summary.latest_success_id + 1..=summary.max_id).map(|id| (id, Candidate::Known));
        let fresh = (summary.max_id + 1..).map(|id| (id, Candidate::Fresh));

        info!(
            latest_success_id = summary.latest_success_id,
            max_id = summary.max_id,
            max_errors,
            "explore started"
        );

        let semaphore = Arc::new(Semaphore::new(self.config.max_workers.max(1)));
        let failures = Arc::new(AtomicUsize::new(0));
        let stats = Arc::new(BatchStats::default());
        let mut handles = Vec::new();

        for (id, candidate) in known.chain(fresh) {
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| ServiceError::SemaphoreClosed)?;

            if failures.load(Ordering::SeqCst) >= max_errors {
                debug!(id, "failure limit reached");
                break;
            }
            if self.is_interrupted() {
                stats.interrupted.store(true, Ordering::SeqCst);
                break;
            }

            let service = self.clone();
            let failures = Arc::clone(&failures);
            let stats = Arc::clone(&stats);
            handles.push(tokio::spawn(async move {
                let _permit = permit;
                let outcome = service.explore_id(id, candidate).await;
                match &outcome {
                    Ok(_) => failures.store(0, Ordering::SeqCst),
                    Err(err) => {
                        debug!(id, error = %err, "explore failed");
                        failures.fetch_add(1, Ordering::SeqCst);
                    }
                }
                stats.record(&outcome);
            }));
        }

        join_tasks("explore", handles).await;

        let report = stats.report();
        info!(
            found = report.changed,
            failed = report.failed,
            interrupted = report.interrupted,
            "explore complete"
        );
        Ok(report)
    }

    async fn explore_id(&self, id: i64, candidate: Candidate) -> Result<bool, ServiceError> {
        match candidate {
            Candidate::Fresh => {
                let mut book = Book::new(self.name.as_ref(), id);
                self.explore_book(&mut book, true).await?;
                Ok(true)
            }
            Candidate::Known => {
                let mut book = self.repo.find_book_by_id(id).await?;
                if book.status != BookStatus::Error {
                    return Ok(false);
                }
                self.explore_book(&mut book, false).await?;
                Ok(true)
            }
        }
    }

    /// Fetches an id known only as an error record, creating the record
    /// first when `fresh`. A failure is stored against the id; a success
    /// clears it.
    ///
    /// # Errors
    ///
    /// Returns the fetch, parse or repository error.
    pub(crate) async fn explore_book(&self, book: &mut Book, fresh: bool) -> Result<(), ServiceError> {
        if book.status != BookStatus::Error {
            return Ok(());
        }
        if fresh {
            self.repo.create_book(book).await?;
        }

        match self.try_update(book).await {
            Ok(_) => {
                self.repo.save_error(book, None).await?;
                info!(book = %book, title = %book.title, "book found");
                Ok(())
            }
            Err(err) => {
                let message = err.to_string();
                book.error = Some(message.clone());
                self.repo.save_error(book, Some(&message)).await?;
                Err(err)
            }
        }
    }
}
