//! Full site pipeline and the single-book pipeline.

use serde::Serialize;
use tracing::{info, instrument, warn};

use super::{BatchReport, ServiceError, SiteService};
use crate::model::{Book, BookStatus};

/// Results of one [`SiteService::process`] run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProcessReport {
    pub explore: BatchReport,
    /// Books moved to `End` by the end sweep.
    pub ended: u64,
    pub update: BatchReport,
    pub download: BatchReport,
    pub patch_status: BatchReport,
    pub patch_missing: BatchReport,
    /// An interrupt stopped the pipeline before its last stage.
    pub interrupted: bool,
}

impl SiteService {
    /// Runs every stage for the site: availability check, explore, end
    /// sweep, update, download, download-status patch and gap fill.
    /// Stops between stages once interrupted.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Unavailable`] when the site is down, or the
    /// error of a stage that could not list its books.
    #[instrument(skip(self), fields(site = %self.name))]
    pub async fn process(&self) -> Result<ProcessReport, ServiceError> {
        let mut report = ProcessReport::default();
        self.check_availability().await?;

        report.explore = self.explore().await?;
        if self.stop_requested(&mut report) {
            return Ok(report);
        }
        report.ended = self.validate_end().await?;
        if self.stop_requested(&mut report) {
            return Ok(report);
        }
        report.update = self.update().await?;
        if self.stop_requested(&mut report) {
            return Ok(report);
        }
        report.download = self.download().await?;
        if self.stop_requested(&mut report) {
            return Ok(report);
        }
        report.patch_status = self.patch_download_status().await?;
        if self.stop_requested(&mut report) {
            return Ok(report);
        }
        report.patch_missing = self.patch_missing_records().await?;

        info!(
            explored = report.explore.changed,
            ended = report.ended,
            updated = report.update.changed,
            downloaded = report.download.changed,
            "site processed"
        );
        Ok(report)
    }

    fn stop_requested(&self, report: &mut ProcessReport) -> bool {
        if self.is_interrupted() {
            warn!(site = %self.name, "interrupted, run again to resume");
            report.interrupted = true;
        }
        report.interrupted
    }

    /// Brings one book fully up to date: update, validate, reconcile the
    /// stored file, download if finished, reconcile again.
    ///
    /// # Errors
    ///
    /// Returns the first failing step's error.
    #[instrument(skip(self, book), fields(site = %self.name, book = %book))]
    pub async fn process_book(&self, book: &mut Book) -> Result<(), ServiceError> {
        self.update_book(book).await?;
        self.validate_book(book).await?;
        self.check_storage(book).await?;

        if book.status == BookStatus::End && !book.is_downloaded {
            self.download_book(book).await?;
            self.check_storage(book).await?;
        }
        Ok(())
    }
}
