//! Book lifecycle engine.
//!
//! A [`SiteService`] owns everything needed to crawl one site: the resilient
//! client, the parser, the repository and the site configuration. Each batch
//! operation (explore, update, validate, download, patch) pulls candidates
//! from the repository, fans out over a semaphore-bounded worker pool and
//! writes results back. Per-book failures are logged and counted; they
//! never abort the batch.
//!
//! # Concurrency Model
//!
//! - Each book runs in its own Tokio task
//! - A worker permit is acquired before spawning and released when the task ends
//! - HTTP fan-out is bounded separately by the client gate
//! - Once the interrupt flag is set no new task is spawned; running tasks finish

mod download;
mod error;
mod explore;
mod patch;
mod process;
mod query;
mod update;
mod validate;

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use futures_util::StreamExt;
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::client::ResilientClient;
use crate::config::SiteConfig;
use crate::model::Book;
use crate::parser::{Parser, SelectorParser};
use crate::repo::{BookRepository, BookStream};

pub use download::resolve_chapter_url;
pub use error::ServiceError;
pub use process::ProcessReport;

/// Counters for one batch run, updated from concurrent tasks.
#[derive(Debug, Default)]
struct BatchStats {
    changed: AtomicUsize,
    unchanged: AtomicUsize,
    failed: AtomicUsize,
    interrupted: AtomicBool,
}

impl BatchStats {
    fn record(&self, outcome: &Result<bool, ServiceError>) {
        let counter = match outcome {
            Ok(true) => &self.changed,
            Ok(false) => &self.unchanged,
            Err(_) => &self.failed,
        };
        counter.fetch_add(1, Ordering::SeqCst);
    }

    fn report(&self) -> BatchReport {
        BatchReport {
            changed: self.changed.load(Ordering::SeqCst),
            unchanged: self.unchanged.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
            interrupted: self.interrupted.load(Ordering::SeqCst),
        }
    }
}

/// Outcome counts of a batch operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    /// Books whose stored record changed.
    pub changed: usize,
    /// Books processed without any change.
    pub unchanged: usize,
    /// Books whose processing failed.
    pub failed: usize,
    /// The batch stopped early because of an interrupt.
    pub interrupted: bool,
}

impl BatchReport {
    #[must_use]
    pub fn total(&self) -> usize {
        self.changed + self.unchanged + self.failed
    }
}

/// Lifecycle engine for one site.
///
/// Cheap to clone; clones share the client, parser, repository and
/// interrupt flag.
#[derive(Clone)]
pub struct SiteService {
    name: Arc<str>,
    config: Arc<SiteConfig>,
    client: ResilientClient,
    parser: Arc<dyn Parser>,
    repo: Arc<dyn BookRepository>,
    interrupt: Arc<AtomicBool>,
}

impl std::fmt::Debug for SiteService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SiteService")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl SiteService {
    /// Builds a service with the real HTTP client and the selector parser
    /// described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Fetch`] if the HTTP client cannot be built and
    /// [`ServiceError::Parse`] if a selector does not compile.
    pub fn new(
        name: impl Into<String>,
        config: SiteConfig,
        repo: Arc<dyn BookRepository>,
    ) -> Result<Self, ServiceError> {
        let client = ResilientClient::new(&config.client)?;
        let parser = Arc::new(SelectorParser::new(&config.selectors)?);
        Ok(Self::with_parts(name, config, client, parser, repo))
    }

    /// Builds a service from already constructed collaborators.
    #[must_use]
    pub fn with_parts(
        name: impl Into<String>,
        config: SiteConfig,
        client: ResilientClient,
        parser: Arc<dyn Parser>,
        repo: Arc<dyn BookRepository>,
    ) -> Self {
        let name: String = name.into();
        debug!(
            site = %name,
            max_workers = config.max_workers,
            max_explore_error = config.max_explore_error,
            "creating site service"
        );
        Self {
            name: name.into(),
            config: Arc::new(config),
            client,
            parser,
            repo,
            interrupt: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Replaces the interrupt flag, so several services can share one.
    #[must_use]
    pub fn with_interrupt(mut self, interrupt: Arc<AtomicBool>) -> Self {
        self.interrupt = interrupt;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    /// Flag that stops batches from scheduling new work once set.
    #[must_use]
    pub fn interrupt_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.interrupt)
    }

    #[must_use]
    pub fn is_interrupted(&self) -> bool {
        self.interrupt.load(Ordering::SeqCst)
    }

    /// Runs `task` for every book of `books` on at most `workers` concurrent
    /// tasks. `task` returns whether the book changed.
    async fn run_batch<F, Fut>(
        &self,
        operation: &'static str,
        mut books: BookStream,
        workers: usize,
        task: F,
    ) -> Result<BatchReport, ServiceError>
    where
        F: Fn(Self, Book) -> Fut + Clone + Send + 'static,
        Fut: Future<Output = Result<bool, ServiceError>> + Send + 'static,
    {
        let semaphore = Arc::new(Semaphore::new(workers.max(1)));
        let stats = Arc::new(BatchStats::default());
        let mut handles = Vec::new();
        let mut listing_error = None;

        info!(site = %self.name, operation, workers, "batch started");

        while let Some(next) = books.next().await {
            let book = match next {
                Ok(book) => book,
                Err(err) => {
                    listing_error = Some(err);
                    break;
                }
            };

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
            let task = task.clone();
            handles.push(tokio::spawn(async move {
                let _permit = permit;
                let label = book.to_string();
                let outcome = task(service, book).await;
                if let Err(err) = &outcome {
                    warn!(operation, book = %label, error = %err, "book failed");
                }
                stats.record(&outcome);
            }));
        }

        join_tasks(operation, handles).await;

        if let Some(err) = listing_error {
            warn!(site = %self.name, operation, error = %err, "listing books failed");
            return Err(err.into());
        }

        let report = stats.report();
        info!(
            site = %self.name,
            operation,
            changed = report.changed,
            unchanged = report.unchanged,
            failed = report.failed,
            interrupted = report.interrupted,
            "batch complete"
        );
        Ok(report)
    }
}

/// Awaits every task. A panicked task is logged and does not fail the batch.
async fn join_tasks(operation: &'static str, handles: Vec<JoinHandle<()>>) {
    debug!(operation, task_count = handles.len(), "waiting for tasks");
    for handle in handles {
        if let Err(e) = handle.await {
            warn!(operation, error = %e, "task panicked");
        }
    }
}
