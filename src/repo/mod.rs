//! Book persistence.
//!
//! [`BookRepository`] is the data-access seam used by the lifecycle engine.
//! [`SqliteBookRepository`] is the shipped implementation over the shared
//! [`Database`](crate::Database) pool; tests substitute their own.

mod error;
mod sqlite;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use serde::Serialize;

use crate::model::{Book, BookStatus, Writer};

pub use error::RepoError;
pub use sqlite::SqliteBookRepository;

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, RepoError>;

/// Lazily paged sequence of books.
pub type BookStream = BoxStream<'static, Result<Book>>;

/// Update-chapter keywords that mark a story as finished.
pub const END_KEYWORDS: [&str; 24] = [
    "后记", "後記", "新书", "新書", "结局", "結局", "感言", "尾声", "尾聲", "终章", "終章", "外传",
    "外傳", "完本", "完結", "完结", "终结", "終結", "番外", "结尾", "結尾", "全书完", "全書完",
    "全本完",
];

/// Returns true when `update_chapter`, with spaces removed, names an ending.
#[must_use]
pub fn has_end_keyword(update_chapter: &str) -> bool {
    let compact: String = update_chapter.chars().filter(|c| *c != ' ').collect();
    END_KEYWORDS.iter().any(|keyword| compact.contains(keyword))
}

/// Aggregate counters for one site.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub book_count: i64,
    pub unique_book_count: i64,
    pub writer_count: i64,
    pub error_count: i64,
    pub downloaded_count: i64,
    pub max_id: i64,
    pub latest_success_id: i64,
    pub status_count: BTreeMap<BookStatus, i64>,
}

/// Data-access contract for books, writers and stored fetch errors.
///
/// Every operation is scoped to the site the repository was opened for.
#[async_trait]
pub trait BookRepository: Send + Sync {
    /// Site this repository is scoped to.
    fn site(&self) -> &str;

    /// Inserts a new record. The first record of an id is stored as version
    /// 0; later records get a version above every existing one. The stored
    /// version is written back into `book`.
    async fn create_book(&self, book: &mut Book) -> Result<()>;

    /// Persists metadata, status and download flag of an existing record.
    async fn update_book(&self, book: &Book) -> Result<()>;

    /// Returns the current (highest version) record of an id.
    async fn find_book_by_id(&self, id: i64) -> Result<Book>;

    /// Returns one exact record.
    async fn find_book_by_id_version(&self, id: i64, version: i64) -> Result<Book>;

    /// Streams every record with the given status.
    fn find_books_by_status(&self, status: BookStatus) -> BookStream;

    /// Streams every record.
    fn find_all_books(&self) -> BookStream;

    /// Streams the current record of every id, whatever its status.
    fn find_books_for_update(&self) -> BookStream;

    /// Streams finished records that are not downloaded yet.
    fn find_books_for_download(&self) -> BookStream;

    /// Searches non-error records by title or writer substring.
    async fn find_books_by_title_writer(
        &self,
        title: &str,
        writer: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Book>>;

    /// Returns up to `limit` random downloaded records.
    async fn find_books_by_random(&self, limit: i64) -> Result<Vec<Book>>;

    /// Upserts a writer by name and sets its id.
    async fn save_writer(&self, writer: &mut Writer) -> Result<()>;

    /// Stores `error` for the book's id, or clears it when `None`.
    async fn save_error(&self, book: &Book, error: Option<&str>) -> Result<()>;

    /// Moves in-progress records to `End` when their update date sorts before
    /// `stale_before` or their update chapter names an ending. Returns the
    /// number of records moved.
    async fn update_books_status(&self, stale_before: &str) -> Result<u64>;

    /// Computes the site summary.
    async fn stats(&self) -> Result<Summary>;

    /// Writes a consistent snapshot of the database into `dir` and returns
    /// the snapshot path.
    async fn backup(&self, dir: &Path) -> Result<PathBuf>;
}
