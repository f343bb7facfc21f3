//! `SQLite` implementation of [`BookRepository`].

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures_util::StreamExt;
use futures_util::stream;
use sqlx::FromRow;
use sqlx::sqlite::SqlitePool;
use tracing::{debug, info, instrument};

use super::{BookRepository, BookStream, END_KEYWORDS, RepoError, Result, Summary};
use crate::db::Database;
use crate::model::{Book, BookStatus, Writer};

/// Rows fetched per page by the book streams.
const PAGE_SIZE: i64 = 500;

const BOOK_SELECT: &str = r"SELECT
    books.site AS site,
    books.id AS id,
    books.version AS version,
    books.title AS title,
    books.writer_id AS writer_id,
    COALESCE(writers.name, '') AS writer_name,
    books.type AS book_type,
    books.update_date AS update_date,
    books.update_chapter AS update_chapter,
    books.status AS status,
    books.is_downloaded AS is_downloaded,
    errors.data AS error
  FROM books
  LEFT JOIN writers ON books.writer_id = writers.id
  LEFT JOIN errors ON books.site = errors.site AND books.id = errors.id";

/// Restricts a query to the highest version of each id.
const CURRENT_VERSION: &str = "books.version = (SELECT MAX(b2.version) FROM books b2 \
     WHERE b2.site = books.site AND b2.id = books.id)";

#[derive(Debug, FromRow)]
struct BookRow {
    site: String,
    id: i64,
    version: i64,
    title: String,
    writer_id: Option<i64>,
    writer_name: String,
    book_type: String,
    update_date: String,
    update_chapter: String,
    status: String,
    is_downloaded: bool,
    error: Option<String>,
}

impl TryFrom<BookRow> for Book {
    type Error = RepoError;

    fn try_from(row: BookRow) -> Result<Self> {
        let status = row.status.parse().map_err(RepoError::InvalidRecord)?;
        Ok(Self {
            site: row.site,
            id: row.id,
            version: row.version,
            title: row.title,
            writer: Writer {
                id: row.writer_id,
                name: row.writer_name,
            },
            book_type: row.book_type,
            update_date: row.update_date,
            update_chapter: row.update_chapter,
            status,
            is_downloaded: row.is_downloaded,
            error: row.error,
        })
    }
}

/// Which records a paged stream walks over.
#[derive(Debug, Clone, Copy)]
enum Listing {
    All,
    Status(BookStatus),
    Current,
    Downloadable,
}

impl Listing {
    fn filter(self) -> String {
        match self {
            Self::All => String::new(),
            Self::Status(_) => " AND books.status = ?".to_string(),
            Self::Current => format!(" AND {CURRENT_VERSION}"),
            Self::Downloadable => format!(
                " AND books.status = '{}' AND books.is_downloaded = 0",
                BookStatus::End.as_str()
            ),
        }
    }
}

/// Keyset cursor state for one stream.
struct Pager {
    pool: SqlitePool,
    site: String,
    listing: Listing,
    after: (i64, i64),
    buffer: VecDeque<Book>,
    exhausted: bool,
}

impl Pager {
    async fn next_page(&mut self) -> Result<()> {
        let sql = format!(
            "{BOOK_SELECT} WHERE books.site = ? AND (books.id, books.version) > (?, ?){} \
             ORDER BY books.id, books.version LIMIT ?",
            self.listing.filter()
        );

        let mut query = sqlx::query_as::<_, BookRow>(&sql)
            .bind(&self.site)
            .bind(self.after.0)
            .bind(self.after.1);
        if let Listing::Status(status) = self.listing {
            query = query.bind(status.as_str());
        }
        let rows = query.bind(PAGE_SIZE).fetch_all(&self.pool).await?;

        self.exhausted = i64::try_from(rows.len()).unwrap_or(i64::MAX) < PAGE_SIZE;
        for row in rows {
            let book = Book::try_from(row)?;
            self.after = (book.id, book.version);
            self.buffer.push_back(book);
        }
        Ok(())
    }
}

/// Book repository backed by the shared `SQLite` pool, scoped to one site.
#[derive(Debug, Clone)]
pub struct SqliteBookRepository {
    db: Database,
    site: String,
}

impl SqliteBookRepository {
    /// Creates a repository for `site` over an opened database.
    #[must_use]
    pub fn new(db: Database, site: impl Into<String>) -> Self {
        Self {
            db,
            site: site.into(),
        }
    }

    fn stream(&self, listing: Listing) -> BookStream {
        let pager = Pager {
            pool: self.db.pool().clone(),
            site: self.site.clone(),
            listing,
            after: (i64::MIN, i64::MIN),
            buffer: VecDeque::new(),
            exhausted: false,
        };

        stream::try_unfold(pager, |mut pager| async move {
            if pager.buffer.is_empty() && !pager.exhausted {
                pager.next_page().await?;
            }
            Ok(pager.buffer.pop_front().map(|book| (book, pager)))
        })
        .boxed()
    }

    async fn fetch_books(&self, sql: &str, binds: &[SqlValue<'_>]) -> Result<Vec<Book>> {
        let mut query = sqlx::query_as::<_, BookRow>(sql);
        for value in binds {
            query = match value {
                SqlValue::Text(text) => query.bind(*text),
                SqlValue::Int(int) => query.bind(*int),
            };
        }
        let rows = query.fetch_all(self.db.pool()).await?;
        rows.into_iter().map(Book::try_from).collect()
    }
}

#[derive(Debug, Clone, Copy)]
enum SqlValue<'a> {
    Text(&'a str),
    Int(i64),
}

fn end_condition() -> String {
    let keyword_terms = END_KEYWORDS
        .iter()
        .map(|_| "REPLACE(books.update_chapter, ' ', '') LIKE ?")
        .collect::<Vec<_>>()
        .join(" OR ");
    format!("((books.update_date <> '' AND books.update_date < ?) OR {keyword_terms})")
}

#[async_trait]
impl BookRepository for SqliteBookRepository {
    fn site(&self) -> &str {
        &self.site
    }

    #[instrument(skip(self, book), fields(site = %self.site, id = book.id))]
    async fn create_book(&self, book: &mut Book) -> Result<()> {
        let version: i64 = sqlx::query_scalar(
            r"INSERT INTO books (
                site, id, version, title, writer_id, type,
                update_date, update_chapter, status, is_downloaded
              )
              SELECT ?, ?,
                CASE WHEN MAX(version) IS NULL THEN 0 ELSE MAX(MAX(version) + 1, ?) END,
                ?, ?, ?, ?, ?, ?, ?
              FROM books WHERE site = ? AND id = ?
              RETURNING version",
        )
        .bind(&self.site)
        .bind(book.id)
        .bind(book.version)
        .bind(&book.title)
        .bind(book.writer.id)
        .bind(&book.book_type)
        .bind(&book.update_date)
        .bind(&book.update_chapter)
        .bind(book.status.as_str())
        .bind(book.is_downloaded)
        .bind(&self.site)
        .bind(book.id)
        .fetch_one(self.db.pool())
        .await?;

        book.site.clone_from(&self.site);
        book.version = version;
        debug!(version, "book created");
        Ok(())
    }

    #[instrument(skip(self, book), fields(site = %self.site, book = %book))]
    async fn update_book(&self, book: &Book) -> Result<()> {
        let result = sqlx::query(
            r"UPDATE books
              SET title = ?, writer_id = ?, type = ?, update_date = ?,
                  update_chapter = ?, status = ?, is_downloaded = ?
              WHERE site = ? AND id = ? AND version = ?",
        )
        .bind(&book.title)
        .bind(book.writer.id)
        .bind(&book.book_type)
        .bind(&book.update_date)
        .bind(&book.update_chapter)
        .bind(book.status.as_str())
        .bind(book.is_downloaded)
        .bind(&self.site)
        .bind(book.id)
        .bind(book.version)
        .execute(self.db.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepoError::version_not_found(&self.site, book.id, book.version));
        }
        Ok(())
    }

    async fn find_book_by_id(&self, id: i64) -> Result<Book> {
        let sql = format!(
            "{BOOK_SELECT} WHERE books.site = ? AND books.id = ? \
             ORDER BY books.version DESC LIMIT 1"
        );
        let row = sqlx::query_as::<_, BookRow>(&sql)
            .bind(&self.site)
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;

        row.ok_or_else(|| RepoError::not_found(&self.site, id))
            .and_then(Book::try_from)
    }

    async fn find_book_by_id_version(&self, id: i64, version: i64) -> Result<Book> {
        let sql =
            format!("{BOOK_SELECT} WHERE books.site = ? AND books.id = ? AND books.version = ?");
        let row = sqlx::query_as::<_, BookRow>(&sql)
            .bind(&self.site)
            .bind(id)
            .bind(version)
            .fetch_optional(self.db.pool())
            .await?;

        row.ok_or_else(|| RepoError::version_not_found(&self.site, id, version))
            .and_then(Book::try_from)
    }

    fn find_books_by_status(&self, status: BookStatus) -> BookStream {
        self.stream(Listing::Status(status))
    }

    fn find_all_books(&self) -> BookStream {
        self.stream(Listing::All)
    }

    fn find_books_for_update(&self) -> BookStream {
        self.stream(Listing::Current)
    }

    fn find_books_for_download(&self) -> BookStream {
        self.stream(Listing::Downloadable)
    }

    #[instrument(skip(self), fields(site = %self.site))]
    async fn find_books_by_title_writer(
        &self,
        title: &str,
        writer: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Book>> {
        let sql = format!(
            "{BOOK_SELECT} WHERE books.site = ? AND books.status <> ? \
             AND ((? <> '' AND books.title LIKE ?) OR (? <> '' AND writers.name LIKE ?)) \
             ORDER BY books.update_date DESC, books.id DESC LIMIT ? OFFSET ?"
        );
        let title_pattern = format!("%{title}%");
        let writer_pattern = format!("%{writer}%");

        self.fetch_books(
            &sql,
            &[
                SqlValue::Text(&self.site),
                SqlValue::Text(BookStatus::Error.as_str()),
                SqlValue::Text(title),
                SqlValue::Text(&title_pattern),
                SqlValue::Text(writer),
                SqlValue::Text(&writer_pattern),
                SqlValue::Int(limit),
                SqlValue::Int(offset),
            ],
        )
        .await
    }

    async fn find_books_by_random(&self, limit: i64) -> Result<Vec<Book>> {
        let sql = format!(
            "{BOOK_SELECT} WHERE books.site = ? AND books.is_downloaded = 1 \
             ORDER BY RANDOM() LIMIT ?"
        );
        self.fetch_books(&sql, &[SqlValue::Text(&self.site), SqlValue::Int(limit)])
            .await
    }

    async fn save_writer(&self, writer: &mut Writer) -> Result<()> {
        let id: i64 = sqlx::query_scalar(
            r"INSERT INTO writers (name) VALUES (?)
              ON CONFLICT(name) DO UPDATE SET name = excluded.name
              RETURNING id",
        )
        .bind(&writer.name)
        .fetch_one(self.db.pool())
        .await?;

        writer.id = Some(id);
        Ok(())
    }

    async fn save_error(&self, book: &Book, error: Option<&str>) -> Result<()> {
        match error {
            Some(data) => {
                sqlx::query(
                    r"INSERT INTO errors (site, id, data) VALUES (?, ?, ?)
                      ON CONFLICT(site, id) DO UPDATE SET data = excluded.data",
                )
                .bind(&self.site)
                .bind(book.id)
                .bind(data)
                .execute(self.db.pool())
                .await?;
            }
            None => {
                sqlx::query("DELETE FROM errors WHERE site = ? AND id = ?")
                    .bind(&self.site)
                    .bind(book.id)
                    .execute(self.db.pool())
                    .await?;
            }
        }
        Ok(())
    }

    #[instrument(skip(self), fields(site = %self.site))]
    async fn update_books_status(&self, stale_before: &str) -> Result<u64> {
        let scope = format!(
            "books.site = ? AND books.status = '{}' AND {CURRENT_VERSION} AND {}",
            BookStatus::InProgress.as_str(),
            end_condition()
        );
        let patterns: Vec<String> = END_KEYWORDS.iter().map(|kw| format!("%{kw}%")).collect();

        let mut tx = self.db.pool().begin().await?;

        let reset_sql = format!("UPDATE books SET is_downloaded = 0 WHERE is_downloaded = 1 AND {scope}");
        let mut reset = sqlx::query(&reset_sql).bind(&self.site).bind(stale_before);
        for pattern in &patterns {
            reset = reset.bind(pattern);
        }
        reset.execute(&mut *tx).await?;

        let end_sql = format!(
            "UPDATE books SET status = '{}' WHERE {scope}",
            BookStatus::End.as_str()
        );
        let mut end = sqlx::query(&end_sql).bind(&self.site).bind(stale_before);
        for pattern in &patterns {
            end = end.bind(pattern);
        }
        let moved = end.execute(&mut *tx).await?.rows_affected();

        tx.commit().await?;
        info!(moved, "books moved to end");
        Ok(moved)
    }

    #[instrument(skip(self), fields(site = %self.site))]
    async fn stats(&self) -> Result<Summary> {
        let pool = self.db.pool();

        let (book_count, unique_book_count, writer_count, downloaded_count, max_id): (
            i64,
            i64,
            i64,
            i64,
            i64,
        ) = sqlx::query_as(
            r"SELECT COUNT(*), COUNT(DISTINCT id), COUNT(DISTINCT writer_id),
                     COALESCE(SUM(is_downloaded), 0), COALESCE(MAX(id), 0)
              FROM books WHERE site = ?",
        )
        .bind(&self.site)
        .fetch_one(pool)
        .await?;

        let error_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM errors WHERE site = ?")
            .bind(&self.site)
            .fetch_one(pool)
            .await?;

        let latest_success_id: i64 = sqlx::query_scalar(&format!(
            "SELECT COALESCE(MAX(books.id), 0) FROM books \
             WHERE books.site = ? AND books.status <> ? AND {CURRENT_VERSION}"
        ))
        .bind(&self.site)
        .bind(BookStatus::Error.as_str())
        .fetch_one(pool)
        .await?;

        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM books WHERE site = ? GROUP BY status")
                .bind(&self.site)
                .fetch_all(pool)
                .await?;
        let status_count = rows
            .into_iter()
            .map(|(status, count)| (BookStatus::from_str_lossy(&status), count))
            .collect();

        Ok(Summary {
            book_count,
            unique_book_count,
            writer_count,
            error_count,
            downloaded_count,
            max_id,
            latest_success_id,
            status_count,
        })
    }

    #[instrument(skip(self), fields(site = %self.site, dir = %dir.display()))]
    async fn backup(&self, dir: &Path) -> Result<PathBuf> {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|source| RepoError::Io {
                path: dir.to_path_buf(),
                source,
            })?;

        let stamp = chrono::Local::now().format("%Y-%m-%d_%H%M%S");
        let path = dir.join(format!("{}_{stamp}.sqlite", self.site));
        let exists = tokio::fs::try_exists(&path)
            .await
            .map_err(|source| RepoError::Io {
                path: path.clone(),
                source,
            })?;
        if exists {
            tokio::fs::remove_file(&path)
                .await
                .map_err(|source| RepoError::Io {
                    path: path.clone(),
                    source,
                })?;
        }

        sqlx::query("VACUUM INTO ?")
            .bind(path.to_string_lossy().into_owned())
            .execute(self.db.pool())
            .await?;

        info!(path = %path.display(), "database backup written");
        Ok(path)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use futures_util::TryStreamExt;

    use super::*;

    async fn repo() -> SqliteBookRepository {
        SqliteBookRepository::new(Database::new_in_memory().await.unwrap(), "site")
    }

    fn book(id: i64, status: BookStatus) -> Book {
        Book {
            id,
            title: format!("title {id}"),
            update_date: "2024-01-01".to_string(),
            update_chapter: "chapter".to_string(),
            status,
            ..Book::new("site", id)
        }
    }

    #[tokio::test]
    async fn test_first_record_gets_version_zero() {
        let repo = repo().await;
        let mut first = book(1, BookStatus::InProgress);

        repo.create_book(&mut first).await.unwrap();

        assert_eq!(first.version, 0);
        let stored = repo.find_book_by_id(1).await.unwrap();
        assert_eq!(stored.version, 0);
        assert_eq!(stored.title, "title 1");
        assert_eq!(stored.status, BookStatus::InProgress);
    }

    #[tokio::test]
    async fn test_later_records_are_current() {
        let repo = repo().await;
        let mut first = book(1, BookStatus::InProgress);
        repo.create_book(&mut first).await.unwrap();

        let mut second = Book {
            version: 5,
            title: "second".to_string(),
            ..book(1, BookStatus::InProgress)
        };
        repo.create_book(&mut second).await.unwrap();
        assert_eq!(second.version, 5);

        let mut third = Book {
            version: 3,
            title: "third".to_string(),
            ..book(1, BookStatus::InProgress)
        };
        repo.create_book(&mut third).await.unwrap();
        assert_eq!(third.version, 6);

        assert_eq!(repo.find_book_by_id(1).await.unwrap().title, "third");
        assert_eq!(
            repo.find_book_by_id_version(1, 0).await.unwrap().title,
            "title 1"
        );
        assert_eq!(repo.find_book_by_id_version(1, 5).await.unwrap().title, "second");
    }

    #[tokio::test]
    async fn test_find_missing_book_is_not_found() {
        let repo = repo().await;
        assert!(repo.find_book_by_id(42).await.unwrap_err().is_not_found());
        assert!(
            repo.find_book_by_id_version(42, 1)
                .await
                .unwrap_err()
                .is_not_found()
        );
    }

    #[tokio::test]
    async fn test_update_book_persists_fields() {
        let repo = repo().await;
        let mut stored = book(1, BookStatus::InProgress);
        repo.create_book(&mut stored).await.unwrap();

        let mut writer = Writer::new("writer");
        repo.save_writer(&mut writer).await.unwrap();
        stored.writer = writer;
        stored.status = BookStatus::End;
        stored.is_downloaded = true;
        repo.update_book(&stored).await.unwrap();

        let reloaded = repo.find_book_by_id(1).await.unwrap();
        assert_eq!(reloaded.writer.name, "writer");
        assert_eq!(reloaded.status, BookStatus::End);
        assert!(reloaded.is_downloaded);
    }

    #[tokio::test]
    async fn test_update_missing_book_fails() {
        let repo = repo().await;
        let missing = Book {
            version: 0,
            ..book(9, BookStatus::End)
        };
        assert!(repo.update_book(&missing).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_save_writer_deduplicates_by_name() {
        let repo = repo().await;
        let mut a = Writer::new("writer");
        let mut b = Writer::new("writer");
        repo.save_writer(&mut a).await.unwrap();
        repo.save_writer(&mut b).await.unwrap();
        assert!(a.id.is_some());
        assert_eq!(a.id, b.id);
    }

    #[tokio::test]
    async fn test_save_and_clear_error() {
        let repo = repo().await;
        let mut stored = book(1, BookStatus::Error);
        repo.create_book(&mut stored).await.unwrap();

        repo.save_error(&stored, Some("boom")).await.unwrap();
        assert_eq!(
            repo.find_book_by_id(1).await.unwrap().error.as_deref(),
            Some("boom")
        );
        repo.save_error(&stored, Some("again")).await.unwrap();
        assert_eq!(
            repo.find_book_by_id(1).await.unwrap().error.as_deref(),
            Some("again")
        );

        repo.save_error(&stored, None).await.unwrap();
        assert_eq!(repo.find_book_by_id(1).await.unwrap().error, None);
    }

    #[tokio::test]
    async fn test_streams_filter_and_page() {
        let repo = repo().await;
        for id in 1..=1200 {
            let status = if id % 2 == 0 {
                BookStatus::End
            } else {
                BookStatus::InProgress
            };
            repo.create_book(&mut book(id, status)).await.unwrap();
        }

        let all: Vec<Book> = repo.find_all_books().try_collect().await.unwrap();
        assert_eq!(all.len(), 1200);
        assert!(all.windows(2).all(|w| w[0].id < w[1].id));

        let ended: Vec<Book> = repo
            .find_books_by_status(BookStatus::End)
            .try_collect()
            .await
            .unwrap();
        assert_eq!(ended.len(), 600);

        let downloadable: Vec<Book> = repo.find_books_for_download().try_collect().await.unwrap();
        assert_eq!(downloadable.len(), 600);
    }

    #[tokio::test]
    async fn test_update_stream_returns_current_versions_only() {
        let repo = repo().await;
        repo.create_book(&mut book(1, BookStatus::InProgress)).await.unwrap();
        let mut republished = Book {
            title: "new title".to_string(),
            ..book(1, BookStatus::InProgress)
        };
        repo.create_book(&mut republished).await.unwrap();
        repo.create_book(&mut book(2, BookStatus::Error)).await.unwrap();

        let current: Vec<Book> = repo.find_books_for_update().try_collect().await.unwrap();

        assert_eq!(current.len(), 2);
        assert_eq!(current[0].title, "new title");
        assert_eq!(current[1].status, BookStatus::Error);
    }

    #[tokio::test]
    async fn test_download_stream_skips_downloaded() {
        let repo = repo().await;
        let mut done = Book {
            is_downloaded: true,
            ..book(1, BookStatus::End)
        };
        repo.create_book(&mut done).await.unwrap();
        repo.create_book(&mut book(2, BookStatus::End)).await.unwrap();

        let pending: Vec<Book> = repo.find_books_for_download().try_collect().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, 2);
    }

    #[tokio::test]
    async fn test_search_by_title_and_writer() {
        let repo = repo().await;
        let mut writer = Writer::new("someone");
        repo.save_writer(&mut writer).await.unwrap();

        let mut a = Book {
            title: "dragon saga".to_string(),
            ..book(1, BookStatus::InProgress)
        };
        let mut b = Book {
            writer: writer.clone(),
            ..book(2, BookStatus::End)
        };
        let mut c = Book {
            title: "dragon error".to_string(),
            ..book(3, BookStatus::Error)
        };
        for entry in [&mut a, &mut b, &mut c] {
            repo.create_book(entry).await.unwrap();
        }

        let by_title = repo
            .find_books_by_title_writer("dragon", "", 10, 0)
            .await
            .unwrap();
        assert_eq!(by_title.len(), 1);
        assert_eq!(by_title[0].id, 1);

        let by_writer = repo
            .find_books_by_title_writer("", "some", 10, 0)
            .await
            .unwrap();
        assert_eq!(by_writer.len(), 1);
        assert_eq!(by_writer[0].id, 2);

        let none = repo.find_books_by_title_writer("", "", 10, 0).await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_random_books_are_downloaded() {
        let repo = repo().await;
        for id in 1..=5 {
            let mut entry = Book {
                is_downloaded: id <= 3,
                ..book(id, BookStatus::End)
            };
            repo.create_book(&mut entry).await.unwrap();
        }

        let picked = repo.find_books_by_random(10).await.unwrap();
        assert_eq!(picked.len(), 3);
        assert!(picked.iter().all(|b| b.is_downloaded));
        assert_eq!(repo.find_books_by_random(2).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_update_books_status_sweeps_in_progress() {
        let repo = repo().await;
        let mut stale = Book {
            update_date: "2020-05-01".to_string(),
            ..book(1, BookStatus::InProgress)
        };
        let mut ending = Book {
            update_date: "2099-01-01".to_string(),
            update_chapter: "第99章 大 结局".to_string(),
            ..book(2, BookStatus::InProgress)
        };
        let mut fresh = Book {
            update_date: "2099-01-01".to_string(),
            ..book(3, BookStatus::InProgress)
        };
        let mut errored = Book {
            update_date: "2020-05-01".to_string(),
            ..book(4, BookStatus::Error)
        };
        for entry in [&mut stale, &mut ending, &mut fresh, &mut errored] {
            repo.create_book(entry).await.unwrap();
        }

        let moved = repo.update_books_status("2025-01-01").await.unwrap();

        assert_eq!(moved, 2);
        assert_eq!(repo.find_book_by_id(1).await.unwrap().status, BookStatus::End);
        assert_eq!(repo.find_book_by_id(2).await.unwrap().status, BookStatus::End);
        assert_eq!(
            repo.find_book_by_id(3).await.unwrap().status,
            BookStatus::InProgress
        );
        assert_eq!(repo.find_book_by_id(4).await.unwrap().status, BookStatus::Error);
    }

    #[tokio::test]
    async fn test_stats_summary() {
        let repo = repo().await;
        let mut writer = Writer::new("writer");
        repo.save_writer(&mut writer).await.unwrap();

        let mut a = Book {
            writer: writer.clone(),
            is_downloaded: true,
            ..book(1, BookStatus::End)
        };
        let mut b = Book {
            writer: writer.clone(),
            ..book(2, BookStatus::InProgress)
        };
        let mut c = book(3, BookStatus::Error);
        for entry in [&mut a, &mut b, &mut c] {
            repo.create_book(entry).await.unwrap();
        }
        let mut republished = book(2, BookStatus::InProgress);
        repo.create_book(&mut republished).await.unwrap();
        repo.save_error(&c, Some("boom")).await.unwrap();

        let summary = repo.stats().await.unwrap();

        assert_eq!(summary.book_count, 4);
        assert_eq!(summary.unique_book_count, 3);
        assert_eq!(summary.writer_count, 1);
        assert_eq!(summary.error_count, 1);
        assert_eq!(summary.downloaded_count, 1);
        assert_eq!(summary.max_id, 3);
        assert_eq!(summary.latest_success_id, 2);
        assert_eq!(summary.status_count.get(&BookStatus::InProgress), Some(&2));
        assert_eq!(summary.status_count.get(&BookStatus::End), Some(&1));
        assert_eq!(summary.status_count.get(&BookStatus::Error), Some(&1));
    }

    #[tokio::test]
    async fn test_stats_on_empty_site() {
        let summary = repo().await.stats().await.unwrap();
        assert_eq!(summary, Summary::default());
    }

    #[tokio::test]
    async fn test_repositories_are_site_scoped() {
        let db = Database::new_in_memory().await.unwrap();
        let first = SqliteBookRepository::new(db.clone(), "first");
        let second = SqliteBookRepository::new(db, "second");

        first.create_book(&mut book(1, BookStatus::End)).await.unwrap();

        assert!(second.find_book_by_id(1).await.unwrap_err().is_not_found());
        assert_eq!(second.stats().await.unwrap().book_count, 0);
    }

    #[tokio::test]
    async fn test_backup_writes_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("books.db");
        let repo = SqliteBookRepository::new(Database::new(&db_path).await.unwrap(), "site");
        repo.create_book(&mut book(1, BookStatus::End)).await.unwrap();

        let backup_dir = dir.path().join("backup");
        let path = repo.backup(&backup_dir).await.unwrap();

        assert!(path.starts_with(&backup_dir));
        assert!(path.exists());
        let copy = SqliteBookRepository::new(Database::new(&path).await.unwrap(), "site");
        assert_eq!(copy.find_book_by_id(1).await.unwrap().title, "title 1");
    }
}
