//! HTML field extraction.
//!
//! The lifecycle engine depends only on the [`Parser`] contract; each site
//! gets a [`SelectorParser`] built from its configured CSS selectors.
//!
//! # Example
//!
//! ```
//! use novelcrawl_core::parser::{Parser, SelectorConfig, SelectorParser};
//!
//! let parser = SelectorParser::new(&SelectorConfig {
//!     title: "h1".into(),
//!     writer: ".writer".into(),
//!     book_type: ".type".into(),
//!     update_date: ".date".into(),
//!     update_chapter: ".last".into(),
//!     chapter_list: ".list a".into(),
//!     chapter_title: "h2".into(),
//!     chapter_content: "#content".into(),
//! })
//! .unwrap();
//! assert!(parser.parse_book_info("<h1>only a title</h1>").is_err());
//! ```

mod error;
mod fields;
mod selector;

pub use error::ParseError;
pub use fields::{BookInfo, ChapterContent, ChapterListItem, chapters_from_list};
pub use selector::{SelectorConfig, SelectorParser};

/// Extracts validated fields from catalog pages.
///
/// Implementations must reject pages with missing or empty fields rather
/// than returning partial data.
pub trait Parser: Send + Sync {
    /// Parses a book info page.
    ///
    /// # Errors
    ///
    /// [`ParseError::FieldsNotFound`] if any field is missing.
    fn parse_book_info(&self, html: &str) -> Result<BookInfo, ParseError>;

    /// Parses a chapter index page into `(url, title)` pairs in page order.
    ///
    /// # Errors
    ///
    /// [`ParseError::NoChaptersFound`] if the page lists no chapters.
    fn parse_chapter_list(&self, html: &str) -> Result<Vec<ChapterListItem>, ParseError>;

    /// Parses a chapter page.
    ///
    /// # Errors
    ///
    /// [`ParseError::ChapterFieldsNotFound`] if title or content is missing.
    fn parse_chapter_content(&self, html: &str) -> Result<ChapterContent, ParseError>;
}
