//! Chapters and the flat text artifact format.
//!
//! A stored book looks like:
//!
//! ```text
//! title
//! writer
//! --------------------
//!
//! chapter 1 title
//! --------------------
//! paragraph
//!
//! paragraph
//! --------------------
//! chapter 2 title
//! --------------------
//! ...
//! ```

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use super::Book;

/// Separator line between titles and content (20 dashes).
pub const CONTENT_SEP: &str = "--------------------";

/// Markup that survives field extraction on some catalogs.
const STRIPPED_MARKUP: [&str; 5] = ["&nbsp;", "<b>", "</b>", "<p>", "</p>"];

static LINE_BREAK_TAG: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>|<p\s*/>").ok());

/// Error raised when stored text does not follow the artifact format.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContentFormatError {
    /// The title/writer header block is missing.
    #[error("book header not found")]
    MissingHeader,

    /// A chapter block is not closed by a separator.
    #[error("chapter {index} is truncated")]
    TruncatedChapter {
        /// Zero-based index of the broken chapter.
        index: usize,
    },
}

/// A chapter of a book being downloaded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Chapter {
    pub index: usize,
    pub url: String,
    pub title: String,
    pub content: String,
    pub error: Option<String>,
}

impl Chapter {
    #[must_use]
    pub fn new(index: usize, url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            index,
            url: url.into(),
            title: title.into(),
            ..Self::default()
        }
    }

    /// Normalises raw chapter content into blank-line separated paragraphs.
    pub fn optimize_content(&mut self) {
        let mut content = match LINE_BREAK_TAG.as_ref() {
            Some(re) => re.replace_all(&self.content, "\n").into_owned(),
            None => self.content.clone(),
        };
        for markup in STRIPPED_MARKUP {
            content = content.replace(markup, "");
        }

        self.content = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n");
    }

    /// Renders this chapter as a block of the text artifact.
    #[must_use]
    pub fn render(&self) -> String {
        format!(
            "{}\n{CONTENT_SEP}\n{}\n{CONTENT_SEP}\n",
            self.title, self.content
        )
    }
}

/// Renders a full book: header followed by every chapter in index order.
#[must_use]
pub fn render_book(book: &Book, chapters: &[Chapter]) -> String {
    let mut text = book.header();
    for chapter in chapters {
        text.push_str(&chapter.render());
    }
    text
}

/// Parses a rendered book back into its chapters.
///
/// Chapter urls are not stored, so parsed chapters carry an empty `url`.
///
/// # Errors
///
/// Returns [`ContentFormatError`] when the header or a chapter block is
/// malformed.
pub fn parse_chapters(text: &str) -> Result<Vec<Chapter>, ContentFormatError> {
    let sep_line = format!("\n{CONTENT_SEP}\n");

    let (_, body) = text
        .split_once(&sep_line)
        .ok_or(ContentFormatError::MissingHeader)?;
    let mut rest = body
        .strip_prefix('\n')
        .ok_or(ContentFormatError::MissingHeader)?;

    let mut chapters = Vec::new();
    while !rest.is_empty() {
        let index = chapters.len();
        let (title, after_title) = split_block(rest, &sep_line)
            .ok_or(ContentFormatError::TruncatedChapter { index })?;
        let (content, after_content) = split_block(after_title, &sep_line)
            .ok_or(ContentFormatError::TruncatedChapter { index })?;

        chapters.push(Chapter {
            index,
            title: title.to_string(),
            content: content.to_string(),
            ..Chapter::default()
        });
        rest = after_content;
    }

    Ok(chapters)
}

/// Splits at the next separator line. A block may be empty, in which case the
/// separator starts immediately after the previous line break.
fn split_block<'a>(text: &'a str, sep_line: &str) -> Option<(&'a str, &'a str)> {
    if let Some(after) = text.strip_prefix(&sep_line[1..]) {
        return Some(("", after));
    }
    text.split_once(sep_line)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::Writer;

    fn book() -> Book {
        Book {
            title: "title".to_string(),
            writer: Writer::new("writer"),
            ..Book::default()
        }
    }

    fn chapter(index: usize, title: &str, content: &str) -> Chapter {
        Chapter {
            index,
            title: title.to_string(),
            content: content.to_string(),
            ..Chapter::default()
        }
    }

    #[test]
    fn test_separator_is_twenty_dashes() {
        assert_eq!(CONTENT_SEP.len(), 20);
        assert!(CONTENT_SEP.chars().all(|c| c == '-'));
    }

    #[test]
    fn test_render_chapter_format() {
        let ch = chapter(1, "title", "content");
        assert_eq!(
            ch.render(),
            format!("title\n{CONTENT_SEP}\ncontent\n{CONTENT_SEP}\n")
        );
    }

    #[test]
    fn test_render_chapter_with_empty_content() {
        let ch = chapter(1, "title", "");
        assert_eq!(ch.render(), format!("title\n{CONTENT_SEP}\n\n{CONTENT_SEP}\n"));
    }

    #[test]
    fn test_optimize_content_strips_markup() {
        let mut ch = chapter(0, "", "&nbsp;<b></b></p>");
        ch.optimize_content();
        assert_eq!(ch.content, "");
    }

    #[test]
    fn test_optimize_content_turns_breaks_into_paragraphs() {
        let mut ch = chapter(0, "", "first<br />second<br/>third<p/>fourth");
        ch.optimize_content();
        assert_eq!(ch.content, "first\n\nsecond\n\nthird\n\nfourth");
    }

    #[test]
    fn test_optimize_content_trims_lines() {
        let mut ch = chapter(0, "", " abc \n\tdef\t\n \n");
        ch.optimize_content();
        assert_eq!(ch.content, "abc\n\ndef");
    }

    #[test]
    fn test_parse_chapters_round_trip() {
        let chapters = vec![
            chapter(0, "chapter 1", "content1\n\ncontent2"),
            chapter(1, "chapter 2", "content3"),
            chapter(2, "chapter 3", ""),
            chapter(3, "", "untitled"),
        ];

        let text = render_book(&book(), &chapters);
        let parsed = parse_chapters(&text).unwrap();

        assert_eq!(parsed, chapters);
    }

    #[test]
    fn test_parse_chapters_preserves_index_order() {
        let chapters: Vec<Chapter> = (0..50)
            .map(|i| chapter(i, &format!("chapter {i}"), &format!("body {i}")))
            .collect();

        let parsed = parse_chapters(&render_book(&book(), &chapters)).unwrap();

        assert_eq!(parsed.len(), 50);
        assert!(parsed.iter().enumerate().all(|(i, ch)| ch.index == i));
        assert_eq!(parsed, chapters);
    }

    #[test]
    fn test_parse_chapters_header_only() {
        let parsed = parse_chapters(&book().header()).unwrap();
        assert!(parsed.is_empty());
    }

    #[test]
    fn test_parse_chapters_missing_header() {
        assert_eq!(
            parse_chapters("no separator here"),
            Err(ContentFormatError::MissingHeader)
        );
    }

    #[test]
    fn test_parse_chapters_truncated_chapter() {
        let mut text = book().header();
        text.push_str(&format!("chapter 1\n{CONTENT_SEP}\ncontent without end"));
        assert_eq!(
            parse_chapters(&text),
            Err(ContentFormatError::TruncatedChapter { index: 0 })
        );
    }
}
