//! Validated field bags produced by a [`Parser`](super::Parser).

use crate::model::{Book, Chapter};

use super::ParseError;

/// Metadata scraped from a book's info page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookInfo {
    pub title: String,
    pub writer: String,
    pub book_type: String,
    pub update_date: String,
    pub update_chapter: String,
}

impl BookInfo {
    /// Builds a field bag, rejecting it when any field is empty.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::FieldsNotFound`] if a field is empty.
    pub fn new(
        title: impl Into<String>,
        writer: impl Into<String>,
        book_type: impl Into<String>,
        update_date: impl Into<String>,
        update_chapter: impl Into<String>,
    ) -> Result<Self, ParseError> {
        let info = Self {
            title: title.into(),
            writer: writer.into(),
            book_type: book_type.into(),
            update_date: update_date.into(),
            update_chapter: update_chapter.into(),
        };
        info.validate()?;
        Ok(info)
    }

    fn validate(&self) -> Result<(), ParseError> {
        let fields = [
            &self.title,
            &self.writer,
            &self.book_type,
            &self.update_date,
            &self.update_chapter,
        ];
        if fields.iter().any(|field| field.is_empty()) {
            return Err(ParseError::FieldsNotFound);
        }
        Ok(())
    }

    /// True when the stored identity (title, writer, type) is known and
    /// differs from these fields, i.e. the site reused the id.
    #[must_use]
    pub fn is_new_book(&self, book: &Book) -> bool {
        (!book.title.is_empty() && book.title != self.title)
            || (!book.writer.name.is_empty() && book.writer.name != self.writer)
            || (!book.book_type.is_empty() && book.book_type != self.book_type)
    }

    /// True when any tracked field differs from the stored record.
    #[must_use]
    pub fn is_updated_book(&self, book: &Book) -> bool {
        book.title != self.title
            || book.writer.name != self.writer
            || book.book_type != self.book_type
            || book.update_date != self.update_date
            || book.update_chapter != self.update_chapter
    }

    /// Copies the fields into `book`. The writer id is reset because the name
    /// may have changed.
    pub fn apply_to(&self, book: &mut Book) {
        book.title.clone_from(&self.title);
        if book.writer.name != self.writer {
            book.writer.id = None;
            book.writer.name.clone_from(&self.writer);
        }
        book.book_type.clone_from(&self.book_type);
        book.update_date.clone_from(&self.update_date);
        book.update_chapter.clone_from(&self.update_chapter);
    }
}

/// One entry of a chapter index page, in page order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterListItem {
    pub url: String,
    pub title: String,
}

impl ChapterListItem {
    #[must_use]
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
        }
    }
}

/// Converts an index page listing into indexed chapters.
///
/// # Errors
///
/// Returns [`ParseError::NoChaptersFound`] for an empty listing.
pub fn chapters_from_list(items: Vec<ChapterListItem>) -> Result<Vec<Chapter>, ParseError> {
    if items.is_empty() {
        return Err(ParseError::NoChaptersFound);
    }
    Ok(items
        .into_iter()
        .enumerate()
        .map(|(index, item)| Chapter::new(index, item.url, item.title))
        .collect())
}

/// Title and raw content of one chapter page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterContent {
    pub title: String,
    pub content: String,
}

impl ChapterContent {
    /// # Errors
    ///
    /// Returns [`ParseError::ChapterFieldsNotFound`] if either field is empty.
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Result<Self, ParseError> {
        let fields = Self {
            title: title.into(),
            content: content.into(),
        };
        if fields.title.is_empty() || fields.content.is_empty() {
            return Err(ParseError::ChapterFieldsNotFound);
        }
        Ok(fields)
    }

    /// Copies title and content into `chapter`.
    pub fn apply_to(self, chapter: &mut Chapter) {
        chapter.title = self.title;
        chapter.content = self.content;
    }
}
