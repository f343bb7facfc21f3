//! Error types for HTML field extraction.

use thiserror::Error;

/// Errors raised while extracting fields from catalog pages.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// One or more book info fields were missing or empty.
    #[error("parse book fail: fields not found")]
    FieldsNotFound,

    /// The chapter index page listed no chapters.
    #[error("no chapters found")]
    NoChaptersFound,

    /// Chapter title or content was missing or empty.
    #[error("parse chapter fail: fields not found")]
    ChapterFieldsNotFound,

    /// A configured selector could not be compiled.
    #[error("invalid selector '{selector}' for {field}: {reason}")]
    InvalidSelector {
        /// Config field the selector belongs to.
        field: &'static str,
        /// The selector text.
        selector: String,
        /// Why compilation failed.
        reason: String,
    },
}

impl ParseError {
    /// Creates an `InvalidSelector` error.
    #[must_use]
    pub fn invalid_selector(field: &'static str, selector: &str, reason: impl ToString) -> Self {
        Self::InvalidSelector {
            field,
            selector: selector.to_string(),
            reason: reason.to_string(),
        }
    }
}
