//! Book records and lifecycle status.

use std::fmt;
use std::path::{Path, PathBuf};

use rand::Rng;
use serde::Serialize;

use super::Writer;
use super::chapter::CONTENT_SEP;

/// Upper bound for minted versions. Keeps base-36 file suffixes short.
const MAX_MINTED_VERSION: i64 = u32::MAX as i64;

/// Lifecycle state of a book.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BookStatus {
    /// Never fetched successfully, or the last explore attempt failed.
    #[default]
    Error,
    /// Metadata known, story still being published.
    InProgress,
    /// Story considered finished; eligible for download.
    End,
}

impl BookStatus {
    /// Returns the database string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "ERROR",
            Self::InProgress => "INPROGRESS",
            Self::End => "END",
        }
    }

    /// Parses a status label case-insensitively. Unknown labels map to `Error`.
    #[must_use]
    pub fn from_str_lossy(s: &str) -> Self {
        s.parse().unwrap_or(Self::Error)
    }
}

impl fmt::Display for BookStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for BookStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ERROR" => Ok(Self::Error),
            "INPROGRESS" => Ok(Self::InProgress),
            "END" => Ok(Self::End),
            _ => Err(format!("invalid book status: {s}")),
        }
    }
}

/// One catalog entry, identified by `(site, id, version)`.
///
/// `version` is 0 for the canonical record of an id. When a site reuses an id
/// for an unrelated title, a new version is minted and a new record is
/// created; older versions are kept as history.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Book {
    pub site: String,
    pub id: i64,
    pub version: i64,
    pub title: String,
    pub writer: Writer,
    pub book_type: String,
    pub update_date: String,
    pub update_chapter: String,
    pub status: BookStatus,
    pub is_downloaded: bool,
    pub error: Option<String>,
}

impl Book {
    /// Creates an empty `Error` shell for a freshly discovered id, with a
    /// newly minted version.
    #[must_use]
    pub fn new(site: impl Into<String>, id: i64) -> Self {
        Self {
            site: site.into(),
            id,
            version: mint_version(),
            ..Self::default()
        }
    }

    /// Base-36 rendering of the version, as used in file names and lookups.
    #[must_use]
    pub fn formatted_version(&self) -> String {
        format_version(self.version)
    }

    /// File name of the stored text artifact.
    #[must_use]
    pub fn storage_file_name(&self) -> String {
        if self.version > 0 {
            format!("{}-v{}.txt", self.id, self.formatted_version())
        } else {
            format!("{}.txt", self.id)
        }
    }

    /// Full storage path of the text artifact under `storage_dir`.
    #[must_use]
    pub fn storage_path(&self, storage_dir: &Path) -> PathBuf {
        storage_dir.join(self.storage_file_name())
    }

    /// Header block written before the chapters.
    #[must_use]
    pub fn header(&self) -> String {
        format!("{}\n{}\n{CONTENT_SEP}\n\n", self.title, self.writer.name)
    }

    /// JSON rendering for CLI output.
    #[must_use]
    pub fn to_json(&self) -> String {
        let view = BookView {
            site: &self.site,
            id: self.id,
            version: self.formatted_version(),
            title: &self.title,
            writer: &self.writer.name,
            book_type: &self.book_type,
            update_date: &self.update_date,
            update_chapter: &self.update_chapter,
            status: self.status,
            is_downloaded: self.is_downloaded,
            error: self.error.as_deref().unwrap_or_default(),
        };
        serde_json::to_string(&view).unwrap_or_else(|_| self.to_string())
    }
}

impl fmt::Display for Book {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.site, self.id)?;
        if self.version > 0 {
            write!(f, "-{}", self.formatted_version())?;
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct BookView<'a> {
    site: &'a str,
    id: i64,
    version: String,
    title: &'a str,
    writer: &'a str,
    #[serde(rename = "type")]
    book_type: &'a str,
    update_date: &'a str,
    update_chapter: &'a str,
    status: BookStatus,
    is_downloaded: bool,
    error: &'a str,
}

/// Mints a new pseudo-random version for a republished or newly found title.
#[must_use]
pub fn mint_version() -> i64 {
    rand::thread_rng().gen_range(1..=MAX_MINTED_VERSION)
}

/// Formats a version in base 36 (lowercase).
#[must_use]
pub fn format_version(version: i64) -> String {
    if version == 0 {
        return "0".to_string();
    }

    let negative = version < 0;
    let mut value = version.unsigned_abs();
    let mut digits = Vec::new();
    while value > 0 {
        let digit = u32::try_from(value % 36).unwrap_or_default();
        digits.push(std::char::from_digit(digit, 36).unwrap_or('0'));
        value /= 36;
    }
    if negative {
        digits.push('-');
    }
    digits.iter().rev().collect()
}

/// Parses a base-36 version string. Returns `None` for invalid input.
#[must_use]
pub fn parse_version(s: &str) -> Option<i64> {
    i64::from_str_radix(s.trim(), 36).ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse_is_case_insensitive() {
        assert_eq!(BookStatus::from_str_lossy("ErRoR"), BookStatus::Error);
        assert_eq!(BookStatus::from_str_lossy("inprogress"), BookStatus::InProgress);
        assert_eq!(BookStatus::from_str_lossy("end"), BookStatus::End);
    }

    #[test]
    fn test_status_unknown_maps_to_error() {
        assert_eq!(BookStatus::from_str_lossy("unknown"), BookStatus::Error);
    }

    #[test]
    fn test_status_as_str() {
        assert_eq!(BookStatus::Error.as_str(), "ERROR");
        assert_eq!(BookStatus::InProgress.as_str(), "INPROGRESS");
        assert_eq!(BookStatus::End.as_str(), "END");
    }

    #[test]
    fn test_new_book_is_error_shell_with_version() {
        let book = Book::new("site", 5);
        assert_eq!(book.status, BookStatus::Error);
        assert!(book.version > 0);
        assert!(book.title.is_empty());
        assert!(book.error.is_none());
    }

    #[test]
    fn test_storage_file_name_for_canonical_version() {
        let book = Book {
            id: 12,
            version: 0,
            ..Book::default()
        };
        assert_eq!(book.storage_file_name(), "12.txt");
    }

    #[test]
    fn test_storage_file_name_for_minted_version() {
        let book = Book {
            id: 12,
            version: 100,
            ..Book::default()
        };
        assert_eq!(book.storage_file_name(), "12-v2s.txt");
    }

    #[test]
    fn test_format_and_parse_version() {
        assert_eq!(format_version(0), "0");
        assert_eq!(format_version(35), "z");
        assert_eq!(format_version(36), "10");
        assert_eq!(parse_version("10"), Some(36));
        assert_eq!(parse_version("2S"), Some(100));
        assert_eq!(parse_version("not valid!"), None);
    }

    #[test]
    fn test_display_includes_version_when_minted() {
        let mut book = Book {
            site: "site".to_string(),
            id: 3,
            ..Book::default()
        };
        assert_eq!(book.to_string(), "site-3");
        book.version = 36;
        assert_eq!(book.to_string(), "site-3-10");
    }

    #[test]
    fn test_header_format() {
        let book = Book {
            title: "title".to_string(),
            writer: Writer::new("writer"),
            ..Book::default()
        };
        assert_eq!(book.header(), format!("title\nwriter\n{CONTENT_SEP}\n\n"));
    }

    #[test]
    fn test_to_json_contains_fields() {
        let book = Book {
            site: "site".to_string(),
            id: 1,
            version: 36,
            title: "title".to_string(),
            status: BookStatus::End,
            ..Book::default()
        };
        let value: serde_json::Value = serde_json::from_str(&book.to_json()).unwrap();
        assert_eq!(value["version"], "10");
        assert_eq!(value["status"], "END");
        assert_eq!(value["title"], "title");
    }
}
