//! Domain records shared by the client, repository and service layers.
//!
//! - [`Book`] - one `(site, id, version)` catalog entry and its lifecycle state
//! - [`Writer`] - author record, deduplicated by name
//! - [`Chapter`] - transient chapter text produced while downloading

mod book;
mod chapter;
mod writer;

pub use book::{Book, BookStatus, format_version, mint_version, parse_version};
pub use chapter::{CONTENT_SEP, Chapter, ContentFormatError, parse_chapters, render_book};
pub use writer::Writer;
