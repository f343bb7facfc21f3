//! CSS-selector driven [`Parser`] backed by `scraper`.

use scraper::{ElementRef, Html, Node, Selector};
use serde::Deserialize;

use super::{BookInfo, ChapterContent, ChapterListItem, ParseError, Parser};

/// Selector strings for one site. They are opaque configuration; any syntax
/// `scraper` accepts is fine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SelectorConfig {
    pub title: String,
    pub writer: String,
    pub book_type: String,
    pub update_date: String,
    pub update_chapter: String,
    /// Matches one anchor per chapter on the index page.
    pub chapter_list: String,
    pub chapter_title: String,
    pub chapter_content: String,
}

/// Parser with selectors compiled once at construction.
#[derive(Debug)]
pub struct SelectorParser {
    title: Selector,
    writer: Selector,
    book_type: Selector,
    update_date: Selector,
    update_chapter: Selector,
    chapter_list: Selector,
    chapter_title: Selector,
    chapter_content: Selector,
}

fn compile(field: &'static str, selector: &str) -> Result<Selector, ParseError> {
    if selector.trim().is_empty() {
        return Err(ParseError::invalid_selector(field, selector, "selector is empty"));
    }
    Selector::parse(selector).map_err(|e| ParseError::invalid_selector(field, selector, format!("{e:?}")))
}

impl SelectorParser {
    /// Compiles every selector in `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::InvalidSelector`] for the first selector that is
    /// empty or does not compile.
    pub fn new(config: &SelectorConfig) -> Result<Self, ParseError> {
        Ok(Self {
            title: compile("title", &config.title)?,
            writer: compile("writer", &config.writer)?,
            book_type: compile("book_type", &config.book_type)?,
            update_date: compile("update_date", &config.update_date)?,
            update_chapter: compile("update_chapter", &config.update_chapter)?,
            chapter_list: compile("chapter_list", &config.chapter_list)?,
            chapter_title: compile("chapter_title", &config.chapter_title)?,
            chapter_content: compile("chapter_content", &config.chapter_content)?,
        })
    }
}

/// Concatenated, trimmed text of every match.
fn select_text(doc: &Html, selector: &Selector) -> String {
    doc.select(selector)
        .flat_map(|element| element.text())
        .collect::<String>()
        .trim()
        .to_string()
}

/// Text of an element with `<br>` and `<p>` turned into line breaks.
fn element_lines(element: ElementRef<'_>) -> String {
    let mut out = String::new();
    for node in element.descendants() {
        match node.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) if matches!(el.name(), "br" | "p") => out.push('\n'),
            _ => {}
        }
    }
    out
}

impl Parser for SelectorParser {
    fn parse_book_info(&self, html: &str) -> Result<BookInfo, ParseError> {
        let doc = Html::parse_document(html);
        BookInfo::new(
            select_text(&doc, &self.title),
            select_text(&doc, &self.writer),
            select_text(&doc, &self.book_type),
            select_text(&doc, &self.update_date),
            select_text(&doc, &self.update_chapter),
        )
    }

    fn parse_chapter_list(&self, html: &str) -> Result<Vec<ChapterListItem>, ParseError> {
        let doc = Html::parse_document(html);
        let items: Vec<ChapterListItem> = doc
            .select(&self.chapter_list)
            .map(|element| {
                ChapterListItem::new(
                    element.value().attr("href").unwrap_or_default(),
                    element.text().collect::<String>().trim(),
                )
            })
            .collect();

        if items.is_empty() {
            return Err(ParseError::NoChaptersFound);
        }
        Ok(items)
    }

    fn parse_chapter_content(&self, html: &str) -> Result<ChapterContent, ParseError> {
        let doc = Html::parse_document(html);
        let title = select_text(&doc, &self.chapter_title);
        let mut content = String::new();
        for element in doc.select(&self.chapter_content) {
            content.push_str(element_lines(element).trim());
            content.push('\n');
        }
        if content.trim().is_empty() {
            content.clear();
        }
        ChapterContent::new(title, content)
    }
}
