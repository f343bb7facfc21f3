//! Shared helpers for integration tests: a mock catalog site served by
//! wiremock and a file-backed repository in a temp dir.

#![allow(dead_code)]

use std::fmt::Write;
use std::sync::Arc;

use novelcrawl_core::client::RetryClientConfig;
use novelcrawl_core::config::SiteUrls;
use novelcrawl_core::parser::SelectorConfig;
use novelcrawl_core::{ClientConfig, Database, SiteConfig, SiteService, SqliteBookRepository};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const SITE: &str = "mock";

/// A site under test. Keep `dir` alive for the duration of the test.
pub struct MockSite {
    pub server: MockServer,
    pub service: SiteService,
    pub repo: Arc<SqliteBookRepository>,
    pub db: Database,
    pub dir: TempDir,
}

pub fn selectors() -> SelectorConfig {
    SelectorConfig {
        title: "h1.title".to_string(),
        writer: "span.writer".to_string(),
        book_type: "span.type".to_string(),
        update_date: "span.date".to_string(),
        update_chapter: "a.last".to_string(),
        chapter_list: "ul.chapters a".to_string(),
        chapter_title: "h2".to_string(),
        chapter_content: "div#content".to_string(),
    }
}

/// Site config pointing at `server`, without retry conditions so failing
/// pages fail fast.
pub fn site_config(server: &MockServer, dir: &TempDir) -> SiteConfig {
    let uri = server.uri();
    SiteConfig {
        urls: SiteUrls {
            book: format!("{uri}/book/{{id}}"),
            chapter_list: format!("{uri}/book/{{id}}/index"),
            chapter_prefix: String::new(),
            availability: String::new(),
        },
        storage_dir: dir.path().join("books"),
        backup_dir: dir.path().join("backup"),
        selectors: selectors(),
        client: ClientConfig {
            retry: RetryClientConfig {
                max_retry_weight: 1,
                conditions: Vec::new(),
            },
            ..ClientConfig::default()
        },
        max_workers: 1,
        max_explore_error: 3,
        ..SiteConfig::default()
    }
}

pub async fn mock_site() -> MockSite {
    mock_site_with(|_| {}).await
}

pub async fn mock_site_with(adjust: impl FnOnce(&mut SiteConfig)) -> MockSite {
    let server = MockServer::start().await;
    let dir = TempDir::new().expect("failed to create temp dir");
    let mut config = site_config(&server, &dir);
    adjust(&mut config);

    let db = Database::new(&dir.path().join("novels.db"))
        .await
        .expect("failed to open database");
    let repo = Arc::new(SqliteBookRepository::new(db.clone(), SITE));
    let service =
        SiteService::new(SITE, config, repo.clone()).expect("failed to build site service");

    MockSite {
        server,
        service,
        repo,
        db,
        dir,
    }
}

pub fn book_page(title: &str, writer: &str, date: &str, last_chapter: &str) -> String {
    format!(
        r##"<html><body>
        <h1 class="title">{title}</h1>
        <span class="writer">{writer}</span>
        <span class="type">fantasy</span>
        <span class="date">{date}</span>
        <a class="last" href="#">{last_chapter}</a>
        </body></html>"##
    )
}

pub fn chapter_list_page(id: i64, chapters: usize) -> String {
    let mut html = String::from(r#"<html><body><ul class="chapters">"#);
    for n in 1..=chapters {
        let _ = write!(html, r#"<li><a href="/chapter/{id}/{n}">chapter {n}</a></li>"#);
    }
    html.push_str("</ul></body></html>");
    html
}

pub fn chapter_page(title: &str, paragraphs: &[&str]) -> String {
    format!(
        r#"<html><body><h2>{title}</h2><div id="content">{}</div></body></html>"#,
        paragraphs.join("<br/>")
    )
}

pub async fn mount_page(server: &MockServer, route: &str, html: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(html))
        .mount(server)
        .await;
}

pub async fn mount_book(server: &MockServer, id: i64, title: &str, date: &str, last_chapter: &str) {
    mount_page(
        server,
        &format!("/book/{id}"),
        book_page(title, "writer", date, last_chapter),
    )
    .await;
}

/// Mounts the chapter index and every chapter page of `id`, except the
/// chapter numbers in `missing`, which answer 404.
pub async fn mount_chapters(server: &MockServer, id: i64, chapters: usize, missing: &[usize]) {
    mount_page(server, &format!("/book/{id}/index"), chapter_list_page(id, chapters)).await;
    for n in (1..=chapters).filter(|n| !missing.contains(n)) {
        mount_page(
            server,
            &format!("/chapter/{id}/{n}"),
            chapter_page(&format!("chapter {n}"), &[&format!("text of {n}"), "second line"]),
        )
        .await;
    }
}
