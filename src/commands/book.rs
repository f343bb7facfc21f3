//! Single-book lookups and catalog queries.

use anyhow::{Context, Result, bail};
use novelcrawl_core::{Book, SiteService};

use crate::cli::{BookArgs, Command};

pub async fn run_book_command(service: &SiteService, command: &Command) -> Result<()> {
    match command {
        Command::Info(args) => {
            let book = find(service, args).await?;
            println!("{}", service.info(&book));
        }
        Command::Content(args) => {
            let book = find(service, args).await?;
            print!("{}", service.book_content(&book).await?);
        }
        Command::Chapters(args) => {
            let book = find(service, args).await?;
            for chapter in service.chapters(&book).await? {
                println!("{}\t{}", chapter.index + 1, chapter.title);
            }
        }
        Command::Refresh(args) => {
            let mut book = find(service, args).await?;
            service.process_book(&mut book).await?;
            println!("{}", service.info(&book));
        }
        Command::Search {
            title,
            writer,
            limit,
            offset,
        } => {
            if title.is_empty() && writer.is_empty() {
                bail!("search needs --title or --writer");
            }
            print_books(&service.query_books(title, writer, *limit, *offset).await?);
        }
        Command::Random { limit } => print_books(&service.random_books(*limit).await?),
        other => bail!("{other:?} does not address a single site"),
    }
    Ok(())
}

async fn find(service: &SiteService, args: &BookArgs) -> Result<Book> {
    service
        .book(args.id, &args.version)
        .await
        .with_context(|| format!("book {} not found on {}", args.id, service.name()))
}

/// One JSON object per line.
fn print_books(books: &[Book]) {
    for book in books {
        println!("{}", book.to_json());
    }
}
