//! CLI command handlers.

mod batch;
mod book;

use anyhow::Result;
use serde::Serialize;

pub use batch::run_batch_command;
pub use book::run_book_command;

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
