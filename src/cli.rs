//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Default configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "novelcrawl.yaml";

/// Discover, refresh and archive serialized web novels.
///
/// Every command runs against the sites selected with `--site` (all
/// configured sites by default).
#[derive(Parser, Debug)]
#[command(name = "novelcrawl")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the YAML configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH, global = true)]
    pub config: PathBuf,

    /// Site to operate on (repeatable)
    #[arg(short, long = "site", global = true)]
    pub sites: Vec<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// Sub-commands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run every stage: availability, explore, end sweep, update, download, patches
    Process,
    /// Discover new ids and retry failed ones
    Explore,
    /// Refresh metadata of every known book
    Update,
    /// Re-evaluate finished/in-progress status of every book
    Validate,
    /// Download every finished book not stored yet
    Download,
    /// Align download flags with the files on disk
    PatchStatus,
    /// Explore ids below the largest known one that have no record
    PatchMissing,
    /// Print the site summary as JSON
    Stats,
    /// Print one book as JSON
    Info(BookArgs),
    /// Print the stored text of one book
    Content(BookArgs),
    /// List the chapter titles of one stored book
    Chapters(BookArgs),
    /// Update, validate and download a single book
    Refresh(BookArgs),
    /// Search books by title or writer substring
    Search {
        /// Title substring
        #[arg(long, default_value = "")]
        title: String,
        /// Writer substring
        #[arg(long, default_value = "")]
        writer: String,
        /// Maximum number of results
        #[arg(long, default_value_t = 20, value_parser = clap::value_parser!(i64).range(1..=1000))]
        limit: i64,
        /// Number of results to skip
        #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(i64).range(0..))]
        offset: i64,
    },
    /// Print random downloaded books
    Random {
        /// Maximum number of results
        #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(i64).range(1..=1000))]
        limit: i64,
    },
    /// Snapshot the database
    Backup {
        /// Target directory (defaults to the site's backup_dir)
        #[arg(long)]
        dir: Option<PathBuf>,
    },
}

impl Command {
    /// Commands addressing a single book or printing query results run
    /// against exactly one site.
    #[must_use]
    pub fn is_single_site(&self) -> bool {
        matches!(
            self,
            Self::Info(_)
                | Self::Content(_)
                | Self::Chapters(_)
                | Self::Refresh(_)
                | Self::Search { .. }
                | Self::Random { .. }
        )
    }
}

/// Selects one book record.
#[derive(clap::Args, Debug, Clone, PartialEq, Eq)]
pub struct BookArgs {
    /// Book id
    pub id: i64,

    /// Base-36 version; the current record when omitted
    #[arg(long, default_value = "")]
    pub version: String,
}
