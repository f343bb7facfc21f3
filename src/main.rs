//! CLI entry point for novelcrawl.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result, bail};
use clap::Parser;
use novelcrawl_core::{Config, Database, SiteService, SqliteBookRepository};
use tracing::{debug, info, warn};

mod cli;
mod commands;

use cli::{Args, Command};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    // stdout carries command output
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    let config = Config::load(&args.config)
        .with_context(|| format!("failed to load config {}", args.config.display()))?;
    let sites = select_sites(&config, &args.sites, &args.command)?;

    if let Some(parent) = config.database.path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }
    let db = Database::new(&config.database.path)
        .await
        .with_context(|| format!("failed to open database {}", config.database.path.display()))?;

    let interrupt = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&interrupt);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, letting in-flight books finish");
            flag.store(true, Ordering::SeqCst);
        }
    });

    let result = run(&args.command, &config, &db, &sites, &interrupt).await;
    db.close().await;
    result
}

async fn run(
    command: &Command,
    config: &Config,
    db: &Database,
    sites: &[String],
    interrupt: &Arc<AtomicBool>,
) -> Result<()> {
    for name in sites {
        if interrupt.load(Ordering::SeqCst) {
            warn!(site = %name, "Interrupted, skipping remaining sites");
            break;
        }

        let site_config = config
            .site(name)
            .with_context(|| format!("unknown site `{name}`"))?
            .clone();
        let repo = Arc::new(SqliteBookRepository::new(db.clone(), name.as_str()));
        let service = SiteService::new(name.as_str(), site_config, repo)
            .with_context(|| format!("failed to set up site `{name}`"))?
            .with_interrupt(Arc::clone(interrupt));

        info!(site = %name, ?command, "Running command");
        if command.is_single_site() {
            commands::run_book_command(&service, command).await?;
        } else {
            commands::run_batch_command(&service, command).await?;
        }
    }
    Ok(())
}

/// Resolves `--site` flags against the config. No flags selects every site.
fn select_sites(config: &Config, requested: &[String], command: &Command) -> Result<Vec<String>> {
    let mut sites: Vec<String> = Vec::new();
    if requested.is_empty() {
        sites.extend(config.sites.keys().cloned());
    } else {
        for name in requested {
            if config.site(name).is_none() {
                bail!("unknown site `{name}`");
            }
            if !sites.contains(name) {
                sites.push(name.clone());
            }
        }
    }

    if command.is_single_site() && sites.len() != 1 {
        bail!("this command reads a single site; select one with --site");
    }
    Ok(sites)
}
