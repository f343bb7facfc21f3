//! Site-wide commands: lifecycle stages, stats and backup.

use anyhow::{Result, bail};
use novelcrawl_core::{BatchReport, SiteService};
use serde::Serialize;
use serde_json::json;
use tracing::info;

use super::print_json;
use crate::cli::Command;

#[derive(Serialize)]
struct StageOutput<'a> {
    site: &'a str,
    stage: &'static str,
    #[serde(flatten)]
    report: BatchReport,
}

pub async fn run_batch_command(service: &SiteService, command: &Command) -> Result<()> {
    let site = service.name();

    let (stage, report) = match command {
        Command::Process => {
            let report = service.process().await?;
            return print_json(&json!({ "site": site, "process": report }));
        }
        Command::Stats => {
            let summary = service.stats().await?;
            return print_json(&json!({ "site": site, "summary": summary }));
        }
        Command::Backup { dir } => {
            let path = service.backup(dir.as_deref()).await?;
            info!(site, path = %path.display(), "backup written");
            println!("{}", path.display());
            return Ok(());
        }
        Command::Validate => {
            let ended = service.validate_end().await?;
            let report = service.validate().await?;
            return print_json(&json!({ "site": site, "ended": ended, "validate": report }));
        }
        Command::Explore => ("explore", service.explore().await?),
        Command::Update => ("update", service.update().await?),
        Command::Download => ("download", service.download().await?),
        Command::PatchStatus => ("patch-status", service.patch_download_status().await?),
        Command::PatchMissing => ("patch-missing", service.patch_missing_records().await?),
        other => bail!("{other:?} does not run site-wide"),
    };

    print_json(&StageOutput {
        site,
        stage,
        report,
    })
}
