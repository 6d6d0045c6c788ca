//! kittgen - Main entry point
//!
//! Thin CLI shell around the library: parse arguments, initialize logging,
//! dispatch to run or rollback.

use anyhow::{Context, Result};
use kittgen::cli::{Cli, Commands};
use kittgen::context::RunOptions;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Initialize the tracing subscriber with appropriate settings.
fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse_args();

    match cli.command {
        Commands::Run {
            repo,
            countries,
            cluster_id,
            namespace,
            dry_run,
            report,
            on_mismatch,
            keep_going,
            pin_commit,
        } => {
            let mut options = RunOptions::new(countries, cluster_id, namespace);
            options.dry_run = dry_run;
            options.report_path = report;
            options.mismatch_policy = on_mismatch.into();
            options.keep_going = keep_going;
            options.pin_commit = pin_commit;

            let summary = kittgen::run(&repo, options)
                .with_context(|| format!("run failed in {}", repo.display()))?;
            info!(
                files = summary.files_created,
                tasks = summary.tasks_appended,
                "completed successfully"
            );
            if !dry_run {
                kittgen::diff::present_diff(&repo);
            }
        }
        Commands::Rollback { repo } => {
            let summary = kittgen::rollback(&repo)
                .with_context(|| format!("rollback failed in {}", repo.display()))?;
            info!(
                restored = summary.restored,
                deleted = summary.deleted,
                failed = summary.failed,
                "rollback completed"
            );
        }
    }

    Ok(())
}
