use crate::rules::MismatchPolicy;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// kittgen - clone Kitt deployment descriptors per market
#[derive(Parser)]
#[command(name = "kittgen")]
#[command(about = "Fan out Kitt deployment descriptors per market, with backup and rollback")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate market descriptors and register them in the pipeline
    Run {
        /// Repository root to traverse
        #[arg(long)]
        repo: PathBuf,

        /// Comma-separated market/country codes (e.g. jp,de)
        #[arg(long, value_delimiter = ',', required = true, value_parser = country_code)]
        countries: Vec<String>,

        /// Cluster id written into every generated descriptor
        #[arg(long)]
        cluster_id: String,

        /// Namespace written into every generated descriptor
        #[arg(long)]
        namespace: String,

        /// Dry-run mode: compute mutations and the change report without
        /// touching the filesystem.
        #[arg(long)]
        dry_run: bool,

        /// Change report output path
        #[arg(long, default_value = "kitt-change-report.json")]
        report: PathBuf,

        /// What to do with a matched field whose value has an unexpected shape
        #[arg(long, value_enum, default_value_t = MismatchArg::Skip)]
        on_mismatch: MismatchArg,

        /// Keep traversing after a directory fails instead of aborting
        #[arg(long)]
        keep_going: bool,

        /// Emit commit/branch template placeholders on appended tasks
        #[arg(long)]
        pin_commit: bool,
    },
    /// Undo every filesystem side effect of previous runs
    Rollback {
        /// Repository root holding the backup store
        #[arg(long)]
        repo: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MismatchArg {
    /// Log a warning and leave the field untouched
    Skip,
    /// Replace the field unconditionally
    Overwrite,
}

/// Trim one comma-separated code; `"jp, de"` must yield `de`, not `" de"`.
fn country_code(raw: &str) -> Result<String, String> {
    let code = raw.trim();
    if code.is_empty() {
        return Err("country code is empty".to_string());
    }
    Ok(code.to_string())
}

impl From<MismatchArg> for MismatchPolicy {
    fn from(arg: MismatchArg) -> Self {
        match arg {
            MismatchArg::Skip => MismatchPolicy::Skip,
            MismatchArg::Overwrite => MismatchPolicy::Overwrite,
        }
    }
}

impl Cli {
    pub fn parse_args() -> Self {
        <Self as clap::Parser>::parse()
    }
}
