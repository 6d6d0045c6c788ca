//! Whole-repo traversal and run orchestration.
//!
//! Walks the repository, treats every directory holding at least one
//! template as a unit of work (generate, then register), and persists the
//! manifest and the change report at the end. A directory failure aborts the
//! run unless `keep_going` is set.

use crate::backup::BACKUP_DIR;
use crate::context::{RunContext, RunOptions};
use crate::error::Result;
use crate::generator::{self, MarkerSubstitution, NamingStrategy};
use crate::registrar;
use std::path::{Path, PathBuf};
use tracing::{error, info};
use walkdir::WalkDir;

/// Outcome counters of one run.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub directories: usize,
    pub files_created: usize,
    pub tasks_appended: usize,
}

/// Execute a full run against `repo` with the default naming strategy.
pub fn run(repo: &Path, options: RunOptions) -> Result<RunSummary> {
    run_with_naming(repo, options, &MarkerSubstitution)
}

/// Execute a full run with an injected naming strategy.
pub fn run_with_naming(
    repo: &Path,
    options: RunOptions,
    naming: &dyn NamingStrategy,
) -> Result<RunSummary> {
    let mut ctx = RunContext::new(repo, options)?;
    let mut summary = RunSummary::default();

    // Collect work units before writing anything, so freshly created files
    // never feed back into the same traversal.
    for dir in work_dirs(repo) {
        match process_dir(&dir, &mut ctx, naming) {
            Ok((files, tasks)) => {
                if files > 0 {
                    summary.directories += 1;
                    summary.files_created += files;
                    summary.tasks_appended += tasks;
                }
            }
            Err(err) if ctx.options.keep_going => {
                error!(dir = %dir.display(), %err, "directory failed, continuing");
            }
            Err(err) => {
                // Files created before the failure must still reach the
                // manifest, or a later rollback cannot remove them.
                if let Err(persist_err) = ctx.finish() {
                    error!(%persist_err, "failed to persist run artifacts after abort");
                }
                return Err(err);
            }
        }
    }

    ctx.finish()?;
    info!(
        directories = summary.directories,
        files = summary.files_created,
        tasks = summary.tasks_appended,
        dry_run = ctx.options.dry_run,
        "run completed"
    );
    Ok(summary)
}

fn process_dir(
    dir: &Path,
    ctx: &mut RunContext,
    naming: &dyn NamingStrategy,
) -> Result<(usize, usize)> {
    let created = generator::generate_dir(dir, ctx, naming)?;
    if created.is_empty() {
        return Ok((0, 0));
    }
    let appended = registrar::register(dir, &created, ctx)?;
    Ok((created.len(), appended))
}

/// All directories under `repo` in deterministic order, skipping the backup
/// store and hidden trees like `.git`.
fn work_dirs(repo: &Path) -> Vec<PathBuf> {
    WalkDir::new(repo)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name().to_string_lossy().as_ref()))
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir())
        .map(|e| e.into_path())
        .collect()
}

fn is_hidden(name: &str) -> bool {
    name.starts_with('.') || name == BACKUP_DIR
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_work_dirs_skip_backup_store_and_git() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::create_dir(dir.path().join("svc-a")).expect("mkdir");
        fs::create_dir(dir.path().join(BACKUP_DIR)).expect("mkdir");
        fs::create_dir(dir.path().join(".git")).expect("mkdir");

        let dirs = work_dirs(dir.path());
        assert!(dirs.iter().any(|d| d.ends_with("svc-a")));
        assert!(!dirs.iter().any(|d| d.ends_with(BACKUP_DIR)));
        assert!(!dirs.iter().any(|d| d.ends_with(".git")));
    }

    #[test]
    fn test_keep_going_survives_a_broken_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let bad = dir.path().join("svc-bad");
        let good = dir.path().join("svc-good");
        fs::create_dir(&bad).expect("mkdir");
        fs::create_dir(&good).expect("mkdir");
        // Healthy template, but a pipeline descriptor that does not parse.
        fs::write(bad.join("kitt.us-wm.primary.yml"), "namespace: a\n").expect("fixture");
        fs::write(bad.join("kitt.yml"), "build: [unclosed\n").expect("fixture");
        fs::write(good.join("kitt.us-wm.primary.yml"), "namespace: a\n").expect("fixture");

        let mut options = RunOptions::new(vec!["jp".into()], "77", "ns");
        options.keep_going = true;
        let summary = run(dir.path(), options).expect("run");

        assert!(good.join("kitt.jp.primary.yml").exists());
        // The broken directory failed after generation, so only the healthy
        // one counts as completed.
        assert_eq!(summary.directories, 1);
    }

    #[test]
    fn test_abort_still_persists_the_manifest() {
        let dir = tempfile::tempdir().expect("tempdir");
        let good = dir.path().join("svc-a");
        let bad = dir.path().join("svc-b");
        fs::create_dir(&good).expect("mkdir");
        fs::create_dir(&bad).expect("mkdir");
        fs::write(good.join("kitt.us-wm.primary.yml"), "namespace: a\n").expect("fixture");
        fs::write(bad.join("kitt.us-wm.primary.yml"), "namespace: a\n").expect("fixture");
        fs::write(bad.join("kitt.yml"), "build: [unclosed\n").expect("fixture");

        let mut options = RunOptions::new(vec!["jp".into()], "77", "ns");
        options.report_path = dir.path().join("report.json");
        assert!(run(dir.path(), options).is_err());
        assert!(good.join("kitt.jp.primary.yml").exists());

        // Everything created before the abort is reversible.
        let summary = crate::backup::rollback(dir.path()).expect("rollback");
        assert_eq!(summary.deleted, 2);
        assert!(!good.join("kitt.jp.primary.yml").exists());
        assert!(!bad.join("kitt.jp.primary.yml").exists());
    }

    #[test]
    fn test_broken_directory_aborts_by_default() {
        let dir = tempfile::tempdir().expect("tempdir");
        let bad = dir.path().join("svc-bad");
        fs::create_dir(&bad).expect("mkdir");
        fs::write(bad.join("kitt.us-wm.primary.yml"), "namespace: a\n").expect("fixture");
        fs::write(bad.join("kitt.yml"), "build: [unclosed\n").expect("fixture");

        let options = RunOptions::new(vec!["jp".into()], "77", "ns");
        assert!(run(dir.path(), options).is_err());
    }
}
