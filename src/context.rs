//! Per-run state and options.
//!
//! The audit log and created-file list live in an explicit [`RunContext`]
//! threaded through every call, so runs are isolated and testable. All
//! filesystem writes funnel through the context: that is where the backup
//! interceptor and the dry-run switch sit.

use crate::backup::BackupManager;
use crate::error::{KittgenError, Result};
use crate::report::{ChangeReport, RunManifest};
use crate::rules::MismatchPolicy;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Everything a run is parameterized by.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Target market/country codes, in the order files and tasks are emitted.
    pub countries: Vec<String>,
    pub cluster_id: String,
    pub namespace: String,
    /// Compute mutations and the report, but write nothing.
    pub dry_run: bool,
    pub mismatch_policy: MismatchPolicy,
    /// Continue past a failed directory instead of aborting the run.
    pub keep_going: bool,
    /// Emit commit/branch template placeholders on appended pipeline tasks.
    pub pin_commit: bool,
    /// Change report output path.
    pub report_path: PathBuf,
}

impl RunOptions {
    pub fn new(
        countries: Vec<String>,
        cluster_id: impl Into<String>,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            countries,
            cluster_id: cluster_id.into(),
            namespace: namespace.into(),
            dry_run: false,
            mismatch_policy: MismatchPolicy::default(),
            keep_going: false,
            pin_commit: false,
            report_path: PathBuf::from("kitt-change-report.json"),
        }
    }
}

/// Mutable state of one run: audit log, manifest, backup interceptor.
#[derive(Debug)]
pub struct RunContext {
    pub repo: PathBuf,
    pub options: RunOptions,
    pub report: ChangeReport,
    pub manifest: RunManifest,
    backup: BackupManager,
}

impl RunContext {
    pub fn new(repo: &Path, mut options: RunOptions) -> Result<Self> {
        if !repo.is_dir() {
            return Err(KittgenError::validation(format!(
                "{} is not a directory",
                repo.display()
            )));
        }
        if options.countries.is_empty() {
            return Err(KittgenError::validation("no target countries given"));
        }
        // Codes feed directly into filenames and task references, so stray
        // whitespace must never survive.
        for code in &mut options.countries {
            *code = code.trim().to_string();
        }
        if options.countries.iter().any(|c| c.is_empty()) {
            return Err(KittgenError::validation("empty country code"));
        }
        Ok(Self {
            repo: repo.to_path_buf(),
            options,
            report: ChangeReport::new(),
            manifest: RunManifest::new(),
            backup: BackupManager::new(repo),
        })
    }

    /// Repo-relative form of `path`, for manifests and log lines.
    pub fn rel(&self, path: &Path) -> String {
        path.strip_prefix(&self.repo)
            .unwrap_or(path)
            .to_string_lossy()
            .into_owned()
    }

    /// Create a file that did not exist before the run. Recorded in the
    /// manifest, never backed up. Suppressed entirely in dry-run: no write,
    /// no manifest entry.
    pub fn create_file(&mut self, path: &Path, content: &str) -> Result<()> {
        let rel = self.rel(path);
        if self.options.dry_run {
            info!(file = %rel, "[dry-run] would create");
            return Ok(());
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        self.manifest.push(rel);
        Ok(())
    }

    /// Overwrite a pre-existing file, snapshotting it first (first write
    /// wins). Suppressed entirely in dry-run.
    pub fn write_existing(&mut self, path: &Path, content: &str) -> Result<()> {
        let rel = self.rel(path);
        if self.options.dry_run {
            info!(file = %rel, "[dry-run] would write");
            return Ok(());
        }
        self.backup.backup(path)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// End-of-run persistence: the manifest (unless dry-run or empty) and
    /// the change report (in dry-run too, it is the preview).
    ///
    /// A manifest left by an earlier run is extended, not replaced, so a
    /// later rollback still covers every file any run created.
    pub fn finish(&self) -> Result<()> {
        if !self.options.dry_run && !self.manifest.is_empty() {
            let manifest_path = self.backup.manifest_path();
            let mut merged = if manifest_path.exists() {
                RunManifest::load(&manifest_path)?
            } else {
                RunManifest::new()
            };
            for path in self.manifest.paths() {
                if !merged.paths().contains(path) {
                    merged.push(path.clone());
                }
            }
            merged.save(&manifest_path)?;
        }
        self.report.flush(&self.options.report_path)?;
        Ok(())
    }
}
