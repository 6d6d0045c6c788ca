//! Audit artifacts of a run: the change report and the run manifest.
//!
//! Both are JSON files. The change report is purely observational — dedup
//! and rollback never read it — while the manifest is what rollback uses to
//! reverse file creation.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

/// One audited field rewrite: which file, which rule, old and new value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub file: String,
    pub field: String,
    pub old: String,
    pub new: String,
}

/// Append-only collection of [`ChangeRecord`]s for one run.
#[derive(Debug, Default)]
pub struct ChangeReport {
    records: Vec<ChangeRecord>,
}

impl ChangeReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(
        &mut self,
        file: impl Into<String>,
        field: impl Into<String>,
        old: impl Into<String>,
        new: impl Into<String>,
    ) {
        self.records.push(ChangeRecord {
            file: file.into(),
            field: field.into(),
            old: old.into(),
            new: new.into(),
        });
    }

    pub fn records(&self) -> &[ChangeRecord] {
        &self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Write the report as pretty JSON. No-op when nothing was recorded.
    pub fn flush(&self, path: &Path) -> Result<()> {
        if self.records.is_empty() {
            return Ok(());
        }
        let json = serde_json::to_string_pretty(&self.records)?;
        fs::write(path, json)?;
        info!(path = %path.display(), records = self.records.len(), "change report written");
        Ok(())
    }
}

/// Repo-relative paths of files newly created by a run, in creation order.
///
/// Distinct from the backup store: backups cover mutated pre-existing files,
/// the manifest covers files that did not exist before the run.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct RunManifest {
    paths: Vec<String>,
}

impl RunManifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, rel_path: impl Into<String>) {
        self.paths.push(rel_path.into());
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.paths)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        let paths: Vec<String> = serde_json::from_str(&json)?;
        Ok(Self { paths })
    }
}
