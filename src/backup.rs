//! First-write-wins snapshotting and rollback.
//!
//! Every mutation of a pre-existing file goes through [`BackupManager::backup`]
//! first. The snapshot tree under `.kitt-backup/` mirrors repo-relative paths
//! with a `.bak` suffix; the first write to a path in a run wins, so repeated
//! writes within one run keep the pristine content. Snapshots are never
//! pruned, even across run/rollback cycles: a later run will not clobber an
//! earlier snapshot of the same path.
//!
//! Rollback has two independent phases: restore every snapshot onto its live
//! path, then delete every manifest-listed file the run created. Per-entry
//! failures are logged and skipped so a partial rollback still restores as
//! much as possible.

use crate::error::{KittgenError, Result};
use crate::report::RunManifest;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use walkdir::WalkDir;

/// Hidden directory holding snapshots and the run manifest.
pub const BACKUP_DIR: &str = ".kitt-backup";
/// Suffix marking a file as a snapshot.
pub const BACKUP_SUFFIX: &str = ".bak";
/// Manifest filename inside the backup store.
pub const MANIFEST_FILE: &str = "created-files.json";

/// Snapshot writer scoped to one repo root.
#[derive(Debug)]
pub struct BackupManager {
    repo: PathBuf,
}

impl BackupManager {
    pub fn new(repo: &Path) -> Self {
        Self { repo: repo.to_path_buf() }
    }

    pub fn store_root(&self) -> PathBuf {
        self.repo.join(BACKUP_DIR)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.store_root().join(MANIFEST_FILE)
    }

    /// Snapshot `path` before its first mutation. No-op when a snapshot for
    /// the path already exists (first write wins) or the file does not exist
    /// yet (creations are covered by the manifest, not backups).
    pub fn backup(&self, path: &Path) -> Result<()> {
        if !path.exists() {
            return Ok(());
        }
        let rel = path.strip_prefix(&self.repo).map_err(|_| {
            KittgenError::general(format!(
                "{} is outside the repo root {}",
                path.display(),
                self.repo.display()
            ))
        })?;
        let mut backup_path = self.store_root().join(rel);
        append_suffix(&mut backup_path);
        if backup_path.exists() {
            return Ok(());
        }
        if let Some(parent) = backup_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(path, &backup_path)?;
        info!(path = %rel.display(), "backed up");
        Ok(())
    }
}

/// Outcome counters of a rollback, for logging and assertions.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RollbackSummary {
    pub restored: usize,
    pub deleted: usize,
    pub failed: usize,
}

/// Undo every filesystem side effect of previous runs against `repo`.
///
/// Fails only when there is no backup store at all; individual entry
/// failures are logged and counted, never fatal.
pub fn rollback(repo: &Path) -> Result<RollbackSummary> {
    let store = repo.join(BACKUP_DIR);
    if !store.is_dir() {
        return Err(KittgenError::rollback(format!(
            "no backup store found under {}",
            repo.display()
        )));
    }

    let mut summary = RollbackSummary::default();

    // Phase 1: restore snapshots onto their live paths.
    for walk_entry in WalkDir::new(&store) {
        let walk_entry = match walk_entry {
            Ok(e) => e,
            Err(err) => {
                error!(%err, "skipping unreadable backup entry");
                summary.failed += 1;
                continue;
            }
        };
        if !walk_entry.file_type().is_file() {
            continue;
        }
        let backup_path = walk_entry.path();
        let Some(name) = backup_path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(original_name) = name.strip_suffix(BACKUP_SUFFIX) else {
            // The manifest and anything else without the suffix is not a snapshot.
            continue;
        };
        let rel = match backup_path.strip_prefix(&store) {
            Ok(rel) => rel.with_file_name(original_name),
            Err(_) => continue,
        };
        let live = repo.join(&rel);
        if let Err(err) = restore_one(backup_path, &live) {
            error!(path = %live.display(), %err, "failed to restore");
            summary.failed += 1;
        } else {
            info!(path = %rel.display(), "restored");
            summary.restored += 1;
        }
    }

    // Phase 2: delete files the run created.
    let manifest_path = store.join(MANIFEST_FILE);
    if manifest_path.exists() {
        match RunManifest::load(&manifest_path) {
            Ok(manifest) => {
                for rel in manifest.paths() {
                    let live = repo.join(rel);
                    if !live.exists() {
                        info!(path = %rel, "nothing to restore, already removed");
                        continue;
                    }
                    match fs::remove_file(&live) {
                        Ok(()) => {
                            info!(path = %rel, "deleted created file");
                            summary.deleted += 1;
                        }
                        Err(err) => {
                            error!(path = %rel, %err, "failed to delete created file");
                            summary.failed += 1;
                        }
                    }
                }
            }
            Err(err) => {
                error!(%err, "manifest unreadable, created files not removed");
                summary.failed += 1;
            }
        }
    }

    if summary.failed > 0 {
        warn!(
            restored = summary.restored,
            deleted = summary.deleted,
            failed = summary.failed,
            "rollback completed with failures"
        );
    } else {
        info!(
            restored = summary.restored,
            deleted = summary.deleted,
            "rollback completed"
        );
    }
    Ok(summary)
}

fn restore_one(backup_path: &Path, live: &Path) -> Result<()> {
    if let Some(parent) = live.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(backup_path, live)?;
    Ok(())
}

fn append_suffix(path: &mut PathBuf) {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(BACKUP_SUFFIX);
    path.set_file_name(name);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_first_write_wins() {
        let dir = tempfile::tempdir().expect("tempdir");
        let repo = dir.path();
        let file = repo.join("svc-a").join("kitt.yml");
        fs::create_dir_all(file.parent().expect("parent")).expect("mkdir");
        fs::write(&file, "pristine\n").expect("write");

        let manager = BackupManager::new(repo);
        manager.backup(&file).expect("first backup");

        // Mutate and back up again: the snapshot must keep pristine content.
        fs::write(&file, "mutated\n").expect("overwrite");
        manager.backup(&file).expect("second backup");

        let snapshot = repo.join(BACKUP_DIR).join("svc-a").join("kitt.yml.bak");
        assert_eq!(fs::read_to_string(snapshot).expect("read"), "pristine\n");
    }

    #[test]
    fn test_backup_of_missing_file_is_noop() {
        let dir = tempfile::tempdir().expect("tempdir");
        let manager = BackupManager::new(dir.path());
        manager
            .backup(&dir.path().join("absent.yml"))
            .expect("no-op backup");
        assert!(!dir.path().join(BACKUP_DIR).exists());
    }

    #[test]
    fn test_rollback_without_store_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = rollback(dir.path()).expect_err("no store");
        assert!(matches!(err, KittgenError::Rollback(_)));
    }

    #[test]
    fn test_rollback_restores_and_deletes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let repo = dir.path();
        let svc = repo.join("svc-a");
        fs::create_dir_all(&svc).expect("mkdir");

        let pipeline = svc.join("kitt.yml");
        fs::write(&pipeline, "build:\n").expect("write");

        let manager = BackupManager::new(repo);
        manager.backup(&pipeline).expect("backup");
        fs::write(&pipeline, "build:\n  mutated: yes\n").expect("mutate");

        let created = svc.join("kitt.jp.primary.yml");
        fs::write(&created, "namespace: jp\n").expect("create");
        let mut manifest = RunManifest::new();
        manifest.push("svc-a/kitt.jp.primary.yml");
        manifest.save(&manager.manifest_path()).expect("manifest");

        let summary = rollback(repo).expect("rollback");
        assert_eq!(summary.restored, 1);
        assert_eq!(summary.deleted, 1);
        assert_eq!(summary.failed, 0);
        assert_eq!(fs::read_to_string(&pipeline).expect("read"), "build:\n");
        assert!(!created.exists());

        // Second rollback: snapshot restored again, nothing left to delete.
        let summary = rollback(repo).expect("second rollback");
        assert_eq!(summary.restored, 1);
        assert_eq!(summary.deleted, 0);
        assert_eq!(summary.failed, 0);
    }
}
