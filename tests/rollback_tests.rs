//! Rollback behavior after real runs.

use kittgen::{rollback, run, RunOptions};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const TEMPLATE: &str = "\
namespace: app-us
deploy:
  cluster_id: [uswm-a]
  labels:
    ccm.country: us
";

const PIPELINE: &str = "\
build:
  buildType: docker
  postBuild:
    - task:
        name: lint
";

fn setup_repo() -> TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    let svc = dir.path().join("svc-a");
    fs::create_dir(&svc).expect("mkdir");
    fs::write(svc.join("kitt.us-wm.primary.yml"), TEMPLATE).expect("template");
    fs::write(svc.join("kitt.yml"), PIPELINE).expect("pipeline");
    dir
}

fn options(repo: &Path) -> RunOptions {
    let mut options = RunOptions::new(vec!["jp".into()], "77", "app-mkt");
    options.report_path = repo.join("kitt-change-report.json");
    options
}

#[test]
fn test_rollback_restores_mutated_files_byte_for_byte() {
    let repo = setup_repo();
    let svc = repo.path().join("svc-a");

    run(repo.path(), options(repo.path())).expect("run");
    assert_ne!(
        fs::read_to_string(svc.join("kitt.yml")).expect("read"),
        PIPELINE
    );

    let summary = rollback(repo.path()).expect("rollback");
    assert_eq!(summary.restored, 1);
    assert_eq!(summary.deleted, 1);
    assert_eq!(summary.failed, 0);

    assert_eq!(
        fs::read_to_string(svc.join("kitt.yml")).expect("read"),
        PIPELINE
    );
    assert!(!svc.join("kitt.jp.primary.yml").exists());
}

#[test]
fn test_rollback_twice_is_safe() {
    let repo = setup_repo();
    run(repo.path(), options(repo.path())).expect("run");

    rollback(repo.path()).expect("first rollback");
    let summary = rollback(repo.path()).expect("second rollback");
    // Snapshots restore again harmlessly; created files are already gone.
    assert_eq!(summary.deleted, 0);
    assert_eq!(summary.failed, 0);
}

#[test]
fn test_rollback_without_backup_store_errors() {
    let repo = tempfile::tempdir().expect("tempdir");
    assert!(rollback(repo.path()).is_err());
}

#[test]
fn test_rollback_survives_a_manually_deleted_clone() {
    let repo = setup_repo();
    let svc = repo.path().join("svc-a");
    run(repo.path(), options(repo.path())).expect("run");

    fs::remove_file(svc.join("kitt.jp.primary.yml")).expect("remove clone");

    let summary = rollback(repo.path()).expect("rollback");
    assert_eq!(summary.restored, 1);
    assert_eq!(summary.deleted, 0);
    assert_eq!(summary.failed, 0);
}

#[test]
fn test_backup_preserves_the_first_snapshot_across_runs() {
    let repo = setup_repo();
    let svc = repo.path().join("svc-a");

    run(repo.path(), options(repo.path())).expect("first run");

    // A later run against new markets mutates the pipeline again, but the
    // snapshot still holds the pristine content from before the first run.
    let mut opts = options(repo.path());
    opts.countries = vec!["fr".into()];
    run(repo.path(), opts).expect("second run");

    let summary = rollback(repo.path()).expect("rollback");
    assert_eq!(
        fs::read_to_string(svc.join("kitt.yml")).expect("read"),
        PIPELINE
    );
    // The manifest accumulated across runs, so both clones are reversed.
    assert_eq!(summary.deleted, 2);
    assert!(!svc.join("kitt.jp.primary.yml").exists());
    assert!(!svc.join("kitt.fr.primary.yml").exists());
}
