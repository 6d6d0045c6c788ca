//! External diff presenter.
//!
//! After a successful non-dry run, the operator reviews the result as a
//! working-tree diff. This is a side effect only: a missing `git` binary or
//! a non-zero exit is logged, never fatal, and the core engine never depends
//! on it.

use std::path::Path;
use std::process::Command;
use tracing::warn;

/// Show the working-tree diff of `repo` on the inherited terminal.
pub fn present_diff(repo: &Path) {
    match Command::new("git").arg("diff").current_dir(repo).status() {
        Ok(status) if !status.success() => {
            warn!(%status, "git diff exited with failure");
        }
        Ok(_) => {}
        Err(err) => warn!(%err, "could not launch git diff"),
    }
}
