//! Deployment task registration in the per-directory pipeline descriptor.
//!
//! Appends one `deployApp` task per generated file to `build.postBuild` in
//! the directory's `kitt.yml`, deduplicated by `kittFilePath` so repeated
//! runs never duplicate entries. The write-back goes through the document
//! model, so untouched lines of the descriptor keep their formatting.

use crate::catalog::PIPELINE_DESCRIPTOR;
use crate::context::RunContext;
use crate::error::{KittgenError, Result};
use crate::rules::MismatchPolicy;
use crate::yaml::{self, Mapping, Node, QuoteStyle, Scalar, SeqStyle, Sequence};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Register `created` files (in order) in `dir`'s pipeline descriptor.
/// A directory without a descriptor is a no-op, not an error. Returns the
/// number of tasks actually appended.
pub fn register(dir: &Path, created: &[String], ctx: &mut RunContext) -> Result<usize> {
    let pipeline = dir.join(PIPELINE_DESCRIPTOR);
    if !pipeline.exists() {
        debug!(dir = %dir.display(), "no pipeline descriptor, skipping registration");
        return Ok(0);
    }

    let text = fs::read_to_string(&pipeline)?;
    let mut doc = yaml::parse(&text).map_err(|e| KittgenError::parse(&pipeline, e))?;

    let policy = ctx.options.mismatch_policy;
    let pin_commit = ctx.options.pin_commit;
    let dir_name = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let Some(root) = doc.root_mapping_mut() else {
        warn!(file = %pipeline.display(), "descriptor root is not a mapping, skipping");
        return Ok(0);
    };
    if !ensure_mapping(root, "build", policy) {
        warn!(file = %pipeline.display(), "'build' is not a mapping, skipping");
        return Ok(0);
    }
    let Some(build) = root.get_mut("build").and_then(Node::as_mapping_mut) else {
        return Ok(0);
    };
    if !ensure_sequence(build, "postBuild", policy) {
        warn!(file = %pipeline.display(), "'build.postBuild' is not a sequence, skipping");
        return Ok(0);
    }
    let Some(tasks) = build.get_mut("postBuild").and_then(Node::as_sequence_mut) else {
        return Ok(0);
    };

    let existing: HashSet<String> = tasks
        .nodes()
        .filter_map(Node::as_mapping)
        .filter_map(|m| m.get("task"))
        .filter_map(Node::as_mapping)
        .filter_map(|t| t.get("kittFilePath"))
        .filter_map(Node::as_scalar)
        .map(|s| s.text.clone())
        .collect();

    let mut appended = 0;
    for file in created {
        let reference = format!("{dir_name}/{file}");
        if existing.contains(&reference) {
            debug!(%reference, "task already registered");
            continue;
        }
        tasks.push(deploy_task(&reference, pin_commit));
        appended += 1;
    }

    if appended == 0 {
        return Ok(0);
    }
    ctx.write_existing(&pipeline, &doc.to_string())?;
    Ok(appended)
}

/// Make sure `map[key]` exists and is a mapping. An absent key or an empty
/// value is created; returns false when the key holds another shape and
/// policy says leave it alone.
fn ensure_mapping(map: &mut Mapping, key: &str, policy: MismatchPolicy) -> bool {
    match map.get_mut(key) {
        None => {
            map.insert(key, Node::Mapping(Mapping::new()));
            true
        }
        Some(Node::Mapping(_)) => true,
        Some(slot @ Node::Scalar(_)) if is_empty_scalar(slot) => {
            *slot = Node::Mapping(Mapping::new());
            true
        }
        Some(other) => match policy {
            MismatchPolicy::Skip => false,
            MismatchPolicy::Overwrite => {
                *other = Node::Mapping(Mapping::new());
                true
            }
        },
    }
}

/// Make sure `map[key]` exists and is a block sequence. An empty value
/// (`postBuild:` with nothing under it) counts as an empty list.
fn ensure_sequence(map: &mut Mapping, key: &str, policy: MismatchPolicy) -> bool {
    match map.get_mut(key) {
        None => {
            map.insert(key, Node::Sequence(Sequence::new(SeqStyle::Block)));
            true
        }
        Some(Node::Sequence(_)) => true,
        Some(slot @ Node::Scalar(_)) if is_empty_scalar(slot) => {
            *slot = Node::Sequence(Sequence::new(SeqStyle::Block));
            true
        }
        Some(other) => match policy {
            MismatchPolicy::Skip => false,
            MismatchPolicy::Overwrite => {
                *other = Node::Sequence(Sequence::new(SeqStyle::Block));
                true
            }
        },
    }
}

fn is_empty_scalar(node: &Node) -> bool {
    node.as_scalar().map(crate::yaml::Scalar::is_empty).unwrap_or(false)
}

/// Build one `- task:` entry for the post-build list.
fn deploy_task(reference: &str, pin_commit: bool) -> Node {
    let mut task = Mapping::new();
    task.insert("name", Node::scalar("deployApp"));
    task.insert("kittFilePath", Node::scalar(reference));
    if pin_commit {
        task.insert("commitId", template_placeholder("{{COMMIT_ID}}"));
        task.insert("branch", template_placeholder("{{BRANCH}}"));
    }
    task.insert("sync", Node::scalar("false"));
    task.insert("executionScope", Node::scalar("child"));

    let mut wrapper = Mapping::new();
    wrapper.insert("task", Node::Mapping(task));
    Node::Mapping(wrapper)
}

fn template_placeholder(text: &str) -> Node {
    // `{{` opens a flow mapping in YAML, so placeholders must be quoted.
    Node::Scalar(Scalar { text: text.to_string(), quote: QuoteStyle::Single })
}
