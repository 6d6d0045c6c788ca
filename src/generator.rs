//! Per-market template fan-out.
//!
//! For every discovered template and every target market not yet
//! materialized: compute the destination name, deep-clone the template tree,
//! run the rule engine, and write through the run context. A destination
//! that already exists is skipped, which is what makes generation idempotent
//! across repeated runs.

use crate::catalog::{self, CELL_TOKEN, PRODUCT_PREFIX, REGION_MARKER};
use crate::context::RunContext;
use crate::error::Result;
use crate::rules::{apply_rules, market_rules};
use crate::yaml;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Maps a template filename and a target key to a destination filename.
pub trait NamingStrategy {
    fn destination(&self, template: &str, key: &str) -> String;
}

/// Default strategy: substitute the cell placeholder and the region marker
/// with the target key; with neither marker present, fall back to the
/// canonical `kitt.<key>.<suffix>` form.
pub struct MarkerSubstitution;

impl NamingStrategy for MarkerSubstitution {
    fn destination(&self, template: &str, key: &str) -> String {
        let dest = template
            .replace(CELL_TOKEN, key)
            .replace(REGION_MARKER, key);
        if dest != template {
            return dest;
        }
        let suffix = template
            .strip_prefix("kitt.")
            .unwrap_or(template);
        format!("{PRODUCT_PREFIX}.{key}.{suffix}")
    }
}

/// Generate market files for one directory. Returns the generated filenames
/// in catalog order (templates sorted, target keys in request order) for the
/// registrar.
pub fn generate_dir(
    dir: &Path,
    ctx: &mut RunContext,
    naming: &dyn NamingStrategy,
) -> Result<Vec<String>> {
    let countries = ctx.options.countries.clone();
    let cluster_id = ctx.options.cluster_id.clone();
    let namespace = ctx.options.namespace.clone();
    let policy = ctx.options.mismatch_policy;

    let mut created = Vec::new();
    for template in catalog::discover(dir)? {
        let src = dir.join(&template);
        let text = fs::read_to_string(&src)?;
        let base = match yaml::parse(&text) {
            Ok(doc) => doc,
            Err(err) => {
                // Local failure: one bad template must not abort the run.
                warn!(file = %src.display(), %err, "template does not parse, skipping");
                continue;
            }
        };

        for country in &countries {
            let dest = naming.destination(&template, country);
            let dest_path = dir.join(&dest);
            if dest_path.exists() {
                continue;
            }

            let mut doc = base.clone();
            let rules = market_rules(&cluster_id, &namespace, country, policy);
            apply_rules(&mut doc.root, &rules, &dest, &mut ctx.report);
            ctx.create_file(&dest_path, &doc.to_string())?;
            created.push(dest.clone());
            info!(file = %dest, "created");
        }
    }
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RunOptions;
    use std::fs;

    #[test]
    fn test_marker_substitution_names() {
        let naming = MarkerSubstitution;
        assert_eq!(
            naming.destination("kitt.us-wm.primary.yml", "jp"),
            "kitt.jp.primary.yml"
        );
        assert_eq!(
            naming.destination("kitt.cell000.stage.yml", "de"),
            "kitt.de.stage.yml"
        );
        // No marker: canonical fallback name.
        assert_eq!(
            naming.destination("kitt.primary.yml", "jp"),
            "kitt.jp.primary.yml"
        );
    }

    fn write_template(dir: &Path) {
        fs::write(
            dir.join("kitt.us-wm.primary.yml"),
            "namespace: app-us\ncluster_id: [old]\nlabels:\n  ccm.country: us\n",
        )
        .expect("write template");
    }

    fn run_options() -> RunOptions {
        RunOptions::new(vec!["jp".into(), "de".into()], "77", "app-mkt")
    }

    #[test]
    fn test_generates_one_file_per_market() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_template(dir.path());
        let mut ctx = RunContext::new(dir.path(), run_options()).expect("context");

        let created =
            generate_dir(dir.path(), &mut ctx, &MarkerSubstitution).expect("generate");

        assert_eq!(created, vec!["kitt.jp.primary.yml", "kitt.de.primary.yml"]);
        let jp = fs::read_to_string(dir.path().join("kitt.jp.primary.yml")).expect("read");
        assert!(jp.contains("namespace: app-mkt"));
        assert!(jp.contains("cluster_id: ['77']"));
        assert!(jp.contains("ccm.country: jp"));
        // Template itself untouched.
        let tpl =
            fs::read_to_string(dir.path().join("kitt.us-wm.primary.yml")).expect("read");
        assert!(tpl.contains("namespace: app-us"));
    }

    #[test]
    fn test_second_run_creates_nothing() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_template(dir.path());

        let mut ctx = RunContext::new(dir.path(), run_options()).expect("context");
        let first = generate_dir(dir.path(), &mut ctx, &MarkerSubstitution).expect("first");
        assert_eq!(first.len(), 2);

        let mut ctx = RunContext::new(dir.path(), run_options()).expect("context");
        let second = generate_dir(dir.path(), &mut ctx, &MarkerSubstitution).expect("second");
        assert!(second.is_empty());
        assert!(ctx.report.is_empty());
        assert!(ctx.manifest.is_empty());
    }

    #[test]
    fn test_unparseable_template_is_skipped() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_template(dir.path());
        fs::write(dir.path().join("kitt.us-wm.secondary.yml"), "bad: [unclosed\n")
            .expect("write broken template");

        let mut ctx = RunContext::new(dir.path(), run_options()).expect("context");
        let created =
            generate_dir(dir.path(), &mut ctx, &MarkerSubstitution).expect("generate");

        // Only the healthy template fanned out.
        assert_eq!(created, vec!["kitt.jp.primary.yml", "kitt.de.primary.yml"]);
    }

    #[test]
    fn test_dry_run_reports_without_writing() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_template(dir.path());
        let mut opts = run_options();
        opts.dry_run = true;
        let mut ctx = RunContext::new(dir.path(), opts).expect("context");

        let created =
            generate_dir(dir.path(), &mut ctx, &MarkerSubstitution).expect("generate");

        assert_eq!(created.len(), 2);
        assert!(!dir.path().join("kitt.jp.primary.yml").exists());
        assert!(ctx.manifest.is_empty());
        // Mutations are still computed in full for the preview.
        assert!(!ctx.report.is_empty());
    }
}
