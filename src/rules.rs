//! Generic rule-based tree mutation.
//!
//! The walker knows nothing about Kitt fields: it applies an ordered list of
//! [`Rule`]s depth-first and records every rewrite in the change report. The
//! field knowledge lives in the rule catalog at the bottom of this module, so
//! a new field rewrite is a new `Rule` impl, never a walker change.
//!
//! Matched entries are terminal targets: once a rule fires on an entry (even
//! as a skip), the walker does not descend into that value. Everything else
//! recurses; sequence elements always recurse.

use crate::catalog::CELL_TOKEN;
use crate::report::ChangeReport;
use crate::yaml::{Mapping, Node, QuoteStyle, Scalar, Sequence};
use tracing::warn;

/// What to do when a rule matches a field whose value has an unexpected
/// shape: `Skip` logs and leaves the field alone, `Overwrite` replaces it
/// unconditionally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MismatchPolicy {
    #[default]
    Skip,
    Overwrite,
}

/// Result of asking a rule to rewrite a matched value.
pub enum RewriteOutcome {
    /// Replace the value; one `(old, new)` pair per audited change.
    Replaced {
        node: Node,
        changes: Vec<(String, String)>,
    },
    /// Matched but nothing to do (e.g. no element carried the placeholder).
    Unchanged,
    /// Matched but the value shape was unexpected; logged, never audited.
    Skipped { reason: String },
}

/// A named (match, rewrite) pair applied during tree mutation.
pub trait Rule {
    /// Field name used in change records and skip warnings.
    fn field(&self) -> &'static str;

    /// Should this rule fire on `(key, value)` within `parent`?
    fn matches(&self, key: &str, value: &Node, parent: &Mapping) -> bool;

    /// Produce the replacement value. Must not mutate anything itself.
    fn rewrite(&self, value: &Node) -> RewriteOutcome;
}

/// Depth-first application of `rules` to `node`. `file` is the audit context
/// (the destination filename) stamped into every change record.
pub fn apply_rules(
    node: &mut Node,
    rules: &[Box<dyn Rule>],
    file: &str,
    report: &mut ChangeReport,
) {
    match node {
        Node::Mapping(map) => {
            'entries: for i in 0..map.entries.len() {
                for rule in rules {
                    let matched = {
                        let entry = &map.entries[i];
                        rule.matches(&entry.key, &entry.value, map)
                    };
                    if !matched {
                        continue;
                    }
                    match rule.rewrite(&map.entries[i].value) {
                        RewriteOutcome::Replaced { node, changes } => {
                            for (old, new) in changes {
                                report.record(file, rule.field(), old, new);
                            }
                            map.entries[i].value = node;
                        }
                        RewriteOutcome::Unchanged => {}
                        RewriteOutcome::Skipped { reason } => {
                            warn!(
                                file,
                                field = rule.field(),
                                %reason,
                                "rule skipped, field left untouched"
                            );
                        }
                    }
                    // Matched entries are terminal.
                    continue 'entries;
                }
                apply_rules(&mut map.entries[i].value, rules, file, report);
            }
        }
        Node::Sequence(seq) => {
            for item in &mut seq.items {
                apply_rules(&mut item.node, rules, file, report);
            }
        }
        Node::Scalar(_) => {}
    }
}

// ============================================================================
// Rule catalog
// ============================================================================

/// `cluster_id` becomes a one-element flow sequence holding the new id.
///
/// The id is emitted single-quoted so a numeric id stays a string on the
/// next parse.
pub struct ClusterIdRule {
    pub cluster_id: String,
    pub policy: MismatchPolicy,
}

impl Rule for ClusterIdRule {
    fn field(&self) -> &'static str {
        "cluster_id"
    }

    fn matches(&self, key: &str, _value: &Node, _parent: &Mapping) -> bool {
        key == "cluster_id"
    }

    fn rewrite(&self, value: &Node) -> RewriteOutcome {
        if value.as_sequence().is_none() && self.policy == MismatchPolicy::Skip {
            return RewriteOutcome::Skipped {
                reason: format!(
                    "expected a sequence, found {}",
                    shape_name(value)
                ),
            };
        }
        let mut seq = Sequence::flow_of([self.cluster_id.clone()]);
        for item in &mut seq.items {
            if let Node::Scalar(s) = &mut item.node {
                s.quote = QuoteStyle::Single;
            }
        }
        let node = Node::Sequence(seq);
        let change = (value.to_compact_string(), node.to_compact_string());
        RewriteOutcome::Replaced { node, changes: vec![change] }
    }
}

/// `namespace` scalar replaced verbatim.
pub struct NamespaceRule {
    pub namespace: String,
    pub policy: MismatchPolicy,
}

impl Rule for NamespaceRule {
    fn field(&self) -> &'static str {
        "namespace"
    }

    fn matches(&self, key: &str, _value: &Node, _parent: &Mapping) -> bool {
        key == "namespace"
    }

    fn rewrite(&self, value: &Node) -> RewriteOutcome {
        let quote = match value {
            Node::Scalar(s) => s.quote,
            _ if self.policy == MismatchPolicy::Skip => {
                return RewriteOutcome::Skipped {
                    reason: format!("expected a scalar, found {}", shape_name(value)),
                };
            }
            _ => QuoteStyle::Plain,
        };
        let node = Node::Scalar(Scalar { text: self.namespace.clone(), quote });
        let change = (value.to_compact_string(), self.namespace.clone());
        RewriteOutcome::Replaced { node, changes: vec![change] }
    }
}

/// Country label under `labels`: the `ccm.country` value becomes the target
/// market code. Matching requires the label key to be present, so a `labels`
/// mapping without it recurses normally instead of being claimed.
pub struct CountryLabelRule {
    pub country: String,
}

/// Label key carrying the market country code.
pub const COUNTRY_LABEL: &str = "ccm.country";

impl Rule for CountryLabelRule {
    fn field(&self) -> &'static str {
        COUNTRY_LABEL
    }

    fn matches(&self, key: &str, value: &Node, _parent: &Mapping) -> bool {
        key == "labels"
            && value
                .as_mapping()
                .map(|m| m.contains_key(COUNTRY_LABEL))
                .unwrap_or(false)
    }

    fn rewrite(&self, value: &Node) -> RewriteOutcome {
        // matches() guarantees a mapping containing the label.
        let Some(map) = value.as_mapping() else {
            return RewriteOutcome::Unchanged;
        };
        let mut map = map.clone();
        let mut changes = Vec::new();
        if let Some(label) = map.get_mut(COUNTRY_LABEL) {
            let old = label.to_compact_string();
            let quote = label
                .as_scalar()
                .map(|s| s.quote)
                .unwrap_or(QuoteStyle::Plain);
            *label = Node::Scalar(Scalar { text: self.country.clone(), quote });
            changes.push((old, self.country.clone()));
        }
        RewriteOutcome::Replaced { node: Node::Mapping(map), changes }
    }
}

/// `cnames` elements containing the cell placeholder get only that substring
/// replaced; other elements are untouched.
pub struct CnamesRule {
    pub country: String,
}

impl Rule for CnamesRule {
    fn field(&self) -> &'static str {
        "cnames"
    }

    fn matches(&self, key: &str, value: &Node, _parent: &Mapping) -> bool {
        key == "cnames" && value.as_sequence().is_some()
    }

    fn rewrite(&self, value: &Node) -> RewriteOutcome {
        let Some(seq) = value.as_sequence() else {
            return RewriteOutcome::Unchanged;
        };
        let mut seq = seq.clone();
        let mut changes = Vec::new();
        for item in &mut seq.items {
            let Node::Scalar(s) = &mut item.node else { continue };
            if !s.text.contains(CELL_TOKEN) {
                continue;
            }
            let old = s.text.clone();
            s.text = s.text.replace(CELL_TOKEN, &self.country);
            changes.push((old, s.text.clone()));
        }
        if changes.is_empty() {
            return RewriteOutcome::Unchanged;
        }
        RewriteOutcome::Replaced { node: Node::Sequence(seq), changes }
    }
}

/// The standard per-market rule table, in application order.
pub fn market_rules(
    cluster_id: &str,
    namespace: &str,
    country: &str,
    policy: MismatchPolicy,
) -> Vec<Box<dyn Rule>> {
    vec![
        Box::new(ClusterIdRule {
            cluster_id: cluster_id.to_string(),
            policy,
        }),
        Box::new(NamespaceRule {
            namespace: namespace.to_string(),
            policy,
        }),
        Box::new(CountryLabelRule { country: country.to_string() }),
        Box::new(CnamesRule { country: country.to_string() }),
    ]
}

fn shape_name(node: &Node) -> &'static str {
    match node {
        Node::Mapping(_) => "a mapping",
        Node::Sequence(_) => "a sequence",
        Node::Scalar(_) => "a scalar",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::yaml::parse;

    fn mutate(input: &str, policy: MismatchPolicy) -> (String, ChangeReport) {
        let mut doc = parse(input).expect("valid fixture");
        let rules = market_rules("77", "app-jp", "jp", policy);
        let mut report = ChangeReport::new();
        apply_rules(&mut doc.root, &rules, "kitt.jp.primary.yml", &mut report);
        (doc.to_string(), report)
    }

    #[test]
    fn test_cluster_id_rewritten_from_sequence() {
        let (out, report) = mutate(
            "deploy:\n  cluster_id: [old-a, old-b]\n",
            MismatchPolicy::Skip,
        );
        assert!(out.contains("cluster_id: ['77']"), "got: {out}");
        assert_eq!(report.records()[0].old, "[old-a, old-b]");
        assert_eq!(report.records()[0].new, "[77]");
    }

    #[test]
    fn test_cluster_id_scalar_skipped_under_skip_policy() {
        let (out, report) = mutate("cluster_id: legacy\n", MismatchPolicy::Skip);
        assert!(out.contains("cluster_id: legacy"));
        assert!(report.is_empty(), "skip must not produce a change record");
    }

    #[test]
    fn test_cluster_id_scalar_replaced_under_overwrite_policy() {
        let (out, report) = mutate("cluster_id: legacy\n", MismatchPolicy::Overwrite);
        assert!(out.contains("cluster_id: ['77']"));
        assert_eq!(report.len(), 1);
    }

    #[test]
    fn test_absent_cluster_id_key_records_nothing() {
        // No rule target at all: the document must come back byte-identical.
        let input = "deploy:\n  replicas: 3\n";
        for policy in [MismatchPolicy::Skip, MismatchPolicy::Overwrite] {
            let (out, report) = mutate(input, policy);
            assert_eq!(out, input);
            assert!(report.is_empty());
        }
    }

    #[test]
    fn test_namespace_replaced_keeping_quote_style() {
        let (out, report) = mutate("namespace: \"app-us\"\n", MismatchPolicy::Skip);
        assert!(out.contains("namespace: \"app-jp\""), "got: {out}");
        assert_eq!(report.records()[0].field, "namespace");
        assert_eq!(report.records()[0].old, "app-us");
    }

    #[test]
    fn test_country_label_rewritten_inside_labels() {
        let (out, report) = mutate(
            "metadata:\n  labels:\n    ccm.country: us\n    team: deploys\n",
            MismatchPolicy::Skip,
        );
        assert!(out.contains("ccm.country: jp"));
        assert!(out.contains("team: deploys"));
        assert_eq!(report.records()[0].field, "ccm.country");
    }

    #[test]
    fn test_labels_without_country_key_left_alone() {
        let (out, report) = mutate(
            "labels:\n  team: deploys\n",
            MismatchPolicy::Skip,
        );
        assert!(out.contains("team: deploys"));
        assert!(report.is_empty());
    }

    #[test]
    fn test_cnames_substitutes_only_placeholder_elements() {
        let (out, report) = mutate(
            "cnames:\n  - app.cell000.example.com\n  - static.example.com\n",
            MismatchPolicy::Skip,
        );
        assert!(out.contains("app.jp.example.com"));
        assert!(out.contains("static.example.com"));
        assert_eq!(report.len(), 1);
        assert_eq!(report.records()[0].new, "app.jp.example.com");
    }

    #[test]
    fn test_cnames_without_placeholder_records_nothing() {
        let (_, report) = mutate("cnames:\n  - static.example.com\n", MismatchPolicy::Skip);
        assert!(report.is_empty());
    }

    #[test]
    fn test_matched_entry_is_terminal() {
        // The labels mapping matched; the cluster_id nested inside it must
        // not be rewritten by a later recursion.
        let (out, _) = mutate(
            "labels:\n  ccm.country: us\n  cluster_id: [keep]\n",
            MismatchPolicy::Skip,
        );
        assert!(out.contains("cluster_id: [keep]"), "got: {out}");
    }

    #[test]
    fn test_rules_reach_nested_sequences() {
        let (out, _) = mutate(
            "services:\n  - deploy:\n      namespace: app-us\n",
            MismatchPolicy::Skip,
        );
        assert!(out.contains("namespace: app-jp"), "got: {out}");
    }
}
