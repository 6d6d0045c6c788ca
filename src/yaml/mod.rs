//! Structure-preserving document model for Kitt descriptors.
//!
//! Kitt files are YAML, but they are edited by humans and reviewed in diffs,
//! so a generated change must not churn untouched lines. This model therefore
//! keeps the details a generic serde round-trip would throw away: comment
//! lines attached to the entry below them, trailing same-line comments,
//! scalar quote styles, and flow-vs-block sequence layout. Re-serializing an
//! unmutated parse of a canonical-form document is byte-identical.
//!
//! # Supported subset
//!
//! Block mappings, block sequences (scalar or mapping items, compact
//! `- key:` form included), single-line flow sequences of scalars, plain /
//! single-quoted / double-quoted scalars, empty values, full-line comments
//! and blank lines. Anchors, tags, multi-document streams and block scalars
//! are out of scope and rejected at parse time.

mod emitter;
mod parser;

pub use parser::{parse, ParseError};

use std::fmt;

/// How a scalar was quoted in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteStyle {
    Plain,
    Single,
    Double,
}

/// A leaf value: text plus the quoting it had (or should get).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scalar {
    /// Unescaped text content. Empty text with `Plain` quoting is the
    /// null/empty value (`key:` with nothing after it).
    pub text: String,
    pub quote: QuoteStyle,
}

impl Scalar {
    pub fn plain(text: impl Into<String>) -> Self {
        Self { text: text.into(), quote: QuoteStyle::Plain }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.quote == QuoteStyle::Plain
    }
}

/// Textual layout of a sequence: `[a, b]` vs. one `- item` per line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeqStyle {
    Flow,
    Block,
}

/// One element of a sequence, with the comments that travel with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeqItem {
    /// Raw comment/blank lines (verbatim, indentation included) that
    /// appeared directly above this item.
    pub leading: Vec<String>,
    pub node: Node,
    /// Raw trailing text on the item line, e.g. `"  # note"`.
    pub trailing: Option<String>,
}

impl SeqItem {
    pub fn new(node: Node) -> Self {
        Self { leading: Vec::new(), node, trailing: None }
    }
}

/// An ordered sequence of nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequence {
    pub items: Vec<SeqItem>,
    pub style: SeqStyle,
}

impl Sequence {
    pub fn new(style: SeqStyle) -> Self {
        Self { items: Vec::new(), style }
    }

    /// Build a flow sequence of plain scalars, e.g. `["77"]`.
    pub fn flow_of<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            items: texts
                .into_iter()
                .map(|t| SeqItem::new(Node::Scalar(Scalar::plain(t))))
                .collect(),
            style: SeqStyle::Flow,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.items.iter().map(|i| &i.node)
    }

    pub fn push(&mut self, node: Node) {
        self.items.push(SeqItem::new(node));
    }
}

/// One `key: value` entry of a mapping, with attached comments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub key: String,
    pub value: Node,
    /// Raw comment/blank lines (verbatim) directly above this entry.
    pub leading: Vec<String>,
    /// Raw trailing text on the key line, e.g. `"  # comment"`.
    pub trailing: Option<String>,
}

impl Entry {
    pub fn new(key: impl Into<String>, value: Node) -> Self {
        Self { key: key.into(), value, leading: Vec::new(), trailing: None }
    }
}

/// An ordered mapping with unique keys.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Mapping {
    pub entries: Vec<Entry>,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Node> {
        self.entries.iter().find(|e| e.key == key).map(|e| &e.value)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Node> {
        self.entries
            .iter_mut()
            .find(|e| e.key == key)
            .map(|e| &mut e.value)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|e| e.key == key)
    }

    /// Append an entry. Keys are unique; appending an existing key replaces
    /// its value in place instead of duplicating it.
    pub fn insert(&mut self, key: impl Into<String>, value: Node) {
        let key = key.into();
        match self.entries.iter_mut().find(|e| e.key == key) {
            Some(entry) => entry.value = value,
            None => self.entries.push(Entry::new(key, value)),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A node of the document tree.
///
/// `Clone` produces a fully independent tree: one template is cloned once per
/// target market and the clones are mutated, the template never.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Mapping(Mapping),
    Sequence(Sequence),
    Scalar(Scalar),
}

impl Node {
    pub fn scalar(text: impl Into<String>) -> Self {
        Node::Scalar(Scalar::plain(text))
    }

    /// The empty/null value (`key:` with nothing after it).
    pub fn null() -> Self {
        Node::Scalar(Scalar::plain(""))
    }

    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Node::Mapping(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_mapping_mut(&mut self) -> Option<&mut Mapping> {
        match self {
            Node::Mapping(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&Sequence> {
        match self {
            Node::Sequence(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_sequence_mut(&mut self) -> Option<&mut Sequence> {
        match self {
            Node::Sequence(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Node::Scalar(s) => Some(s),
            _ => None,
        }
    }

    /// Single-line rendering for audit records and logs: scalars bare,
    /// sequences in flow form, mappings as `{key: value, ...}`.
    pub fn to_compact_string(&self) -> String {
        match self {
            Node::Scalar(s) => s.text.clone(),
            Node::Sequence(seq) => {
                let items: Vec<String> =
                    seq.nodes().map(|n| n.to_compact_string()).collect();
                format!("[{}]", items.join(", "))
            }
            Node::Mapping(map) => {
                let entries: Vec<String> = map
                    .entries
                    .iter()
                    .map(|e| format!("{}: {}", e.key, e.value.to_compact_string()))
                    .collect();
                format!("{{{}}}", entries.join(", "))
            }
        }
    }
}

/// A parsed descriptor: the root node plus any comment lines that trailed
/// the last entry of the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub root: Node,
    pub trailing: Vec<String>,
}

impl Document {
    pub fn new(root: Node) -> Self {
        Self { root, trailing: Vec::new() }
    }

    /// Root mapping accessor; Kitt descriptors are mappings at the top level.
    pub fn root_mapping(&self) -> Option<&Mapping> {
        self.root.as_mapping()
    }

    pub fn root_mapping_mut(&mut self) -> Option<&mut Mapping> {
        self.root.as_mapping_mut()
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&emitter::emit(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mapping_insert_replaces_existing_key() {
        let mut map = Mapping::new();
        map.insert("a", Node::scalar("1"));
        map.insert("b", Node::scalar("2"));
        map.insert("a", Node::scalar("3"));

        assert_eq!(map.len(), 2);
        assert_eq!(map.get("a").and_then(Node::as_scalar).map(|s| s.text.as_str()), Some("3"));
    }

    #[test]
    fn test_clone_is_independent() {
        let mut map = Mapping::new();
        map.insert("namespace", Node::scalar("original"));
        let template = Node::Mapping(map);

        let mut copy = template.clone();
        copy.as_mapping_mut()
            .expect("mapping")
            .insert("namespace", Node::scalar("mutated"));

        assert_eq!(
            template
                .as_mapping()
                .and_then(|m| m.get("namespace"))
                .and_then(Node::as_scalar)
                .map(|s| s.text.as_str()),
            Some("original")
        );
    }

    #[test]
    fn test_compact_rendering() {
        let seq = Node::Sequence(Sequence::flow_of(["77", "88"]));
        assert_eq!(seq.to_compact_string(), "[77, 88]");

        let mut map = Mapping::new();
        map.insert("name", Node::scalar("deployApp"));
        assert_eq!(Node::Mapping(map).to_compact_string(), "{name: deployApp}");
    }
}
