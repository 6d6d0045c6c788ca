//! Canonical serializer for the document model.
//!
//! Emits 2-space mapping indentation with block-sequence dashes indented two
//! columns past their key, matching the layout the parser treats as
//! canonical, so emit-then-parse-then-emit is a fixed point and untouched
//! entries keep their comments, quoting and layout byte for byte.

use super::{Document, Entry, Mapping, Node, QuoteStyle, Scalar, SeqStyle, Sequence};

pub(super) fn emit(doc: &Document) -> String {
    let mut out = String::new();
    match &doc.root {
        Node::Mapping(map) => emit_mapping(map, 0, &mut out),
        Node::Sequence(seq) if seq.style == SeqStyle::Block => {
            emit_block_seq(seq, 0, &mut out)
        }
        other => {
            out.push_str(&render_inline(other));
            out.push('\n');
        }
    }
    for line in &doc.trailing {
        out.push_str(line);
        out.push('\n');
    }
    out
}

fn emit_mapping(map: &Mapping, indent: usize, out: &mut String) {
    for entry in &map.entries {
        emit_entry(entry, indent, None, out);
    }
}

/// Emit one entry with its key at `indent` columns. `dash_at` renders the
/// compact sequence-item form, placing `- ` at the given column instead of
/// plain indentation (the key still lands at `indent`).
fn emit_entry(entry: &Entry, indent: usize, dash_at: Option<usize>, out: &mut String) {
    for line in &entry.leading {
        out.push_str(line);
        out.push('\n');
    }

    match dash_at {
        Some(col) => {
            push_pad(out, col);
            out.push_str("- ");
        }
        None => push_pad(out, indent),
    }
    out.push_str(&entry.key);
    out.push(':');

    match &entry.value {
        Node::Scalar(s) if s.is_empty() => {}
        Node::Scalar(s) => {
            out.push(' ');
            out.push_str(&render_scalar(s));
        }
        Node::Sequence(seq) if seq.style == SeqStyle::Flow => {
            out.push(' ');
            out.push_str(&render_flow(seq));
        }
        // Block values go on the following lines.
        _ => {}
    }
    if let Some(trailing) = &entry.trailing {
        out.push_str(trailing);
    }
    out.push('\n');

    match &entry.value {
        Node::Mapping(map) => emit_mapping(map, indent + 2, out),
        Node::Sequence(seq) if seq.style == SeqStyle::Block => {
            emit_block_seq(seq, indent + 2, out)
        }
        _ => {}
    }
}

/// Emit a block sequence with dashes at `indent` columns.
fn emit_block_seq(seq: &Sequence, indent: usize, out: &mut String) {
    for item in &seq.items {
        for line in &item.leading {
            out.push_str(line);
            out.push('\n');
        }
        match &item.node {
            Node::Mapping(map) if !map.is_empty() => {
                emit_entry(&map.entries[0], indent + 2, Some(indent), out);
                for entry in &map.entries[1..] {
                    emit_entry(entry, indent + 2, None, out);
                }
            }
            Node::Sequence(inner) if inner.style == SeqStyle::Block => {
                push_pad(out, indent);
                out.push('-');
                if let Some(trailing) = &item.trailing {
                    out.push_str(trailing);
                }
                out.push('\n');
                emit_block_seq(inner, indent + 2, out);
            }
            node => {
                push_pad(out, indent);
                match node {
                    // Bare dash: empty scalars, and empty mappings, which
                    // have no inline form.
                    Node::Scalar(s) if s.is_empty() => out.push('-'),
                    Node::Mapping(_) => out.push('-'),
                    _ => {
                        out.push_str("- ");
                        out.push_str(&render_inline(node));
                    }
                }
                if let Some(trailing) = &item.trailing {
                    out.push_str(trailing);
                }
                out.push('\n');
            }
        }
    }
}

fn render_inline(node: &Node) -> String {
    match node {
        Node::Scalar(s) => render_scalar(s),
        Node::Sequence(seq) if seq.style == SeqStyle::Flow => render_flow(seq),
        other => other.to_compact_string(),
    }
}

fn render_flow(seq: &Sequence) -> String {
    let items: Vec<String> = seq.nodes().map(render_inline).collect();
    format!("[{}]", items.join(", "))
}

fn render_scalar(s: &Scalar) -> String {
    match s.quote {
        QuoteStyle::Plain => s.text.clone(),
        QuoteStyle::Single => format!("'{}'", s.text.replace('\'', "''")),
        QuoteStyle::Double => format!(
            "\"{}\"",
            s.text.replace('\\', "\\\\").replace('"', "\\\"")
        ),
    }
}

fn push_pad(out: &mut String, width: usize) {
    for _ in 0..width {
        out.push(' ');
    }
}
