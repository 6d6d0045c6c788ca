//! Line-based parser for the Kitt descriptor subset.
//!
//! The parser is indentation-driven and lossless for the subset it accepts:
//! comment and blank lines accumulate in a pending buffer and attach to the
//! next entry or sequence item that consumes them, trailing comments keep
//! their exact spacing, and scalar quote styles are recorded rather than
//! normalized. Anything outside the subset (anchors, tags, block scalars,
//! flow mappings, tab indentation) is a hard `ParseError` with a line number.

use super::{Document, Entry, Mapping, Node, QuoteStyle, Scalar, SeqItem, SeqStyle, Sequence};
use thiserror::Error;

/// Malformed descriptor input.
#[derive(Debug, Error)]
#[error("line {line}: {message}")]
pub struct ParseError {
    pub line: usize,
    pub message: String,
}

impl ParseError {
    fn new(line: usize, message: impl Into<String>) -> Self {
        Self { line, message: message.into() }
    }
}

type Result<T> = std::result::Result<T, ParseError>;

/// Parse a descriptor into a [`Document`].
pub fn parse(input: &str) -> Result<Document> {
    let mut cur = Cursor::new(input);
    cur.skip_comment_lines()?;

    let root = match cur.peek() {
        None => Node::Mapping(Mapping::new()),
        Some(line) => parse_block_node(&mut cur, line.indent)?,
    };

    cur.skip_comment_lines()?;
    if let Some(line) = cur.peek() {
        return Err(ParseError::new(
            line.number,
            "trailing content after document root",
        ));
    }

    let trailing = cur.take_pending();
    Ok(Document { root, trailing })
}

/// One content line: raw text, leading-space count, and 1-based number.
#[derive(Clone, Copy)]
struct Line<'a> {
    indent: usize,
    content: &'a str,
    number: usize,
}

struct Cursor<'a> {
    lines: Vec<&'a str>,
    pos: usize,
    /// Comment/blank lines waiting to be attached to the next entry or item.
    pending: Vec<String>,
}

impl<'a> Cursor<'a> {
    fn new(input: &'a str) -> Self {
        Self { lines: input.lines().collect(), pos: 0, pending: Vec::new() }
    }

    /// Consume blank and full-line-comment lines into the pending buffer.
    fn skip_comment_lines(&mut self) -> Result<()> {
        while let Some(raw) = self.lines.get(self.pos).copied() {
            let trimmed = raw.trim_start();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                self.pending.push(raw.to_string());
                self.pos += 1;
            } else {
                break;
            }
        }
        Ok(())
    }

    fn peek(&self) -> Option<Line<'a>> {
        let raw = *self.lines.get(self.pos)?;
        let indent = raw.len() - raw.trim_start_matches(' ').len();
        Some(Line {
            indent,
            content: &raw[indent..],
            number: self.pos + 1,
        })
    }

    /// Like `peek`, but rejects tab indentation.
    fn peek_checked(&self) -> Result<Option<Line<'a>>> {
        match self.peek() {
            Some(line) if line.content.starts_with('\t') => Err(ParseError::new(
                line.number,
                "tab indentation is not allowed",
            )),
            other => Ok(other),
        }
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn take_pending(&mut self) -> Vec<String> {
        std::mem::take(&mut self.pending)
    }
}

fn is_dash_item(content: &str) -> bool {
    content == "-" || content.starts_with("- ")
}

fn parse_block_node(cur: &mut Cursor<'_>, indent: usize) -> Result<Node> {
    let Some(line) = cur.peek_checked()? else {
        return Ok(Node::Mapping(Mapping::new()));
    };
    if is_dash_item(line.content) {
        parse_block_sequence(cur, indent)
    } else {
        parse_block_mapping(cur, indent, None)
    }
}

/// Parse a block mapping whose entries sit at exactly `indent` columns.
///
/// For compact sequence items (`- key: value`), the dash line's remainder is
/// passed as `first` and treated as the first entry.
fn parse_block_mapping(
    cur: &mut Cursor<'_>,
    indent: usize,
    first: Option<(&str, usize)>,
) -> Result<Node> {
    let mut map = Mapping::new();

    if let Some((content, number)) = first {
        let entry = parse_entry(cur, indent, content, number, Vec::new())?;
        map.entries.push(entry);
    }

    loop {
        cur.skip_comment_lines()?;
        let Some(line) = cur.peek_checked()? else { break };
        if line.indent < indent {
            break;
        }
        if line.indent > indent {
            return Err(ParseError::new(line.number, "unexpected indentation"));
        }
        if is_dash_item(line.content) {
            // A dash at the entry level belongs to the enclosing context.
            break;
        }
        cur.advance();
        let leading = cur.take_pending();
        let entry = parse_entry(cur, indent, line.content, line.number, leading)?;
        if map.contains_key(&entry.key) {
            return Err(ParseError::new(
                line.number,
                format!("duplicate mapping key '{}'", entry.key),
            ));
        }
        map.entries.push(entry);
    }

    Ok(Node::Mapping(map))
}

/// Parse one `key: value` line (the line itself already consumed).
fn parse_entry(
    cur: &mut Cursor<'_>,
    indent: usize,
    content: &str,
    number: usize,
    leading: Vec<String>,
) -> Result<Entry> {
    let colon = find_key_colon(content).ok_or_else(|| {
        ParseError::new(number, "expected ':' in mapping entry")
    })?;
    let key = content[..colon].trim_end();
    if key.is_empty() {
        return Err(ParseError::new(number, "empty mapping key"));
    }
    let rest = &content[colon + 1..];

    let (value, trailing) = parse_value(cur, indent, rest, number, true)?;
    Ok(Entry {
        key: key.to_string(),
        value,
        leading,
        trailing,
    })
}

/// Parse the text after the colon of a mapping entry (or after a sequence
/// dash): either an inline value, or an indented block on following lines.
///
/// `same_indent_seq` allows the `key:` + dash-at-key-indent form; it must be
/// false when parsing a sequence item, where a same-indent dash is the next
/// item of the enclosing sequence.
fn parse_value(
    cur: &mut Cursor<'_>,
    indent: usize,
    rest: &str,
    number: usize,
    same_indent_seq: bool,
) -> Result<(Node, Option<String>)> {
    let (value_raw, trailing) = split_trailing_comment(rest);
    let value_text = value_raw.trim();

    if !value_text.is_empty() {
        return Ok((parse_inline_value(value_text, number)?, trailing));
    }

    // No inline value: look for an indented block below.
    cur.skip_comment_lines()?;
    match cur.peek_checked()? {
        Some(next) if next.indent > indent => {
            Ok((parse_block_node(cur, next.indent)?, trailing))
        }
        // YAML permits sequence dashes at the key's own indentation.
        Some(next) if same_indent_seq && next.indent == indent && is_dash_item(next.content) => {
            Ok((parse_block_sequence(cur, indent)?, trailing))
        }
        _ => Ok((Node::null(), trailing)),
    }
}

/// Parse a block sequence whose dashes sit at exactly `indent` columns.
fn parse_block_sequence(cur: &mut Cursor<'_>, indent: usize) -> Result<Node> {
    let mut seq = Sequence::new(SeqStyle::Block);

    loop {
        cur.skip_comment_lines()?;
        let Some(line) = cur.peek_checked()? else { break };
        if line.indent < indent || !is_dash_item(line.content) {
            break;
        }
        if line.indent > indent {
            return Err(ParseError::new(line.number, "unexpected indentation"));
        }
        cur.advance();
        let leading = cur.take_pending();

        let rest = if line.content == "-" { "" } else { &line.content[1..] };
        let rest_offset = line.content.len() - rest.trim_start().len();
        let rest = rest.trim_start();

        if looks_like_mapping_entry(rest) {
            // Compact form: the dash line carries the item's first entry.
            let entry_col = indent + rest_offset;
            let node = parse_block_mapping(cur, entry_col, Some((rest, line.number)))?;
            seq.items.push(SeqItem { leading, node, trailing: None });
        } else {
            let (node, trailing) = parse_value(cur, indent, rest, line.number, false)?;
            seq.items.push(SeqItem { leading, node, trailing });
        }
    }

    Ok(Node::Sequence(seq))
}

/// Does a dash-line remainder open a mapping entry (`key: ...`) rather than
/// a plain scalar or flow value?
fn looks_like_mapping_entry(rest: &str) -> bool {
    if rest.is_empty() || rest.starts_with(['[', '\'', '"', '#']) {
        return false;
    }
    let (value_raw, _) = split_trailing_comment(rest);
    find_key_colon(value_raw).is_some()
}

/// Index of the colon separating key from value: the first `:` at end of
/// text or followed by a space.
fn find_key_colon(content: &str) -> Option<usize> {
    let bytes = content.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if b == b':' && (i + 1 == bytes.len() || bytes[i + 1] == b' ') {
            return Some(i);
        }
    }
    None
}

/// Split `rest` into the value text and a raw trailing comment (spacing
/// preserved). A `#` begins a comment only outside quotes and when preceded
/// by whitespace or at the start of the text.
fn split_trailing_comment(rest: &str) -> (&str, Option<String>) {
    let bytes = rest.as_bytes();
    let mut i = 0;
    let mut in_single = false;
    let mut in_double = false;

    while i < bytes.len() {
        let b = bytes[i];
        if in_double {
            if b == b'\\' {
                i += 1; // skip escaped char
            } else if b == b'"' {
                in_double = false;
            }
        } else if in_single {
            if b == b'\'' {
                if bytes.get(i + 1) == Some(&b'\'') {
                    i += 1; // '' escape
                } else {
                    in_single = false;
                }
            }
        } else if b == b'"' {
            in_double = true;
        } else if b == b'\'' {
            in_single = true;
        } else if b == b'#' && (i == 0 || bytes[i - 1] == b' ') {
            let mut start = i;
            while start > 0 && bytes[start - 1] == b' ' {
                start -= 1;
            }
            return (&rest[..start], Some(rest[start..].to_string()));
        }
        i += 1;
    }
    (rest, None)
}

/// Parse a single-line value: flow sequence or scalar.
fn parse_inline_value(text: &str, number: usize) -> Result<Node> {
    if let Some(inner) = text.strip_prefix('[') {
        let inner = inner.strip_suffix(']').ok_or_else(|| {
            ParseError::new(number, "unterminated flow sequence")
        })?;
        return parse_flow_sequence(inner, number);
    }
    if text.starts_with('{') {
        return Err(ParseError::new(number, "flow mappings are not supported"));
    }
    if text.starts_with('|') || text.starts_with('>') {
        return Err(ParseError::new(number, "block scalars are not supported"));
    }
    if text.starts_with('&') || text.starts_with('*') {
        return Err(ParseError::new(number, "anchors and aliases are not supported"));
    }
    Ok(Node::Scalar(parse_scalar_token(text, number)?))
}

fn parse_flow_sequence(inner: &str, number: usize) -> Result<Node> {
    let mut seq = Sequence::new(SeqStyle::Flow);
    if inner.trim().is_empty() {
        return Ok(Node::Sequence(seq));
    }
    for piece in split_flow_items(inner, number)? {
        let piece = piece.trim();
        if piece.is_empty() {
            return Err(ParseError::new(number, "empty flow sequence element"));
        }
        if piece.starts_with(['[', '{']) {
            return Err(ParseError::new(
                number,
                "nested flow collections are not supported",
            ));
        }
        seq.push(Node::Scalar(parse_scalar_token(piece, number)?));
    }
    Ok(Node::Sequence(seq))
}

/// Split flow-sequence content on top-level commas, respecting quotes.
fn split_flow_items(inner: &str, number: usize) -> Result<Vec<&str>> {
    let bytes = inner.as_bytes();
    let mut items = Vec::new();
    let mut start = 0;
    let mut i = 0;
    let mut in_single = false;
    let mut in_double = false;

    while i < bytes.len() {
        let b = bytes[i];
        if in_double {
            if b == b'\\' {
                i += 1;
            } else if b == b'"' {
                in_double = false;
            }
        } else if in_single {
            if b == b'\'' {
                if bytes.get(i + 1) == Some(&b'\'') {
                    i += 1;
                } else {
                    in_single = false;
                }
            }
        } else if b == b'"' {
            in_double = true;
        } else if b == b'\'' {
            in_single = true;
        } else if b == b',' {
            items.push(&inner[start..i]);
            start = i + 1;
        }
        i += 1;
    }
    if in_single || in_double {
        return Err(ParseError::new(number, "unterminated quoted scalar"));
    }
    items.push(&inner[start..]);
    Ok(items)
}

/// Parse one scalar token, recording its quote style.
fn parse_scalar_token(text: &str, number: usize) -> Result<Scalar> {
    if let Some(inner) = text.strip_prefix('"') {
        let inner = inner.strip_suffix('"').ok_or_else(|| {
            ParseError::new(number, "unterminated double-quoted scalar")
        })?;
        return Ok(Scalar {
            text: unescape_double(inner, number)?,
            quote: QuoteStyle::Double,
        });
    }
    if let Some(inner) = text.strip_prefix('\'') {
        let inner = inner.strip_suffix('\'').ok_or_else(|| {
            ParseError::new(number, "unterminated single-quoted scalar")
        })?;
        return Ok(Scalar {
            text: inner.replace("''", "'"),
            quote: QuoteStyle::Single,
        });
    }
    Ok(Scalar {
        text: text.to_string(),
        quote: QuoteStyle::Plain,
    })
}

fn unescape_double(inner: &str, number: usize) -> Result<String> {
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            other => {
                return Err(ParseError::new(
                    number,
                    format!("unsupported escape sequence '\\{}'", other.unwrap_or(' ')),
                ))
            }
        }
    }
    Ok(out)
}
