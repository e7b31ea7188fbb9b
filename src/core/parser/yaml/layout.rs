//! In-place rewriting of block-style YAML.
//!
//! `serde_yaml` drops comments and formatting, so transformed documents are
//! written back by replacing each changed scalar's source span instead of
//! re-emitting the tree. The scanner understands the block subset that
//! configuration files are written in: nested mappings and sequences, plain,
//! quoted and block scalars, tags, comments. Flow collections, anchors,
//! multi-line plain or quoted scalars and multi-document streams are
//! reported as [`Unsupported`] and the caller re-emits the document.
//!
//! Every rewrite is parsed again and compared with the tree it is meant to
//! represent before it is returned.

use serde_yaml::{Mapping, Value};

use crate::core::constants::METADATA_KEY;
use crate::core::parser::node::Direction;
use crate::core::parser::split_line_ending;

/// Reason a document cannot be rewritten in place.
pub(super) type Unsupported = &'static str;

#[derive(Debug, Clone, PartialEq)]
enum Step {
    Key(Value),
    Index(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Style {
    Plain,
    Single,
    Double,
    Block,
}

/// Source span of one scalar.
#[derive(Debug)]
struct Slot {
    path: Vec<Step>,
    start: usize,
    end: usize,
    /// Length of a leading tag plus the whitespace after it.
    tag: usize,
    style: Style,
    /// Indentation of the owning entry. Block content sits deeper.
    indent: usize,
    newline: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Mapping,
    Sequence,
}

struct Frame {
    indent: usize,
    kind: Kind,
    path: Vec<Step>,
    next: usize,
}

/// A key or item whose value starts on a later line.
struct Pending {
    indent: usize,
    path: Vec<Step>,
    sequence_at_same_indent: bool,
}

struct Scanner<'a> {
    lines: Vec<(usize, &'a str)>,
    stack: Vec<Frame>,
    pending: Option<Pending>,
    rooted: bool,
    slots: Vec<Slot>,
}

fn scan(content: &str) -> Result<Vec<Slot>, Unsupported> {
    let mut offset = 0;
    let lines = content
        .split_inclusive('\n')
        .map(|line| {
            let start = offset;
            offset += line.len();
            (start, line)
        })
        .collect();

    let mut scanner = Scanner {
        lines,
        stack: Vec::new(),
        pending: None,
        rooted: false,
        slots: Vec::new(),
    };
    scanner.run()?;
    Ok(scanner.slots)
}

impl<'a> Scanner<'a> {
    fn run(&mut self) -> Result<(), Unsupported> {
        let mut index = 0;
        let mut started = false;

        while index < self.lines.len() {
            let (start, line) = self.lines[index];
            let (body, _) = split_line_ending(line);
            let rest = body.trim_start_matches(' ');
            let indent = body.len() - rest.len();

            if rest.trim().is_empty() || rest.starts_with('#') {
                index += 1;
                continue;
            }
            if rest.starts_with('\t') {
                return Err("tab indentation");
            }
            if rest.starts_with('%') {
                return Err("directive");
            }
            if indent == 0 && (rest.starts_with("---") || rest.starts_with("...")) {
                if started || rest.trim_end() != "---" {
                    return Err("multiple documents");
                }
                started = true;
                index += 1;
                continue;
            }

            started = true;
            index = self.line(index, start, indent, rest)?;
        }

        Ok(())
    }

    fn line(
        &mut self,
        index: usize,
        start: usize,
        indent: usize,
        rest: &'a str,
    ) -> Result<usize, Unsupported> {
        let item = is_item(rest);
        self.enter(indent, item)?;

        if !item {
            let (key, after) = split_entry(rest)?.ok_or("not a mapping entry")?;
            match self.stack.last() {
                Some(frame) if frame.kind == Kind::Mapping && frame.indent == indent => {}
                _ => return Err("unexpected indentation"),
            }
            return self.entry(index, start + indent + after, indent, &rest[after..], key);
        }

        let path = match self.stack.last_mut() {
            Some(frame) if frame.kind == Kind::Sequence && frame.indent == indent => {
                let mut path = frame.path.clone();
                path.push(Step::Index(frame.next));
                frame.next += 1;
                path
            }
            _ => return Err("misplaced sequence item"),
        };

        let after = &rest[1..];
        let body = after.trim_start_matches([' ', '\t']);
        let column = indent + 1 + (after.len() - body.len());

        if body.is_empty() || body.starts_with('#') {
            self.pending = Some(Pending {
                indent,
                path,
                sequence_at_same_indent: false,
            });
            return Ok(index + 1);
        }
        if is_item(body) {
            return Err("nested inline sequence");
        }

        match split_entry(body)? {
            Some((key, after)) => {
                self.stack.push(Frame {
                    indent: column,
                    kind: Kind::Mapping,
                    path,
                    next: 0,
                });
                self.entry(index, start + column + after, column, &body[after..], key)
            }
            None => self.value(index, start + column, indent, body, path),
        }
    }

    /// Open the container a pending key is waiting for, or close every
    /// container the line has dedented out of.
    fn enter(&mut self, indent: usize, item: bool) -> Result<(), Unsupported> {
        let kind = if item { Kind::Sequence } else { Kind::Mapping };

        if let Some(pending) = self.pending.take() {
            let nested = indent > pending.indent
                || (item && pending.sequence_at_same_indent && indent == pending.indent);
            if nested {
                self.stack.push(Frame {
                    indent,
                    kind,
                    path: pending.path,
                    next: 0,
                });
                return Ok(());
            }
        }

        while let Some(top) = self.stack.last() {
            let closed = top.indent > indent
                || (top.indent == indent && top.kind == Kind::Sequence && !item);
            if !closed {
                break;
            }
            self.stack.pop();
        }

        if self.stack.is_empty() {
            if self.rooted {
                return Err("content after the root node");
            }
            self.rooted = true;
            self.stack.push(Frame {
                indent,
                kind,
                path: Vec::new(),
                next: 0,
            });
        }

        Ok(())
    }

    fn entry(
        &mut self,
        index: usize,
        offset: usize,
        column: usize,
        tail: &'a str,
        key: Value,
    ) -> Result<usize, Unsupported> {
        let mut path = self
            .stack
            .last()
            .map(|frame| frame.path.clone())
            .unwrap_or_default();
        path.push(Step::Key(key));

        let value = tail.trim_start_matches([' ', '\t']);
        if value.is_empty() || value.starts_with('#') {
            self.pending = Some(Pending {
                indent: column,
                path,
                sequence_at_same_indent: true,
            });
            return Ok(index + 1);
        }

        self.value(index, offset + (tail.len() - value.len()), column, value, path)
    }

    fn value(
        &mut self,
        index: usize,
        offset: usize,
        indent: usize,
        text: &'a str,
        path: Vec<Step>,
    ) -> Result<usize, Unsupported> {
        let (_, ending) = split_line_ending(self.lines[index].1);
        let newline = if ending == "\r\n" { "\r\n" } else { "\n" };

        let mut tag = 0;
        let mut body = text;
        if text.starts_with('!') {
            let name = text.find([' ', '\t']).ok_or("tag without value")?;
            body = text[name..].trim_start_matches([' ', '\t']);
            tag = text.len() - body.len();
            if body.is_empty() || body.starts_with('#') {
                return Err("tag without value");
            }
        }

        let (style, len, next) = match body.as_bytes()[0] {
            b'"' => (
                Style::Double,
                quoted_end(body, b'"').ok_or("multi-line quoted scalar")?,
                index + 1,
            ),
            b'\'' => (
                Style::Single,
                quoted_end(body, b'\'').ok_or("multi-line quoted scalar")?,
                index + 1,
            ),
            b'|' | b'>' => {
                let (len, next) = self.block(index, offset + tag, indent, body)?;
                (Style::Block, len, next)
            }
            b'[' | b'{' | b'&' | b'*' | b'!' | b'?' | b'%' | b'@' | b'`' => {
                return Err("unsupported node")
            }
            _ => (Style::Plain, plain_end(body), index + 1),
        };

        if style != Style::Block && !is_trailer(&body[len..]) {
            return Err("trailing content after scalar");
        }

        self.slots.push(Slot {
            path,
            start: offset,
            end: offset + tag + len,
            tag,
            style,
            indent,
            newline,
        });
        Ok(next)
    }

    /// Length of a block scalar starting at `at`, and the line after it.
    fn block(
        &self,
        index: usize,
        at: usize,
        indent: usize,
        header: &str,
    ) -> Result<(usize, usize), Unsupported> {
        let head = header.split(" #").next().unwrap_or(header).trim_end();
        if !head[1..]
            .bytes()
            .all(|b| matches!(b, b'-' | b'+' | b'1'..=b'9'))
        {
            return Err("block scalar header");
        }

        let mut end = at + header.len();
        let mut next = index + 1;
        for (scan, &(start, line)) in self.lines.iter().enumerate().skip(index + 1) {
            let (body, _) = split_line_ending(line);
            if body.trim().is_empty() {
                continue;
            }
            if body.len() - body.trim_start_matches(' ').len() <= indent {
                break;
            }
            end = start + body.len();
            next = scan + 1;
        }

        Ok((end - at, next))
    }
}

fn is_item(text: &str) -> bool {
    text == "-" || text.starts_with("- ") || text.starts_with("-\t")
}

fn separates(text: &str, at: usize) -> bool {
    matches!(text.as_bytes().get(at), None | Some(b' ') | Some(b'\t'))
}

/// Split `key: value`, returning the parsed key and the offset just past
/// the colon. `None` when the text is not a mapping entry.
fn split_entry(text: &str) -> Result<Option<(Value, usize)>, Unsupported> {
    let bytes = text.as_bytes();

    let colon = match bytes[0] {
        quote @ (b'"' | b'\'') => {
            let Some(end) = quoted_end(text, quote) else {
                return Ok(None);
            };
            let at = end + (text[end..].len() - text[end..].trim_start_matches(' ').len());
            if text[at..].starts_with(':') && separates(text, at + 1) {
                at
            } else {
                return Ok(None);
            }
        }
        b'?' | b'[' | b'{' | b'&' | b'*' | b'!' | b'|' | b'>' | b'%' | b'@' | b'`' | b'#' => {
            return Ok(None)
        }
        _ => {
            let mut found = None;
            for (i, &b) in bytes.iter().enumerate() {
                if b == b'#' && i > 0 && matches!(bytes[i - 1], b' ' | b'\t') {
                    break;
                }
                if b == b':' && separates(text, i + 1) {
                    found = Some(i);
                    break;
                }
            }
            match found {
                Some(i) => i,
                None => return Ok(None),
            }
        }
    };

    let key = serde_yaml::from_str(text[..colon].trim_end()).map_err(|_| "unreadable key")?;
    Ok(Some((key, colon + 1)))
}

/// Offset just past the closing quote, `None` if the scalar does not close
/// on this line.
fn quoted_end(text: &str, quote: u8) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut i = 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if quote == b'"' => i += 2,
            b'\'' if quote == b'\'' && bytes.get(i + 1) == Some(&b'\'') => i += 2,
            b if b == quote => return Some(i + 1),
            _ => i += 1,
        }
    }
    None
}

fn plain_end(text: &str) -> usize {
    let bytes = text.as_bytes();
    let end = (1..bytes.len())
        .find(|&i| bytes[i] == b'#' && matches!(bytes[i - 1], b' ' | b'\t'))
        .unwrap_or(bytes.len());
    text[..end].trim_end_matches([' ', '\t']).len()
}

/// Whitespace, optionally followed by a comment.
fn is_trailer(rest: &str) -> bool {
    let trimmed = rest.trim_start_matches([' ', '\t']);
    trimmed.is_empty() || (trimmed.len() < rest.len() && trimmed.starts_with('#'))
}

fn lookup<'v>(root: &'v Value, path: &[Step]) -> Option<&'v Value> {
    path.iter().try_fold(root, |node, step| match step {
        Step::Key(key) => node.as_mapping()?.get(key),
        Step::Index(i) => node.as_sequence()?.get(*i),
    })
}

fn lookup_mut<'v>(root: &'v mut Value, path: &[Step]) -> Option<&'v mut Value> {
    path.iter().try_fold(root, |node, step| match step {
        Step::Key(key) => node.as_mapping_mut()?.get_mut(key),
        Step::Index(i) => node.as_sequence_mut()?.get_mut(*i),
    })
}

/// Does `text` parse to exactly `expected`?
fn same(text: &str, expected: &Value) -> bool {
    match serde_yaml::from_str::<Value>(text) {
        Ok(Value::Null) => {
            matches!(expected, Value::Null) || expected.as_mapping().is_some_and(Mapping::is_empty)
        }
        Ok(value) => value == *expected,
        Err(_) => false,
    }
}

/// Rewrite every scalar that differs between `original` and `transformed`.
///
/// Decrypted plain scalars whose text is a canonical number or boolean are
/// written back unquoted and come back typed, so `port: 5432` survives a
/// round trip as an integer. Quoted and tagged scalars stay strings.
pub(super) fn rewrite(
    content: &str,
    original: &Value,
    transformed: &Value,
    direction: Direction,
) -> Result<String, Unsupported> {
    let slots = scan(content)?;
    let mut expected = transformed.clone();
    let mut out = String::with_capacity(content.len() * 2);
    let mut cursor = 0;

    for slot in &slots {
        let before = lookup(original, &slot.path).ok_or("scalar outside the parsed tree")?;
        let after = lookup(transformed, &slot.path).ok_or("scalar outside the parsed tree")?;
        if before == after {
            continue;
        }

        let tag = &content[slot.start..slot.start + slot.tag];
        let (text, value) = render(after, slot, tag, direction)?;
        if value != *after {
            *lookup_mut(&mut expected, &slot.path).ok_or("scalar outside the parsed tree")? =
                value;
        }

        out.push_str(&content[cursor..slot.start]);
        out.push_str(&text);
        cursor = slot.end;
    }
    out.push_str(&content[cursor..]);

    if !same(&out, &expected) {
        return Err("rewritten document does not match");
    }
    Ok(out)
}

/// Source text for a transformed scalar, and the value it will parse to.
fn render(
    value: &Value,
    slot: &Slot,
    tag: &str,
    direction: Direction,
) -> Result<(String, Value), Unsupported> {
    let text = match value {
        Value::Tagged(tagged) if !tag.is_empty() => tagged.value.as_str(),
        Value::String(text) => Some(text.as_str()),
        _ => None,
    }
    .ok_or("unexpected scalar")?;

    if direction == Direction::Decrypt && tag.is_empty() && slot.style == Style::Plain {
        if let Some(typed) = resolve(text) {
            return Ok((text.to_string(), typed));
        }
    }

    let rendered = match slot.style {
        Style::Double => double_quoted(text),
        Style::Single if !text.contains('\n') => format!("'{}'", text.replace('\'', "''")),
        Style::Single => double_quoted(text),
        Style::Plain | Style::Block if text.contains('\n') => {
            block_literal(text, slot.indent + 2, slot.newline)
                .unwrap_or_else(|| double_quoted(text))
        }
        Style::Plain | Style::Block => plain(text),
    };

    Ok((format!("{}{}", tag, rendered), value.clone()))
}

/// A number or boolean whose canonical text is exactly `text`.
pub(super) fn resolve(text: &str) -> Option<Value> {
    let value: Value = serde_yaml::from_str(text).ok()?;
    let canonical = match &value {
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (canonical == text).then_some(value)
}

fn is_plain_safe(text: &str) -> bool {
    !text.contains('\n')
        && text.trim() == text
        && matches!(serde_yaml::from_str::<Value>(text), Ok(Value::String(ref s)) if s == text)
}

fn plain(text: &str) -> String {
    if is_plain_safe(text) {
        text.to_string()
    } else {
        double_quoted(text)
    }
}

/// JSON string syntax is valid YAML double-quoted syntax.
fn double_quoted(text: &str) -> String {
    serde_json::Value::String(text.to_string()).to_string()
}

fn block_literal(text: &str, indent: usize, newline: &str) -> Option<String> {
    let body = text.trim_end_matches('\n');
    let trailing = text.len() - body.len();
    let printable = body.chars().all(|c| c == '\n' || c == '\t' || !c.is_control());
    if body.is_empty() || body.starts_with([' ', '\t', '\n']) || !printable {
        return None;
    }

    let chomp = match trailing {
        0 => "-",
        1 => "",
        _ => "+",
    };
    let pad = " ".repeat(indent);

    let mut out = format!("|{}", chomp);
    for line in body.split('\n') {
        out.push_str(newline);
        if !line.is_empty() {
            out.push_str(&pad);
            out.push_str(line);
        }
    }
    for _ in 1..trailing {
        out.push_str(newline);
    }
    Some(out)
}

/// Remove a top-level `_shhh:` block, undoing the separator written by
/// [`append_metadata`] when the block ends the document.
fn remove_metadata(content: &str) -> String {
    let lines: Vec<&str> = content.split_inclusive('\n').collect();
    let header = format!("{}:", METADATA_KEY);

    let Some(start) = lines.iter().position(|line| {
        let (body, _) = split_line_ending(line);
        body.strip_prefix(header.as_str())
            .is_some_and(|rest| rest.is_empty() || rest.starts_with([' ', '\t']))
    }) else {
        return content.to_string();
    };

    let mut end = start + 1;
    for (index, line) in lines.iter().enumerate().skip(start + 1) {
        let (body, _) = split_line_ending(line);
        if body.trim().is_empty() {
            continue;
        }
        if !body.starts_with([' ', '\t']) {
            break;
        }
        end = index + 1;
    }

    let mut from = start;
    let mut unterminated = false;
    if end == lines.len() && from > 0 {
        if lines[from - 1].trim().is_empty() {
            from -= 1;
        } else {
            unterminated = true;
        }
    }

    let mut out: String = lines[..from].iter().chain(&lines[end..]).copied().collect();
    if unterminated && out.ends_with('\n') {
        out.pop();
    }
    out
}

/// Replace any `_shhh` block with `fields`, appended after the document.
pub(super) fn append_metadata(
    content: &str,
    fields: &[(&str, String)],
    expected: &Value,
) -> Result<String, Unsupported> {
    let mut out = remove_metadata(content);
    if !out.is_empty() {
        out.push('\n');
    }

    out.push_str(METADATA_KEY);
    out.push_str(":\n");
    for (name, value) in fields {
        out.push_str("  ");
        out.push_str(name);
        out.push_str(": ");
        out.push_str(&plain(value));
        out.push('\n');
    }

    if !same(&out, expected) {
        return Err("metadata block does not attach cleanly");
    }
    Ok(out)
}

/// Remove the `_shhh` block, keeping the rest of the text as written.
pub(super) fn strip_metadata(content: &str, expected: &Value) -> Result<String, Unsupported> {
    let out = remove_metadata(content);
    if !same(&out, expected) {
        return Err("metadata block does not detach cleanly");
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(name: &str) -> Step {
        Step::Key(Value::String(name.to_string()))
    }

    fn paths(content: &str) -> Vec<Vec<Step>> {
        scan(content)
            .unwrap()
            .into_iter()
            .map(|slot| slot.path)
            .collect()
    }

    #[test]
    fn test_scan_nested_blocks() {
        let doc = "\
# header
db:
  host: x # trailing
  users:
  - name: a
    pass: 'b'
  -   \"c\"
list:
    - one
port: 1
";
        assert_eq!(
            paths(doc),
            vec![
                vec![key("db"), key("host")],
                vec![key("db"), key("users"), Step::Index(0), key("name")],
                vec![key("db"), key("users"), Step::Index(0), key("pass")],
                vec![key("db"), key("users"), Step::Index(1)],
                vec![key("list"), Step::Index(0)],
                vec![key("port")],
            ]
        );
    }

    #[test]
    fn test_scan_spans() {
        let doc = "a: plain value # note\nb: \"x\\\"y\" \nc: !secret z\n";
        let slots = scan(doc).unwrap();

        let spans: Vec<&str> = slots.iter().map(|s| &doc[s.start..s.end]).collect();
        assert_eq!(spans, vec!["plain value", "\"x\\\"y\"", "!secret z"]);
        assert_eq!(slots[2].tag, "!secret ".len());
        assert_eq!(slots[1].style, Style::Double);
    }

    #[test]
    fn test_scan_block_scalar() {
        let doc = "cert: |\n  one\n\n  two\nnext: 1\n";
        let slots = scan(doc).unwrap();

        assert_eq!(&doc[slots[0].start..slots[0].end], "|\n  one\n\n  two");
        assert_eq!(slots[0].style, Style::Block);
        assert_eq!(slots[1].path, vec![key("next")]);
    }

    #[test]
    fn test_scan_rejects_unsupported_layouts() {
        for doc in [
            "a: {b: 1}\n",
            "a: [1, 2]\n",
            "base: &b x\nother: *b\n",
            "a: 1\n---\nb: 2\n",
            "a: first\n  continued\n",
            "a: \"open\n  quote\"\n",
            "? complex\n: key\n",
        ] {
            assert!(scan(doc).is_err(), "{doc:?}");
        }
    }

    #[test]
    fn test_resolve_only_canonical_scalars() {
        assert_eq!(resolve("5432"), Some(Value::from(5432)));
        assert_eq!(resolve("true"), Some(Value::Bool(true)));
        assert_eq!(resolve("0.5"), Some(Value::from(0.5)));
        assert_eq!(resolve("02134"), None);
        assert_eq!(resolve("hello"), None);
        assert_eq!(resolve("null"), None);
    }

    #[test]
    fn test_plain_quotes_ambiguous_text() {
        assert_eq!(plain("ENC[v1:YWJj]"), "ENC[v1:YWJj]");
        assert_eq!(plain("hello world"), "hello world");
        assert_eq!(plain("a: b"), "\"a: b\"");
        assert_eq!(plain("123"), "\"123\"");
        assert_eq!(plain(" padded"), "\" padded\"");
        assert_eq!(plain("x # y"), "\"x # y\"");
    }

    #[test]
    fn test_block_literal() {
        assert_eq!(
            block_literal("one\ntwo\n", 2, "\n").as_deref(),
            Some("|\n  one\n  two")
        );
        assert_eq!(
            block_literal("one\n\ntwo", 4, "\r\n").as_deref(),
            Some("|-\r\n    one\r\n\r\n    two")
        );
        assert_eq!(block_literal("  indented\n", 2, "\n"), None);
        assert_eq!(block_literal("bell\u{7}\n", 2, "\n"), None);
    }

    #[test]
    fn test_remove_metadata_undoes_separator() {
        assert_eq!(remove_metadata("a: 1\n\n_shhh:\n  vault: x\n"), "a: 1\n");
        assert_eq!(remove_metadata("a: 1\n_shhh:\n  vault: x\n"), "a: 1");
        assert_eq!(
            remove_metadata("_shhh:\n  vault: x\nb: 2\n"),
            "b: 2\n"
        );
        assert_eq!(remove_metadata("a: 1\n"), "a: 1\n");
    }
}
