//! `.env` parser.
//!
//! Works line by line so comments, blank lines, ordering and line endings
//! survive untouched. Only the value part of `KEY=VALUE` lines is rewritten.

use tracing::trace;

use super::node::{apply, Direction, Transform};
use super::{split_line_ending, Parser};
use crate::core::constants::{ENV_METADATA_MARKER, ENV_METADATA_PREFIX};
use crate::core::detect::Format;
use crate::core::metadata::FileMetadata;
use crate::core::validation::validate_content_size;
use crate::error::Result;

/// Parser for `KEY=VALUE` files.
#[derive(Debug, Clone, Copy, Default)]
pub struct Env;

impl Parser for Env {
    fn format(&self) -> Format {
        Format::Env
    }

    fn transform(
        &self,
        content: &str,
        direction: Direction,
        f: &mut Transform<'_>,
    ) -> Result<String> {
        validate_content_size(content.as_bytes())?;

        let mut out = String::with_capacity(content.len());
        let mut changed = 0usize;

        for (index, line) in content.split_inclusive('\n').enumerate() {
            let (body, ending) = split_line_ending(line);
            let trimmed = body.trim();

            if trimmed.is_empty()
                || trimmed.starts_with('#')
                || trimmed.starts_with(ENV_METADATA_PREFIX)
            {
                out.push_str(line);
                continue;
            }

            let Some((key, raw)) = body.split_once('=') else {
                out.push_str(line);
                continue;
            };

            let value = EnvValue::parse(raw);
            let location = format!("{} (line {})", key.trim(), index + 1);
            match apply(value.text, direction, f).map_err(|e| e.at(location))? {
                Some(next) => {
                    out.push_str(key);
                    out.push('=');
                    out.push_str(value.leading);
                    out.push_str(&quote(&next, value.quote));
                    out.push_str(value.trailing);
                    out.push_str(ending);
                    changed += 1;
                }
                None => out.push_str(line),
            }
        }

        trace!(changed, "transformed env values");
        Ok(out)
    }

    fn attach_metadata(&self, content: &str, metadata: &FileMetadata) -> Result<String> {
        let mut out = self.strip_metadata(content)?;

        // A blank separator after a terminated last line, otherwise just the
        // terminator. `strip_metadata` removes exactly this one newline.
        if !out.is_empty() {
            out.push('\n');
        }

        out.push_str(ENV_METADATA_MARKER);
        out.push('\n');
        for (name, value) in metadata.fields() {
            out.push_str(ENV_METADATA_PREFIX);
            out.push_str(&name.to_ascii_uppercase());
            out.push('=');
            out.push_str(&value);
            out.push('\n');
        }

        Ok(out)
    }

    fn read_metadata(&self, content: &str) -> Result<Option<FileMetadata>> {
        let fields: Vec<(String, String)> = content
            .lines()
            .filter_map(|line| {
                let rest = line.trim().strip_prefix(ENV_METADATA_PREFIX)?;
                let (name, value) = rest.split_once('=')?;
                Some((name.to_string(), value.to_string()))
            })
            .collect();

        if fields.is_empty() {
            return Ok(None);
        }

        FileMetadata::from_fields(fields).map(Some)
    }

    fn strip_metadata(&self, content: &str) -> Result<String> {
        let lines: Vec<&str> = content.split_inclusive('\n').collect();

        let Some(start) = lines
            .iter()
            .position(|l| l.trim() == ENV_METADATA_MARKER)
        else {
            return Ok(content.to_string());
        };

        let mut end = start + 1;
        while end < lines.len() && lines[end].trim().starts_with(ENV_METADATA_PREFIX) {
            end += 1;
        }

        // undo the separator `attach_metadata` wrote before a trailing block
        let mut from = start;
        let mut unterminated = false;
        if end == lines.len() && from > 0 {
            if lines[from - 1].trim().is_empty() {
                from -= 1;
            } else {
                unterminated = true;
            }
        }

        let mut out = String::with_capacity(content.len());
        for line in lines[..from].iter().chain(&lines[end..]) {
            out.push_str(line);
        }
        if unterminated && out.ends_with('\n') {
            out.pop();
        }
        Ok(out)
    }
}

/// The value half of a `KEY=VALUE` line, split into its parts.
struct EnvValue<'a> {
    leading: &'a str,
    text: &'a str,
    quote: Option<char>,
    trailing: &'a str,
}

impl<'a> EnvValue<'a> {
    fn parse(raw: &'a str) -> Self {
        let start = raw.len() - raw.trim_start().len();
        let end = raw.trim_end().len().max(start);
        let inner = &raw[start..end];

        let quote = ['"', '\'']
            .into_iter()
            .find(|&q| inner.len() >= 2 && inner.starts_with(q) && inner.ends_with(q));

        let text = match quote {
            Some(_) => &inner[1..inner.len() - 1],
            None => inner,
        };

        Self {
            leading: &raw[..start],
            text,
            quote,
            trailing: &raw[end..],
        }
    }
}

/// Characters that force a value to be quoted.
fn needs_quoting(value: &str) -> bool {
    value
        .chars()
        .any(|c| matches!(c, ' ' | '\t' | '"' | '\'' | '#' | '$' | '\\' | '\n' | '\r'))
}

/// Quote a transformed value, keeping the original quote character if it had one.
fn quote(value: &str, original: Option<char>) -> String {
    match original {
        Some(q) => format!("{q}{value}{q}"),
        None if needs_quoting(value) => format!("\"{value}\""),
        None => value.to_string(),
    }
}
