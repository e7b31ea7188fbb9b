//! INI parser.
//!
//! A line-preserving model: every line is classified once, values are
//! rewritten in place, and everything else (comments, spacing, blank lines,
//! line endings) is written back byte for byte.

use tracing::trace;

use super::node::{apply, Direction, Transform};
use super::{split_line_ending, Parser};
use crate::core::constants::METADATA_KEY;
use crate::core::detect::Format;
use crate::core::metadata::FileMetadata;
use crate::core::validation::validate_content_size;
use crate::error::{FormatError, Result};

/// Parser for INI-style files (`.ini`, `.cfg`, `.conf`).
#[derive(Debug, Clone, Copy, Default)]
pub struct Ini;

#[derive(Debug)]
enum Line<'a> {
    /// Blank lines and comments.
    Verbatim(&'a str),
    Section {
        raw: &'a str,
        name: &'a str,
    },
    Entry {
        key: &'a str,
        /// Everything before the value, delimiter and spacing included.
        head: &'a str,
        value: &'a str,
        /// Trailing whitespace and the line ending.
        tail: &'a str,
    },
}

impl<'a> Line<'a> {
    fn raw_len(&self) -> usize {
        match self {
            Line::Verbatim(raw) | Line::Section { raw, .. } => raw.len(),
            Line::Entry {
                head, value, tail, ..
            } => head.len() + value.len() + tail.len(),
        }
    }

    fn is_blank(&self) -> bool {
        matches!(self, Line::Verbatim(raw) if raw.trim().is_empty())
    }
}

fn parse(content: &str) -> Result<Vec<Line<'_>>> {
    let mut lines = Vec::new();

    for (index, line) in content.split_inclusive('\n').enumerate() {
        let (body, _) = split_line_ending(line);
        let trimmed = body.trim();

        if trimmed.is_empty() || trimmed.starts_with(';') || trimmed.starts_with('#') {
            lines.push(Line::Verbatim(line));
            continue;
        }

        if trimmed.starts_with('[') {
            let name = trimmed
                .strip_prefix('[')
                .and_then(|s| s.strip_suffix(']'))
                .ok_or_else(|| parse_error(index, "unterminated section header"))?;
            lines.push(Line::Section {
                raw: line,
                name: name.trim(),
            });
            continue;
        }

        let delimiter = body
            .find(['=', ':'])
            .ok_or_else(|| parse_error(index, "expected 'key = value'"))?;

        let key = body[..delimiter].trim();
        if key.is_empty() {
            return Err(parse_error(index, "missing key"));
        }

        let rest = &body[delimiter + 1..];
        let value_start = delimiter + 1 + (rest.len() - rest.trim_start().len());
        let value_end = body.trim_end().len().max(value_start);

        lines.push(Line::Entry {
            key,
            head: &line[..value_start],
            value: &line[value_start..value_end],
            tail: &line[value_end..],
        });
    }

    Ok(lines)
}

fn parse_error(index: usize, message: &str) -> crate::error::Error {
    FormatError::Parse {
        format: "ini",
        message: format!("{} at line {}", message, index + 1),
    }
    .into()
}

/// Strip one pair of surrounding double quotes.
fn unquote(value: &str) -> (&str, bool) {
    match value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
    {
        Some(inner) if value.len() >= 2 => (inner, true),
        _ => (value, false),
    }
}

/// Index range `[start, end)` of the metadata section, if present.
fn metadata_range(lines: &[Line<'_>]) -> Option<(usize, usize)> {
    let start = lines
        .iter()
        .position(|l| matches!(l, Line::Section { name, .. } if *name == METADATA_KEY))?;
    let end = lines[start + 1..]
        .iter()
        .position(|l| matches!(l, Line::Section { .. }))
        .map_or(lines.len(), |offset| start + 1 + offset);
    Some((start, end))
}

impl Parser for Ini {
    fn format(&self) -> Format {
        Format::Ini
    }

    fn transform(
        &self,
        content: &str,
        direction: Direction,
        f: &mut Transform<'_>,
    ) -> Result<String> {
        validate_content_size(content.as_bytes())?;
        let lines = parse(content)?;

        let mut out = String::with_capacity(content.len());
        let mut section: Option<&str> = None;
        let mut changed = 0usize;

        for line in &lines {
            match line {
                Line::Verbatim(raw) => out.push_str(raw),
                Line::Section { raw, name } => {
                    section = Some(*name);
                    out.push_str(raw);
                }
                Line::Entry {
                    key,
                    head,
                    value,
                    tail,
                } => {
                    let next = if section == Some(METADATA_KEY) {
                        None
                    } else {
                        let (text, quoted) = unquote(value);
                        let location = match section {
                            Some(name) => format!("{}.{}", name, key),
                            None => key.to_string(),
                        };
                        apply(text, direction, f)
                            .map_err(|e| e.at(location))?
                            .map(|v| if quoted { format!("\"{}\"", v) } else { v })
                    };

                    out.push_str(head);
                    match next {
                        Some(v) => {
                            out.push_str(&v);
                            changed += 1;
                        }
                        None => out.push_str(value),
                    }
                    out.push_str(tail);
                }
            }
        }

        trace!(changed, "transformed ini values");
        Ok(out)
    }

    fn attach_metadata(&self, content: &str, metadata: &FileMetadata) -> Result<String> {
        let mut out = self.strip_metadata(content)?;

        // A blank separator after a terminated last line, otherwise just the
        // terminator. `strip_metadata` removes exactly this one newline.
        if !out.is_empty() {
            out.push('\n');
        }

        out.push_str(&format!("[{}]\n", METADATA_KEY));
        for (name, value) in metadata.fields() {
            out.push_str(&format!("{} = {}\n", name, value));
        }

        Ok(out)
    }

    fn read_metadata(&self, content: &str) -> Result<Option<FileMetadata>> {
        let lines = parse(content)?;
        let Some((start, end)) = metadata_range(&lines) else {
            return Ok(None);
        };

        let fields = lines[start + 1..end].iter().filter_map(|line| match line {
            Line::Entry { key, value, .. } => Some((*key, unquote(value).0)),
            _ => None,
        });

        FileMetadata::from_fields(fields).map(Some)
    }

    fn strip_metadata(&self, content: &str) -> Result<String> {
        let lines = parse(content)?;
        let Some((mut start, end)) = metadata_range(&lines) else {
            return Ok(content.to_string());
        };

        let mut unterminated = false;
        if end == lines.len() && start > 0 {
            if lines[start - 1].is_blank() {
                start -= 1;
            } else {
                unterminated = true;
            }
        }

        // Lines are contiguous slices of `content`, so byte offsets suffice.
        let from: usize = lines[..start].iter().map(Line::raw_len).sum();
        let to: usize = from + lines[start..end].iter().map(Line::raw_len).sum::<usize>();

        let mut head = &content[..from];
        if unterminated {
            head = head.strip_suffix('\n').unwrap_or(head);
        }

        let mut out = String::with_capacity(content.len());
        out.push_str(head);
        out.push_str(&content[to..]);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::marker;
    use crate::core::metadata::Mode;

    fn fake_encrypt(v: &str) -> Result<String> {
        Ok(marker::encode(v.as_bytes()))
    }

    fn fake_decrypt(v: &str) -> Result<String> {
        Ok(String::from_utf8(marker::decode(v)?).unwrap())
    }

    const DOC: &str = "\
; global settings
name = demo

[database]
host = localhost
password: \"s3cr3t value\"
empty =

# trailing comment
[api]
token=abc123
";

    #[test]
    fn test_roundtrip_preserves_layout() {
        let encrypted = Ini.encrypt_values(DOC, &mut fake_encrypt).unwrap();

        assert!(encrypted.starts_with("; global settings\nname = ENC[v1:"));
        assert!(encrypted.contains("\n[database]\nhost = ENC[v1:"));
        assert!(encrypted.contains("password: \"ENC[v1:"));
        assert!(encrypted.contains("\nempty =\n"));
        assert!(encrypted.contains("# trailing comment\n[api]\ntoken=ENC[v1:"));
        assert!(!encrypted.contains("s3cr3t"));

        let decrypted = Ini.decrypt_values(&encrypted, &mut fake_decrypt).unwrap();
        assert_eq!(decrypted, DOC);
    }

    #[test]
    fn test_metadata_section_skipped() {
        let doc = "a = 1\n\n[_shhh]\nvault = default\n";
        let encrypted = Ini.encrypt_values(doc, &mut fake_encrypt).unwrap();
        assert!(encrypted.ends_with("[_shhh]\nvault = default\n"));
    }

    #[test]
    fn test_location_includes_section() {
        let err = Ini
            .encrypt_values("[database]\npassword = x\n", &mut |_: &str| {
                Err(crate::error::CipherError::NoRecipients.into())
            })
            .unwrap_err();
        assert!(err.to_string().contains("database.password"));
    }

    #[test]
    fn test_malformed_lines_rejected() {
        assert!(Ini.encrypt_values("just words\n", &mut fake_encrypt).is_err());
        assert!(Ini.encrypt_values("[broken\n", &mut fake_encrypt).is_err());
        assert!(Ini.encrypt_values(" = value\n", &mut fake_encrypt).is_err());
    }

    #[test]
    fn test_metadata_roundtrip() {
        let meta = FileMetadata::new("default", Mode::Values, &["alice@test.com".to_string()]);
        let with_meta = Ini.attach_metadata(DOC, &meta).unwrap();

        assert!(with_meta.ends_with(&format!(
            "\n\n[_shhh]\nversion = 1\nvault = default\nmode = values\nrecipients = alice@test.com\nencrypted_at = {}\n",
            meta.fields()[4].1
        )));
        assert_eq!(Ini.read_metadata(&with_meta).unwrap(), Some(meta.clone()));
        assert_eq!(Ini.strip_metadata(&with_meta).unwrap(), DOC);

        let again = Ini.attach_metadata(&with_meta, &meta).unwrap();
        assert_eq!(again, with_meta);
    }

    #[test]
    fn test_metadata_roundtrip_without_final_newline() {
        let meta = FileMetadata::new("default", Mode::Values, &["alice@test.com".to_string()]);

        for doc in ["a = 1", "a = 1\n", "a = 1\n\n", "[db]\r\nhost = x", "\n"] {
            let with_meta = Ini.attach_metadata(doc, &meta).unwrap();
            assert_eq!(Ini.strip_metadata(&with_meta).unwrap(), doc, "{doc:?}");
            assert_eq!(Ini.attach_metadata(&with_meta, &meta).unwrap(), with_meta);
        }

        let with_meta = Ini.attach_metadata("a = 1", &meta).unwrap();
        assert!(with_meta.starts_with("a = 1\n[_shhh]\nversion = 1\n"));
    }

    #[test]
    fn test_strip_without_metadata() {
        assert_eq!(Ini.strip_metadata(DOC).unwrap(), DOC);
        assert!(Ini.read_metadata(DOC).unwrap().is_none());
    }

    #[test]
    fn test_unquote() {
        assert_eq!(unquote("\"a b\""), ("a b", true));
        assert_eq!(unquote("\""), ("\"", false));
        assert_eq!(unquote("plain"), ("plain", false));
    }
}
