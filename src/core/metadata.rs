//! File metadata side-channel.
//!
//! Every encrypted file carries a small, never-encrypted block describing how
//! it was produced. Structured formats embed it under a reserved key or
//! section (see each parser's `attach_metadata`); fully encrypted files carry
//! it in the envelope header.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::core::constants::FORMAT_VERSION;
use crate::core::detect::Format;
use crate::core::parser;
use crate::error::{FormatError, Result};

/// Encryption mode of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Encrypt each scalar value in place.
    #[default]
    Values,
    /// Encrypt the whole file as a single ciphertext.
    Full,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Values => "values",
            Self::Full => "full",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = FormatError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "values" => Ok(Self::Values),
            "full" => Ok(Self::Full),
            other => Err(FormatError::Metadata(format!(
                "unknown mode '{}', expected 'values' or 'full'",
                other
            ))),
        }
    }
}

/// Metadata describing an encrypted file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileMetadata {
    pub version: String,
    pub vault: String,
    pub mode: Mode,
    pub recipients: Vec<String>,
    pub encrypted_at: Option<DateTime<Utc>>,
}

impl FileMetadata {
    /// Metadata for a file encrypted now.
    ///
    /// The timestamp is truncated to whole seconds, the precision it is
    /// written with.
    pub fn new(vault: &str, mode: Mode, recipients: &[String]) -> Self {
        Self {
            version: FORMAT_VERSION.to_string(),
            vault: vault.to_string(),
            mode,
            recipients: recipients.to_vec(),
            encrypted_at: Some(Utc::now().trunc_subsecs(0)),
        }
    }

    /// Metadata as ordered `(name, value)` pairs.
    ///
    /// Names are lowercase with underscores; each format decorates them as
    /// it needs (`_SHHH_VAULT`, `Encrypted-At`, ...).
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("version", self.version.clone()),
            ("vault", self.vault.clone()),
            ("mode", self.mode.to_string()),
            ("recipients", self.recipients.join(", ")),
        ];
        if let Some(at) = self.encrypted_at {
            fields.push((
                "encrypted_at",
                at.to_rfc3339_opts(SecondsFormat::Secs, true),
            ));
        }
        fields
    }

    /// Rebuild metadata from `(name, value)` pairs.
    ///
    /// Names are matched case-insensitively with `-` treated as `_`, unknown
    /// names are ignored, and an unparseable timestamp is dropped.
    ///
    /// # Errors
    ///
    /// Returns `FormatError::Metadata` if the mode is not recognised.
    pub fn from_fields<K, V>(fields: impl IntoIterator<Item = (K, V)>) -> Result<Self>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut meta = Self {
            version: String::new(),
            vault: String::new(),
            mode: Mode::default(),
            recipients: Vec::new(),
            encrypted_at: None,
        };

        for (name, value) in fields {
            let name = name.as_ref().trim().to_ascii_lowercase().replace('-', "_");
            let value = value.as_ref().trim();

            match name.as_str() {
                "version" => meta.version = value.to_string(),
                "vault" => meta.vault = value.to_string(),
                "mode" => meta.mode = value.parse()?,
                "recipients" => meta.recipients = split_recipients(value),
                "encrypted_at" => {
                    meta.encrypted_at = DateTime::parse_from_rfc3339(value)
                        .ok()
                        .map(|t| t.with_timezone(&Utc));
                }
                _ => {}
            }
        }

        Ok(meta)
    }
}

fn split_recipients(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string)
        .collect()
}

/// Embed metadata into a structured document, replacing any existing block.
///
/// Unknown formats are returned unchanged.
pub fn attach(format: Format, content: &str, metadata: &FileMetadata) -> Result<String> {
    match parser::for_format(format) {
        Some(p) => p.attach_metadata(content, metadata),
        None => Ok(content.to_string()),
    }
}

/// Read the metadata block of a structured document, if it has one.
pub fn read(format: Format, content: &str) -> Result<Option<FileMetadata>> {
    match parser::for_format(format) {
        Some(p) => p.read_metadata(content),
        None => Ok(None),
    }
}

/// Remove the metadata block from a structured document.
pub fn strip(format: Format, content: &str) -> Result<String> {
    match parser::for_format(format) {
        Some(p) => p.strip_metadata(content),
        None => Ok(content.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FileMetadata {
        FileMetadata {
            version: "1".to_string(),
            vault: "default".to_string(),
            mode: Mode::Values,
            recipients: vec!["alice@test.com".to_string(), "bob@test.com".to_string()],
            encrypted_at: DateTime::parse_from_rfc3339("2026-10-16T09:30:00Z")
                .ok()
                .map(|t| t.with_timezone(&Utc)),
        }
    }

    #[test]
    fn test_fields_order_and_format() {
        let fields = sample().fields();
        let names: Vec<_> = fields.iter().map(|(n, _)| *n).collect();
        assert_eq!(
            names,
            vec!["version", "vault", "mode", "recipients", "encrypted_at"]
        );
        assert_eq!(fields[3].1, "alice@test.com, bob@test.com");
        assert_eq!(fields[4].1, "2026-10-16T09:30:00Z");
    }

    #[test]
    fn test_from_fields_inverts_fields() {
        let meta = sample();
        let parsed = FileMetadata::from_fields(meta.fields()).unwrap();
        assert_eq!(parsed, meta);
    }

    #[test]
    fn test_from_fields_normalizes_names() {
        let parsed = FileMetadata::from_fields([
            ("Version", "1"),
            ("Mode", "full"),
            ("Encrypted-At", "2026-10-16T09:30:00Z"),
            ("Recipients", " a@x.io ,, b@x.io "),
            ("Unrelated", "ignored"),
        ])
        .unwrap();

        assert_eq!(parsed.mode, Mode::Full);
        assert_eq!(parsed.recipients, vec!["a@x.io", "b@x.io"]);
        assert!(parsed.encrypted_at.is_some());
    }

    #[test]
    fn test_from_fields_bad_mode() {
        assert!(FileMetadata::from_fields([("mode", "partial")]).is_err());
    }

    #[test]
    fn test_from_fields_bad_timestamp_dropped() {
        let parsed = FileMetadata::from_fields([("encrypted_at", "yesterday")]).unwrap();
        assert!(parsed.encrypted_at.is_none());
    }

    #[test]
    fn test_new_truncates_to_seconds() {
        let meta = FileMetadata::new("default", Mode::Values, &["a@x.io".to_string()]);
        let at = meta.encrypted_at.unwrap();
        assert_eq!(at.timestamp_subsec_nanos(), 0);
        assert_eq!(meta.version, "1");
    }

    #[test]
    fn test_mode_parse_display() {
        assert_eq!("values".parse::<Mode>().unwrap(), Mode::Values);
        assert_eq!("full".parse::<Mode>().unwrap(), Mode::Full);
        assert_eq!(Mode::Full.to_string(), "full");
    }

    #[test]
    fn test_unknown_format_passthrough() {
        let meta = sample();
        assert_eq!(attach(Format::Unknown, "raw", &meta).unwrap(), "raw");
        assert!(read(Format::Unknown, "raw").unwrap().is_none());
        assert_eq!(strip(Format::Unknown, "raw").unwrap(), "raw");
    }
}
