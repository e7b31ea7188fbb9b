//! Format-aware value parsers.
//!
//! Each parser walks one document format and hands every leaf secret value
//! to a caller-supplied transform, leaving keys, sections and ordering in
//! place. Parsers also own the format's metadata block.

pub mod env;
pub mod ini;
pub mod json;
pub mod node;
pub mod yaml;

pub use env::Env;
pub use ini::Ini;
pub use json::Json;
pub use node::{Direction, Node, Scalar, Transform};
pub use yaml::Yaml;

use crate::core::detect::Format;
use crate::core::metadata::FileMetadata;
use crate::error::Result;

/// A structured document format.
///
/// Implementations are stateless; see [`for_format`].
pub trait Parser: Send + Sync {
    /// Format handled by this parser.
    fn format(&self) -> Format;

    /// Rewrite `content`, passing candidate values through `f`.
    ///
    /// When encrypting, candidates are non-empty values that are not already
    /// markers. When decrypting, candidates are markers. Metadata is never a
    /// candidate.
    ///
    /// # Errors
    ///
    /// Fails on oversize or malformed input, excessive nesting, or the first
    /// failing transform (wrapped with the value's location).
    fn transform(&self, content: &str, direction: Direction, f: &mut Transform<'_>)
        -> Result<String>;

    /// Encrypt every candidate value.
    fn encrypt_values(&self, content: &str, encrypt: &mut Transform<'_>) -> Result<String> {
        self.transform(content, Direction::Encrypt, encrypt)
    }

    /// Decrypt every marker.
    fn decrypt_values(&self, content: &str, decrypt: &mut Transform<'_>) -> Result<String> {
        self.transform(content, Direction::Decrypt, decrypt)
    }

    /// Embed `metadata`, replacing any block already present.
    fn attach_metadata(&self, content: &str, metadata: &FileMetadata) -> Result<String>;

    /// Read the metadata block without modifying the document.
    fn read_metadata(&self, content: &str) -> Result<Option<FileMetadata>>;

    /// Remove the metadata block. Documents without one are returned as-is.
    fn strip_metadata(&self, content: &str) -> Result<String>;
}

static YAML: Yaml = Yaml;
static JSON: Json = Json;
static INI: Ini = Ini;
static ENV: Env = Env;

/// Parser for a detected format, `None` for unknown formats.
pub fn for_format(format: Format) -> Option<&'static dyn Parser> {
    match format {
        Format::Yaml => Some(&YAML),
        Format::Json => Some(&JSON),
        Format::Ini => Some(&INI),
        Format::Env => Some(&ENV),
        Format::Unknown => None,
    }
}

/// Split a line into its body and line ending (`\n`, `\r\n` or nothing).
pub(crate) fn split_line_ending(line: &str) -> (&str, &str) {
    if let Some(body) = line.strip_suffix("\r\n") {
        (body, &line[body.len()..])
    } else if let Some(body) = line.strip_suffix('\n') {
        (body, &line[body.len()..])
    } else {
        (line, "")
    }
}
