//! Full-file envelope.
//!
//! Files without a structured format (or encrypted in `full` mode) are
//! encrypted as one ciphertext and wrapped in an armored envelope:
//!
//! ```text
//! -----BEGIN SHHH ENCRYPTED FILE-----
//! Version: 1
//! Vault: default
//! Mode: full
//! Recipients: alice@example.com, bob@example.com
//! Encrypted-At: 2026-10-16T09:30:00Z
//!
//! <base64, 64 columns>
//! -----END SHHH ENCRYPTED FILE-----
//! ```

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::core::constants::{ENVELOPE_FOOTER, ENVELOPE_HEADER, ENVELOPE_LINE_WIDTH};
use crate::core::metadata::FileMetadata;
use crate::error::{FormatError, Result};

/// A fully encrypted file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub metadata: FileMetadata,
    pub ciphertext: Vec<u8>,
}

impl Envelope {
    pub fn new(metadata: FileMetadata, ciphertext: Vec<u8>) -> Self {
        Self {
            metadata,
            ciphertext,
        }
    }

    /// Render the envelope as text.
    pub fn seal(&self) -> String {
        let body = STANDARD.encode(&self.ciphertext);
        let mut out = String::with_capacity(body.len() + body.len() / ENVELOPE_LINE_WIDTH + 256);

        out.push_str(ENVELOPE_HEADER);
        out.push('\n');
        for (name, value) in self.metadata.fields() {
            out.push_str(&header_name(name));
            out.push_str(": ");
            out.push_str(&value);
            out.push('\n');
        }
        out.push('\n');

        // base64 output is ASCII, so byte chunks are valid str boundaries
        for chunk in body.as_bytes().chunks(ENVELOPE_LINE_WIDTH) {
            out.push_str(&String::from_utf8_lossy(chunk));
            out.push('\n');
        }

        out.push_str(ENVELOPE_FOOTER);
        out.push('\n');
        out
    }

    /// Parse a sealed envelope.
    ///
    /// # Errors
    ///
    /// Returns `FormatError::Envelope` if the header or footer is missing or
    /// the body is not valid base64.
    pub fn parse(content: &str) -> Result<Self> {
        let (metadata, body) = split(content)?;
        let metadata = FileMetadata::from_fields(metadata)?;

        let encoded: String = body.concat();
        let ciphertext = STANDARD
            .decode(encoded.as_bytes())
            .map_err(|e| FormatError::Envelope(format!("invalid base64 body: {}", e)))?;

        Ok(Self {
            metadata,
            ciphertext,
        })
    }

    /// Read only the metadata lines of a sealed envelope.
    pub fn read_metadata(content: &str) -> Result<FileMetadata> {
        let (metadata, _) = split(content)?;
        FileMetadata::from_fields(metadata)
    }

    /// Whether content is a sealed envelope. Only the header is checked.
    pub fn is_envelope(content: &[u8]) -> bool {
        content.starts_with(ENVELOPE_HEADER.as_bytes())
    }
}

/// `encrypted_at` -> `Encrypted-At`
fn header_name(name: &str) -> String {
    name.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

type Split<'a> = (Vec<(&'a str, &'a str)>, Vec<&'a str>);

/// Separate metadata pairs from body lines.
fn split(content: &str) -> Result<Split<'_>> {
    let mut lines = content.lines().map(str::trim);

    if lines.next() != Some(ENVELOPE_HEADER) {
        return Err(FormatError::Envelope("missing header".to_string()).into());
    }

    let mut metadata = Vec::new();
    for line in lines.by_ref() {
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            metadata.push((name.trim(), value.trim()));
        }
    }

    let mut body = Vec::new();
    for line in lines {
        if line == ENVELOPE_FOOTER {
            return Ok((metadata, body));
        }
        if !line.is_empty() {
            body.push(line);
        }
    }

    Err(FormatError::Envelope("missing footer".to_string()).into())
}
