//! Inspect command.
//!
//! Reads metadata only, so it needs no keys.

use std::path::Path;

use crate::cli::{detection_name, output, read_input};
use crate::core::detect::Format;
use crate::core::engine::{is_fully_encrypted, read_file_metadata};
use crate::error::{FormatError, Result};

/// Print how a file was encrypted.
pub fn execute(file: &Path, as_name: Option<&str>, json: bool) -> Result<()> {
    let name = detection_name(file, as_name);
    let content = read_input(file)?;
    let metadata = read_file_metadata(&content, &name)?;

    if json {
        let rendered = serde_json::to_string_pretty(&metadata).map_err(|e| {
            FormatError::Serialize {
                format: "json",
                message: e.to_string(),
            }
        })?;
        println!("{}", rendered);
        return Ok(());
    }

    let Some(metadata) = metadata else {
        output::warn(&format!("{} is not encrypted", output::path(&name)));
        return Ok(());
    };

    let format = if is_fully_encrypted(&content) {
        "sealed".to_string()
    } else {
        Format::detect(&name).to_string()
    };

    output::header(&name);
    output::kv("format", format);
    output::kv("version", &metadata.version);
    output::kv("vault", &metadata.vault);
    output::kv("mode", metadata.mode);
    output::kv("recipients", metadata.recipients.join(", "));
    if let Some(at) = metadata.encrypted_at {
        output::kv("encrypted", at.to_rfc3339());
    }
    Ok(())
}
