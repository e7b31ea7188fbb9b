//! Encrypt command.

use std::path::Path;

use tracing::debug;

use crate::cli::{detection_name, output, read_input, write_output};
use crate::core::config::Settings;
use crate::core::engine::{EncryptOptions, Engine};
use crate::core::metadata::Mode;
use crate::error::Result;

/// Arguments for [`execute`].
pub struct Args<'a> {
    pub file: &'a Path,
    pub recipients: Vec<String>,
    pub vault: String,
    pub mode: Mode,
    pub as_name: Option<&'a str>,
    pub output: Option<&'a Path>,
}

/// Encrypt a file for the given recipients.
///
/// Recipient keys are checked first; keys expiring within the configured
/// window produce a warning but do not stop encryption.
pub fn execute(settings: &Settings, args: Args<'_>) -> Result<()> {
    let engine = Engine::from_settings(settings);
    let options = EncryptOptions::new(args.recipients)
        .with_vault(args.vault)
        .with_mode(args.mode);
    options.validate()?;

    for info in engine.check_recipients(&options.recipients)? {
        if info.is_expiring_soon(settings.expiry_warning_days) {
            let when = info
                .expires_at
                .map(|at| at.format("%Y-%m-%d").to_string())
                .unwrap_or_default();
            output::warn(&format!("key for {} expires on {}", info.email, when));
        }
    }

    let name = detection_name(args.file, args.as_name);
    let content = read_input(args.file)?;
    debug!(file = %name, bytes = content.len(), "read input");

    let encrypted = engine.encrypt_file_content(&content, &name, &options)?;
    write_output(encrypted.as_bytes(), args.output)?;

    output::success(&format!(
        "encrypted {} for {} recipient{}",
        output::path(&name),
        options.recipients.len(),
        if options.recipients.len() == 1 { "" } else { "s" }
    ));
    Ok(())
}
