//! Decrypt command.

use std::path::Path;

use crate::cli::{detection_name, output, read_input, write_output};
use crate::core::config::Settings;
use crate::core::engine::Engine;
use crate::error::Result;

/// Decrypt a file to stdout or `output`.
pub fn execute(
    settings: &Settings,
    file: &Path,
    as_name: Option<&str>,
    output_path: Option<&Path>,
) -> Result<()> {
    let engine = Engine::from_settings(settings);
    let name = detection_name(file, as_name);
    let content = read_input(file)?;

    let decrypted = engine.decrypt_file_content(&content, &name)?;
    write_output(&decrypted, output_path)?;

    if let Some(path) = output_path {
        output::success(&format!(
            "decrypted {} to {}",
            output::path(&name),
            output::path(path.display())
        ));
    }
    Ok(())
}
