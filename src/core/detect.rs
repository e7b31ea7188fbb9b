//! File format detection.
//!
//! Maps a filename to the document format its values are parsed as. Detection
//! looks at the extension only and never at the content.

use std::fmt;
use std::path::Path;

/// Detected document format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Yaml,
    Json,
    Ini,
    Env,
    Unknown,
}

impl Format {
    /// Detect the format of a file from its name.
    ///
    /// Unknown extensions are routed to whole-file encryption by the engine.
    pub fn detect(filename: impl AsRef<Path>) -> Self {
        let path = filename.as_ref();

        // `.env` has no stem, so `Path::extension` reports nothing for it
        if path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.eq_ignore_ascii_case(".env"))
        {
            return Self::Env;
        }

        let ext = match path.extension().and_then(|e| e.to_str()) {
            Some(ext) => ext.to_ascii_lowercase(),
            None => return Self::Unknown,
        };

        match ext.as_str() {
            "yaml" | "yml" => Self::Yaml,
            "json" => Self::Json,
            "ini" | "cfg" | "conf" => Self::Ini,
            "env" => Self::Env,
            _ => Self::Unknown,
        }
    }

    /// Whether values in this format can be encrypted individually.
    pub fn is_structured(&self) -> bool {
        !matches!(self, Self::Unknown)
    }

    /// Display name for user-facing messages
    pub fn name(&self) -> &'static str {
        match self {
            Self::Yaml => "yaml",
            Self::Json => "json",
            Self::Ini => "ini",
            Self::Env => "env",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
