//! Key commands.

use std::path::Path;

use tracing::debug;

use crate::cli::{output, read_input, write_output};
use crate::core::cipher::{KeyInfo, Provider};
use crate::core::config::{Backend, Settings};
use crate::core::engine::Engine;
use crate::error::{FormatError, Result};

/// Show key details for an email address.
pub fn show(settings: &Settings, email: &str, json: bool) -> Result<()> {
    let engine = Engine::from_settings(settings);
    let info = engine.provider().lookup_key(email)?;

    if json {
        let rendered = serde_json::to_string_pretty(&info).map_err(|e| FormatError::Serialize {
            format: "json",
            message: e.to_string(),
        })?;
        println!("{}", rendered);
        return Ok(());
    }

    output::header(&info.email);
    output::kv("key id", &info.key_id);
    output::kv("fingerprint", &info.fingerprint);
    output::kv("created", info.created_at.format("%Y-%m-%d"));
    output::kv(
        "expires",
        info.expires_at
            .map(|at| at.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "never".to_string()),
    );
    output::kv("status", status(&info, settings.expiry_warning_days));
    Ok(())
}

fn status(info: &KeyInfo, warning_days: i64) -> &'static str {
    if info.is_expired {
        "expired"
    } else if info.is_expiring_soon(warning_days) {
        "expiring soon"
    } else {
        "valid"
    }
}

/// Print the armored public key for an email address.
pub fn export(settings: &Settings, email: &str) -> Result<()> {
    let engine = Engine::from_settings(settings);
    let armored = engine.provider().public_key(email)?;
    write_output(&armored, None)
}

/// Import a public key.
///
/// The native keyring lives in memory, so for the native and auto backends
/// the key is also saved under the extra keys directory where the next run
/// picks it up. The gpg backend stores it in gpg's own keyring.
pub fn import(settings: &Settings, file: &Path) -> Result<()> {
    let mut engine = Engine::from_settings(settings);
    let armored = read_input(file)?;
    let info = engine.provider_mut().import_public_key(&armored)?;

    if settings.backend != Backend::Gpg && !info.public_key.is_empty() {
        let dir = settings.extra_keys_dir();
        std::fs::create_dir_all(&dir)?;
        let path = dir.join(format!("{}.asc", info.fingerprint));
        std::fs::write(&path, &info.public_key)?;
        debug!(path = %path.display(), "saved imported key");
    }

    let who = if info.email.is_empty() {
        info.fingerprint.clone()
    } else {
        info.email.clone()
    };
    output::success(&format!("imported key for {} ({})", who, info.key_id));
    Ok(())
}
