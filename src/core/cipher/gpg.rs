//! GnuPG shell-out backend.
//!
//! Delegates every operation to the `gpg` program, one process per call.
//! Useful when keys live in a keybox, on a smartcard, or behind an agent
//! that the native backend cannot reach.
//!
//! ## Requirements
//!
//! - `gpg` must be installed (or `SHHH_GPG` must point at it)
//! - the keyring must hold the recipients' public keys
//! - decryption needs a private key gpg can use without prompting

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, trace};

use super::{is_expired, KeyInfo, Provider};
use crate::core::constants::GPG_PROGRAM;
use crate::error::{CipherError, Result};

/// Provider backed by the `gpg` command line tool.
#[derive(Debug, Clone)]
pub struct Gpg {
    program: String,
    homedir: Option<PathBuf>,
}

impl Default for Gpg {
    fn default() -> Self {
        Self::new()
    }
}

impl Gpg {
    pub fn new() -> Self {
        Self {
            program: GPG_PROGRAM.to_string(),
            homedir: None,
        }
    }

    /// Use a different gpg executable (name on PATH or absolute path).
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Pass `--homedir` on every invocation.
    pub fn with_homedir(mut self, homedir: impl Into<PathBuf>) -> Self {
        self.homedir = Some(homedir.into());
        self
    }

    /// Whether the configured program can be found.
    pub fn is_available(&self) -> bool {
        which::which(&self.program).is_ok()
    }

    fn command(&self) -> Result<Command> {
        let program = which::which(&self.program).map_err(|_| CipherError::Backend {
            backend: "gpg",
            message: format!(
                "{} not found. Install GnuPG from https://gnupg.org/download/",
                self.program
            ),
        })?;

        let mut cmd = Command::new(program);
        cmd.arg("--batch");
        if let Some(home) = &self.homedir {
            cmd.arg("--homedir").arg(home);
        }
        Ok(cmd)
    }

    /// Run gpg with `args`, feeding `input` on stdin.
    ///
    /// stdin is written from a separate thread so large inputs cannot
    /// deadlock against gpg filling its stdout pipe.
    fn run(&self, args: &[&str], input: Option<&[u8]>) -> Result<Output> {
        let mut cmd = self.command()?;
        cmd.args(args)
            .stdin(if input.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        trace!(?args, "running gpg");

        let mut child = cmd.spawn().map_err(|e| CipherError::Backend {
            backend: "gpg",
            message: format!("failed to spawn gpg: {}", e),
        })?;

        let stdin = child.stdin.take();
        let output = std::thread::scope(|scope| {
            if let (Some(mut pipe), Some(data)) = (stdin, input) {
                scope.spawn(move || {
                    // gpg closing stdin early surfaces as a nonzero exit
                    let _ = pipe.write_all(data);
                });
            }
            child.wait_with_output()
        })?;

        Ok(output)
    }
}

fn stderr_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).trim().to_string()
}

fn backend_error(stderr: String) -> crate::error::Error {
    CipherError::Backend {
        backend: "gpg",
        message: stderr,
    }
    .into()
}

/// Parse a `--with-colons` timestamp: epoch seconds or `YYYY-MM-DD`.
fn parse_timestamp(field: &str) -> Option<DateTime<Utc>> {
    if field.is_empty() {
        return None;
    }
    if let Ok(secs) = field.parse::<i64>() {
        return DateTime::from_timestamp(secs, 0);
    }
    NaiveDate::parse_from_str(field, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Build key details from a `--list-keys --with-colons` listing.
///
/// Only the first primary key (`pub` record) and its fingerprint are used.
fn parse_listing(email: &str, listing: &str) -> Option<KeyInfo> {
    let mut info: Option<KeyInfo> = None;
    let mut validity_expired = false;

    for line in listing.lines() {
        let fields: Vec<&str> = line.split(':').collect();
        match fields.first().copied() {
            Some("pub") => {
                if info.is_some() {
                    break;
                }
                let field = |i: usize| fields.get(i).copied().unwrap_or("");
                validity_expired = field(1) == "e";
                let expires_at = parse_timestamp(field(6));
                info = Some(KeyInfo {
                    email: email.to_string(),
                    key_id: field(4).to_string(),
                    fingerprint: String::new(),
                    expires_at,
                    created_at: parse_timestamp(field(5)).unwrap_or_default(),
                    is_expired: false,
                    public_key: Vec::new(),
                });
            }
            Some("fpr") => {
                if let Some(info) = info.as_mut() {
                    if info.fingerprint.is_empty() {
                        info.fingerprint = fields.get(9).copied().unwrap_or("").to_string();
                    }
                }
            }
            _ => {}
        }
    }

    let mut info = info.filter(|i| !i.key_id.is_empty())?;
    info.is_expired = validity_expired || is_expired(info.expires_at);
    Some(info)
}

/// User ID pattern matching exactly one address. A bare address is a
/// substring search in gpg, so `alice@x` would also find `malice@x`.
fn exact_address(email: &str) -> String {
    format!("<{}>", email)
}

/// Pull the first `<email>` out of gpg's import chatter.
fn imported_email(stderr: &str) -> Option<&str> {
    let start = stderr.find('<')? + 1;
    let len = stderr[start..].find('>')?;
    let email = &stderr[start..start + len];
    email.contains('@').then_some(email)
}

impl Provider for Gpg {
    fn name(&self) -> &'static str {
        "gpg"
    }

    fn lookup_key(&self, email: &str) -> Result<KeyInfo> {
        let pattern = exact_address(email);
        let output = self.run(
            &["--list-keys", "--with-colons", "--with-fingerprint", &pattern],
            None,
        )?;

        if !output.status.success() {
            let stderr = stderr_of(&output);
            if stderr.contains("No public key") || stderr.contains("not found") {
                return Err(CipherError::KeyNotFound(email.to_string()).into());
            }
            return Err(backend_error(stderr));
        }

        let listing = String::from_utf8_lossy(&output.stdout);
        parse_listing(email, &listing)
            .ok_or_else(|| CipherError::KeyNotFound(email.to_string()).into())
    }

    fn public_key(&self, email: &str) -> Result<Vec<u8>> {
        let output = self.run(&["--export", "--armor", &exact_address(email)], None)?;

        if !output.status.success() {
            return Err(backend_error(stderr_of(&output)));
        }
        if output.stdout.is_empty() {
            return Err(CipherError::KeyNotFound(email.to_string()).into());
        }
        Ok(output.stdout)
    }

    fn encrypt(&self, plaintext: &[u8], recipients: &[String]) -> Result<Vec<u8>> {
        if recipients.is_empty() {
            return Err(CipherError::NoRecipients.into());
        }

        trace!(
            recipients = recipients.len(),
            plaintext_len = plaintext.len(),
            "encrypting with gpg"
        );

        let patterns: Vec<String> = recipients.iter().map(|r| exact_address(r)).collect();
        let mut args = vec!["--encrypt", "--armor", "--trust-model", "always", "--yes"];
        for pattern in &patterns {
            args.push("--recipient");
            args.push(pattern);
        }

        let output = self.run(&args, Some(plaintext))?;
        if !output.status.success() {
            return Err(CipherError::EncryptionFailed(stderr_of(&output)).into());
        }

        trace!(ciphertext_len = output.stdout.len(), "encrypted with gpg");
        Ok(output.stdout)
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        trace!(ciphertext_len = ciphertext.len(), "decrypting with gpg");

        let output = self.run(&["--decrypt", "--quiet", "--yes"], Some(ciphertext))?;
        if !output.status.success() {
            let stderr = stderr_of(&output);
            if stderr.contains("No secret key") {
                return Err(CipherError::NoPrivateKey.into());
            }
            return Err(CipherError::DecryptionFailed(stderr).into());
        }

        Ok(output.stdout)
    }

    fn import_public_key(&mut self, armored: &[u8]) -> Result<KeyInfo> {
        let output = self.run(&["--import"], Some(armored))?;
        let stderr = stderr_of(&output);

        if !output.status.success() {
            if stderr.contains("no valid OpenPGP data") {
                return Err(CipherError::InvalidKey(stderr).into());
            }
            return Err(backend_error(stderr));
        }

        let email = imported_email(&stderr).ok_or_else(|| {
            CipherError::InvalidKey("imported key has no email address".to_string())
        })?;
        debug!(email, "imported public key with gpg");

        self.lookup_key(email)
    }
}
