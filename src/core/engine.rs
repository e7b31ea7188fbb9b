//! Engine.
//!
//! The entry point for encrypting and decrypting configuration files. An
//! [`Engine`] owns one [`Provider`] and routes content through the matching
//! parser (per-value encryption) or the full-file [`Envelope`].

use tracing::{debug, trace};
use zeroize::{Zeroize, Zeroizing};

use crate::core::cipher::{KeyInfo, Provider, Resolution};
use crate::core::config::Settings;
use crate::core::detect::Format;
use crate::core::envelope::Envelope;
use crate::core::marker;
use crate::core::metadata::{FileMetadata, Mode};
use crate::core::parser::{self, Parser};
use crate::core::validation::{validate_content_size, validate_recipients, validate_vault};
use crate::error::{CipherError, FormatError, Result};

/// Vault label used when the caller does not name one.
pub const DEFAULT_VAULT: &str = "default";

/// How a file should be encrypted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptOptions {
    pub vault: String,
    pub mode: Mode,
    pub recipients: Vec<String>,
}

impl EncryptOptions {
    /// Per-value encryption for `recipients` in the default vault.
    pub fn new(recipients: Vec<String>) -> Self {
        Self {
            vault: DEFAULT_VAULT.to_string(),
            mode: Mode::Values,
            recipients,
        }
    }

    pub fn with_vault(mut self, vault: impl Into<String>) -> Self {
        self.vault = vault.into();
        self
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Check recipients and vault label.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for an empty, duplicated or malformed
    /// recipient, or a blank or multi-line vault label.
    pub fn validate(&self) -> Result<()> {
        validate_recipients(&self.recipients)?;
        validate_vault(&self.vault)
    }
}

/// Encrypts and decrypts file content with a provider.
pub struct Engine<P> {
    provider: P,
}

impl<P: Provider> std::fmt::Debug for Engine<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("provider", &self.provider.name())
            .finish()
    }
}

impl Engine<Box<dyn Provider>> {
    /// Engine over the provider described by `settings`.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.provider())
    }
}

impl<P: Provider> Engine<P> {
    // --- Construction ---
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Mutable provider access, for keyring imports.
    pub fn provider_mut(&mut self) -> &mut P {
        &mut self.provider
    }

    // --- Single values ---
    /// Encrypt one value into an `ENC[v1:...]` marker.
    ///
    /// # Errors
    ///
    /// Returns the provider's error if any recipient cannot be used.
    pub fn encrypt_value(&self, plaintext: &str, recipients: &[String]) -> Result<String> {
        let ciphertext = self.provider.encrypt(plaintext.as_bytes(), recipients)?;
        Ok(marker::encode(&ciphertext))
    }

    /// Decrypt one marker. Values that are not markers are returned as-is.
    ///
    /// # Errors
    ///
    /// Returns `CipherError::NoPrivateKey` if no available key opens the
    /// value, or `DecryptionFailed` if it is damaged or not UTF-8.
    pub fn decrypt_value(&self, value: &str) -> Result<Zeroizing<String>> {
        if !marker::is_marker(value) {
            return Ok(Zeroizing::new(value.to_string()));
        }

        let ciphertext = marker::decode(value)?;
        let plaintext = self.provider.decrypt(&ciphertext)?;
        String::from_utf8(plaintext).map(Zeroizing::new).map_err(|e| {
            e.into_bytes().zeroize();
            CipherError::DecryptionFailed("plaintext is not valid UTF-8".to_string()).into()
        })
    }

    // --- Files ---
    /// Encrypt a file's content.
    ///
    /// Structured formats in `values` mode get every secret value replaced
    /// by a marker plus an embedded metadata block. Unknown formats, and any
    /// file in `full` mode, are sealed whole in an [`Envelope`]. Content that
    /// is already a sealed envelope is returned unchanged.
    ///
    /// Every recipient is looked up before anything is encrypted, so a
    /// missing or expired key fails the call even for a file with nothing to
    /// encrypt.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for bad options or oversize content,
    /// `FormatError` for malformed documents, and the provider's error for
    /// unusable recipients.
    pub fn encrypt_file_content(
        &self,
        content: &[u8],
        filename: &str,
        options: &EncryptOptions,
    ) -> Result<String> {
        validate_content_size(content)?;
        options.validate()?;

        if Envelope::is_envelope(content) {
            debug!(filename, "already fully encrypted");
            return Ok(as_text(content, Format::Unknown)?.to_string());
        }

        self.check_recipients(&options.recipients)?;

        let format = Format::detect(filename);
        debug!(
            filename,
            %format,
            mode = %options.mode,
            recipients = options.recipients.len(),
            "encrypting file"
        );

        match (options.mode, parser::for_format(format)) {
            (Mode::Values, Some(parser)) => self.encrypt_values(parser, content, options),
            (mode, _) => {
                if mode == Mode::Values {
                    debug!(filename, "no parser for format, encrypting whole file");
                }
                self.seal(content, options)
            }
        }
    }

    /// Decrypt a file's content.
    ///
    /// Sealed envelopes are opened whole. Anything else is parsed by its
    /// format: markers are decrypted and the metadata block is removed.
    ///
    /// # Errors
    ///
    /// Returns `FormatError::Unsupported` for an unknown format that is not
    /// an envelope, `FormatError` for malformed content, and the provider's
    /// error when a value cannot be decrypted.
    pub fn decrypt_file_content(&self, content: &[u8], filename: &str) -> Result<Zeroizing<Vec<u8>>> {
        validate_content_size(content)?;

        if Envelope::is_envelope(content) {
            debug!(filename, "decrypting sealed file");
            let envelope = Envelope::parse(as_text(content, Format::Unknown)?)?;
            return Ok(Zeroizing::new(self.provider.decrypt(&envelope.ciphertext)?));
        }

        let format = Format::detect(filename);
        let parser = parser::for_format(format)
            .ok_or_else(|| FormatError::Unsupported(filename.to_string()))?;
        debug!(filename, %format, "decrypting values");

        let text = as_text(content, format)?;
        let mut decrypt = |value: &str| self.decrypt_value(value).map(|v| v.to_string());
        let decrypted = Zeroizing::new(parser.decrypt_values(text, &mut decrypt)?);
        let stripped = parser.strip_metadata(&decrypted)?;

        Ok(Zeroizing::new(stripped.into_bytes()))
    }

    /// Read a file's metadata without decrypting anything.
    ///
    /// Returns `None` for a structured file without a metadata block and for
    /// unknown formats that are not envelopes.
    pub fn file_metadata(&self, content: &[u8], filename: &str) -> Result<Option<FileMetadata>> {
        read_file_metadata(content, filename)
    }

    // --- Recipients ---
    /// Look up every recipient's key.
    ///
    /// Resolution is all-or-nothing: the first missing or expired key fails
    /// the whole list.
    ///
    /// # Errors
    ///
    /// Returns `CipherError::NoRecipients`, `KeyNotFound` or `KeyExpired`.
    pub fn check_recipients(&self, recipients: &[String]) -> Result<Vec<KeyInfo>> {
        if recipients.is_empty() {
            return Err(CipherError::NoRecipients.into());
        }

        let resolution = Resolution::resolve(recipients, |email| {
            let info = self.provider.lookup_key(email)?;
            if info.is_expired {
                return Err(CipherError::KeyExpired(email.to_string()).into());
            }
            Ok(info)
        });

        if let Resolution::Failed { email, error } = &resolution {
            debug!(email, error = %error, "recipient check failed");
        }
        resolution.into_result()
    }

    fn encrypt_values(
        &self,
        parser: &dyn Parser,
        content: &[u8],
        options: &EncryptOptions,
    ) -> Result<String> {
        let text = as_text(content, parser.format())?;

        let mut count = 0usize;
        let mut encrypt = |value: &str| {
            count += 1;
            self.encrypt_value(value, &options.recipients)
        };
        let encrypted = parser.encrypt_values(text, &mut encrypt)?;
        trace!(values = count, "encrypted values");

        let metadata = FileMetadata::new(&options.vault, Mode::Values, &options.recipients);
        parser.attach_metadata(&encrypted, &metadata)
    }

    fn seal(&self, content: &[u8], options: &EncryptOptions) -> Result<String> {
        let ciphertext = self.provider.encrypt(content, &options.recipients)?;
        let metadata = FileMetadata::new(&options.vault, Mode::Full, &options.recipients);
        Ok(Envelope::new(metadata, ciphertext).seal())
    }
}

/// Whether content is a sealed full-file envelope.
pub fn is_fully_encrypted(content: &[u8]) -> bool {
    Envelope::is_envelope(content)
}

/// Read metadata from an envelope or a structured document.
pub fn read_file_metadata(content: &[u8], filename: &str) -> Result<Option<FileMetadata>> {
    if Envelope::is_envelope(content) {
        return Envelope::read_metadata(as_text(content, Format::Unknown)?).map(Some);
    }

    let format = Format::detect(filename);
    match parser::for_format(format) {
        Some(parser) => parser.read_metadata(as_text(content, format)?),
        None => Ok(None),
    }
}

fn as_text(content: &[u8], format: Format) -> Result<&str> {
    std::str::from_utf8(content).map_err(|e| {
        FormatError::Parse {
            format: format.name(),
            message: format!("content is not valid UTF-8: {}", e),
        }
        .into()
    })
}
