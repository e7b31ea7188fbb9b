//! Error types.
//!
//! Every failure the engine can signal is a variant of [`Error`]. The
//! sub-enums group failures by concern so callers can match on the part
//! they care about (e.g. a missing key versus a malformed document).

use thiserror::Error;

/// Top-level error type.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Cipher(#[from] CipherError),

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures raised by a public-key provider.
#[derive(Error, Debug)]
pub enum CipherError {
    #[error("key not found: {0}")]
    KeyNotFound(String),

    #[error("key has expired: {0}")]
    KeyExpired(String),

    #[error("no private key available for decryption")]
    NoPrivateKey,

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("no recipients specified")]
    NoRecipients,

    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("decryption failed: {0}")]
    DecryptionFailed(String),

    /// Opaque backend failure, e.g. a nonzero exit from the gpg program.
    #[error("{backend} backend failed: {message}")]
    Backend {
        backend: &'static str,
        message: String,
    },
}

/// Document and envelope format failures.
#[derive(Error, Debug)]
pub enum FormatError {
    #[error("failed to parse {format}: {message}")]
    Parse {
        format: &'static str,
        message: String,
    },

    #[error("failed to encode {format}: {message}")]
    Serialize {
        format: &'static str,
        message: String,
    },

    #[error("failed to transform value at {location}: {source}")]
    Transform {
        location: String,
        #[source]
        source: Box<Error>,
    },

    #[error("invalid encrypted value: {0}")]
    InvalidMarker(String),

    #[error("invalid encrypted file: {0}")]
    Envelope(String),

    #[error("invalid metadata: {0}")]
    Metadata(String),

    #[error("unsupported file format: {0}")]
    Unsupported(String),
}

/// Input validation failures, raised before any transform runs.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("content too large: {size} bytes (max {limit})")]
    Oversize { size: usize, limit: usize },

    #[error("maximum nesting depth of {limit} exceeded")]
    DepthExceeded { limit: usize },

    #[error("no recipients specified")]
    EmptyRecipients,

    #[error("duplicate recipient: {0}")]
    DuplicateRecipient(String),

    #[error("invalid recipient '{recipient}': {reason}")]
    InvalidRecipient { recipient: String, reason: String },

    #[error("invalid vault name '{vault}': {reason}")]
    InvalidVault { vault: String, reason: String },
}

/// Settings loading failures.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read settings from {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("unknown backend: {0}. Supported: auto, native, gpg")]
    UnknownBackend(String),
}

impl Error {
    /// Whether this error means the provider does not know the requested key.
    pub fn is_key_not_found(&self) -> bool {
        matches!(self, Error::Cipher(CipherError::KeyNotFound(_)))
    }

    /// Whether this error means no usable private key was available.
    pub fn is_no_private_key(&self) -> bool {
        matches!(self, Error::Cipher(CipherError::NoPrivateKey))
    }

    /// Wrap this error with the location of the value being transformed.
    pub(crate) fn at(self, location: impl Into<String>) -> Error {
        FormatError::Transform {
            location: location.into(),
            source: Box::new(self),
        }
        .into()
    }
}

pub type Result<T> = std::result::Result<T, Error>;
