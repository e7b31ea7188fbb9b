//! Constants used throughout shhh.
//!
//! Centralizes wire-format strings and hard limits.

/// Prefix of an inline encrypted value.
pub const MARKER_PREFIX: &str = "ENC[v1:";

/// Suffix of an inline encrypted value.
pub const MARKER_SUFFIX: &str = "]";

/// First line of a fully encrypted file.
pub const ENVELOPE_HEADER: &str = "-----BEGIN SHHH ENCRYPTED FILE-----";

/// Last line of a fully encrypted file.
pub const ENVELOPE_FOOTER: &str = "-----END SHHH ENCRYPTED FILE-----";

/// Base64 body width inside a fully encrypted file.
pub const ENVELOPE_LINE_WIDTH: usize = 64;

/// Reserved key (YAML/JSON) and section (INI) holding file metadata.
pub const METADATA_KEY: &str = "_shhh";

/// Comment line opening the metadata block in .env files.
pub const ENV_METADATA_MARKER: &str = "# shhh metadata";

/// Prefix of metadata lines in .env files.
pub const ENV_METADATA_PREFIX: &str = "_SHHH_";

/// Current metadata and envelope version.
pub const FORMAT_VERSION: &str = "1";

/// Largest document the engine accepts (50 MiB).
pub const MAX_CONTENT_SIZE: usize = 50 * 1024 * 1024;

/// Deepest structure the engine accepts.
pub const MAX_NESTING_DEPTH: usize = 100;

/// Days before expiry at which a key counts as expiring soon.
pub const EXPIRY_WARNING_DAYS: i64 = 30;

/// Default external OpenPGP program.
pub const GPG_PROGRAM: &str = "gpg";

/// Directory under the GnuPG home scanned for extra exported keys.
pub const EXTRA_KEYS_DIR: &str = "shhh-keys";
