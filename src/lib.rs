//! shhh - encrypt secrets inside configuration files.
//!
//! Secret values in YAML, JSON, INI and `.env` files are replaced with
//! OpenPGP-encrypted `ENC[v1:...]` markers while keys, sections and ordering
//! stay put, so encrypted files still diff cleanly. Files without a known
//! structure are sealed whole in an armored envelope.
//!
//! # Architecture
//!
//! ```text
//! src/
//! ├── cli/              # Command-line interface
//! │   ├── encrypt       # Encrypt a file
//! │   ├── decrypt       # Decrypt a file
//! │   ├── inspect       # Show file metadata
//! │   └── key           # Show, export and import public keys
//! └── core/             # Core library components
//!     ├── engine        # Encrypt/decrypt orchestration
//!     ├── detect        # Format detection by filename
//!     ├── parser/       # Format-aware value parsers
//!     │   ├── node      # Tagged-union document tree
//!     │   ├── yaml      # YAML
//!     │   ├── json      # JSON
//!     │   ├── ini       # INI
//!     │   └── env       # .env
//!     ├── marker        # ENC[v1:...] value markers
//!     ├── envelope      # Full-file envelope
//!     ├── metadata      # File metadata side-channel
//!     ├── cipher/       # Public-key providers
//!     │   ├── mod       # Provider trait
//!     │   ├── native    # In-process OpenPGP
//!     │   ├── gpg       # gpg shell-out
//!     │   └── fallback  # Native first, gpg second
//!     ├── validation    # Input limits and option checks
//!     └── config        # Settings
//! ```
//!
//! # Example
//!
//! ```no_run
//! use shhh::core::cipher::Native;
//! use shhh::core::engine::{EncryptOptions, Engine};
//! use std::path::Path;
//!
//! let engine = Engine::new(Native::load(Path::new("/home/me/.gnupg")));
//! let options = EncryptOptions::new(vec!["alice@example.com".to_string()]);
//!
//! let encrypted = engine.encrypt_file_content(b"password: hunter2\n", "app.yaml", &options)?;
//! let decrypted = engine.decrypt_file_content(encrypted.as_bytes(), "app.yaml")?;
//! assert_eq!(decrypted.as_slice(), b"password: hunter2\n");
//! # Ok::<(), shhh::error::Error>(())
//! ```

pub mod cli;
pub mod core;
pub mod error;

pub use crate::core::cipher::{Fallback, Gpg, KeyInfo, Native, Provider};
pub use crate::core::config::Settings;
pub use crate::core::detect::Format;
pub use crate::core::engine::{is_fully_encrypted, EncryptOptions, Engine};
pub use crate::core::metadata::{FileMetadata, Mode};
pub use crate::error::{Error, Result};
