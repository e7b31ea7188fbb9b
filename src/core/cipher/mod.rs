//! Public-key cryptography providers.
//!
//! The engine never talks to OpenPGP directly; it goes through the
//! [`Provider`] trait. Two backends implement it:
//!
//! - **native**: in-process OpenPGP (sequoia) over a keyring loaded from the
//!   GnuPG home directory.
//! - **gpg**: shells out to the `gpg` program, one process per operation.
//!
//! [`Fallback`] composes the two so the native backend is tried first and
//! `gpg` only picks up the cases the native keyring cannot serve.
//!
//! ## Adding a New Backend
//!
//! 1. Implement the `Provider` trait
//! 2. Add the implementation in a new file next to `native.rs`
//! 3. Re-export from this module and wire it into `Settings::provider`

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;

use crate::error::{Error, Result};

pub mod fallback;
pub mod gpg;
pub mod native;

pub use fallback::Fallback;
pub use gpg::Gpg;
pub use native::Native;

/// Public key details returned by a lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyInfo {
    pub email: String,
    pub key_id: String,
    pub fingerprint: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub is_expired: bool,
    /// ASCII-armored public certificate. Empty when the backend's listing
    /// does not include it.
    #[serde(skip)]
    pub public_key: Vec<u8>,
}

impl KeyInfo {
    /// Whether the key expires within `days` days (or already has).
    pub fn is_expiring_soon(&self, days: i64) -> bool {
        is_expiring_soon(self.expires_at, days)
    }
}

/// Public-key encryption backend.
///
/// Recipients are email addresses. Ciphertexts are opaque bytes that only
/// the same family of providers needs to understand (armored OpenPGP for
/// both built-in backends).
pub trait Provider: Send + Sync {
    /// Backend name for logs and messages.
    fn name(&self) -> &'static str;

    /// Look up the public key for an email address.
    ///
    /// # Errors
    ///
    /// Returns `CipherError::KeyNotFound` if no key matches.
    fn lookup_key(&self, email: &str) -> Result<KeyInfo>;

    /// Export the ASCII-armored public key for an email address.
    ///
    /// # Errors
    ///
    /// Returns `CipherError::KeyNotFound` if no key matches.
    fn public_key(&self, email: &str) -> Result<Vec<u8>>;

    /// Encrypt `plaintext` so that any one of `recipients` can decrypt it.
    ///
    /// Every recipient must resolve to a usable key; one missing or expired
    /// key fails the whole call.
    ///
    /// # Errors
    ///
    /// Returns `CipherError::NoRecipients`, `KeyNotFound`, `KeyExpired` or
    /// `EncryptionFailed`.
    fn encrypt(&self, plaintext: &[u8], recipients: &[String]) -> Result<Vec<u8>>;

    /// Decrypt a ciphertext with whatever private key is available.
    ///
    /// # Errors
    ///
    /// Returns `CipherError::NoPrivateKey` if no available key can open the
    /// message and `DecryptionFailed` if the message is damaged.
    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>>;

    /// Add an ASCII-armored public key to the keyring.
    ///
    /// # Errors
    ///
    /// Returns `CipherError::InvalidKey` if the data holds no usable key.
    fn import_public_key(&mut self, armored: &[u8]) -> Result<KeyInfo>;
}

impl<P: Provider + ?Sized> Provider for Box<P> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn lookup_key(&self, email: &str) -> Result<KeyInfo> {
        (**self).lookup_key(email)
    }

    fn public_key(&self, email: &str) -> Result<Vec<u8>> {
        (**self).public_key(email)
    }

    fn encrypt(&self, plaintext: &[u8], recipients: &[String]) -> Result<Vec<u8>> {
        (**self).encrypt(plaintext, recipients)
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        (**self).decrypt(ciphertext)
    }

    fn import_public_key(&mut self, armored: &[u8]) -> Result<KeyInfo> {
        (**self).import_public_key(armored)
    }
}

/// Outcome of resolving a recipient list.
///
/// Resolution is all-or-nothing: either every recipient resolved, or the
/// first one that did not is reported with its error.
#[derive(Debug)]
pub enum Resolution<T> {
    Complete(Vec<T>),
    Failed { email: String, error: Error },
}

impl<T> Resolution<T> {
    /// Resolve each email in order, stopping at the first failure.
    pub fn resolve<F>(emails: &[String], mut resolve_one: F) -> Self
    where
        F: FnMut(&str) -> Result<T>,
    {
        let mut resolved = Vec::with_capacity(emails.len());
        for email in emails {
            match resolve_one(email) {
                Ok(item) => resolved.push(item),
                Err(error) => {
                    return Resolution::Failed {
                        email: email.clone(),
                        error,
                    }
                }
            }
        }
        Resolution::Complete(resolved)
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, Resolution::Complete(_))
    }

    pub fn into_result(self) -> Result<Vec<T>> {
        match self {
            Resolution::Complete(items) => Ok(items),
            Resolution::Failed { error, .. } => Err(error),
        }
    }
}

/// Whether an expiry time has passed.
pub fn is_expired(expires_at: Option<DateTime<Utc>>) -> bool {
    is_expired_at(expires_at, Utc::now())
}

pub fn is_expired_at(expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    expires_at.is_some_and(|at| at < now)
}

/// Whether an expiry time falls within the next `days` days.
///
/// Keys without an expiry never expire soon.
pub fn is_expiring_soon(expires_at: Option<DateTime<Utc>>, days: i64) -> bool {
    is_expiring_soon_at(expires_at, days, Utc::now())
}

pub fn is_expiring_soon_at(
    expires_at: Option<DateTime<Utc>>,
    days: i64,
    now: DateTime<Utc>,
) -> bool {
    let Some(at) = expires_at else {
        return false;
    };
    match TimeDelta::try_days(days).and_then(|d| now.checked_add_signed(d)) {
        Some(threshold) => at < threshold,
        None => true,
    }
}
