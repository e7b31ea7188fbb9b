//! Primary/secondary provider composition.

use tracing::debug;

use super::{KeyInfo, Provider};
use crate::error::Result;

/// Tries `primary` first and falls back to `secondary` on specific failures.
///
/// | operation           | falls back when primary fails with |
/// |---------------------|------------------------------------|
/// | `lookup_key`        | `KeyNotFound`                      |
/// | `import_public_key` | `KeyNotFound`                      |
/// | `decrypt`           | `NoPrivateKey`                     |
/// | `encrypt`           | any error                          |
/// | `public_key`        | any error                          |
///
/// Any other primary failure is returned as-is.
#[derive(Debug, Clone)]
pub struct Fallback<A, B> {
    primary: A,
    secondary: B,
}

impl<A: Provider, B: Provider> Fallback<A, B> {
    pub fn new(primary: A, secondary: B) -> Self {
        Self { primary, secondary }
    }

    pub fn primary(&self) -> &A {
        &self.primary
    }

    pub fn secondary(&self) -> &B {
        &self.secondary
    }

    fn log_fallback(&self, operation: &str, error: &crate::error::Error) {
        debug!(
            operation,
            primary = self.primary.name(),
            secondary = self.secondary.name(),
            error = %error,
            "falling back"
        );
    }
}

impl<A: Provider, B: Provider> Provider for Fallback<A, B> {
    fn name(&self) -> &'static str {
        "fallback"
    }

    fn lookup_key(&self, email: &str) -> Result<KeyInfo> {
        match self.primary.lookup_key(email) {
            Err(e) if e.is_key_not_found() => {
                self.log_fallback("lookup_key", &e);
                self.secondary.lookup_key(email)
            }
            other => other,
        }
    }

    fn public_key(&self, email: &str) -> Result<Vec<u8>> {
        self.primary.public_key(email).or_else(|e| {
            self.log_fallback("public_key", &e);
            self.secondary.public_key(email)
        })
    }

    fn encrypt(&self, plaintext: &[u8], recipients: &[String]) -> Result<Vec<u8>> {
        self.primary.encrypt(plaintext, recipients).or_else(|e| {
            self.log_fallback("encrypt", &e);
            self.secondary.encrypt(plaintext, recipients)
        })
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        match self.primary.decrypt(ciphertext) {
            Err(e) if e.is_no_private_key() => {
                self.log_fallback("decrypt", &e);
                self.secondary.decrypt(ciphertext)
            }
            other => other,
        }
    }

    fn import_public_key(&mut self, armored: &[u8]) -> Result<KeyInfo> {
        match self.primary.import_public_key(armored) {
            Err(e) if e.is_key_not_found() => {
                self.log_fallback("import_public_key", &e);
                self.secondary.import_public_key(armored)
            }
            other => other,
        }
    }
}
