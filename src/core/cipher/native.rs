//! In-process OpenPGP backend.
//!
//! Encrypts and decrypts with sequoia against a keyring read once from the
//! GnuPG home directory. Only the legacy keyring files are readable here
//! (`pubring.gpg`, `secring.gpg`) plus any exported keys dropped into
//! `shhh-keys/`; a keybox-only setup resolves nothing natively and is left
//! to the `gpg` backend through [`super::Fallback`].

use std::cell::Cell;
use std::fs;
use std::io::{Read, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use sequoia_openpgp as openpgp;

use openpgp::cert::amalgamation::key::ValidErasedKeyAmalgamation;
use openpgp::cert::prelude::*;
use openpgp::cert::CertParser;
use openpgp::crypto::SessionKey;
use openpgp::packet::key::PublicParts;
use openpgp::packet::{PKESK, SKESK};
use openpgp::parse::stream::{
    DecryptionHelper, DecryptorBuilder, MessageStructure, VerificationHelper,
};
use openpgp::parse::Parse;
use openpgp::policy::StandardPolicy;
use openpgp::serialize::stream::{Armorer, Encryptor2, LiteralWriter, Message};
use openpgp::serialize::SerializeInto;
use openpgp::types::SymmetricAlgorithm;
use openpgp::{Cert, Fingerprint, KeyHandle};
use tracing::{debug, trace};

use super::{is_expired, KeyInfo, Provider, Resolution};
use crate::core::constants::EXTRA_KEYS_DIR;
use crate::error::{CipherError, Result};

const POLICY: &StandardPolicy = &StandardPolicy::new();

/// Keyring file names read from the GnuPG home, in load order.
const KEYRING_FILES: &[&str] = &["pubring.gpg", "secring.gpg"];

/// Extensions picked up from the extra keys directory.
const KEY_EXTENSIONS: &[&str] = &["asc", "gpg", "pgp", "key"];

/// Built-in OpenPGP provider.
#[derive(Debug, Clone, Default)]
pub struct Native {
    keyring: Vec<Cert>,
}

impl Native {
    /// Load every readable certificate under a GnuPG home directory.
    ///
    /// Missing or unreadable files are skipped; the resulting keyring may be
    /// empty.
    pub fn load(home: &Path) -> Self {
        let mut native = Self::default();

        for name in KEYRING_FILES {
            native.load_file(&home.join(name));
        }

        let extra = home.join(EXTRA_KEYS_DIR);
        if let Ok(entries) = fs::read_dir(&extra) {
            let mut paths: Vec<_> = entries
                .filter_map(|e| e.ok().map(|e| e.path()))
                .filter(|p| {
                    p.extension()
                        .and_then(|e| e.to_str())
                        .is_some_and(|e| KEY_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
                })
                .collect();
            paths.sort();
            for path in paths {
                native.load_file(&path);
            }
        }

        debug!(
            home = %home.display(),
            certs = native.keyring.len(),
            "loaded native keyring"
        );
        native
    }

    /// Build a provider over an explicit set of certificates.
    pub fn from_certs(certs: impl IntoIterator<Item = Cert>) -> Self {
        let mut native = Self::default();
        for cert in certs {
            native.add_cert(cert);
        }
        native
    }

    /// Add a certificate, merging it with an existing one of the same
    /// fingerprint (so a public key and its secret half become one entry).
    pub fn add_cert(&mut self, cert: Cert) {
        let existing = self
            .keyring
            .iter()
            .position(|c| c.fingerprint() == cert.fingerprint());

        match existing {
            Some(pos) => match self.keyring[pos].clone().merge_public_and_secret(cert) {
                Ok(merged) => self.keyring[pos] = merged,
                Err(e) => debug!(error = %e, "failed to merge certificate"),
            },
            None => self.keyring.push(cert),
        }
    }

    /// Certificates currently in the keyring.
    pub fn keyring(&self) -> &[Cert] {
        &self.keyring
    }

    fn load_file(&mut self, path: &Path) {
        let Ok(bytes) = fs::read(path) else {
            return;
        };

        let parser = match CertParser::from_bytes(&bytes) {
            Ok(parser) => parser,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "skipping unreadable keyring");
                return;
            }
        };

        for cert in parser {
            match cert {
                Ok(cert) => self.add_cert(cert),
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "skipping unreadable certificate")
                }
            }
        }
    }

    fn find(&self, email: &str) -> Option<&Cert> {
        self.keyring.iter().find(|cert| has_email(cert, email))
    }

    /// Find a certificate that can receive encrypted messages.
    fn recipient(&self, email: &str) -> Result<&Cert> {
        let cert = self
            .find(email)
            .ok_or_else(|| CipherError::KeyNotFound(email.to_string()))?;

        if encryption_keys(cert).next().is_none() {
            if key_info(cert, email)?.is_expired {
                return Err(CipherError::KeyExpired(email.to_string()).into());
            }
            return Err(CipherError::InvalidKey(format!(
                "{}: no valid encryption subkey",
                email
            ))
            .into());
        }

        Ok(cert)
    }
}

fn has_email(cert: &Cert, email: &str) -> bool {
    cert.userids().any(|ua| {
        ua.userid()
            .email_normalized()
            .ok()
            .flatten()
            .is_some_and(|e| e.eq_ignore_ascii_case(email))
    })
}

fn first_email(cert: &Cert) -> Option<String> {
    cert.userids()
        .find_map(|ua| ua.userid().email_normalized().ok().flatten())
}

fn encryption_keys(
    cert: &Cert,
) -> impl Iterator<Item = ValidErasedKeyAmalgamation<'_, PublicParts>> {
    cert.keys()
        .with_policy(POLICY, None)
        .supported()
        .alive()
        .revoked(false)
        .for_transport_encryption()
}

fn key_info(cert: &Cert, email: &str) -> Result<KeyInfo> {
    let created_at: DateTime<Utc> = cert.primary_key().key().creation_time().into();
    let expires_at = cert
        .with_policy(POLICY, None)
        .ok()
        .and_then(|vc| vc.primary_key().key_expiration_time())
        .map(DateTime::<Utc>::from);

    let public_key = cert
        .armored()
        .to_vec()
        .map_err(|e| CipherError::InvalidKey(format!("failed to armor key: {}", e)))?;

    Ok(KeyInfo {
        email: email.to_string(),
        key_id: cert.keyid().to_hex(),
        fingerprint: cert.fingerprint().to_hex(),
        expires_at,
        created_at,
        is_expired: is_expired(expires_at),
        public_key,
    })
}

impl Provider for Native {
    fn name(&self) -> &'static str {
        "native"
    }

    fn lookup_key(&self, email: &str) -> Result<KeyInfo> {
        let cert = self
            .find(email)
            .ok_or_else(|| CipherError::KeyNotFound(email.to_string()))?;
        key_info(cert, email)
    }

    fn public_key(&self, email: &str) -> Result<Vec<u8>> {
        Ok(self.lookup_key(email)?.public_key)
    }

    fn encrypt(&self, plaintext: &[u8], recipients: &[String]) -> Result<Vec<u8>> {
        if recipients.is_empty() {
            return Err(CipherError::NoRecipients.into());
        }

        trace!(
            recipients = recipients.len(),
            plaintext_len = plaintext.len(),
            "encrypting natively"
        );

        let certs = Resolution::resolve(recipients, |email| self.recipient(email)).into_result()?;
        let keys: Vec<_> = certs.into_iter().flat_map(encryption_keys).collect();

        let mut sink = Vec::new();
        {
            let message = Message::new(&mut sink);
            let message = Armorer::new(message)
                .build()
                .map_err(|e| CipherError::EncryptionFailed(e.to_string()))?;
            let message = Encryptor2::for_recipients(message, keys)
                .build()
                .map_err(|e| CipherError::EncryptionFailed(e.to_string()))?;
            let mut message = LiteralWriter::new(message)
                .build()
                .map_err(|e| CipherError::EncryptionFailed(e.to_string()))?;
            message
                .write_all(plaintext)
                .map_err(|e| CipherError::EncryptionFailed(e.to_string()))?;
            message
                .finalize()
                .map_err(|e| CipherError::EncryptionFailed(e.to_string()))?;
        }

        trace!(ciphertext_len = sink.len(), "encrypted natively");
        Ok(sink)
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        trace!(ciphertext_len = ciphertext.len(), "decrypting natively");

        let secrets: Vec<&Cert> = self.keyring.iter().filter(|c| c.is_tsk()).collect();
        if secrets.is_empty() {
            return Err(CipherError::NoPrivateKey.into());
        }

        let attempt = Cell::new(Attempt::NotReached);
        let helper = Helper {
            secrets: &secrets,
            attempt: &attempt,
        };

        let opened = DecryptorBuilder::from_bytes(ciphertext)
            .and_then(|builder| builder.with_policy(POLICY, None, helper));

        let mut decryptor = match opened {
            Ok(decryptor) => decryptor,
            Err(e) if attempt.get() == Attempt::NoMatch => {
                debug!(error = %e, "no native secret key matched");
                return Err(CipherError::NoPrivateKey.into());
            }
            Err(e) => return Err(CipherError::DecryptionFailed(e.to_string()).into()),
        };

        let mut plaintext = Vec::new();
        decryptor
            .read_to_end(&mut plaintext)
            .map_err(|e| CipherError::DecryptionFailed(e.to_string()))?;

        trace!(plaintext_len = plaintext.len(), "decrypted natively");
        Ok(plaintext)
    }

    fn import_public_key(&mut self, armored: &[u8]) -> Result<KeyInfo> {
        let cert = CertParser::from_bytes(armored)
            .map_err(|e| CipherError::InvalidKey(e.to_string()))?
            .next()
            .ok_or_else(|| CipherError::InvalidKey("no key found in input".to_string()))?
            .map_err(|e| CipherError::InvalidKey(e.to_string()))?
            .strip_secret_key_material();

        let email = first_email(&cert).unwrap_or_default();
        let info = key_info(&cert, &email)?;

        debug!(fingerprint = %info.fingerprint, "imported public key");
        self.add_cert(cert);
        Ok(info)
    }
}

/// How far decryption got before it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attempt {
    /// The message was rejected before any key was tried.
    NotReached,
    NoMatch,
    Matched,
}

struct Helper<'a> {
    secrets: &'a [&'a Cert],
    attempt: &'a Cell<Attempt>,
}

impl VerificationHelper for Helper<'_> {
    fn get_certs(&mut self, _ids: &[KeyHandle]) -> openpgp::Result<Vec<Cert>> {
        Ok(Vec::new())
    }

    fn check(&mut self, _structure: MessageStructure) -> openpgp::Result<()> {
        // messages are encrypted, not signed
        Ok(())
    }
}

impl DecryptionHelper for Helper<'_> {
    fn decrypt<D>(
        &mut self,
        pkesks: &[PKESK],
        _skesks: &[SKESK],
        sym_algo: Option<SymmetricAlgorithm>,
        mut decrypt: D,
    ) -> openpgp::Result<Option<Fingerprint>>
    where
        D: FnMut(SymmetricAlgorithm, &SessionKey) -> bool,
    {
        self.attempt.set(Attempt::NoMatch);

        for cert in self.secrets {
            for ka in cert.keys().unencrypted_secret() {
                let keyid = ka.key().keyid();
                let Ok(mut pair) = ka.key().clone().into_keypair() else {
                    continue;
                };

                for pkesk in pkesks {
                    if !pkesk.recipient().is_wildcard() && *pkesk.recipient() != keyid {
                        continue;
                    }
                    if let Some((algo, session_key)) = pkesk.decrypt(&mut pair, sym_algo) {
                        if decrypt(algo, &session_key) {
                            self.attempt.set(Attempt::Matched);
                            return Ok(Some(cert.fingerprint()));
                        }
                    }
                }
            }
        }

        Ok(None)
    }
}
