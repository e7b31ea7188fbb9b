//! Test support utilities for shhh integration tests.
//!
//! Provides isolated keyrings, generated keys and CLI helpers.

#![allow(dead_code)]

pub mod assertions;
pub mod commands;
pub mod fixtures;
pub mod skip;

#[allow(unused_imports)]
pub use assertions::*;
#[allow(unused_imports)]
pub use fixtures::*;

use sequoia_openpgp::serialize::SerializeInto;
use sequoia_openpgp::Cert;
use std::io::Write;
use std::path::PathBuf;
use tempfile::TempDir;

/// Test environment with isolated temp directories.
///
/// Each test gets its own working dir, home dir and GnuPG home. No
/// process-global state is mutated, so tests can run in parallel.
pub struct Test {
    /// Working directory for files under test
    pub dir: TempDir,
    /// Temporary home directory
    pub home: TempDir,
}

impl Test {
    /// Create an environment with an empty keyring.
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        let home = TempDir::new().expect("failed to create temp home");
        std::fs::create_dir_all(home.path().join(".gnupg")).expect("failed to create gnupg home");

        Self { dir, home }
    }

    /// Create an environment holding the secret keys for `emails`.
    ///
    /// Returns the generated certificates in the same order.
    pub fn with_keys(emails: &[&str]) -> (Self, Vec<Cert>) {
        let t = Self::new();
        let certs: Vec<Cert> = emails.iter().map(|e| cert(e)).collect();
        for c in &certs {
            t.add_secret_key(c);
        }
        (t, certs)
    }

    /// GnuPG home directory used by commands.
    pub fn gnupg(&self) -> PathBuf {
        self.home.path().join(".gnupg")
    }

    /// Append a certificate with its secret key to `secring.gpg`.
    pub fn add_secret_key(&self, cert: &Cert) {
        let bytes = cert.as_tsk().to_vec().expect("failed to serialize key");
        self.append("secring.gpg", &bytes);
    }

    /// Append a public certificate to `pubring.gpg`.
    pub fn add_public_key(&self, cert: &Cert) {
        let bytes = cert.to_vec().expect("failed to serialize key");
        self.append("pubring.gpg", &bytes);
    }

    fn append(&self, keyring: &str, bytes: &[u8]) {
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.gnupg().join(keyring))
            .expect("failed to open keyring");
        file.write_all(bytes).expect("failed to write keyring");
    }

    /// Write a file into the working directory.
    pub fn write(&self, name: &str, content: impl AsRef<[u8]>) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, content).expect("failed to write file");
        path
    }

    /// Read a file from the working directory.
    pub fn read(&self, name: &str) -> String {
        std::fs::read_to_string(self.dir.path().join(name)).expect("failed to read file")
    }

    /// Whether a file exists in the working directory.
    pub fn exists(&self, name: &str) -> bool {
        self.dir.path().join(name).exists()
    }
}
