//! Test fixtures: generated keys, engines and sample documents.

use sequoia_openpgp::cert::CertBuilder;
use sequoia_openpgp::Cert;
use shhh::{EncryptOptions, Engine, Native};
use std::time::{Duration, SystemTime};

const DAY: u64 = 86_400;

/// Generate a certificate (with secret key) for an email address.
pub fn cert(email: &str) -> Cert {
    let uid = format!("Test User <{}>", email);
    CertBuilder::general_purpose(None, Some(uid.as_str()))
        .generate()
        .expect("failed to generate key")
        .0
}

/// A certificate that expired yesterday.
pub fn expired_cert(email: &str) -> Cert {
    let uid = format!("Old User <{}>", email);
    CertBuilder::general_purpose(None, Some(uid.as_str()))
        .set_creation_time(SystemTime::now() - Duration::from_secs(3 * DAY))
        .set_validity_period(Duration::from_secs(2 * DAY))
        .generate()
        .expect("failed to generate key")
        .0
}

/// A certificate that expires in `days` days.
pub fn expiring_cert(email: &str, days: u64) -> Cert {
    let uid = format!("Soon User <{}>", email);
    CertBuilder::general_purpose(None, Some(uid.as_str()))
        .set_validity_period(Duration::from_secs(days * DAY))
        .generate()
        .expect("failed to generate key")
        .0
}

/// Public half of a certificate.
pub fn public(cert: &Cert) -> Cert {
    cert.clone().strip_secret_key_material()
}

/// Engine over an in-memory keyring.
pub fn engine(certs: impl IntoIterator<Item = Cert>) -> Engine<Native> {
    Engine::new(Native::from_certs(certs))
}

/// Per-value options for `recipients`.
pub fn options(recipients: &[&str]) -> EncryptOptions {
    EncryptOptions::new(recipients.iter().map(|r| r.to_string()).collect())
}

pub const ALICE: &str = "alice@test.com";
pub const BOB: &str = "bob@test.com";
pub const CAROL: &str = "carol@test.com";

/// Secrets that must never appear in encrypted output.
pub const SECRETS: &[&str] = &["s3cr3t-db-pass", "sk_live_4242", "jwt-signing-key"];

pub const SAMPLE_YAML: &str = "\
database:
  host: db.internal
  password: s3cr3t-db-pass
  replicas:
  - primary
  - standby
api:
  key: sk_live_4242
  timeout: 30
  enabled: true
";

pub const SAMPLE_JSON: &str = r#"{
  "database": {
    "host": "db.internal",
    "password": "s3cr3t-db-pass"
  },
  "api": {
    "key": "sk_live_4242",
    "timeout": 30,
    "tags": [
      "a",
      "b"
    ]
  },
  "debug": false
}
"#;

pub const SAMPLE_INI: &str = "\
; service settings
global = on

[database]
host = db.internal
password = \"s3cr3t-db-pass\"

[api]
key: sk_live_4242
";

pub const SAMPLE_ENV: &str = "\
# app secrets
DATABASE_PASSWORD=s3cr3t-db-pass
API_KEY=\"sk_live_4242\"
JWT_SECRET='jwt-signing-key'
EMPTY=

export_like
";
