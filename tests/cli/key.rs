//! Tests for `shhh key`.

use crate::support::*;
use sequoia_openpgp::serialize::SerializeInto;

#[test]
fn test_key_show() {
    let (t, certs) = Test::with_keys(&[ALICE]);

    let output = t.key(&["show", ALICE]);
    assert_success(&output);
    let out = stdout(&output);
    assert!(out.contains(&certs[0].fingerprint().to_hex()));
    assert!(out.contains("valid"));
}

#[test]
fn test_key_show_json() {
    let (t, certs) = Test::with_keys(&[ALICE]);

    let output = t.key(&["show", ALICE, "--json"]);
    assert_success(&output);
    let info: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(info["email"], ALICE);
    assert_eq!(info["key_id"], certs[0].keyid().to_hex());
    assert_eq!(info["is_expired"], false);
    assert!(info.get("public_key").is_none());
}

#[test]
fn test_key_show_missing() {
    let t = Test::new();

    let output = t.key(&["show", CAROL]);
    assert_failure(&output);
    assert_stderr_contains(&output, "key not found");
}

#[test]
fn test_key_export() {
    let (t, _) = Test::with_keys(&[ALICE]);

    let output = t.key(&["export", ALICE]);
    assert_success(&output);
    let out = stdout(&output);
    assert!(out.starts_with("-----BEGIN PGP PUBLIC KEY BLOCK-----"));
    assert!(!out.contains("PRIVATE KEY"));
}

#[test]
fn test_key_import_persists_for_next_run() {
    let (t, _) = Test::with_keys(&[ALICE]);
    let carol = cert(CAROL);
    t.write("carol.asc", carol.armored().to_vec().unwrap());

    let output = t.key(&["import", "carol.asc"]);
    assert_success(&output);
    assert_stderr_contains(&output, "imported key for carol@test.com");

    // a fresh process sees the imported key
    t.write(".env", "A=1\n");
    assert_success(&t.encrypt(".env", &[ALICE, CAROL], "out.env"));

    let saved = t
        .gnupg()
        .join("shhh-keys")
        .join(format!("{}.asc", carol.fingerprint().to_hex()));
    assert!(saved.exists());
}

#[test]
fn test_key_import_garbage() {
    let t = Test::new();
    t.write("junk.asc", "not a key");

    let output = t.key(&["import", "junk.asc"]);
    assert_failure(&output);
    assert_stderr_contains(&output, "invalid key");
}
