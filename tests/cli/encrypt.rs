//! Tests for `shhh encrypt`.

use crate::support::*;
use predicates::prelude::*;

#[test]
fn test_encrypt_env_to_file() {
    let (t, _) = Test::with_keys(&[ALICE]);
    t.write(".env", SAMPLE_ENV);

    let output = t.encrypt(".env", &[ALICE], ".env.enc");
    assert_success(&output);
    assert_stderr_contains(&output, "encrypted .env for 1 recipient");

    let encrypted = t.read(".env.enc");
    assert_no_leak(&encrypted, SECRETS);
    assert_eq!(marker_count(&encrypted), 3);
    assert!(encrypted.contains("# shhh metadata"));
}

#[test]
fn test_encrypt_to_stdout() {
    let (t, _) = Test::with_keys(&[ALICE]);
    t.write("app.yaml", SAMPLE_YAML);

    t.cmd()
        .args(["encrypt", "app.yaml", "-r", ALICE])
        .assert()
        .success()
        .stdout(predicate::str::contains("password: "))
        .stdout(predicate::str::contains("ENC[v1:"))
        .stdout(predicate::str::contains("timeout: ENC[v1:"))
        .stdout(predicate::str::contains("\n  replicas:\n  - ENC[v1:"))
        .stdout(predicate::str::contains("s3cr3t-db-pass").not());
}

#[test]
fn test_encrypt_from_stdin_with_format_hint() {
    let (t, _) = Test::with_keys(&[ALICE]);

    t.cmd()
        .args(["encrypt", "-", "--as", "x.env", "-r", ALICE])
        .write_stdin("TOKEN=abc\n")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("TOKEN=ENC[v1:"));
}

#[test]
fn test_encrypt_full_mode() {
    let (t, _) = Test::with_keys(&[ALICE]);
    t.write("app.json", SAMPLE_JSON);

    t.cmd()
        .args(["encrypt", "app.json", "-r", ALICE, "--mode", "full", "--vault", "ops"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("-----BEGIN SHHH ENCRYPTED FILE-----"))
        .stdout(predicate::str::contains("Vault: ops"))
        .stdout(predicate::str::contains("Mode: full"));
}

#[test]
fn test_encrypt_multiple_recipients() {
    let (t, _) = Test::with_keys(&[ALICE]);
    let bob = cert(BOB);
    t.add_public_key(&bob);
    t.write(".env", "A=1\n");

    let output = t.encrypt(".env", &[ALICE, BOB], "out.env");
    assert_success(&output);
    assert_stderr_contains(&output, "2 recipients");

    // bob can read it with only his own key
    let reader = engine([bob]);
    let decrypted = reader
        .decrypt_file_content(t.read("out.env").as_bytes(), ".env")
        .unwrap();
    assert_eq!(decrypted.as_slice(), b"A=1\n");
}

#[test]
fn test_encrypt_unknown_recipient_fails() {
    let (t, _) = Test::with_keys(&[ALICE]);
    t.write(".env", "A=1\n");

    let output = t.encrypt(".env", &[ALICE, CAROL], "out.env");
    assert_failure(&output);
    assert_stderr_contains(&output, "key not found: carol@test.com");
    assert_stderr_contains(&output, "shhh key import");
    assert!(!t.exists("out.env"));
}

#[test]
fn test_encrypt_warns_about_expiring_key() {
    let t = Test::new();
    t.add_secret_key(&expiring_cert(ALICE, 5));
    t.write(".env", "A=1\n");

    let output = t.encrypt(".env", &[ALICE], "out.env");
    assert_success(&output);
    assert_stderr_contains(&output, "key for alice@test.com expires on");
}

#[test]
fn test_encrypt_expired_key_fails() {
    let t = Test::new();
    t.add_secret_key(&expired_cert(ALICE));
    t.write(".env", "A=1\n");

    let output = t.encrypt(".env", &[ALICE], "out.env");
    assert_failure(&output);
    assert_stderr_contains(&output, "key has expired");
}

#[test]
fn test_encrypt_invalid_recipient() {
    let (t, _) = Test::with_keys(&[ALICE]);
    t.write(".env", "A=1\n");

    let output = t.encrypt(".env", &["not-an-email"], "out.env");
    assert_failure(&output);
    assert_stderr_contains(&output, "invalid recipient");
}
