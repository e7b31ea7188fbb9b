//! Tests for `shhh decrypt`.

use crate::support::*;
use predicates::prelude::*;

#[test]
fn test_encrypt_then_decrypt_each_format() {
    let (t, _) = Test::with_keys(&[ALICE]);

    for (name, doc) in [
        ("app.json", SAMPLE_JSON),
        ("app.ini", SAMPLE_INI),
        (".env", SAMPLE_ENV),
    ] {
        t.write(name, doc);
        let encrypted = format!("enc-{}", name.trim_start_matches('.'));
        assert_success(&t.encrypt(name, &[ALICE], &encrypted));

        let output = t
            .cmd()
            .args(["decrypt", &encrypted, "--as", name])
            .output()
            .unwrap();
        assert_success(&output);
        assert_eq!(stdout(&output), doc, "round trip of {}", name);
    }
}

#[test]
fn test_decrypt_to_file() {
    let (t, _) = Test::with_keys(&[ALICE]);
    t.write(".env", SAMPLE_ENV);
    assert_success(&t.encrypt(".env", &[ALICE], "sealed.env"));

    t.cmd()
        .args(["decrypt", "sealed.env", "-o", "plain.env"])
        .assert()
        .success()
        .stderr(predicate::str::contains("decrypted sealed.env to"));

    assert_eq!(t.read("plain.env"), SAMPLE_ENV);
}

#[test]
fn test_decrypt_full_file() {
    let (t, _) = Test::with_keys(&[ALICE]);
    t.write("notes.txt", "meet at dawn\n");
    assert_success(&t.encrypt("notes.txt", &[ALICE], "notes.txt.shhh"));
    assert!(t.read("notes.txt.shhh").starts_with("-----BEGIN SHHH"));

    let output = t.decrypt("notes.txt.shhh");
    assert_success(&output);
    assert_eq!(stdout(&output), "meet at dawn\n");
}

#[test]
fn test_decrypt_without_private_key() {
    let t = Test::new();
    let bob = cert(BOB);
    t.add_public_key(&public(&bob));
    t.write(".env", "A=1\n");
    assert_success(&t.encrypt(".env", &[BOB], "out.env"));

    let output = t.decrypt("out.env");
    assert_failure(&output);
    assert_stderr_contains(&output, "no private key");
    assert_stderr_contains(&output, "A (line 1)");
}

#[test]
fn test_decrypt_plain_unknown_file() {
    let t = Test::new();
    t.write("notes.txt", "just text\n");

    let output = t.decrypt("notes.txt");
    assert_failure(&output);
    assert_stderr_contains(&output, "unsupported file format");
    assert_stderr_contains(&output, "--as");
}
