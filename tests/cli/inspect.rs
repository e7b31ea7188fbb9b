//! Tests for `shhh inspect`.

use crate::support::*;

#[test]
fn test_inspect_encrypted_file() {
    let (t, _) = Test::with_keys(&[ALICE]);
    t.write("app.yaml", SAMPLE_YAML);
    let output = t
        .cmd()
        .args(["encrypt", "app.yaml", "-r", ALICE, "--vault", "prod", "-o", "app.enc.yaml"])
        .output()
        .unwrap();
    assert_success(&output);

    let output = t.inspect("app.enc.yaml");
    assert_success(&output);
    let out = stdout(&output);
    assert!(out.contains("vault:"));
    assert!(out.contains("prod"));
    assert!(out.contains("values"));
    assert!(out.contains(ALICE));
    assert!(out.contains("yaml"));
}

#[test]
fn test_inspect_json() {
    let (t, _) = Test::with_keys(&[ALICE]);
    t.write("blob.bin", "payload");
    assert_success(&t.encrypt("blob.bin", &[ALICE], "blob.bin.shhh"));

    let output = t.inspect_json("blob.bin.shhh");
    assert_success(&output);
    let meta: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(meta["mode"], "full");
    assert_eq!(meta["vault"], "default");
    assert_eq!(meta["recipients"][0], ALICE);
}

#[test]
fn test_inspect_needs_no_keys() {
    let (t, _) = Test::with_keys(&[ALICE]);
    t.write(".env", "A=1\n");
    assert_success(&t.encrypt(".env", &[ALICE], "out.env"));

    // wipe the keyring
    std::fs::remove_file(t.gnupg().join("secring.gpg")).unwrap();

    let output = t.inspect("out.env");
    assert_success(&output);
    assert!(stdout(&output).contains(ALICE));
}

#[test]
fn test_inspect_plain_file() {
    let t = Test::new();
    t.write(".env", "A=1\n");

    let output = t.inspect(".env");
    assert_success(&output);
    assert_stderr_contains(&output, "is not encrypted");

    let output = t.inspect_json(".env");
    assert_success(&output);
    assert_eq!(stdout(&output).trim(), "null");
}
