//! Tests for error handling and CLI flags.

use crate::support::*;

#[test]
fn test_help() {
    let t = Test::new();

    let output = t.cmd().arg("--help").output().unwrap();
    assert_success(&output);
    let out = stdout(&output);
    assert!(out.contains("encrypt") && out.contains("decrypt"));
}

#[test]
fn test_unknown_command_fails() {
    let t = Test::new();

    let output = t.cmd().arg("unknown-command").output().unwrap();
    assert_failure(&output);
}

#[test]
fn test_version_flag() {
    let t = Test::new();

    let output = t.cmd().arg("--version").output().unwrap();
    assert_success(&output);
    assert!(stdout(&output).contains("shhh"));
}

#[test]
fn test_verbose_logs_to_stderr() {
    let (t, _) = Test::with_keys(&[ALICE]);
    t.write(".env", "A=1\n");

    let output = t
        .cmd()
        .args(["--verbose", "encrypt", ".env", "-r", ALICE])
        .output()
        .unwrap();
    assert_success(&output);
    assert_stderr_contains(&output, "encrypting file");
    assert!(!stdout(&output).contains("DEBUG"));
}

#[test]
fn test_missing_input_file() {
    let (t, _) = Test::with_keys(&[ALICE]);

    let output = t.encrypt("nope.env", &[ALICE], "out.env");
    assert_failure(&output);
    assert_stderr_contains(&output, "io error");
}

#[test]
fn test_unknown_backend() {
    let t = Test::new();
    t.write(".env", "A=1\n");

    let output = t
        .cmd()
        .env("SHHH_BACKEND", "vault")
        .args(["decrypt", ".env"])
        .output()
        .unwrap();
    assert_failure(&output);
    assert_stderr_contains(&output, "unknown backend: vault");
}

#[test]
fn test_settings_file() {
    let t = Test::new();
    let settings = t.write("shhh.toml", "backend = \"gpg\"\ngpg_program = \"no-such-gpg\"\n");
    t.write(".env", "A=1\n");

    // the environment still forces native, so the gpg program is never used
    let output = t
        .cmd()
        .arg("--config")
        .arg(&settings)
        .args(["decrypt", ".env"])
        .output()
        .unwrap();
    assert_success(&output);
    assert_eq!(stdout(&output), "A=1\n");
}

#[test]
fn test_broken_settings_file() {
    let t = Test::new();
    let settings = t.write("shhh.toml", "backend = [\n");

    let output = t
        .cmd()
        .arg("--config")
        .arg(&settings)
        .args(["inspect", "x.env"])
        .output()
        .unwrap();
    assert_failure(&output);
    assert_stderr_contains(&output, "failed to parse settings");
}
