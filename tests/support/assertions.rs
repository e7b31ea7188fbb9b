//! Test assertion helpers.

use std::process::Output;

/// Assert that a command output was successful.
pub fn assert_success(output: &Output) {
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        panic!("Command failed:\n{}", stderr);
    }
}

/// Assert that a command output failed.
pub fn assert_failure(output: &Output) {
    assert!(
        !output.status.success(),
        "Expected command to fail but it succeeded"
    );
}

/// Get stdout as String.
pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

/// Get stderr as String.
pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

/// Assert stderr contains a string.
pub fn assert_stderr_contains(output: &Output, expected: &str) {
    let err = stderr(output);
    assert!(
        err.contains(expected),
        "stderr missing '{}', got: {}",
        expected,
        err
    );
}

/// Assert no secret from `secrets` appears in `text`.
pub fn assert_no_leak(text: &str, secrets: &[&str]) {
    for secret in secrets {
        assert!(
            !text.contains(secret),
            "plaintext '{}' leaked into:\n{}",
            secret,
            text
        );
    }
}

/// Number of `ENC[v1:` markers in `text`.
pub fn marker_count(text: &str) -> usize {
    text.matches("ENC[v1:").count()
}

/// Every `ENC[v1:...]` marker in `text`, in order.
pub fn markers(text: &str) -> Vec<String> {
    let mut found = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find("ENC[v1:") {
        let Some(len) = rest[start..].find(']') else {
            break;
        };
        found.push(rest[start..start + len + 1].to_string());
        rest = &rest[start + len + 1..];
    }
    found
}
