//! Command helper methods for Test.

use super::Test;
use assert_cmd::Command;
use std::process::Output;

impl Test {
    /// Create a shhh command with an isolated environment.
    ///
    /// Returns a Command configured with:
    /// - HOME and XDG_CONFIG_HOME inside the temporary home directory
    /// - GNUPGHOME pointing at the test keyring
    /// - the native backend, so no system gpg is involved
    /// - colors off and the working directory set to the test dir
    pub fn cmd(&self) -> Command {
        #[allow(deprecated)]
        let mut cmd = Command::cargo_bin("shhh").expect("failed to find shhh binary");
        cmd.env("HOME", self.home.path());
        cmd.env("USERPROFILE", self.home.path());
        cmd.env("XDG_CONFIG_HOME", self.home.path().join(".config"));
        cmd.env("GNUPGHOME", self.gnupg());
        cmd.env("SHHH_BACKEND", "native");
        cmd.env("NO_COLOR", "1");
        cmd.env_remove("SHHH_LOG");
        cmd.env_remove("SHHH_GPG");
        cmd.current_dir(self.dir.path());
        cmd
    }

    /// Shortcut for `shhh encrypt <file> -r ... -o <output>`.
    pub fn encrypt(&self, file: &str, recipients: &[&str], output: &str) -> Output {
        let mut cmd = self.cmd();
        cmd.args(["encrypt", file, "-o", output]);
        for r in recipients {
            cmd.args(["-r", r]);
        }
        cmd.output().expect("failed to run shhh encrypt")
    }

    /// Shortcut for `shhh decrypt <file>` (to stdout).
    pub fn decrypt(&self, file: &str) -> Output {
        self.cmd()
            .args(["decrypt", file])
            .output()
            .expect("failed to run shhh decrypt")
    }

    /// Shortcut for `shhh inspect <file>`.
    pub fn inspect(&self, file: &str) -> Output {
        self.cmd()
            .args(["inspect", file])
            .output()
            .expect("failed to run shhh inspect")
    }

    /// Shortcut for `shhh inspect <file> --json`.
    pub fn inspect_json(&self, file: &str) -> Output {
        self.cmd()
            .args(["inspect", file, "--json"])
            .output()
            .expect("failed to run shhh inspect --json")
    }

    /// Shortcut for `shhh key <args...>`.
    pub fn key(&self, args: &[&str]) -> Output {
        self.cmd()
            .arg("key")
            .args(args)
            .output()
            .expect("failed to run shhh key")
    }
}
