//! Command helper methods for Test.

use std::path::Path;
use std::process::Output;

use assert_cmd::Command;

use super::{Test, PASSPHRASE};

impl Test {
    /// Create a cryptctl command isolated to this environment.
    ///
    /// Returns a Command configured with:
    /// - HOME and XDG_CONFIG_HOME inside the temporary home directory
    /// - Current directory set to the working directory
    /// - No passphrase, no log filter, no colors
    pub fn cmd(&self) -> Command {
        #[allow(deprecated)]
        let mut cmd = Command::cargo_bin("cryptctl").expect("failed to find cryptctl binary");
        cmd.env("HOME", self.home.path());
        cmd.env("USERPROFILE", self.home.path());
        cmd.env("XDG_CONFIG_HOME", self.home.path().join(".config"));
        cmd.env("NO_COLOR", "1");
        cmd.env_remove("CRYPTCTL_PASSPHRASE");
        cmd.env_remove("CRYPTCTL_LOG");
        cmd.env_remove("CRYPTCTL_CONFIG");
        cmd.env_remove("CRYPTCTL_STATE");
        cmd.current_dir(self.dir.path());
        cmd
    }

    /// Command with the test passphrase exported.
    pub fn keyed(&self) -> Command {
        let mut cmd = self.cmd();
        cmd.env("CRYPTCTL_PASSPHRASE", PASSPHRASE);
        cmd
    }

    /// Shortcut for `cryptctl seal`.
    pub fn seal(&self, value: &str) -> Output {
        self.keyed()
            .args(["seal", value])
            .output()
            .expect("failed to run cryptctl seal")
    }

    /// Shortcut for `cryptctl apply`.
    pub fn apply(&self, manifest: &Path) -> Output {
        self.cmd()
            .arg("apply")
            .arg(manifest)
            .output()
            .expect("failed to run cryptctl apply")
    }

    /// Shortcut for `cryptctl reconcile <id>`.
    pub fn reconcile(&self, id: &str) -> Output {
        self.keyed()
            .args(["reconcile", id])
            .output()
            .expect("failed to run cryptctl reconcile")
    }

    /// Shortcut for `cryptctl status <id> --json`.
    pub fn status_json(&self, id: &str) -> serde_json::Value {
        let output = self
            .cmd()
            .args(["status", id, "--json"])
            .output()
            .expect("failed to run cryptctl status");
        super::assert_success(&output);
        super::stdout_json(&output)
    }

    /// Shortcut for `cryptctl get-secret <id> --json`.
    pub fn secret_json(&self, id: &str) -> Output {
        self.cmd()
            .args(["get-secret", id, "--json"])
            .output()
            .expect("failed to run cryptctl get-secret")
    }
}
