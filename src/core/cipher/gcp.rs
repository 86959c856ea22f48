//! Google Cloud KMS backend.
//!
//! Drives the `gcloud` CLI. Enable with `--features gcp`.
//!
//! ## Requirements
//!
//! - `gcloud` CLI installed and authenticated
//! - `cloudkms.cryptoKeyVersions.useToEncrypt` and `useToDecrypt` on the key
//!
//! Key handles are full resource names:
//! `projects/<p>/locations/<l>/keyRings/<r>/cryptoKeys/<k>`.

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use tracing::trace;

use super::kms::KmsClient;
use crate::error::CipherError;

const SERVICE: &str = "gcp-kms";

fn remote(message: String) -> CipherError {
    CipherError::Remote {
        service: SERVICE,
        message,
    }
}

/// GCP Cloud KMS client.
#[derive(Debug)]
pub struct GcpKms {
    gcloud: PathBuf,
    /// Explicit account passed to every call instead of the ambient default.
    account: Option<String>,
}

/// Resource name components, in gcloud flag order.
struct KeyName {
    project: String,
    location: String,
    keyring: String,
    key: String,
}

impl KeyName {
    fn parse(resource_name: &str) -> Result<Self, CipherError> {
        let parts: Vec<&str> = resource_name.split('/').collect();

        if parts.len() != 8
            || parts[0] != "projects"
            || parts[2] != "locations"
            || parts[4] != "keyRings"
            || parts[6] != "cryptoKeys"
        {
            return Err(remote(format!(
                "invalid GCP KMS resource name format: {}",
                resource_name
            )));
        }

        Ok(Self {
            project: parts[1].to_string(),
            location: parts[3].to_string(),
            keyring: parts[5].to_string(),
            key: parts[7].to_string(),
        })
    }
}

impl GcpKms {
    /// Locate `gcloud` on `PATH`.
    pub fn new(account: Option<String>) -> Result<Self, CipherError> {
        let gcloud = which::which("gcloud").map_err(|_| {
            remote(
                "gcloud CLI not found. Install it from https://cloud.google.com/sdk/docs/install"
                    .to_string(),
            )
        })?;
        Ok(Self { gcloud, account })
    }

    fn run(&self, op: &str, resource_name: &str, input: &[u8]) -> Result<Vec<u8>, CipherError> {
        let name = KeyName::parse(resource_name)?;

        let (input_flag, output_flag) = match op {
            "encrypt" => ("--plaintext-file", "--ciphertext-file"),
            _ => ("--ciphertext-file", "--plaintext-file"),
        };

        let mut cmd = Command::new(&self.gcloud);
        cmd.args([
            "kms",
            op,
            "--project",
            &name.project,
            "--location",
            &name.location,
            "--keyring",
            &name.keyring,
            "--key",
            &name.key,
            input_flag,
            "-",
            output_flag,
            "-",
        ]);
        if let Some(account) = &self.account {
            cmd.args(["--account", account]);
        }

        let mut child = cmd
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| remote(format!("failed to spawn gcloud: {}", e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(input)
                .map_err(|e| remote(format!("failed to write to gcloud: {}", e)))?;
        }

        let output = child
            .wait_with_output()
            .map_err(|e| remote(format!("gcloud command failed: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(remote(format!("gcloud kms {} failed: {}", op, stderr.trim())));
        }

        Ok(output.stdout)
    }
}

impl KmsClient for GcpKms {
    fn name(&self) -> &'static str {
        SERVICE
    }

    fn encrypt(&self, key: &str, plaintext: &[u8]) -> Result<Vec<u8>, CipherError> {
        trace!(resource_name = %key, plaintext_len = plaintext.len(), "encrypting with GCP KMS");
        self.run("encrypt", key, plaintext)
    }

    fn decrypt(&self, key: &str, ciphertext: &[u8]) -> Result<Vec<u8>, CipherError> {
        trace!(resource_name = %key, ciphertext_len = ciphertext.len(), "decrypting with GCP KMS");
        self.run("decrypt", key, ciphertext)
    }
}
