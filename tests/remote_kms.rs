//! Remote provider flow through the CLI with the stub KMS.
//!
//! ```bash
//! cargo test --features test-kms --test remote_kms
//! ```

#![cfg(feature = "test-kms")]

mod support;

use cryptctl::core::domain::EncryptedRecord;

use crate::support::*;

fn plain_manifest(provider: &str, extra: &str) -> String {
    format!(
        r#"{{
            "kind": "DecryptedSecret",
            "metadata": {{
                "name": "app",
                "annotations": {{"secrets.opensecrecy.org/provider": "{}"{}}}
            }},
            "data": {{"token": "hello-world"}}
        }}"#,
        provider, extra
    )
}

fn encrypt(t: &Test, contents: &str) -> EncryptedRecord {
    let path = t.write("plain.json", contents);
    let output = t.cmd().arg("encrypt").arg(&path).output().unwrap();
    assert_success(&output);
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn test_aws_kms_flow_with_default_key() {
    let t = Test::new();
    let encrypted = encrypt(&t, &plain_manifest("aws-kms", ""));
    assert_ne!(encrypted.data["token"], "hello-world");

    let path = t.write("app.json", &manifest(&encrypted));
    assert_success(&t.apply(&path));
    assert_success(&t.cmd().args(["reconcile", "default/app"]).output().unwrap());

    assert_eq!(t.status_json("default/app")["status"], "Ready");
    let output = t.cmd().args(["get-secret", "default/app"]).output().unwrap();
    assert_stdout_contains(&output, "hello-world");
}

#[test]
fn test_gcp_kms_needs_a_key() {
    let t = Test::new();
    let path = t.write("plain.json", &plain_manifest("gcp-kms", ""));
    let output = t.cmd().arg("encrypt").arg(&path).output().unwrap();
    assert_failure(&output);
    assert_stderr_contains(&output, "key unavailable");
}

#[test]
fn test_gcp_kms_key_from_annotation() {
    let t = Test::new();
    let extra = r#", "secrets.opensecrecy.org/kms-key": "projects/p/locations/global/keyRings/r/cryptoKeys/k""#;
    let encrypted = encrypt(&t, &plain_manifest("gcp-kms", extra));

    let path = t.write("app.json", &manifest(&encrypted));
    let output = t.cmd().arg("decrypt").arg(&path).output().unwrap();
    assert_success(&output);
    assert_eq!(stdout_json(&output)["data"]["token"], "hello-world");
}
