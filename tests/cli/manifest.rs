//! Tests for decrypt and encrypt.

use cryptctl::core::domain::{DecryptedRecord, EncryptedRecord};

use crate::support::*;

#[test]
fn test_decrypt_manifest() {
    let t = Test::new();
    let record = static_record("default", "app", &[("user", "admin"), ("pass", "s3cret")]);
    let path = t.write("app.json", &manifest(&record));

    let output = t.keyed().arg("decrypt").arg(&path).output().unwrap();
    assert_success(&output);

    let decrypted: DecryptedRecord = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(decrypted.kind, "DecryptedSecret");
    assert_eq!(decrypted.data["user"], "admin");
    assert_eq!(decrypted.data["pass"], "s3cret");
}

#[test]
fn test_decrypt_from_stdin() {
    let t = Test::new();
    let record = static_record("default", "app", &[("user", "admin")]);

    let output = t
        .keyed()
        .args(["decrypt", "-"])
        .write_stdin(manifest(&record))
        .output()
        .unwrap();
    assert_success(&output);
    assert_eq!(stdout_json(&output)["data"]["user"], "admin");
}

#[test]
fn test_decrypt_rejects_other_kinds() {
    let t = Test::new();
    let path = t.write(
        "secret.json",
        r#"{"kind":"Secret","metadata":{"name":"app"},"data":{}}"#,
    );
    let output = t.keyed().arg("decrypt").arg(&path).output().unwrap();
    assert_failure(&output);
    assert_stderr_contains(&output, "EncryptedSecret");
}

#[test]
fn test_encrypt_keeps_unchanged_ciphertext() {
    let t = Test::new();
    let mut record = static_record("default", "app", &[("user", "admin"), ("pass", "s3cret")]);
    record.metadata.uid = Some("7c9e6679-7425-40de-944b-e07fc1f90ae7".to_string());
    let previous = t.write("previous.json", &manifest(&record));

    let edited = r#"{
        "kind": "DecryptedSecret",
        "metadata": {
            "name": "app",
            "annotations": {"secrets.opensecrecy.org/provider": "static"}
        },
        "data": {"user": "admin", "pass": "rotated"}
    }"#;
    let path = t.write("edited.json", edited);

    let output = t
        .keyed()
        .arg("encrypt")
        .arg(&path)
        .arg("--from")
        .arg(&previous)
        .output()
        .unwrap();
    assert_success(&output);

    let encrypted: EncryptedRecord = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(encrypted.data["user"], record.data["user"]);
    assert_ne!(encrypted.data["pass"], record.data["pass"]);
    assert_eq!(
        cryptctl::core::cipher::open(&encrypted.data["pass"], &key(PASSPHRASE)).unwrap(),
        "rotated"
    );
}

#[test]
fn test_re_encrypt_requires_from() {
    let t = Test::new();
    let path = t.write(
        "plain.json",
        r#"{"kind":"DecryptedSecret","metadata":{"name":"app","annotations":{"secrets.opensecrecy.org/provider":"static"}},"data":{"a":"b"}}"#,
    );
    let output = t
        .keyed()
        .arg("encrypt")
        .arg(&path)
        .arg("--re-encrypt")
        .output()
        .unwrap();
    assert_failure(&output);
}

#[test]
fn test_re_encrypt_seals_every_field_again() {
    let t = Test::new();
    let record = static_record("default", "app", &[("user", "admin")]);
    let previous = t.write("previous.json", &manifest(&record));
    let path = t.write(
        "plain.json",
        r#"{"kind":"DecryptedSecret","metadata":{"name":"app","annotations":{"secrets.opensecrecy.org/provider":"static"}},"data":{"user":"ignored"}}"#,
    );

    let output = t
        .keyed()
        .arg("encrypt")
        .arg(&path)
        .arg("--from")
        .arg(&previous)
        .arg("--re-encrypt")
        .output()
        .unwrap();
    assert_success(&output);

    let encrypted: EncryptedRecord = serde_json::from_slice(&output.stdout).unwrap();
    assert_ne!(encrypted.data["user"], record.data["user"]);
    assert_eq!(
        cryptctl::core::cipher::open(&encrypted.data["user"], &key(PASSPHRASE)).unwrap(),
        "admin"
    );
}
