//! Tests for seal and open.

use crate::support::*;

#[test]
fn test_seal_then_open() {
    let t = Test::new();

    let output = t.seal("hello-world");
    assert_success(&output);
    let blob = stdout(&output).trim().to_string();
    assert!(!blob.contains("hello-world"));

    let output = t.keyed().args(["open", &blob]).output().unwrap();
    assert_success(&output);
    assert_eq!(stdout(&output).trim(), "hello-world");
}

#[test]
fn test_cli_seal_matches_library() {
    let t = Test::new();
    let blob = stdout(&t.seal("v")).trim().to_string();
    assert_eq!(
        cryptctl::core::cipher::open(&blob, &key(PASSPHRASE)).unwrap(),
        "v"
    );
}

#[test]
fn test_seal_reads_stdin() {
    let t = Test::new();
    let output = t.keyed().arg("seal").write_stdin("piped\n").output().unwrap();
    assert_success(&output);

    let blob = stdout(&output).trim().to_string();
    let output = t.keyed().arg("open").write_stdin(blob).output().unwrap();
    assert_success(&output);
    assert_eq!(stdout(&output).trim(), "piped");
}

#[test]
fn test_open_with_wrong_passphrase_fails() {
    let t = Test::new();
    let blob = stdout(&t.seal("v")).trim().to_string();

    let output = t
        .cmd()
        .env("CRYPTCTL_PASSPHRASE", "not-hello")
        .args(["open", &blob])
        .output()
        .unwrap();
    assert_failure(&output);
    assert_stderr_contains(&output, "authentication failed");
}

#[test]
fn test_legacy_kdf_override() {
    let t = Test::new();
    let output = t
        .keyed()
        .args(["seal", "v", "--kdf", "legacy-md5"])
        .output()
        .unwrap();
    assert_success(&output);
    let blob = stdout(&output).trim().to_string();

    let legacy = cryptctl::core::cipher::Kdf::LegacyMd5
        .derive(PASSPHRASE.as_bytes())
        .unwrap();
    assert_eq!(cryptctl::core::cipher::open(&blob, &legacy).unwrap(), "v");

    let output = t.keyed().args(["open", &blob]).output().unwrap();
    assert_failure(&output);
}

#[test]
fn test_seal_without_passphrase_fails() {
    let t = Test::new();
    let output = t.cmd().args(["seal", "v"]).output().unwrap();
    assert_failure(&output);
    assert_stderr_contains(&output, "CRYPTCTL_PASSPHRASE");
}
