//! Tests for apply, reconcile, status and get-secret.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::support::*;

#[test]
fn test_apply_reconcile_get_secret() {
    let t = Test::new();
    let path = t.write(
        "app.json",
        &manifest(&static_record("default", "app", &[("secret", "hello-world")])),
    );

    assert_success(&t.apply(&path));
    let output = t.reconcile("default/app");
    assert_success(&output);
    assert_stdout_contains(&output, "ready");

    let status = t.status_json("default/app");
    assert_eq!(status["status"], "Ready");
    assert_eq!(status["message"], "encrypted secrets app is ready to be used");

    let output = t.secret_json("default/app");
    assert_success(&output);
    let secret = stdout_json(&output);
    assert_eq!(
        secret["data"]["secret"],
        STANDARD.encode("hello-world").as_str()
    );
    assert_eq!(
        secret["metadata"]["ownerReferences"][0]["kind"],
        "EncryptedSecret"
    );

    let output = t.cmd().args(["get-secret", "app"]).output().unwrap();
    assert_success(&output);
    assert_stdout_contains(&output, "hello-world");
}

#[test]
fn test_reconcile_missing_record() {
    let t = Test::new();
    let output = t.reconcile("default/ghost");
    assert_success(&output);
    assert_stdout_contains(&output, "missing");
    assert!(!t.state_path().exists());
}

#[test]
fn test_reconcile_without_passphrase_sets_error() {
    let t = Test::new();
    let path = t.write(
        "app.json",
        &manifest(&static_record("default", "app", &[("secret", "x")])),
    );
    assert_success(&t.apply(&path));

    let output = t.cmd().args(["reconcile", "default/app"]).output().unwrap();
    assert_success(&output);

    let status = t.status_json("default/app");
    assert_eq!(status["status"], "Error");
    assert!(status["message"]
        .as_str()
        .unwrap()
        .starts_with("failed to decrypt value for"));
    assert_failure(&t.secret_json("default/app"));
}

#[test]
fn test_cluster_key_from_applied_secret() {
    let t = Test::new();
    let key_path = t.write(
        "key.json",
        &serde_json::to_string(&key_secret("default", "cluster")).unwrap(),
    );
    assert_success(&t.apply(&key_path));

    let key = fast_kdf().derive(b"cluster").unwrap();
    let value = cryptctl::core::cipher::seal("from-cluster", &key).unwrap();
    let path = t.write(
        "app.json",
        &manifest(&record("default", "app", "k8s", &[("v", &value)])),
    );
    assert_success(&t.apply(&path));

    assert_success(&t.cmd().args(["reconcile", "default/app"]).output().unwrap());
    assert_eq!(t.status_json("default/app")["status"], "Ready");
}

#[test]
fn test_reconcile_all() {
    let t = Test::new();
    for (name, provider) in [("one", "static"), ("two", "vault")] {
        let mut record = static_record("default", name, &[("v", name)]);
        record
            .metadata
            .annotations
            .insert("secrets.opensecrecy.org/provider".to_string(), provider.to_string());
        assert_success(&t.apply(&t.write(&format!("{}.json", name), &manifest(&record))));
    }

    let output = t.keyed().args(["reconcile", "--all"]).output().unwrap();
    assert_success(&output);
    assert_eq!(t.status_json("default/one")["status"], "Ready");
    assert_eq!(t.status_json("default/two")["status"], "Error");
}

#[test]
fn test_unknown_provider_ignored_by_config() {
    let t = Test::new();
    t.write_config(&format!("{}\n[provider]\nunknown = \"ignore\"\n", FAST_CONFIG));
    let path = t.write(
        "app.json",
        &manifest(&record("default", "app", "vault", &[("v", "x")])),
    );
    assert_success(&t.apply(&path));

    let output = t.reconcile("default/app");
    assert_success(&output);
    assert_stdout_contains(&output, "ignored");
    assert_eq!(t.status_json("default/app")["status"], "Unknown");
}

#[test]
fn test_injected_record_bypassed() {
    let t = Test::new();
    let mut record = static_record("default", "app", &[("v", "x")]);
    record.metadata.annotations.insert(
        "secrets.opensecrecy.org/inject-encrypted-secrets".to_string(),
        "true".to_string(),
    );
    assert_success(&t.apply(&t.write("app.json", &manifest(&record))));

    let output = t.reconcile("default/app");
    assert_success(&output);
    assert_stdout_contains(&output, "bypassed");
    assert_failure(&t.secret_json("default/app"));
}

#[test]
fn test_custom_state_path() {
    let t = Test::new();
    let state = t.dir.path().join("nested").join("state.json");
    let path = t.write(
        "app.json",
        &manifest(&static_record("default", "app", &[("v", "x")])),
    );

    let output = t
        .cmd()
        .arg("--state")
        .arg(&state)
        .arg("apply")
        .arg(&path)
        .output()
        .unwrap();
    assert_success(&output);
    assert!(state.exists());
    assert!(!t.state_path().exists());
}
